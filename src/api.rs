use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::handler::{AppState, package::package_router, stream::stream_router};

pub(crate) fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(package_router())
        .nest("/stream", stream_router())
        .with_state(state)
}

pub(crate) fn start_api_server(addr: std::net::SocketAddr, state: AppState, cancel: CancellationToken) {
    tokio::spawn(async move {
        let app = app_router(state);

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("Error binding API server to {}: {}", addr, e);
                cancel.cancel();
                return;
            }
        };
        log::info!("API server started on {}", addr);
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(cancel))
            .await
        {
            log::error!("Error starting API server: {}", e);
        }
    });
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {
            log::info!("Shutting down API server...");
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
