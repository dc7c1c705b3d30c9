use std::sync::Arc;

use ffmpeg_pack::{FfmpegEncoder, Ladder};
use tokio_util::sync::CancellationToken;

use crate::{
    handler::{
        AppState,
        auth::{AllowAll, StaticTokens, TokenVerifier},
    },
    manager::TaskRegistry,
    packaging::{access::ManifestAccess, orchestrator::Packager},
};

mod api;
mod config;
mod handler;
mod manager;
mod packaging;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ott_packager", log::LevelFilter::Debug)
        .filter_module("ffmpeg_pack", log::LevelFilter::Debug)
        .init();
}

fn build_state(config: &config::PackagerConfig) -> AppState {
    let encoder = FfmpegEncoder::new(config.ffmpeg_bin()).with_threads(config.ffmpeg_threads());
    let packager = Packager::new(Arc::new(encoder), Ladder::default());
    log::info!(
        "packaging {} renditions per protocol into {}",
        packager.ladder().renditions().len(),
        config.output_root().display()
    );

    let verifier: Arc<dyn TokenVerifier> = if config.api_tokens().is_empty() {
        log::warn!("PACKAGER_API_TOKENS is empty, requests are not authenticated");
        Arc::new(AllowAll)
    } else {
        Arc::new(StaticTokens::new(config.api_tokens().iter().cloned()))
    };

    AppState {
        registry: Arc::new(TaskRegistry::new()),
        packager: Arc::new(packager),
        access: Arc::new(ManifestAccess::new(config.output_root().clone())),
        verifier,
    }
}

#[tokio::main]
async fn main() -> ! {
    init_logging();
    let config = config::config();
    ffmpeg_pack::init(config.ffmpeg_bin())
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error initializing ffmpeg: {:#}", e);
            std::process::exit(1);
        });

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    api::start_api_server(config.listen_addr(), build_state(config), cancel_clone);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            },
        }
    }

    std::process::exit(0);
}
