//! Bearer token boundary. Tokens are issued and validated elsewhere; this
//! only turns an `Authorization` header into a [`Principal`].

use std::collections::HashMap;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::handler::{ApiError, AppState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidScheme,
    #[error("Unauthorized: invalid token")]
    Rejected,
}

pub trait TokenVerifier: Send + Sync {
    /// Requests without an `Authorization` header are let through.
    fn allows_anonymous(&self) -> bool {
        false
    }

    fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Fixed token → subject table.
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

impl TokenVerifier for StaticTokens {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(token)
            .map(|subject| Principal {
                subject: subject.clone(),
            })
            .ok_or(AuthError::Rejected)
    }
}

/// Used when no tokens are configured.
pub struct AllowAll;

impl TokenVerifier for AllowAll {
    fn allows_anonymous(&self) -> bool {
        true
    }

    fn verify(&self, _token: &str) -> Result<Principal, AuthError> {
        Ok(Principal::anonymous())
    }
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
        }
    }
}

fn authenticate(header: Option<&str>, verifier: &dyn TokenVerifier) -> Result<Principal, AuthError> {
    let Some(header) = header else {
        if verifier.allows_anonymous() {
            return Ok(Principal::anonymous());
        }
        return Err(AuthError::MissingHeader);
    };
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidScheme)?;
    verifier.verify(token)
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidScheme)?),
            None => None,
        };
        let principal = authenticate(header, state.verifier.as_ref())?;
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> StaticTokens {
        StaticTokens::new([("secret".to_string(), "alice".to_string())])
    }

    #[test]
    fn test_static_tokens() {
        let verifier = tokens();
        assert_eq!(
            authenticate(Some("Bearer secret"), &verifier),
            Ok(Principal {
                subject: "alice".to_string()
            })
        );
        assert_eq!(
            authenticate(Some("Bearer wrong"), &verifier),
            Err(AuthError::Rejected)
        );
        assert_eq!(authenticate(None, &verifier), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_header_format() {
        let verifier = tokens();
        assert_eq!(
            authenticate(Some("secret"), &verifier),
            Err(AuthError::InvalidScheme)
        );
        assert_eq!(
            authenticate(Some("Basic secret"), &verifier),
            Err(AuthError::InvalidScheme)
        );
        assert_eq!(
            authenticate(Some("Bearer "), &verifier),
            Err(AuthError::InvalidScheme)
        );
    }

    #[test]
    fn test_allow_all() {
        assert_eq!(authenticate(None, &AllowAll), Ok(Principal::anonymous()));
        assert_eq!(
            authenticate(Some("Bearer anything"), &AllowAll),
            Ok(Principal::anonymous())
        );
    }
}
