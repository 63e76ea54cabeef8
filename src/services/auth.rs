// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Bearer-token authentication for the HTTP surface.
//!
//! A single static token guards every route except the health check. Only
//! its SHA-256 digest is held in memory; presented tokens are hashed and
//! compared against it.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

/// Hash a token for storage and comparison.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest-only holder of the configured API token.
#[derive(Debug, Clone)]
pub struct TokenAuth {
    digest: String,
}

impl TokenAuth {
    pub fn new(token: &str) -> Self {
        Self {
            digest: hash_token(token),
        }
    }

    pub fn verify(&self, presented: &str) -> bool {
        hash_token(presented) == self.digest
    }
}

/// Auth error responses. A missing or malformed header is distinguished
/// from a well-formed header carrying the wrong token.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "no token"),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "bad token"),
        };
        (status, message).into_response()
    }
}

/// Extractor that rejects requests without a valid bearer token.
pub struct RequireAuth;

impl<S> FromRequestParts<S> for RequireAuth
where
    TokenAuth: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let Some(presented) = header.strip_prefix("Bearer ") else {
            return Err(AuthError::MissingToken);
        };
        if TokenAuth::from_ref(state).verify(presented) {
            Ok(RequireAuth)
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}
