// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;
use thiserror::Error;

/// Failures surfaced by [`crate::RequestGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("admin secret required: {0}")]
    Auth(String),
    #[error("{}", http_message(.status, .body))]
    Http { status: u16, body: String },
    #[error("cannot reach {url} ({message})")]
    Network { url: String, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a missing secret and for a rejection that survived the retry.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Http { status: 401, .. })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

fn http_message(status: &u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return format!("server error ({status}): {message}");
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return format!("server error ({status}): {trimmed}");
    }

    format!("server returned {status}")
}
