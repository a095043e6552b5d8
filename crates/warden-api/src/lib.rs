// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod charts;
mod credential;
mod endpoints;
mod error;
mod gateway;

pub use charts::{ChartDataResolver, SeriesSource};
pub use credential::{Credential, CredentialGuard, SecretPrompt};
pub use endpoints::AdminClient;
pub use error::ApiError;
pub use gateway::{
    ApiRequest, DEFAULT_SECRET_HEADER, MAX_AUTH_RETRIES, RequestGateway, parse_body,
};
