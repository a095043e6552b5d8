// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ApiError, Credential, CredentialGuard};
use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_SECRET_HEADER: &str = "x-admin-secret";

/// A 401 is answered by re-prompting and retrying this many times, no more.
pub const MAX_AUTH_RETRIES: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Unencoded path, for logs.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Issues authenticated requests against the admin API. Every call
/// consults the shared [`CredentialGuard`] first.
pub struct RequestGateway {
    base_url: Url,
    secret_header: HeaderName,
    http: HttpClient,
    guard: Mutex<CredentialGuard>,
}

impl RequestGateway {
    pub fn new(
        base_url: &str,
        secret_header: &str,
        timeout: Duration,
        guard: CredentialGuard,
    ) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base_url =
            Url::parse(trimmed).with_context(|| format!("parse api.base_url {trimmed:?}"))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            bail!("api.base_url {trimmed:?} must be an http(s) URL");
        }

        let secret_header = HeaderName::from_bytes(secret_header.trim().as_bytes())
            .with_context(|| format!("invalid api.secret_header {secret_header:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            secret_header,
            http,
            guard: Mutex::new(guard),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(request);
        let mut auth_retries = 0;

        loop {
            let credential = self.guard().ensure()?;
            debug!(method = %request.method, path = %request.path(), "dispatch admin request");
            let response = self.dispatch(request, &url, &credential)?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && auth_retries < MAX_AUTH_RETRIES {
                auth_retries += 1;
                warn!(path = %request.path(), "admin secret rejected; asking again");
                self.guard().invalidate_if(&credential);
                continue;
            }

            let text = response
                .text()
                .map_err(|error| network_error(&url, &error))?;
            if !status.is_success() {
                debug!(status = status.as_u16(), path = %request.path(), "admin request failed");
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    body: text,
                });
            }
            return Ok(parse_body(&text));
        }
    }

    fn dispatch(
        &self,
        request: &ApiRequest,
        url: &Url,
        credential: &Credential,
    ) -> Result<Response, ApiError> {
        let mut secret = HeaderValue::from_str(credential.expose()).map_err(|_| {
            self.guard().invalidate_if(credential);
            ApiError::Auth("admin secret contains characters not allowed in a header".to_owned())
        })?;
        secret.set_sensitive(true);

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .header(self.secret_header.clone(), secret)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder.send().map_err(|error| network_error(url, &error))
    }

    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }

    fn guard(&self) -> MutexGuard<'_, CredentialGuard> {
        match self.guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Decodes a response body, wrapping non-JSON text as `{"ok": true, "raw": ...}`.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "ok": true, "raw": text }))
}

fn network_error(url: &Url, error: &reqwest::Error) -> ApiError {
    ApiError::Network {
        url: format!("{}://{}", url.scheme(), url.authority()),
        message: error.to_string(),
    }
}
