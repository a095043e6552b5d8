// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

pub const FIXTURE_SECRET: &str = "letmein";

/// One scripted answer, replayed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

impl MockReply {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json",
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            content_type: "text/plain",
        }
    }

    pub fn unauthorized() -> Self {
        Self::json(401, &json!({"error": "unauthorized"}))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    pub fn json_body(&self) -> Result<Value> {
        serde_json::from_str(&self.body).with_context(|| format!("decode body of {}", self.url))
    }
}

/// Local HTTP server that answers with `replies` in order and records what
/// it received. Stops after the last reply or two idle seconds.
pub struct MockBackend {
    base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl MockBackend {
    pub fn start(replies: Vec<MockReply>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock backend: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::new();
            for reply in replies {
                let mut request = match server.recv_timeout(IDLE_TIMEOUT) {
                    Ok(Some(request)) => request,
                    Ok(None) | Err(_) => break,
                };

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| {
                            (
                                header.field.as_str().as_str().to_owned(),
                                header.value.as_str().to_owned(),
                            )
                        })
                        .collect(),
                    body,
                });

                let mut response =
                    Response::from_string(reply.body).with_status_code(reply.status);
                if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
            recorded
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the server thread and returns every request it saw.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock backend thread panicked"))
    }
}

pub fn stats_json(total_users: u64) -> Value {
    json!({
        "totalUsers": total_users,
        "onlineNow": 3,
        "activeToday": 11,
        "totalBalance": 1520.5,
    })
}

pub fn user_json(uid: &str, username: &str) -> Value {
    json!({
        "uid": uid,
        "username": username,
        "balance": 12.5,
        "usage": 40,
        "lastSeen": "2026-10-14T09:30:00Z",
    })
}

/// A page body holding `rows` generated users starting at `first`.
pub fn user_page_json(first: u64, rows: u64, count: u64) -> Value {
    let users: Vec<Value> = (first..first + rows)
        .map(|index| user_json(&format!("u{index}"), &format!("player{index}")))
        .collect();
    json!({ "users": users, "count": count })
}

pub fn fixture_date() -> &'static str {
    "2026-10-14"
}
