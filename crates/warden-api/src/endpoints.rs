// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ApiError, ApiRequest, ChartDataResolver, RequestGateway, SeriesSource};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use time::Date;
use warden_app::{
    AccountAction, OnlineUser, Overview, PageQuery, PayoutAction, SeriesKind, StatsSummary,
    UserDetail, UserId, UserPage, UserRow,
};

const ROW_KEYS: [&str; 3] = ["users", "rows", "items"];
const COUNT_KEYS: [&str; 3] = ["count", "total", "totalCount"];
const ONLINE_KEYS: [&str; 2] = ["users", "online"];

/// Typed wrappers over the admin REST surface.
pub struct AdminClient {
    gateway: RequestGateway,
}

impl AdminClient {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn stats_payload(&self) -> Result<Value, ApiError> {
        self.gateway.send(&ApiRequest::get(["admin", "stats"]))
    }

    /// Stats plus both chart series, fetched as one sequenced action.
    pub fn overview(&self, window_days: u32, today: Date) -> Result<Overview, ApiError> {
        let payload = self.stats_payload()?;
        let stats = decode_stats(&payload)?;
        let charts =
            ChartDataResolver::new(self).resolve(&payload, window_days, stats.total_users, today);
        Ok(Overview { stats, charts })
    }

    pub fn list_users(&self, query: &PageQuery) -> Result<UserPage, ApiError> {
        let request = ApiRequest::get(["admin", "users"])
            .query("search", &query.search)
            .query("limit", query.limit)
            .query("offset", query.offset)
            .query("order", query.order.as_str());
        let payload = self.gateway.send(&request)?;
        decode_user_page(&payload, query)
    }

    pub fn user_detail(&self, uid: &UserId) -> Result<UserDetail, ApiError> {
        let payload = self
            .gateway
            .send(&ApiRequest::get(["admin", "users", uid.as_str()]))?;
        let record = payload.get("user").unwrap_or(&payload);
        decode(record, "user detail")
    }

    pub fn online_users(&self, minutes: u32) -> Result<Vec<OnlineUser>, ApiError> {
        let payload = self
            .gateway
            .send(&ApiRequest::get(["admin", "online"]).query("minutes", minutes))?;
        let list = if payload.is_array() {
            &payload
        } else {
            ONLINE_KEYS
                .iter()
                .find_map(|key| payload.get(key).filter(|value| value.is_array()))
                .ok_or_else(|| ApiError::Decode("online users: expected a list".to_owned()))?
        };
        decode(list, "online users")
    }

    pub fn series(&self, kind: SeriesKind, days: u32) -> Result<Value, ApiError> {
        self.gateway
            .send(&ApiRequest::get(["admin", "charts", kind.as_str()]).query("days", days))
    }

    pub fn apply_account(&self, action: &AccountAction) -> Result<Value, ApiError> {
        let request = match action {
            AccountAction::AdjustBalance { uid, delta } => {
                ApiRequest::post(["admin", "users", uid.as_str(), "balance"])
                    .json(json!({ "delta": delta }))
            }
            AccountAction::SetBalance { uid, balance } => {
                ApiRequest::post(["admin", "users", uid.as_str(), "balance"])
                    .json(json!({ "balance": balance }))
            }
            AccountAction::ResetBalance(uid) => {
                ApiRequest::post(["admin", "users", uid.as_str(), "balance", "reset"])
            }
            AccountAction::ResetUsage(uid) => {
                ApiRequest::post(["admin", "users", uid.as_str(), "usage", "reset"])
            }
        };
        self.gateway.send(&request)
    }

    pub fn payout(&self, action: &PayoutAction) -> Result<Value, ApiError> {
        let request = match action {
            PayoutAction::Preview(uid) => {
                ApiRequest::get(["admin", "payout", "preview"]).query("uid", uid)
            }
            PayoutAction::Create { uid, amount } => ApiRequest::post(["admin", "payout", "create"])
                .json(json!({ "uid": uid, "piAmount": amount })),
            PayoutAction::Confirm(uid) => {
                ApiRequest::post(["admin", "payout", "confirm"]).json(json!({ "uid": uid }))
            }
        };
        self.gateway.send(&request)
    }
}

impl SeriesSource for AdminClient {
    fn fetch_series(&self, kind: SeriesKind, days: u32) -> Result<Value, ApiError> {
        self.series(kind, days)
    }
}

fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value.clone())
        .map_err(|error| ApiError::Decode(format!("{what}: {error}")))
}

fn decode_stats(payload: &Value) -> Result<StatsSummary, ApiError> {
    if is_raw_fallback(payload) {
        return Err(ApiError::Decode("stats: expected a JSON object".to_owned()));
    }
    let record = payload
        .get("stats")
        .filter(|value| value.is_object())
        .unwrap_or(payload);
    decode(record, "stats")
}

fn decode_user_page(payload: &Value, query: &PageQuery) -> Result<UserPage, ApiError> {
    let list = if payload.is_array() {
        payload
    } else {
        ROW_KEYS
            .iter()
            .find_map(|key| payload.get(key).filter(|value| value.is_array()))
            .ok_or_else(|| ApiError::Decode("user list: expected a users array".to_owned()))?
    };
    let rows: Vec<UserRow> = decode(list, "user list")?;

    // Without a reported count, assume the list ends with this page.
    let count = COUNT_KEYS
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_u64))
        .unwrap_or(query.offset + rows.len() as u64);

    Ok(UserPage {
        rows,
        count,
        offset: query.offset,
        limit: query.limit,
    })
}

fn is_raw_fallback(payload: &Value) -> bool {
    payload.get("raw").is_some_and(Value::is_string) && payload.get("ok") == Some(&json!(true))
}
