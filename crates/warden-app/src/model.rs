// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use time::Date;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewKind {
    Overview,
    Users,
    Online,
}

impl ViewKind {
    pub const ALL: [Self; 3] = [Self::Overview, Self::Users, Self::Online];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Users => "users",
            Self::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overview" => Some(Self::Overview),
            "users" => Some(Self::Users),
            "online" => Some(Self::Online),
            _ => None,
        }
    }

    /// Views refreshed on the live timer while active.
    pub const fn is_pollable(self) -> bool {
        matches!(self, Self::Users | Self::Online)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Recent,
    Balance,
    Usage,
    Name,
}

impl SortOrder {
    pub const ALL: [Self; 4] = [Self::Recent, Self::Balance, Self::Usage, Self::Name];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Balance => "balance",
            Self::Usage => "usage",
            Self::Name => "name",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recent" => Some(Self::Recent),
            "balance" => Some(Self::Balance),
            "usage" => Some(Self::Usage),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(default, alias = "users", alias = "userCount", deserialize_with = "count")]
    pub total_users: u64,
    #[serde(
        default,
        alias = "online",
        alias = "onlineUsers",
        deserialize_with = "optional_count"
    )]
    pub online_now: Option<u64>,
    #[serde(default, alias = "activeUsersToday", deserialize_with = "optional_count")]
    pub active_today: Option<u64>,
    #[serde(default)]
    pub total_balance: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// Counts arrive as integers, floats, numeric strings, or the list itself.
fn lenient_count(value: &Value) -> Option<u64> {
    let whole = |raw: f64| (raw.is_finite() && raw >= 0.0).then(|| raw.round() as u64);
    match value {
        Value::Number(number) => number.as_u64().or_else(|| number.as_f64().and_then(whole)),
        Value::String(text) => text.trim().parse::<f64>().ok().and_then(whole),
        Value::Array(items) => u64::try_from(items.len()).ok(),
        _ => None,
    }
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(lenient_count(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn optional_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_count(&Value::deserialize(deserializer)?))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    #[serde(alias = "id", alias = "userId")]
    pub uid: UserId,
    #[serde(default, alias = "name")]
    pub username: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default, alias = "usageCount", alias = "plays")]
    pub usage: Option<i64>,
    #[serde(default, alias = "lastSeenAt")]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserPage {
    pub rows: Vec<UserRow>,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(alias = "id", alias = "userId")]
    pub uid: UserId,
    #[serde(default, alias = "name")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default, alias = "usageCount", alias = "plays")]
    pub usage: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "lastSeenAt")]
    pub last_seen: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    #[serde(alias = "id", alias = "userId")]
    pub uid: UserId,
    #[serde(default, alias = "name")]
    pub username: Option<String>,
    #[serde(default, alias = "lastSeenAt")]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnlineSnapshot {
    pub minutes: u32,
    pub users: Vec<OnlineUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// Cumulative total per day.
    Growth,
    /// New entries per day.
    Daily,
}

impl SeriesKind {
    pub const ALL: [Self; 2] = [Self::Growth, Self::Daily];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Growth => "growth",
            Self::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Embedded,
    Endpoint,
    Synthesized,
}

impl Provenance {
    pub const fn is_real(self) -> bool {
        !matches!(self, Self::Synthesized)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Embedded | Self::Endpoint => "real data",
            Self::Synthesized => "no data yet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: Date,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub growth: ChartSeries,
    pub daily: ChartSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub stats: StatsSummary,
    pub charts: ChartSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountAction {
    AdjustBalance { uid: UserId, delta: f64 },
    SetBalance { uid: UserId, balance: f64 },
    ResetBalance(UserId),
    ResetUsage(UserId),
}

impl AccountAction {
    pub fn uid(&self) -> &UserId {
        match self {
            Self::AdjustBalance { uid, .. } | Self::SetBalance { uid, .. } => uid,
            Self::ResetBalance(uid) | Self::ResetUsage(uid) => uid,
        }
    }

    pub fn confirmation_prompt(&self) -> Option<String> {
        match self {
            Self::ResetBalance(uid) => Some(format!("reset balance of {uid} to zero?")),
            Self::ResetUsage(uid) => Some(format!("reset usage counters of {uid}?")),
            Self::AdjustBalance { .. } | Self::SetBalance { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::AdjustBalance { uid, delta } => format!("balance of {uid} adjusted by {delta}"),
            Self::SetBalance { uid, balance } => format!("balance of {uid} set to {balance}"),
            Self::ResetBalance(uid) => format!("balance of {uid} reset"),
            Self::ResetUsage(uid) => format!("usage of {uid} reset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayoutAction {
    Preview(UserId),
    Create { uid: UserId, amount: f64 },
    Confirm(UserId),
}

impl PayoutAction {
    pub fn confirmation_prompt(&self) -> Option<String> {
        match self {
            Self::Confirm(uid) => Some(format!("confirm payout for {uid}?")),
            Self::Preview(_) | Self::Create { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutReceipt {
    pub action: PayoutAction,
    pub body: Value,
}

/// Render-facing state of one console section.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Empty,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Marks the panel loading without dropping data already shown.
    pub fn begin_loading(&mut self) {
        if !matches!(self, Self::Ready(_)) {
            *self = Self::Loading;
        }
    }
}
