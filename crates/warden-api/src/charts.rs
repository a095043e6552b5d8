// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ApiError;
use serde_json::Value;
use std::collections::BTreeMap;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use tracing::debug;
use warden_app::{ChartPoint, ChartSeries, ChartSet, Provenance, SeriesKind};

const GROWTH_PATHS: [&str; 2] = ["/charts/growth", "/growth"];
const DAILY_PATHS: [&str; 2] = ["/charts/daily", "/daily"];
const ENDPOINT_WRAPPERS: [&str; 3] = ["series", "data", "points"];
const DATE_KEYS: [&str; 4] = ["date", "day", "t", "x"];
const VALUE_KEYS: [&str; 4] = ["value", "count", "total", "y"];

// Above this a numeric timestamp is taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Secondary time-series lookup used when the stats payload has no series.
pub trait SeriesSource {
    fn fetch_series(&self, kind: SeriesKind, days: u32) -> Result<Value, ApiError>;
}

pub struct ChartDataResolver<'a, S: SeriesSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: SeriesSource + ?Sized> ChartDataResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Always yields both series over `window_days` days ending `today`.
    /// Missing or broken sources degrade to a synthesized placeholder.
    pub fn resolve(
        &self,
        primary: &Value,
        window_days: u32,
        current_total: u64,
        today: Date,
    ) -> ChartSet {
        let window = window_days.max(1);
        ChartSet {
            growth: self.resolve_series(SeriesKind::Growth, primary, window, current_total, today),
            daily: self.resolve_series(SeriesKind::Daily, primary, window, current_total, today),
        }
    }

    fn resolve_series(
        &self,
        kind: SeriesKind,
        primary: &Value,
        window: u32,
        current_total: u64,
        today: Date,
    ) -> ChartSeries {
        if let Some(points) = embedded_points(primary, kind) {
            return normalize(kind, &points, window, today, Provenance::Embedded);
        }

        match self.source.fetch_series(kind, window) {
            Ok(value) => match endpoint_points(&value) {
                Some(points) => {
                    return normalize(kind, &points, window, today, Provenance::Endpoint);
                }
                None => debug!(series = kind.as_str(), "series endpoint had no usable points"),
            },
            Err(error) => debug!(series = kind.as_str(), %error, "series endpoint failed"),
        }

        synthesize(kind, window, current_total, today)
    }
}

fn embedded_points(primary: &Value, kind: SeriesKind) -> Option<Vec<(Date, f64)>> {
    let paths = match kind {
        SeriesKind::Growth => GROWTH_PATHS,
        SeriesKind::Daily => DAILY_PATHS,
    };
    paths
        .iter()
        .filter_map(|path| primary.pointer(path))
        .find_map(parse_points)
}

fn endpoint_points(value: &Value) -> Option<Vec<(Date, f64)>> {
    if value.is_array() {
        return parse_points(value);
    }
    ENDPOINT_WRAPPERS
        .iter()
        .filter_map(|key| value.get(key))
        .find_map(parse_points)
}

fn parse_points(value: &Value) -> Option<Vec<(Date, f64)>> {
    let points: Vec<(Date, f64)> = value.as_array()?.iter().filter_map(parse_point).collect();
    if points.is_empty() {
        return None;
    }
    Some(points)
}

fn parse_point(value: &Value) -> Option<(Date, f64)> {
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            Some((parse_date(&pair[0])?, parse_number(&pair[1])?))
        }
        Value::Object(fields) => {
            let date = DATE_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .find_map(parse_date)?;
            let number = VALUE_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .find_map(parse_number)?;
            Some((date, number))
        }
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<Date> {
    match value {
        Value::String(text) => {
            let head = text.trim().get(..10)?;
            Date::parse(head, format_description!("[year]-[month]-[day]")).ok()
        }
        Value::Number(number) => {
            let raw = number.as_i64()?;
            let seconds = if raw.abs() > MILLIS_THRESHOLD {
                raw / 1000
            } else {
                raw
            };
            OffsetDateTime::from_unix_timestamp(seconds)
                .ok()
                .map(OffsetDateTime::date)
        }
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn trailing_days(window: u32, today: Date) -> Vec<Date> {
    (0..window)
        .rev()
        .map(|back| today.saturating_sub(Duration::days(i64::from(back))))
        .collect()
}

// Lays points onto a gapless window. Growth carries the last known total
// forward; daily counts are zero on days without a point.
fn normalize(
    kind: SeriesKind,
    points: &[(Date, f64)],
    window: u32,
    today: Date,
    provenance: Provenance,
) -> ChartSeries {
    let by_day: BTreeMap<Date, f64> = points.iter().copied().collect();
    let first = by_day.values().next().copied().unwrap_or_default();

    let points = trailing_days(window, today)
        .into_iter()
        .map(|date| {
            let value = match kind {
                SeriesKind::Growth => by_day
                    .range(..=date)
                    .next_back()
                    .map_or(first, |(_, value)| *value),
                SeriesKind::Daily => by_day.get(&date).copied().unwrap_or(0.0),
            };
            ChartPoint { date, value }
        })
        .collect();

    ChartSeries {
        kind,
        points,
        provenance,
    }
}

fn synthesize(kind: SeriesKind, window: u32, current_total: u64, today: Date) -> ChartSeries {
    let value = match kind {
        SeriesKind::Growth => current_total as f64,
        SeriesKind::Daily => 0.0,
    };
    ChartSeries {
        kind,
        points: trailing_days(window, today)
            .into_iter()
            .map(|date| ChartPoint { date, value })
            .collect(),
        provenance: Provenance::Synthesized,
    }
}
