// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use warden_app::{
    ChartSeries, ConsoleState, OnlineSnapshot, Overview, Panel, PayoutAction, PayoutReceipt,
    UserDetail, UserPage, ViewKind,
};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const NO_VALUE: &str = "-";

/// Full text frame for the current state. The loop reprints only when this
/// string changes.
pub fn render_frame(state: &ConsoleState) -> String {
    let panels = state.panels();
    let mut sections = vec![render_tabs(state.active_view())];

    sections.push(match state.active_view() {
        ViewKind::Overview => render_panel(&panels.overview, render_overview_text),
        ViewKind::Users => render_panel(&panels.users, render_users_text),
        ViewKind::Online => render_panel(&panels.online, render_online_text),
    });

    if !matches!(panels.detail, Panel::Empty) {
        sections.push(render_panel(&panels.detail, render_detail_text));
    }
    if !matches!(panels.payout, Panel::Empty) {
        sections.push(render_panel(&panels.payout, render_payout_text));
    }

    sections.join("\n\n")
}

pub fn render_tabs(active: ViewKind) -> String {
    ViewKind::ALL
        .iter()
        .map(|view| {
            if *view == active {
                format!("[{}]", view.as_str())
            } else {
                view.as_str().to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_panel<T>(panel: &Panel<T>, ready: impl Fn(&T) -> String) -> String {
    match panel {
        Panel::Empty => "(nothing loaded)".to_owned(),
        Panel::Loading => "loading...".to_owned(),
        Panel::Ready(value) => ready(value),
        Panel::Failed(error) => format!("error: {error}"),
    }
}

fn render_overview_text(overview: &Overview) -> String {
    let stats = &overview.stats;
    [
        format!("users: {}", stats.total_users),
        format!("online now: {}", optional(stats.online_now)),
        format!("active today: {}", optional(stats.active_today)),
        format!("total balance: {}", optional_amount(stats.total_balance)),
        String::new(),
        render_series_text(&overview.charts.growth),
        render_series_text(&overview.charts.daily),
    ]
    .join("\n")
}

pub fn render_series_text(series: &ChartSeries) -> String {
    let values: Vec<f64> = series.points.iter().map(|point| point.value).collect();
    let range = match (series.points.first(), series.points.last()) {
        (Some(first), Some(last)) => format!("{}..{}", first.date, last.date),
        _ => "no days".to_owned(),
    };
    let latest = values
        .last()
        .map_or_else(|| NO_VALUE.to_owned(), |value| format_amount(*value));
    format!(
        "{} ({}) {range}\n  {} latest {latest}",
        series.kind.as_str(),
        series.provenance.label(),
        sparkline(&values),
    )
}

pub fn sparkline(values: &[f64]) -> String {
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = high - low;
    let top = SPARK_BARS.len() - 1;

    values
        .iter()
        .map(|value| {
            if !span.is_finite() || span <= f64::EPSILON {
                return SPARK_BARS[if high > 0.0 { top / 2 } else { 0 }];
            }
            let scaled = ((value - low) / span * top as f64).round() as usize;
            SPARK_BARS[scaled.min(top)]
        })
        .collect()
}

fn render_users_text(page: &UserPage) -> String {
    let limit = page.limit.max(1);
    let pages = page.count.div_ceil(limit).max(1);
    let current = page.offset / limit + 1;
    let mut lines = vec![format!(
        "page {current}/{pages} ({} users, showing {})",
        page.count,
        page.rows.len()
    )];

    if page.rows.is_empty() {
        lines.push("no users match".to_owned());
        return lines.join("\n");
    }

    lines.push(format!(
        "{:<24} {:<20} {:>10} {:>7}  last seen",
        "uid", "username", "balance", "usage"
    ));
    for row in &page.rows {
        lines.push(format!(
            "{:<24} {:<20} {:>10} {:>7}  {}",
            row.uid.as_str(),
            row.username.as_deref().unwrap_or(NO_VALUE),
            optional_amount(row.balance),
            optional(row.usage),
            row.last_seen.as_deref().unwrap_or(NO_VALUE),
        ));
    }
    lines.join("\n")
}

fn render_online_text(snapshot: &OnlineSnapshot) -> String {
    let mut lines = vec![format!(
        "{} online in the last {} min",
        snapshot.users.len(),
        snapshot.minutes
    )];
    for user in &snapshot.users {
        lines.push(format!(
            "  {} {} {}",
            user.uid,
            user.username.as_deref().unwrap_or(NO_VALUE),
            user.last_seen.as_deref().unwrap_or(NO_VALUE),
        ));
    }
    lines.join("\n")
}

fn render_detail_text(detail: &UserDetail) -> String {
    let mut lines = vec![
        format!("user {}", detail.uid),
        format!("  username: {}", detail.username.as_deref().unwrap_or(NO_VALUE)),
        format!("  email: {}", detail.email.as_deref().unwrap_or(NO_VALUE)),
        format!("  balance: {}", optional_amount(detail.balance)),
        format!("  usage: {}", optional(detail.usage)),
        format!("  created: {}", detail.created_at.as_deref().unwrap_or(NO_VALUE)),
        format!("  last seen: {}", detail.last_seen.as_deref().unwrap_or(NO_VALUE)),
    ];
    for (key, value) in &detail.extra {
        lines.push(format!("  {key}: {}", scalar_text(value)));
    }
    lines.join("\n")
}

fn render_payout_text(receipt: &PayoutReceipt) -> String {
    let heading = match &receipt.action {
        PayoutAction::Preview(uid) => format!("payout preview for {uid}"),
        PayoutAction::Create { uid, amount } => {
            format!("payout created for {uid} ({})", format_amount(*amount))
        }
        PayoutAction::Confirm(uid) => format!("payout confirmed for {uid}"),
    };
    let body = match receipt.body.get("raw").and_then(Value::as_str) {
        Some(raw) if receipt.body.get("ok") == Some(&Value::Bool(true)) => raw.to_owned(),
        _ => serde_json::to_string_pretty(&receipt.body)
            .unwrap_or_else(|_| receipt.body.to_string()),
    };
    format!("{heading}\n{body}")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => NO_VALUE.to_owned(),
        other => other.to_string(),
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NO_VALUE.to_owned(), |value| value.to_string())
}

fn optional_amount(value: Option<f64>) -> String {
    value.map_or_else(|| NO_VALUE.to_owned(), format_amount)
}

pub fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
