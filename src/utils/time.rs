// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{Local, TimeZone, Utc};
use regex::Regex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn pluralize(count: u64, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

fn unit(count: u64, word: &str) -> String {
    format!("{} {}", count, pluralize(count, word))
}

/// Coarse human readable duration, e.g. `5 minutes` or `2 weeks`.
///
/// Only the largest unit is shown; with `include_seconds` durations below an
/// hour also show the remaining seconds.
pub fn human_time(ms: i64, include_seconds: bool) -> String {
    let seconds = ms.unsigned_abs() / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;
    let months = weeks / 4;
    let years = months / 12;

    if seconds < 60 {
        unit(seconds, "second")
    } else if minutes < 60 {
        if include_seconds {
            format!("{} {}", unit(minutes, "minute"), unit(seconds % 60, "second"))
        } else {
            unit(minutes, "minute")
        }
    } else if hours < 24 {
        unit(hours, "hour")
    } else if days < 7 {
        unit(days, "day")
    } else if weeks < 4 {
        unit(weeks, "week")
    } else if months < 12 {
        unit(months, "month")
    } else {
        unit(years, "year")
    }
}

/// `abcde...vwxyz` for strings longer than 10 characters
pub fn shorten_string(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 10 {
        return value.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_local_time(ms: u64) -> String {
    match Local.timestamp_millis_opt(ms as i64).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

pub fn iso_time(ms: u64) -> String {
    match Utc.timestamp_millis_opt(ms as i64).single() {
        Some(time) => time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

/// Parse `1s`, `5min`, `2h`, `1d` or plain seconds into milliseconds
pub fn parse_duration_ms(input: &str) -> Option<u64> {
    let pattern = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(ms|s|sec|m|min|h|hr|d)?\s*$").ok()?;
    let captures = pattern.captures(input)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let factor = match captures.get(2).map(|m| m.as_str()) {
        Some("ms") => 1.0,
        None | Some("s") | Some("sec") => 1_000.0,
        Some("m") | Some("min") => 60_000.0,
        Some("h") | Some("hr") => 3_600_000.0,
        Some("d") => 86_400_000.0,
        Some(_) => return None,
    };
    let ms = (value * factor).round();
    if ms <= 0.0 {
        return None;
    }
    Some(ms as u64)
}
