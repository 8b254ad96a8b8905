// src/share/parse.rs
use chrono::{DateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::share::types::{Entry, Trend};
use crate::share::ShareError;

#[derive(Debug, Deserialize)]
struct ShareRecord {
    #[serde(rename = "WT")]
    wt: String,
    #[serde(rename = "Trend")]
    trend: TrendField,
    #[serde(rename = "Value")]
    value: i32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrendField {
    Code(i64),
    Name(String),
}

impl TrendField {
    fn resolve(&self) -> Trend {
        let known = match self {
            TrendField::Code(c) => Trend::from_code(*c),
            TrendField::Name(n) => Trend::from_share_name(n),
        };
        known.unwrap_or_else(|| {
            tracing::warn!(target: "share", trend = ?self, "unknown trend, treating as not computable");
            counter!("share_unknown_trend_total").increment(1);
            Trend::NotComputable
        })
    }
}

/// Decode the upstream's `Date(<millis>)` form; a trailing `±hhmm` offset is
/// informational only since the millis are already UTC.
pub fn parse_share_time(wt: &str) -> Result<DateTime<Utc>, ShareError> {
    static RE_DATE: OnceCell<Regex> = OnceCell::new();
    let re = RE_DATE.get_or_init(|| {
        Regex::new(r"\((-?\d+)(?:[+-]\d{4})?\)").expect("date pattern compiles")
    });

    let millis = re
        .captures(wt)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ShareError::Format(format!("no match for date in {wt:?}")))?
        .as_str()
        .parse::<i64>()
        .map_err(|e| ShareError::Format(format!("bad millis in {wt:?}: {e}")))?;

    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| ShareError::Format(format!("timestamp out of range in {wt:?}")))
}

/// Turn a read response body (newest first) into strictly ascending entries.
/// Any malformed record fails the whole batch.
pub fn parse_entries(body: &str) -> Result<Vec<Entry>, ShareError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        ShareError::Format(format!("failed to unmarshal {} byte body: {e}", body.len()))
    })?;

    let mut out = Vec::with_capacity(records.len());
    for v in records {
        let raw = v.to_string();
        let rec: ShareRecord = serde_json::from_value(v)
            .map_err(|e| ShareError::Format(format!("bad record {raw}: {e}")))?;
        out.push(Entry {
            time: parse_share_time(&rec.wt)?,
            value: rec.value,
            trend: rec.trend.resolve(),
            raw,
        });
    }

    // Upstream is newest first; repeated timestamps collapse to one entry.
    out.reverse();
    out.sort_by_key(|e| e.time);
    out.dedup_by_key(|e| e.time);
    Ok(out)
}
