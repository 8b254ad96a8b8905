// src/trigger/predicate.rs
use crate::share::types::{Entry, Trend};

/// Condition on the latest entry alone. `explain` returns why it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Below(i32),
    Above(i32),
    Arrow(Vec<Trend>),
}

impl Check {
    pub fn explain(&self, e: &Entry) -> Option<String> {
        match self {
            Check::Below(bg) if e.value < *bg => Some(format!("{} < {}", e.value, bg)),
            Check::Above(bg) if e.value > *bg => Some(format!("{} > {}", e.value, bg)),
            Check::Arrow(dirs) if dirs.contains(&e.trend) => Some(e.trend.arrow().to_string()),
            _ => None,
        }
    }
}

/// Condition on the previous and latest entries.
#[derive(Debug, Clone, PartialEq)]
pub enum PairCheck {
    /// Rate of change in mg/dL per minute. Fires only for a move in the
    /// threshold's own direction; a zero threshold never fires.
    RateOfChange(f64),
}

impl PairCheck {
    pub fn explain(&self, e0: &Entry, e1: &Entry) -> Option<String> {
        match self {
            PairCheck::RateOfChange(d) => {
                let minutes = (e1.time - e0.time).num_milliseconds() as f64 / 60_000.0;
                if minutes <= 0.0 {
                    return None;
                }
                let delta = f64::from(e1.value - e0.value) / minutes;
                if delta < 0.0 && *d < 0.0 && delta < *d {
                    Some(format!("Delta({delta:.1} < {d:.1})"))
                } else if delta > 0.0 && *d > 0.0 && delta > *d {
                    Some(format!("Delta({delta:.1} > {d:.1})"))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn e(min: i64, value: i32, trend: Trend) -> Entry {
        Entry {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(min),
            value,
            trend,
            raw: String::new(),
        }
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(Check::Below(70).explain(&e(0, 69, Trend::Flat)).as_deref(), Some("69 < 70"));
        assert_eq!(Check::Below(70).explain(&e(0, 70, Trend::Flat)), None);
        assert_eq!(Check::Above(180).explain(&e(0, 180, Trend::Flat)), None);
    }

    #[test]
    fn arrow_reports_glyph() {
        let c = Check::Arrow(vec![Trend::Falling, Trend::FallingFast]);
        assert_eq!(c.explain(&e(0, 90, Trend::FallingFast)).as_deref(), Some("⇊"));
        assert_eq!(c.explain(&e(0, 90, Trend::Flat)), None);
    }

    #[test]
    fn rising_rate() {
        let c = PairCheck::RateOfChange(2.0);
        assert_eq!(
            c.explain(&e(0, 100, Trend::Flat), &e(5, 120, Trend::Rising)).as_deref(),
            Some("Delta(4.0 > 2.0)")
        );
        // steep fall never satisfies a rising threshold
        assert_eq!(c.explain(&e(0, 120, Trend::Flat), &e(5, 60, Trend::Flat)), None);
    }

    #[test]
    fn zero_threshold_never_fires() {
        let c = PairCheck::RateOfChange(0.0);
        assert_eq!(c.explain(&e(0, 100, Trend::Flat), &e(5, 200, Trend::Flat)), None);
        assert_eq!(c.explain(&e(0, 200, Trend::Flat), &e(5, 100, Trend::Flat)), None);
    }
}
