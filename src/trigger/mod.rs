//! # Triggers
//! Composable, stateful rules over the entry stream.
//!
//! Leaves remember only what they need (the latest entry, or the latest two)
//! and recompute `is_active`/`describe` from that state on every call, so a
//! combinator queried at any point reflects its children exactly.
//!
//! ```
//! use dexwatch::trigger::Trigger;
//!
//! let in_range = Trigger::all(vec![Trigger::above(70), Trigger::below(180)]);
//! assert!(!in_range.is_active());
//! ```

pub mod engine;
pub mod errors;
pub mod predicate;

use crate::share::types::{Entry, Trend};
pub use engine::{Evaluation, Firing, TriggerEngine};
pub use errors::ObserveError;
use errors::Errs;
pub use predicate::{Check, PairCheck};

#[derive(Debug, Clone)]
pub enum Trigger {
    Single {
        check: Check,
        cur: Option<Entry>,
    },
    Pair {
        check: PairCheck,
        last: Option<Entry>,
        cur: Option<Entry>,
    },
    Any(Vec<Trigger>),
    All(Vec<Trigger>),
    /// Leaf that refuses every entry; exercises failure aggregation.
    #[cfg(test)]
    Failing(ObserveError),
}

impl Trigger {
    pub fn single(check: Check) -> Self {
        Trigger::Single { check, cur: None }
    }

    pub fn pair(check: PairCheck) -> Self {
        Trigger::Pair {
            check,
            last: None,
            cur: None,
        }
    }

    pub fn below(bg: i32) -> Self {
        Self::single(Check::Below(bg))
    }

    pub fn above(bg: i32) -> Self {
        Self::single(Check::Above(bg))
    }

    pub fn arrow(dirs: impl IntoIterator<Item = Trend>) -> Self {
        Self::single(Check::Arrow(dirs.into_iter().collect()))
    }

    /// `threshold` in mg/dL per minute; negative watches for falls.
    pub fn rate_of_change(threshold: f64) -> Self {
        Self::pair(PairCheck::RateOfChange(threshold))
    }

    pub fn any(children: Vec<Trigger>) -> Self {
        Trigger::Any(children)
    }

    pub fn all(children: Vec<Trigger>) -> Self {
        Trigger::All(children)
    }

    pub fn observe(&mut self, e: &Entry) -> Result<(), ObserveError> {
        match self {
            Trigger::Single { cur, .. } => {
                *cur = Some(e.clone());
                Ok(())
            }
            // A same-time or older entry still shifts; the rate then reads
            // as undefined and the leaf goes inactive.
            Trigger::Pair { last, cur, .. } => {
                *last = cur.replace(e.clone());
                Ok(())
            }
            Trigger::Any(children) | Trigger::All(children) => {
                let mut errs = Errs::default();
                for t in children.iter_mut() {
                    errs.record(t.observe(e));
                }
                errs.into_result()
            }
            #[cfg(test)]
            Trigger::Failing(err) => Err(err.clone()),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Trigger::Single { .. } | Trigger::Pair { .. } => self.explain().is_some(),
            Trigger::Any(children) => children.iter().any(Trigger::is_active),
            // Empty `All` is vacuously active.
            Trigger::All(children) => children.iter().all(Trigger::is_active),
            #[cfg(test)]
            Trigger::Failing(_) => false,
        }
    }

    /// Why the trigger holds; empty for an inactive leaf. Combinators list
    /// only their active children.
    pub fn describe(&self) -> String {
        match self {
            Trigger::Single { .. } | Trigger::Pair { .. } => self.explain().unwrap_or_default(),
            Trigger::Any(children) => format!("Any({})", describe_active(children)),
            Trigger::All(children) => format!("All({})", describe_active(children)),
            #[cfg(test)]
            Trigger::Failing(_) => String::new(),
        }
    }

    fn explain(&self) -> Option<String> {
        match self {
            Trigger::Single { check, cur } => check.explain(cur.as_ref()?),
            Trigger::Pair { check, last, cur } => check.explain(last.as_ref()?, cur.as_ref()?),
            Trigger::Any(_) | Trigger::All(_) => None,
            #[cfg(test)]
            Trigger::Failing(_) => None,
        }
    }
}

fn describe_active(children: &[Trigger]) -> String {
    children
        .iter()
        .filter(|t| t.is_active())
        .map(Trigger::describe)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn e(min: i64, value: i32) -> Entry {
        Entry {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(min),
            value,
            trend: Trend::Flat,
            raw: String::new(),
        }
    }

    #[test]
    fn leaves_inactive_before_data() {
        assert!(!Trigger::below(70).is_active());
        assert_eq!(Trigger::below(70).describe(), "");
        let mut r = Trigger::rate_of_change(-2.0);
        r.observe(&e(0, 150)).unwrap();
        assert!(!r.is_active());
    }

    #[test]
    fn pair_shifts_on_repeated_timestamp_and_goes_inactive() {
        let mut r = Trigger::rate_of_change(-2.0);
        r.observe(&e(0, 150)).unwrap();
        r.observe(&e(5, 130)).unwrap();
        assert!(r.is_active());

        r.observe(&e(5, 60)).unwrap();
        assert!(!r.is_active());
        assert_eq!(r.describe(), "");

        // The repeated entry is now the baseline for the next rate.
        r.observe(&e(10, 40)).unwrap();
        assert_eq!(r.describe(), "Delta(-4.0 < -2.0)");
    }

    #[test]
    fn nested_combinators_aggregate_every_failure() {
        let refuse = |why: &str| Trigger::Failing(ObserveError::Rejected(why.into()));
        let mut t = Trigger::any(vec![
            refuse("a"),
            Trigger::all(vec![refuse("b"), Trigger::below(70)]),
            Trigger::above(200),
        ]);
        let err = t.observe(&e(0, 250)).unwrap_err();
        assert_eq!(err.to_string(), "entry rejected: a,entry rejected: b");

        // Healthy siblings still saw the entry.
        assert!(t.is_active());
        assert_eq!(t.describe(), "Any(250 > 200)");
    }

    #[test]
    fn empty_all_is_vacuous() {
        assert!(Trigger::all(vec![]).is_active());
        assert!(!Trigger::any(vec![]).is_active());
        assert_eq!(Trigger::any(vec![]).describe(), "Any()");
    }
}
