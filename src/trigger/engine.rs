// src/trigger/engine.rs
use serde::Serialize;

use crate::share::types::Entry;
use crate::trigger::errors::{Errs, ObserveError};
use crate::trigger::Trigger;

/// A registered trigger that is active after the latest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Firing {
    pub name: String,
    pub description: String,
    /// True when the trigger was inactive before this entry.
    pub rising: bool,
}

#[derive(Debug, Default)]
pub struct Evaluation {
    pub active: Vec<Firing>,
    pub failure: Option<ObserveError>,
}

impl Evaluation {
    /// Firings that just became active.
    pub fn rising(&self) -> impl Iterator<Item = &Firing> {
        self.active.iter().filter(|f| f.rising)
    }
}

struct Registered {
    name: String,
    trigger: Trigger,
    was_active: bool,
}

/// Named root triggers fed from one entry stream.
#[derive(Default)]
pub struct TriggerEngine {
    rules: Vec<Registered>,
}

impl TriggerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, trigger: Trigger) {
        self.rules.push(Registered {
            name: name.into(),
            trigger,
            was_active: false,
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Feed `e` to every trigger and report the ones now active. A failing
    /// trigger is still evaluated on whatever state it kept.
    pub fn observe(&mut self, e: &Entry) -> Evaluation {
        let mut errs = Errs::default();
        let mut active = Vec::new();

        for r in self.rules.iter_mut() {
            if let Err(err) = r.trigger.observe(e) {
                tracing::warn!(target: "trigger", rule = %r.name, error = %err, "observe failed");
                errs.record(Err(err));
            }
            let now_active = r.trigger.is_active();
            if now_active {
                active.push(Firing {
                    name: r.name.clone(),
                    description: r.trigger.describe(),
                    rising: !r.was_active,
                });
            }
            r.was_active = now_active;
        }

        Evaluation {
            active,
            failure: errs.into_result().err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::types::Trend;
    use chrono::{TimeZone, Utc};

    #[test]
    fn failing_rule_is_reported_and_others_still_fire() {
        let mut engine = TriggerEngine::new();
        engine.register(
            "broken",
            Trigger::Failing(ObserveError::Rejected("stale".into())),
        );
        engine.register("low", Trigger::below(70));

        let e = Entry {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            value: 60,
            trend: Trend::Flat,
            raw: String::new(),
        };
        let eval = engine.observe(&e);
        assert_eq!(
            eval.failure,
            Some(ObserveError::Composite(vec![ObserveError::Rejected("stale".into())]))
        );
        assert_eq!(eval.active.len(), 1);
        assert_eq!(eval.active[0].description, "60 < 70");
        assert!(eval.active[0].rising);
    }
}
