// src/trigger/errors.rs
use thiserror::Error;

/// Failure to take in an entry. The built-in leaves always accept; the
/// variants exist for leaves that validate their input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObserveError {
    #[error("entry rejected: {0}")]
    Rejected(String),

    #[error("{}", join(.0))]
    Composite(Vec<ObserveError>),
}

fn join(errs: &[ObserveError]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Collects child failures so none is lost behind the first.
#[derive(Debug, Default)]
pub(crate) struct Errs {
    errs: Vec<ObserveError>,
}

impl Errs {
    pub(crate) fn record(&mut self, r: Result<(), ObserveError>) {
        if let Err(e) = r {
            self.errs.push(e);
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ObserveError> {
        if self.errs.is_empty() {
            Ok(())
        } else {
            Err(ObserveError::Composite(self.errs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_joins_all_messages() {
        let mut errs = Errs::default();
        errs.record(Ok(()));
        errs.record(Err(ObserveError::Rejected("stale".into())));
        errs.record(Err(ObserveError::Rejected("garbled".into())));
        let e = errs.into_result().unwrap_err();
        assert_eq!(e.to_string(), "entry rejected: stale,entry rejected: garbled");
    }

    #[test]
    fn nothing_recorded_is_ok() {
        let mut errs = Errs::default();
        errs.record(Ok(()));
        assert!(errs.into_result().is_ok());
    }
}
