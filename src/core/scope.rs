use crate::core::types::{SignalId, Step};
use serde::Serialize;

/// One recorded observation: the observed signal's value at the end of a
/// step, or `None` when sampling failed and a gap was recorded instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub step: Step,
    pub value: Option<u64>,
}

/// Passive observer of one signal.
///
/// A scope is sampled once per completed step and appends to its history; it
/// never mutates the signal it watches. Histories serialize for export to
/// external waveform tooling.
#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub(crate) label: String,
    pub(crate) signal: SignalId,
    pub(crate) samples: Vec<Sample>,
}

impl Scope {
    pub(crate) fn new(label: &str, signal: SignalId) -> Self {
        Self {
            label: label.to_string(),
            signal,
            samples: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn signal(&self) -> SignalId {
        self.signal
    }

    /// Full time-ordered history, one entry per completed step
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Latest recorded value, skipping gaps
    pub fn last_value(&self) -> Option<u64> {
        self.samples.iter().rev().find_map(|s| s.value)
    }

    pub(crate) fn record(&mut self, step: Step, value: Option<u64>) {
        self.samples.push(Sample { step, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_append_only_and_ordered() {
        let mut scope = Scope::new("out", SignalId(0));
        scope.record(1, Some(4));
        scope.record(2, None);
        scope.record(3, Some(7));
        assert_eq!(
            scope.samples(),
            &[
                Sample { step: 1, value: Some(4) },
                Sample { step: 2, value: None },
                Sample { step: 3, value: Some(7) },
            ]
        );
        assert_eq!(scope.last_value(), Some(7));
    }
}
