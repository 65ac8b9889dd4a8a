//! Diagnostics Channel
//!
//! Failures the cards deliberately swallow (bad sensor JSON, a missing day
//! summary) still land here and in the log, so they stay observable.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// Where a swallowed failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSource {
    PowerSensor,
    GasSensor,
    DatesSensor,
    Summary,
}

impl fmt::Display for DiagnosticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticSource::PowerSensor => "power",
            DiagnosticSource::GasSensor => "gas",
            DiagnosticSource::DatesSensor => "dates",
            DiagnosticSource::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// A single swallowed failure
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    /// Entity id or URL the failure relates to
    pub subject: String,
    pub message: String,
}

/// Records kept per card; the oldest are dropped first
pub const MAX_DIAGNOSTICS: usize = 64;

/// Per-card record of swallowed failures
///
/// A failure identical to the last one recorded for the same source and
/// subject is only logged at debug level, so a bad payload re-read on every
/// host update does not pile up.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: RefCell<VecDeque<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep a swallowed failure
    pub fn record(&self, source: DiagnosticSource, subject: &str, message: impl Into<String>) {
        let message = message.into();
        let repeated = self
            .records
            .borrow()
            .iter()
            .rev()
            .find(|d| d.source == source && d.subject == subject)
            .map(|d| d.message == message)
            .unwrap_or(false);
        if repeated {
            tracing::debug!(source = %source, subject = %subject, "Card data error unchanged");
            return;
        }

        tracing::warn!(
            source = %source,
            subject = %subject,
            error = %message,
            "Swallowed card data error"
        );

        let mut records = self.records.borrow_mut();
        if records.len() == MAX_DIAGNOSTICS {
            records.pop_front();
        }
        records.push_back(Diagnostic {
            source,
            subject: subject.to_string(),
            message,
        });
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Number of records from one source
    pub fn count(&self, source: DiagnosticSource) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.source == source)
            .count()
    }
}
