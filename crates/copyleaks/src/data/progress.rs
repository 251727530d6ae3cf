use std::fmt;

/// Byte counters for one request's lifecycle.
///
/// `completed_units` only ever grows within a request, and never exceeds
/// `total_units` once the total is known. The total stays unknown until the
/// response head declares a content length (downloads) or the body size is
/// fixed up front (uploads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    completed_units: u64,
    total_units: Option<u64>,
}

impl Progress {
    /// Units completed so far.
    pub fn completed_units(&self) -> u64 {
        self.completed_units
    }

    /// Expected total, if the transport has declared one.
    pub fn total_units(&self) -> Option<u64> {
        self.total_units
    }

    /// Completion as a fraction in `0.0..=1.0`, or `None` while the total
    /// is unknown.
    pub fn fraction(&self) -> Option<f64> {
        self.total_units.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.completed_units as f64 / total as f64
            }
        })
    }

    /// Record the declared total. A known total caps `completed_units`.
    pub(crate) fn set_total(&mut self, total: Option<u64>) {
        self.total_units = total;
        if let Some(total) = total {
            self.completed_units = self.completed_units.min(total);
        }
    }

    /// Advance the completed counter. Regressions are ignored so the
    /// counter stays monotonic, and a known total is never exceeded.
    pub(crate) fn advance_to(&mut self, completed: u64) {
        let capped = match self.total_units {
            Some(total) => completed.min(total),
            None => completed,
        };
        self.completed_units = self.completed_units.max(capped);
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total_units {
            Some(total) => write!(f, "{}/{}", self.completed_units, total),
            None => write!(f, "{}/?", self.completed_units),
        }
    }
}
