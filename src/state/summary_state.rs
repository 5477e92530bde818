use serde::{Deserialize, Serialize};

use crate::data::{Segment, SegmentList};

/// A named interval over which a tab is processed, with the segments during
/// which the state's condition held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryState {
    pub name: String,
    pub start: f64,
    pub end: f64,
    pub active: SegmentList,
}

impl SummaryState {
    pub fn new(name: impl Into<String>, start: f64, end: f64, active: SegmentList) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            active,
        }
    }

    /// State that is active over its whole span.
    pub fn always(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(name, start, end, SegmentList::new(vec![Segment::new(start, end)]))
    }

    pub fn livetime(&self) -> f64 {
        self.active.duration()
    }
}
