use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered hiring stages an application can occupy on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    Reviewing,
    Shortlisted,
    Interview,
    Hired,
    Rejected,
}

impl PipelineStage {
    /// Canonical column order.
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Pending,
        PipelineStage::Reviewing,
        PipelineStage::Shortlisted,
        PipelineStage::Interview,
        PipelineStage::Hired,
        PipelineStage::Rejected,
    ];

    pub const fn wire_value(self) -> &'static str {
        match self {
            PipelineStage::Pending => "pending",
            PipelineStage::Reviewing => "reviewing",
            PipelineStage::Shortlisted => "shortlisted",
            PipelineStage::Interview => "interview",
            PipelineStage::Hired => "hired",
            PipelineStage::Rejected => "rejected",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PipelineStage::Pending => "Pending",
            PipelineStage::Reviewing => "Reviewing",
            PipelineStage::Shortlisted => "Shortlisted",
            PipelineStage::Interview => "Interview",
            PipelineStage::Hired => "Hired",
            PipelineStage::Rejected => "Rejected",
        }
    }

    /// Hired and rejected close out an application for placement purposes.
    pub const fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Hired | PipelineStage::Rejected)
    }

    /// Zero-based column index.
    pub const fn position(self) -> usize {
        match self {
            PipelineStage::Pending => 0,
            PipelineStage::Reviewing => 1,
            PipelineStage::Shortlisted => 2,
            PipelineStage::Interview => 3,
            PipelineStage::Hired => 4,
            PipelineStage::Rejected => 5,
        }
    }

    /// Resolve a backend status string, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.wire_value() == normalized)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

/// Raised when a status string does not name a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a pipeline stage")]
pub struct UnknownStage(pub String);

impl FromStr for PipelineStage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownStage(value.to_string()))
    }
}

/// Display labels keyed by stage, in column order.
pub fn stage_labels() -> BTreeMap<PipelineStage, &'static str> {
    PipelineStage::ALL
        .into_iter()
        .map(|stage| (stage, stage.label()))
        .collect()
}
