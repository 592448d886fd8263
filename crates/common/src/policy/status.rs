//! Workflow states for papers and review assignments

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A paper's position in the publication workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Draft,
    Submitted,
    UnderReview,
    Published,
    Rejected,
}

impl PaperStatus {
    pub const ALL: [PaperStatus; 5] = [
        PaperStatus::Draft,
        PaperStatus::Submitted,
        PaperStatus::UnderReview,
        PaperStatus::Published,
        PaperStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Draft => "draft",
            PaperStatus::Submitted => "submitted",
            PaperStatus::UnderReview => "under_review",
            PaperStatus::Published => "published",
            PaperStatus::Rejected => "rejected",
        }
    }

    /// No outgoing transition except re-entry as a new draft
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaperStatus::Published | PaperStatus::Rejected)
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PaperStatus::Draft),
            "submitted" => Ok(PaperStatus::Submitted),
            "under_review" => Ok(PaperStatus::UnderReview),
            "published" => Ok(PaperStatus::Published),
            "rejected" => Ok(PaperStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// State of a single review assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "completed" => Ok(AssignmentStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_status_strings() {
        for status in PaperStatus::ALL {
            assert_eq!(status.as_str().parse::<PaperStatus>(), Ok(status));
        }
        assert!("revised".parse::<PaperStatus>().is_err());
        assert!("Published".parse::<PaperStatus>().is_err());
    }

    #[test]
    fn test_paper_status_serde_matches_storage() {
        let json = serde_json::to_string(&PaperStatus::UnderReview).unwrap();
        assert_eq!(json, "\"under_review\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PaperStatus::Published.is_terminal());
        assert!(PaperStatus::Rejected.is_terminal());
        assert!(!PaperStatus::Draft.is_terminal());
        assert!(!PaperStatus::UnderReview.is_terminal());
    }

    #[test]
    fn test_assignment_status_strings() {
        assert_eq!("assigned".parse::<AssignmentStatus>(), Ok(AssignmentStatus::Assigned));
        assert_eq!("completed".parse::<AssignmentStatus>(), Ok(AssignmentStatus::Completed));
        assert!("revised".parse::<AssignmentStatus>().is_err());
    }
}
