//! Per-run ingestion reporting.

use serde::Serialize;

/// Result of one extraction stage for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    /// The stage produced units.
    Extracted { count: usize },
    /// The stage ran and found nothing.
    Empty,
    /// The stage raised; other stages still ran.
    Failed { error: String },
}

impl StageOutcome {
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            StageOutcome::Empty
        } else {
            StageOutcome::Extracted { count }
        }
    }

    pub fn count(&self) -> usize {
        match self {
            StageOutcome::Extracted { count } => *count,
            _ => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOutcome::Extracted { count } => write!(f, "{}", count),
            StageOutcome::Empty => write!(f, "none"),
            StageOutcome::Failed { error } => write!(f, "failed ({})", error),
        }
    }
}

/// Stage outcomes for one source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub document: String,
    pub text: StageOutcome,
    pub images: StageOutcome,
    pub tables: StageOutcome,
}

impl DocumentReport {
    pub fn unit_count(&self) -> usize {
        self.text.count() + self.images.count() + self.tables.count()
    }

    pub fn has_failures(&self) -> bool {
        self.text.is_failed() || self.images.is_failed() || self.tables.is_failed()
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub documents: Vec<DocumentReport>,
    /// Files in the source folder no loader understood.
    pub skipped: Vec<String>,
    pub units_appended: usize,
}

impl IngestReport {
    pub fn failed_stages(&self) -> usize {
        self.documents
            .iter()
            .flat_map(|d| [&d.text, &d.images, &d.tables])
            .filter(|s| s.is_failed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counts() {
        assert_eq!(StageOutcome::from_count(0), StageOutcome::Empty);
        assert_eq!(StageOutcome::from_count(3).count(), 3);

        let report = DocumentReport {
            document: "a.pdf".to_string(),
            text: StageOutcome::from_count(2),
            images: StageOutcome::Failed {
                error: "bad stream".to_string(),
            },
            tables: StageOutcome::Empty,
        };
        assert_eq!(report.unit_count(), 2);
        assert!(report.has_failures());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(StageOutcome::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "error": "boom"}));
    }
}
