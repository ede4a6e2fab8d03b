//! Output types: per-photo results, the model's analysis, and run stats.

use crate::error::{ItemError, PhotoVibeError};
use serde::{Deserialize, Serialize};

/// Categorical strength of a passion match. Exactly two tiers exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// The photo shows the passion directly.
    High,
    /// The photo only hints at the passion.
    Suggested,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => f.write_str("High"),
            Confidence::Suggested => f.write_str("Suggested"),
        }
    }
}

/// One candidate passion the model matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPassion {
    pub passion_name: String,
    pub confidence: Confidence,
}

/// The structured answer for one photo.
///
/// Field names on the wire follow the response schema (`matchedPassions`,
/// `passionName`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeAnalysis {
    pub description: String,
    pub matched_passions: Vec<MatchedPassion>,
}

impl VibeAnalysis {
    /// Matches at the given confidence tier, in model order.
    pub fn with_confidence(&self, tier: Confidence) -> impl Iterator<Item = &MatchedPassion> {
        self.matched_passions
            .iter()
            .filter(move |m| m.confidence == tier)
    }
}

/// Lifecycle of one photo within a run.
///
/// `Pending → Processing → {Done | Error}`. Terminal states are final for
/// the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Pending,
    Processing,
    Done,
    Error,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Done | ItemState::Error)
    }
}

/// Result for a single photo, index-aligned with the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    /// 0-based position in the selection.
    pub index: usize,
    pub file_name: String,
    pub mime_type: String,
    /// Context line offered to the model (empty when not derived).
    pub metadata: String,
    pub state: ItemState,
    /// Present when `state == Done`.
    pub analysis: Option<VibeAnalysis>,
    /// Present when `state == Error`.
    pub error: Option<ItemError>,
    /// HTTP attempts made for this photo (0 if never sent).
    pub attempts: u32,
    /// Wall-clock time of the inference call, in milliseconds.
    pub duration_ms: u64,
}

impl ResultItem {
    pub fn pending(
        index: usize,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            metadata: String::new(),
            state: ItemState::Pending,
            analysis: None,
            error: None,
            attempts: 0,
            duration_ms: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move into the `Done` state. Ignored if the item is already terminal.
    pub(crate) fn complete(&mut self, analysis: VibeAnalysis, attempts: u32, duration_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.state = ItemState::Done;
        self.analysis = Some(analysis);
        self.attempts = attempts;
        self.duration_ms = duration_ms;
    }

    /// Move into the `Error` state. Ignored if the item is already terminal.
    pub(crate) fn fail(&mut self, error: ItemError, attempts: u32, duration_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.state = ItemState::Error;
        self.error = Some(error);
        self.attempts = attempts;
        self.duration_ms = duration_ms;
    }
}

/// Count of results in a terminal state.
pub fn terminal_count(results: &[ResultItem]) -> usize {
    results.iter().filter(|r| r.is_terminal()).count()
}

/// Aggregate numbers for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Subset of `failed` that never reached the endpoint.
    pub preprocess_failed: usize,
    pub total_attempts: u64,
    pub preprocess_duration_ms: u64,
    pub inference_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything the eager API returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Name of the prompt profile used.
    pub profile: String,
    pub model: String,
    pub results: Vec<ResultItem>,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// Treat any failed photo as an error.
    pub fn into_result(self) -> Result<Self, PhotoVibeError> {
        if self.stats.failed > 0 {
            return Err(PhotoVibeError::PartialFailure {
                success: self.stats.succeeded,
                failed: self.stats.failed,
                total: self.stats.total_files,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> VibeAnalysis {
        VibeAnalysis {
            description: "Party".into(),
            matched_passions: vec![
                MatchedPassion {
                    passion_name: "DJ Sets".into(),
                    confidence: Confidence::High,
                },
                MatchedPassion {
                    passion_name: "Dancing".into(),
                    confidence: Confidence::Suggested,
                },
            ],
        }
    }

    #[test]
    fn terminal_transition_happens_once() {
        let mut item = ResultItem::pending(0, "a.jpg", "image/jpeg");
        item.state = ItemState::Processing;
        item.complete(analysis(), 1, 10);
        item.fail(
            ItemError::MalformedResponse {
                file: "a.jpg".into(),
                detail: "late".into(),
            },
            2,
            20,
        );
        assert_eq!(item.state, ItemState::Done);
        assert!(item.error.is_none());
        assert_eq!(item.attempts, 1);
    }

    #[test]
    fn confidence_filter() {
        let a = analysis();
        let high: Vec<_> = a
            .with_confidence(Confidence::High)
            .map(|m| m.passion_name.as_str())
            .collect();
        assert_eq!(high, vec!["DJ Sets"]);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(analysis()).unwrap();
        assert_eq!(json["matchedPassions"][0]["passionName"], "DJ Sets");
        assert_eq!(json["matchedPassions"][0]["confidence"], "High");
    }

    #[test]
    fn into_result_flags_failures() {
        let output = AnalysisOutput {
            profile: "itinerary".into(),
            model: "m".into(),
            results: vec![],
            stats: AnalysisStats {
                total_files: 3,
                succeeded: 2,
                failed: 1,
                ..Default::default()
            },
        };
        let err = output.into_result().unwrap_err();
        assert!(err.to_string().contains("1/3"));
    }
}
