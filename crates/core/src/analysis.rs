//! Pronunciation scoring results returned by the speech gateway.

use serde::{Deserialize, Serialize};

/// Per-word correctness feedback within an [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordFeedback {
    pub word: String,
    pub is_correct: bool,
    /// Score in [0, 100] for this word.
    pub score: f64,
    /// An optional short hint on how to improve the pronunciation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// The structured result of scoring one recorded attempt.
///
/// Produced by the speech gateway and consumed read-only by the presentation
/// layer. A gateway failure is represented by [`AnalysisResult::failed`], never
/// by an error: analysis failures are not fatal to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Overall score in [0, 100].
    pub overall_score: f64,
    pub summary: String,
    #[serde(default)]
    pub feedback: Vec<WordFeedback>,
}

impl AnalysisResult {
    /// The zero-score placeholder used whenever scoring fails.
    pub fn failed() -> Self {
        Self {
            overall_score: 0.0,
            summary: "Error during analysis.".to_string(),
            feedback: Vec::new(),
        }
    }

    /// Whether this result clears the learner's target accuracy threshold.
    pub fn passes(&self, target_accuracy: u32) -> bool {
        self.overall_score >= target_accuracy as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_is_zero_score_with_empty_feedback() {
        let result = AnalysisResult::failed();
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.summary, "Error during analysis.");
        assert!(result.feedback.is_empty());
        assert!(!result.passes(50));
    }

    #[test]
    fn test_passes_threshold() {
        let result = AnalysisResult {
            overall_score: 80.0,
            summary: "Good".to_string(),
            feedback: Vec::new(),
        };
        assert!(result.passes(80));
        assert!(result.passes(75));
        assert!(!result.passes(81));
    }

    #[test]
    fn test_deserialize_gateway_response_shape() {
        // Mirrors the exact JSON schema the scoring service is asked to return.
        let json = r#"{
            "overallScore": 85,
            "summary": "Mostly clear pronunciation.",
            "feedback": [
                { "word": "iced", "isCorrect": true, "score": 92 },
                { "word": "americano", "isCorrect": false, "score": 61, "tip": "Stress the third syllable." }
            ]
        }"#;

        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.overall_score, 85.0);
        assert_eq!(result.feedback.len(), 2);
        assert!(result.feedback[0].is_correct);
        assert_eq!(result.feedback[0].tip, None);
        assert_eq!(
            result.feedback[1].tip.as_deref(),
            Some("Stress the third syllable.")
        );
    }

    #[test]
    fn test_deserialize_tolerates_missing_feedback() {
        let json = r#"{ "overallScore": 10, "summary": "Too quiet." }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert!(result.feedback.is_empty());
    }
}
