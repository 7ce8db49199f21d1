//! Confidence Scorer (§4.7): field-weighted aggregation with completeness
//! penalties, yielding an action-band recommendation.
//!
//! Confidence scores, not money — float arithmetic throughout.
#![allow(clippy::float_arithmetic, clippy::float_cmp)]

mod weights;
#[cfg(test)]
mod service_props;

use crate::llm::{ExtractedRecord, ExtractionOutcome};
use weights::field_weight;

/// Fields whose absence triggers the critical-field penalty.
const CRITICAL_FIELDS: [&str; 3] = ["vendor", "amount", "date"];
/// Penalty subtracted per missing critical field (§4.7).
const CRITICAL_FIELD_PENALTY: f32 = 0.15;

/// Thresholds partitioning `[0, 1]` into action bands (§4.7, GLOSSARY).
const AUTO_APPROVE_THRESHOLD: f32 = 0.85;
const REVIEW_THRESHOLD: f32 = 0.60;

/// The three-way recommendation a confidence score maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActionBand {
    AutoApprove,
    ReviewRecommended,
    ManualReviewRequired,
}

/// Full scorer output: the numeric score plus the derived action band.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreResult {
    pub confidence: f32,
    pub action_band: ActionBand,
}

/// Structured recommendation mirroring the original scorer's return value
/// (§9): a bare band label loses the human-readable message and the two
/// routing flags callers actually branch on.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    pub action: ActionBand,
    pub message: String,
    pub confidence_level: &'static str,
    pub auto_approve: bool,
    pub requires_review: bool,
    pub overall_confidence: f32,
}

impl ScoreResult {
    /// Expands the band into the full recommendation object.
    #[must_use]
    pub fn recommendation(&self) -> Recommendation {
        let (confidence_level, message) = match self.action_band {
            ActionBand::AutoApprove => ("high", "Confidence is high enough to auto-approve."),
            ActionBand::ReviewRecommended => {
                ("medium", "Confidence is moderate; review recommended before posting.")
            }
            ActionBand::ManualReviewRequired => ("low", "Confidence is low; manual review required."),
        };

        Recommendation {
            action: self.action_band,
            message: message.to_string(),
            confidence_level,
            auto_approve: self.action_band == ActionBand::AutoApprove,
            requires_review: self.action_band != ActionBand::AutoApprove,
            overall_confidence: self.confidence,
        }
    }
}

/// Pure-function confidence aggregator (§9: "Confidence scoring as math,
/// not logic").
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    /// Scores a single extracted record (§4.7 single-record score).
    #[must_use]
    pub fn score_record(record: &ExtractedRecord) -> ScoreResult {
        let confidence = Self::single_record_score(record);
        ScoreResult {
            confidence,
            action_band: Self::recommend(confidence),
        }
    }

    /// Scores an extraction outcome, dispatching to the single- or
    /// multi-record formula and applying the completeness penalty when an
    /// expected count is known.
    #[must_use]
    pub fn score_outcome(outcome: &ExtractionOutcome, expected_transactions: Option<usize>) -> ScoreResult {
        let confidence = match outcome {
            ExtractionOutcome::Single(record) => Self::single_record_score(record),
            ExtractionOutcome::Multi(result) => {
                if result.transactions.is_empty() {
                    0.0
                } else {
                    let average: f32 = result
                        .transactions
                        .iter()
                        .map(Self::presence_estimated_score)
                        .sum::<f32>()
                        / result.transactions.len() as f32;

                    let expected = expected_transactions.or(result.total_raw_transactions);
                    let penalty = expected.map_or(0.0, |expected| {
                        if expected == 0 {
                            0.0
                        } else {
                            let valid = result.transactions.len() as f32;
                            (1.0 - valid / expected as f32).max(0.0) * 0.3
                        }
                    });

                    (average - penalty).clamp(0.0, 1.0)
                }
            }
        };

        ScoreResult {
            confidence,
            action_band: Self::recommend(confidence),
        }
    }

    fn single_record_score(record: &ExtractedRecord) -> f32 {
        let fields: [(&str, bool); 7] = [
            ("vendor", record.vendor.as_deref().is_some_and(|s| !s.is_empty())),
            ("amount", record.amount.is_some()),
            ("date", record.date.is_some()),
            ("description", record.description.as_deref().is_some_and(|s| !s.is_empty())),
            ("category", record.category.as_deref().is_some_and(|s| !s.is_empty())),
            ("payment_method", record.payment_method.as_deref().is_some_and(|s| !s.is_empty())),
            ("recipient_id", record.recipient_id.as_deref().is_some_and(|s| !s.is_empty())),
        ];

        // Every field contributes its full weight to a fixed denominator,
        // present or not, so dropping a field can only remove its
        // contribution from the numerator and never raise the average
        // (§8 P6: confidence is monotone in field completeness).
        let total_weight: f32 = fields.iter().map(|(field, _)| field_weight(field)).sum();
        let weighted_sum: f32 = fields
            .iter()
            .filter(|(_, present)| *present)
            .map(|(field, _)| {
                let conf = record.field_confidence.get(*field).copied().unwrap_or(1.0);
                field_weight(field) * conf
            })
            .sum();

        let base_score = if total_weight > 0.0 { weighted_sum / total_weight } else { 0.0 };

        let missing_critical = CRITICAL_FIELDS
            .iter()
            .filter(|field| !fields.iter().any(|(f, present)| f == *field && *present))
            .count();

        (base_score - CRITICAL_FIELD_PENALTY * missing_critical as f32).clamp(0.0, 1.0)
    }

    /// §4.7 multi-record fallback estimate when no per-field confidences
    /// are present: presence alone contributes fixed increments.
    fn presence_estimated_score(record: &ExtractedRecord) -> f32 {
        let mut score = 0.0f32;
        if record.vendor.as_deref().is_some_and(|s| !s.is_empty()) {
            score += 0.3;
        }
        if record.amount.is_some() {
            score += 0.4;
        }
        if record.date.is_some() {
            score += 0.3;
        }
        score.min(1.0)
    }

    fn recommend(confidence: f32) -> ActionBand {
        if confidence >= AUTO_APPROVE_THRESHOLD {
            ActionBand::AutoApprove
        } else if confidence >= REVIEW_THRESHOLD {
            ActionBand::ReviewRecommended
        } else {
            ActionBand::ManualReviewRequired
        }
    }
}
