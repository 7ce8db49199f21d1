//! Property test for the Confidence Scorer (§8 P6): monotonicity in
//! per-field confidence, and the strict penalty for dropping a critical
//! field.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::llm::ExtractedRecord;

use super::ConfidenceScorer;

fn record_with_confidences(vendor_conf: f32, amount_conf: f32, date_conf: f32) -> ExtractedRecord {
    ExtractedRecord {
        vendor: Some("Acme".to_string()),
        amount: Some(Decimal::new(1000, 2)),
        date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1),
        description: None,
        category: None,
        payment_method: None,
        recipient_id: None,
        is_income: None,
        line_items: Vec::new(),
        field_confidence: [
            ("vendor".to_string(), vendor_conf),
            ("amount".to_string(), amount_conf),
            ("date".to_string(), date_conf),
        ]
        .into_iter()
        .collect(),
        extraction_error: None,
    }
}

proptest! {
    /// P6 (monotonicity half): raising one field's confidence without
    /// lowering another never decreases the overall score.
    #[test]
    fn prop_raising_a_confidence_never_decreases_score(
        vendor_conf in 0.0f32..1.0,
        amount_conf in 0.0f32..1.0,
        date_conf in 0.0f32..1.0,
        delta in 0.0f32..0.3,
    ) {
        let before = record_with_confidences(vendor_conf, amount_conf, date_conf);
        let raised_vendor_conf = (vendor_conf + delta).min(1.0);
        let after = record_with_confidences(raised_vendor_conf, amount_conf, date_conf);

        let score_before = ConfidenceScorer::score_record(&before).confidence;
        let score_after = ConfidenceScorer::score_record(&after).confidence;

        prop_assert!(score_after >= score_before - 1e-5);
    }

    /// P6 (penalty half): dropping a critical field's presence (setting
    /// it to null) strictly decreases the score by at least 0.15 − ε.
    #[test]
    fn prop_dropping_critical_field_decreases_score_by_penalty(
        vendor_conf in 0.0f32..1.0,
        amount_conf in 0.0f32..1.0,
        date_conf in 0.0f32..1.0,
    ) {
        let with_vendor = record_with_confidences(vendor_conf, amount_conf, date_conf);
        let mut without_vendor = with_vendor.clone();
        without_vendor.vendor = None;
        without_vendor.field_confidence.remove("vendor");

        let score_with = ConfidenceScorer::score_record(&with_vendor).confidence;
        let score_without = ConfidenceScorer::score_record(&without_vendor).confidence;

        // Only assert the strict drop when the score isn't already
        // pinned at the floor by clamping — the invariant is about the
        // raw penalty, not the clamp boundary.
        if score_with > 0.15 {
            prop_assert!(score_with - score_without >= 0.15 - 0.02);
        }
    }
}
