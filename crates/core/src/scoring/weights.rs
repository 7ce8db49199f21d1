//! Field-weight table for the single-record confidence score (§4.7). The
//! weights sum to ~1.0; any field not listed defaults to 0.05.

const DEFAULT_WEIGHT: f32 = 0.05;

/// Returns the scorer weight for `field`.
#[must_use]
pub fn field_weight(field: &str) -> f32 {
    match field {
        "vendor" => 0.20,
        "amount" => 0.30,
        "date" => 0.20,
        "description" => 0.10,
        "category" => 0.10,
        "payment_method" => 0.05,
        "recipient_id" => 0.05,
        _ => DEFAULT_WEIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_field_weights_sum_to_approximately_one() {
        let total: f32 = ["vendor", "amount", "date", "description", "category", "payment_method", "recipient_id"]
            .iter()
            .map(|f| field_weight(f))
            .sum();
        assert!((total - 1.0).abs() < 0.01, "weights summed to {total}");
    }

    #[test]
    fn unknown_field_defaults_to_low_weight() {
        assert!((field_weight("something_unlisted") - DEFAULT_WEIGHT).abs() < f32::EPSILON);
    }
}
