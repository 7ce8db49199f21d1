//! Prompt construction (§4.6): per-document-type templates, category
//! listing, and chunk-text truncation.

/// Chunk text is truncated to this many characters before being embedded
/// in the prompt.
const MAX_CHUNK_CHARS: usize = 8000;

const SCHEMA_INSTRUCTIONS: &str = r#"Respond with JSON only, matching this schema exactly:
{
  "vendor": string | null,
  "amount": number | null,
  "date": "YYYY-MM-DD" | null,
  "description": string | null,
  "category": string | null,
  "payment_method": string | null,
  "recipient_id": string | null,
  "is_income": boolean | null,
  "line_items": [{"description": string, "amount": number, "quantity": number | null}],
  "field_confidence": {"<field>": number between 0 and 1}
}
Amounts must be plain numbers (no currency symbols or thousands separators). Dates must be ISO YYYY-MM-DD."#;

const MULTI_SCHEMA_INSTRUCTIONS: &str = r#"This document contains MULTIPLE transactions. Respond with JSON only, matching this schema exactly:
{
  "extraction_type": "multi_transaction",
  "transactions": [ <one object per transaction, each matching the single-transaction schema below> ],
  "total_raw_transactions": number | null,
  "valid_transactions": number | null
}
Each transaction object:
{
  "vendor": string | null,
  "amount": number | null,
  "date": "YYYY-MM-DD" | null,
  "description": string | null,
  "category": string | null,
  "payment_method": string | null,
  "recipient_id": string | null,
  "is_income": boolean | null,
  "field_confidence": {"<field>": number between 0 and 1}
}
Amounts must be plain numbers (no currency symbols or thousands separators). Dates must be ISO YYYY-MM-DD.
If the response would otherwise be a single object, wrap it in a one-element "transactions" array."#;

/// Returns the document-type-specific instruction preamble, falling back
/// to a generic template when no specific one is registered.
fn template_for(document_type: &str) -> &'static str {
    match document_type.trim_end_matches("_multi") {
        "receipt" => {
            "Extract the single purchase transaction from this receipt. Identify the vendor/merchant name, total amount paid, transaction date, and payment method."
        }
        "invoice" => {
            "Extract the billed transaction from this invoice. Identify the vendor/biller, total amount due, invoice/due date, and a description of goods or services."
        }
        "utility_bill" => {
            "Extract the payment transaction from this utility bill. Identify the utility provider as vendor, the amount due, the billing/due date, and the service type as description."
        }
        "paystub" => {
            "Extract the income transaction from this paystub. Identify the employer as vendor, net pay as amount, the pay date, and mark is_income as true."
        }
        "bank_statement" => {
            "Extract every transaction line from this bank statement. For each, identify the description/vendor, the signed amount (negative for debits, positive for credits), and the date."
        }
        "credit_card_statement" => {
            "Extract every transaction line from this credit card statement. For each, identify the merchant as vendor, the amount (positive for purchases, negative for payments/credits), and the transaction date."
        }
        "expense_report" => {
            "Extract every expense line item from this expense report. For each, identify the vendor, amount, date, category, and payment method if present."
        }
        _ => "Extract the financial transaction(s) present in this document. Identify vendor, amount, date, and any other available fields.",
    }
}

/// Builds the full prompt for one chunk: document-type instructions,
/// forced-multi augmentation when applicable, category listing, schema,
/// and the truncated chunk text.
#[must_use]
pub fn build_prompt(
    document_type: &str,
    chunk_text: &str,
    category_listing: &str,
    force_multi: bool,
) -> String {
    let instructions = template_for(document_type);
    let schema = if force_multi {
        MULTI_SCHEMA_INSTRUCTIONS
    } else {
        SCHEMA_INSTRUCTIONS
    };

    let truncated: String = chunk_text.chars().take(MAX_CHUNK_CHARS).collect();

    format!(
        "{instructions}\n\nAvailable categories for this business:\n{category_listing}\n\n{schema}\n\nDocument text:\n{truncated}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_chunk_text_to_max_chars() {
        let long_text = "a".repeat(9000);
        let prompt = build_prompt("receipt", &long_text, "", false);
        assert!(prompt.contains(&"a".repeat(MAX_CHUNK_CHARS)));
        assert!(!prompt.contains(&"a".repeat(MAX_CHUNK_CHARS + 1)));
    }

    #[test]
    fn falls_back_to_generic_template_for_unknown_type() {
        let prompt = build_prompt("mystery_type", "text", "", false);
        assert!(prompt.contains("Extract the financial transaction(s)"));
    }

    #[test]
    fn uses_multi_schema_when_force_multi() {
        let prompt = build_prompt("bank_statement", "text", "", true);
        assert!(prompt.contains("multi_transaction"));
    }

    #[test]
    fn strips_multi_suffix_before_template_lookup() {
        let prompt = build_prompt("receipt_multi", "text", "", true);
        assert!(prompt.contains("single purchase transaction"));
    }
}
