//! Vocabulary tables for the three classifier scoring passes (§4.3).

/// `(document_type, filename_keyword)` pairs, first match wins.
pub fn file_type_patterns() -> &'static [(&'static str, &'static str)] {
    &[
        ("bank_statement", "statement"),
        ("bank_statement", "stmt"),
        ("invoice", "invoice"),
        ("utility_bill", "bill"),
        ("receipt", "receipt"),
        ("expense_report", "expense"),
    ]
}

/// Modifiers that strengthen a filename match's confidence.
pub fn file_modifiers() -> &'static [&'static str] {
    &["bank", "credit", "card"]
}

/// Content regex patterns per document type, used for the content-regex
/// scoring pass.
pub fn content_patterns() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        (
            "receipt",
            &[r"(?i)subtotal", r"(?i)total\s*:?\s*\$?\d", r"(?i)thank you"],
        ),
        (
            "invoice",
            &[r"(?i)invoice\s*#?\s*\d+", r"(?i)due\s*date", r"(?i)bill\s*to"],
        ),
        (
            "utility_bill",
            &[r"(?i)kwh|usage|meter", r"(?i)account\s*number", r"(?i)service\s*address"],
        ),
        (
            "paystub",
            &[r"(?i)gross\s*pay", r"(?i)net\s*pay", r"(?i)deductions?"],
        ),
        (
            "bank_statement",
            &[
                r"(?i)account\s*summary",
                r"(?i)beginning\s*balance",
                r"(?i)ending\s*balance",
            ],
        ),
        (
            "expense_report",
            &[r"(?i)expense\s*report", r"(?i)reimbursement", r"(?i)employee\s*id"],
        ),
        (
            "credit_card_statement",
            &[
                r"(?i)credit\s*limit",
                r"(?i)minimum\s*payment",
                r"(?i)statement\s*balance",
            ],
        ),
    ]
}

/// Keyword bundles contributing additively to the multi-transaction
/// signal; each matching bundle adds a fixed 0.2.
pub fn multi_transaction_keywords() -> &'static [&'static [&'static str]] {
    &[
        &["transaction history", "transaction log"],
        &["account activity", "recent activity"],
        &["debits and credits", "deposits and withdrawals"],
    ]
}
