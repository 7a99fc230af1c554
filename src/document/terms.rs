//! Regex extraction of dates and monetary figures from extracted text.

use super::{FinancialTerms, KeyDate};
use regex::Regex;
use std::sync::LazyLock;

const DATE_CONTEXT_CHARS: usize = 50;

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d{1,2}/\d{1,2}/\d{4}\b",
        r"\b\d{1,2}-\d{1,2}-\d{4}\b",
        r"\b\d{4}-\d{1,2}-\d{1,2}\b",
        r"(?i)\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("date pattern compiles"))
    .collect()
});

static MONEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"₹[\d,]+(?:\.\d{2})?",
        r"Rs\.?\s*[\d,]+(?:\.\d{2})?",
        r"\$[\d,]+(?:\.\d{2})?",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("money pattern compiles"))
    .collect()
});

static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?%").expect("percentage pattern compiles"));

static INTEREST_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:interest rate|APR|annual percentage rate).*?(\d+(?:\.\d+)?%)")
        .expect("interest pattern compiles")
});

/// Find dates written as `M/D/YYYY`, `M-D-YYYY`, `YYYY-M-D`, or `Month D, YYYY`.
///
/// Results are ordered by position in the text.
pub fn extract_key_dates(text: &str) -> Vec<KeyDate> {
    let mut dates: Vec<KeyDate> = DATE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .map(|found| KeyDate {
            date: found.as_str().to_string(),
            position: text[..found.start()].chars().count(),
            context: context_window(text, found.start(), found.end(), DATE_CONTEXT_CHARS)
                .to_string(),
        })
        .collect();
    dates.sort_by_key(|date| date.position);
    dates
}

/// Collect currency amounts, percentages, and interest rates.
pub fn extract_financial_terms(text: &str) -> FinancialTerms {
    let amounts = MONEY_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .map(|found| found.as_str().to_string())
        .collect();
    let percentages = PERCENTAGE
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect();
    let interest_rates = INTEREST_RATE
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|rate| rate.as_str().to_string())
        .collect();

    FinancialTerms {
        amounts,
        percentages,
        interest_rates,
    }
}

/// Slice `radius` characters either side of `[start, end)`, staying on char boundaries.
fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(offset, _)| offset)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(offset, _)| end + offset)
        .unwrap_or(text.len());
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_dates_in_every_supported_format() {
        let text = "Starts 01/04/2024, renews 2025-03-31, notice by 15-02-2025 \
                    and ends on December 31, 2026.";
        let dates: Vec<String> = extract_key_dates(text)
            .into_iter()
            .map(|date| date.date)
            .collect();
        assert_eq!(
            dates,
            vec!["01/04/2024", "2025-03-31", "15-02-2025", "December 31, 2026"]
        );
    }

    #[test]
    fn date_positions_count_characters() {
        let dates = extract_key_dates("Deposit ₹50,000 due 01/02/2024.");
        assert_eq!(dates[0].position, 20);
    }

    #[test]
    fn month_names_match_case_insensitively() {
        let dates = extract_key_dates("payable on march 5 2024");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].date, "march 5 2024");
    }

    #[test]
    fn date_context_is_bounded() {
        let prefix = "x".repeat(80);
        let text = format!("{prefix} due 01/02/2024 thereafter");
        let dates = extract_key_dates(&text);
        assert_eq!(dates.len(), 1);
        let context = &dates[0].context;
        assert!(context.contains("01/02/2024"));
        assert!(context.chars().count() <= 50 + 10 + 50);
        assert!(context.ends_with("thereafter"));
    }

    #[test]
    fn extracts_amounts_percentages_and_rates() {
        let text = "Rent of ₹25,000 plus Rs. 5,000.00 maintenance and $120.50 fees. \
                    The interest rate is 12.5% per annum; late fee 2%.";
        let terms = extract_financial_terms(text);
        assert_eq!(terms.amounts, vec!["₹25,000", "Rs. 5,000.00", "$120.50"]);
        assert_eq!(terms.percentages, vec!["12.5%", "2%"]);
        assert_eq!(terms.interest_rates, vec!["12.5%"]);
    }

    #[test]
    fn no_figures_yields_empty_terms() {
        assert!(extract_financial_terms("No money here.").is_empty());
    }

    #[test]
    fn context_window_handles_multibyte_neighbours() {
        let text = "₹₹₹ 01/01/2024 ₹₹₹";
        let dates = extract_key_dates(text);
        assert_eq!(dates[0].context, text);
    }
}
