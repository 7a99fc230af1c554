//! Keyword-based document type detection and text size figures.

use super::{DocumentMetadata, DocumentType};

const WORDS_PER_MINUTE: usize = 200;

/// A type wins only when more than this many of its keywords occur.
const MIN_KEYWORD_HITS: usize = 2;

/// Keyword sets in tie-break order.
const KEYWORDS: [(DocumentType, &[&str]); 5] = [
    (
        DocumentType::Rental,
        &["lease", "rent", "tenant", "landlord", "property", "premises", "deposit"],
    ),
    (
        DocumentType::Loan,
        &["loan", "borrow", "lender", "principal", "interest", "repayment", "credit"],
    ),
    (
        DocumentType::Employment,
        &["employment", "employee", "employer", "salary", "wages", "position", "job"],
    ),
    (
        DocumentType::Nda,
        &["confidential", "non-disclosure", "proprietary", "trade secret"],
    ),
    (
        DocumentType::Service,
        &["service", "provider", "client", "deliverables", "scope of work"],
    ),
];

/// Guess the agreement type by counting which keywords appear in the text.
///
/// Each keyword counts once regardless of how often it occurs. The best-scoring type wins if it
/// has more than two hits; ties keep the earlier type in the rental, loan, employment, NDA,
/// service order. Otherwise the document is [`DocumentType::Other`].
pub fn detect_document_type(text: &str) -> DocumentType {
    let lower = text.to_lowercase();
    let mut best = (DocumentType::Other, 0usize);

    for (doc_type, keywords) in KEYWORDS {
        let hits = keywords
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .count();
        if hits > best.1 {
            best = (doc_type, hits);
        }
    }

    if best.1 > MIN_KEYWORD_HITS {
        best.0
    } else {
        DocumentType::Other
    }
}

/// Compute word count, character count, and reading time for extracted text.
pub fn extract_metadata(text: &str) -> DocumentMetadata {
    let word_count = text.split_whitespace().count();
    DocumentMetadata {
        word_count,
        character_count: text.chars().count(),
        estimated_reading_time: word_count / WORDS_PER_MINUTE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rental_agreement() {
        let text = "This Lease is made between the Landlord and the Tenant for the premises. \
                    Rent is due monthly and a security deposit applies.";
        assert_eq!(detect_document_type(text), DocumentType::Rental);
    }

    #[test]
    fn detects_nda() {
        let text = "The Recipient shall keep all Confidential and proprietary information, \
                    including any trade secret, under this Non-Disclosure Agreement.";
        assert_eq!(detect_document_type(text), DocumentType::Nda);
    }

    #[test]
    fn few_hits_fall_back_to_other() {
        assert_eq!(
            detect_document_type("The client will receive a service."),
            DocumentType::Other
        );
        assert_eq!(detect_document_type(""), DocumentType::Other);
    }

    #[test]
    fn ties_prefer_earlier_types() {
        // Three rental hits and three loan hits.
        let text = "lease rent tenant loan lender principal";
        assert_eq!(detect_document_type(text), DocumentType::Rental);
    }

    #[test]
    fn metadata_counts_words_and_reading_time() {
        let text = "word ".repeat(450);
        let metadata = extract_metadata(&text);
        assert_eq!(metadata.word_count, 450);
        assert_eq!(metadata.character_count, 450 * 5);
        assert_eq!(metadata.estimated_reading_time, 2);
    }
}
