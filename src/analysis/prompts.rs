use crate::document::{DocumentType, truncate_chars};

/// Characters of document text sent with the risk prompt.
pub(crate) const RISK_TEXT_LIMIT: usize = 4000;
/// Characters of document text sent with every other prompt.
pub(crate) const TEXT_LIMIT: usize = 3000;

pub(crate) fn risk_prompt(text: &str, document_type: DocumentType) -> String {
    format!(
        r#"Review the following {kind} document for clauses that could hurt the person signing it.

Document text:
{text}

Look for:
1. High-risk clauses that are unfavourable to the signer
2. Financial risks such as hidden fees, penalties, or high costs
3. Commitment risks such as long lock-in periods or hard-to-exit terms
4. Rights risks such as waived protections or limited recourse

For each risk give the exact clause (at most 100 words), a category (financial, commitment,
rights, or standard), a severity (low, medium, high, or critical), why it is risky, and what
to change or watch for.

Respond with JSON only, no text before or after it, in exactly this shape:
{{
    "risk_factors": [
        {{
            "clause_text": "exact text from the document",
            "category": "financial",
            "severity": "medium",
            "explanation": "why this is risky",
            "suggestion": "how to improve it or what to watch for"
        }}
    ],
    "overall_assessment": "short verdict on the document's overall risk"
}}"#,
        kind = document_type.as_str(),
        text = truncate_chars(text, RISK_TEXT_LIMIT),
    )
}

pub(crate) fn simplification_prompt(text: &str, document_type: DocumentType) -> String {
    format!(
        r#"Rewrite the following legal text in plain English that anyone can follow.

Document type: {kind}
Legal text: {text}

Use everyday words instead of legal jargon, keep sentences short, explain obligations in
practical terms, address the reader as "you", and keep the meaning intact.

Respond with JSON only, no other text, in exactly this shape:
{{
    "simplified_text": "the plain-English version",
    "key_points": ["main point 1", "main point 2", "main point 3"],
    "jargon_definitions": {{"legal term": "simple definition"}}
}}"#,
        kind = document_type.as_str(),
        text = truncate_chars(text, TEXT_LIMIT),
    )
}

pub(crate) fn summary_prompt(text: &str, document_type: DocumentType) -> String {
    format!(
        r#"Write a concise summary of this {kind} document.

Document: {text}

Cover what kind of agreement it is, who the parties are, the key obligations of each party,
the important terms (dates, amounts, conditions), and the main benefits and risks.
Stay under 200 words and focus on what matters to the person signing."#,
        kind = document_type.as_str(),
        text = truncate_chars(text, TEXT_LIMIT),
    )
}

pub(crate) fn question_prompt(question: &str, context: &str, document_type: DocumentType) -> String {
    format!(
        r#"Answer the question below about this {kind} document. Be specific and point to the
relevant parts of the document.

Document: {context}

Question: {question}

Answer only from the document content. If the document does not contain the answer, say so
plainly."#,
        kind = document_type.as_str(),
        context = truncate_chars(context, TEXT_LIMIT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_truncate_document_text() {
        let text = "a".repeat(RISK_TEXT_LIMIT + 500);
        let risk = risk_prompt(&text, DocumentType::Rental);
        assert!(risk.contains(&"a".repeat(RISK_TEXT_LIMIT)));
        assert!(!risk.contains(&"a".repeat(RISK_TEXT_LIMIT + 1)));

        let summary = summary_prompt(&text, DocumentType::Loan);
        assert!(!summary.contains(&"a".repeat(TEXT_LIMIT + 1)));
        assert!(summary.contains("loan document"));
    }

    #[test]
    fn json_prompts_describe_the_contract() {
        let risk = risk_prompt("text", DocumentType::Nda);
        assert!(risk.contains("\"risk_factors\""));
        assert!(risk.contains("\"overall_assessment\""));

        let simple = simplification_prompt("text", DocumentType::Other);
        assert!(simple.contains("\"simplified_text\""));
        assert!(simple.contains("\"jargon_definitions\""));
    }

    #[test]
    fn question_prompt_includes_question_and_context() {
        let prompt = question_prompt("Can I sublet?", "No subletting.", DocumentType::Rental);
        assert!(prompt.contains("Question: Can I sublet?"));
        assert!(prompt.contains("Document: No subletting."));
    }
}
