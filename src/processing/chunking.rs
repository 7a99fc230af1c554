//! Semantic chunking of extracted document text for the vector index.
//!
//! Chunks are cut by `semchunk-rs` on natural boundaries (paragraphs, sentences, words) with a
//! character budget, then stitched with a sliding character overlap so clauses straddling a
//! boundary stay retrievable from either side.

use semchunk_rs::Chunker;

use super::types::ChunkingError;

/// Character budget per chunk.
pub(crate) const CHUNK_SIZE: usize = 1000;
/// Characters carried over from the previous chunk.
pub(crate) const CHUNK_OVERLAP: usize = 200;

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Chunk text into semantic segments of at most `chunk_size` characters.
///
/// The chunker runs with `chunk_size - overlap` so the carried-over tail always fits; each chunk
/// after the first then starts with up to `overlap` characters of its predecessor. Returns an
/// empty vector when the input text is all whitespace.
pub(crate) fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let overlap = overlap.min(chunk_size - 1);
    let budget = chunk_size - overlap;
    let chunker = Chunker::new(budget, Box::new(char_count));
    let base_chunks = chunker
        .chunk(text)
        .into_iter()
        .flat_map(|chunk| split_to_budget(&chunk, budget))
        .collect();
    Ok(apply_overlap(base_chunks, chunk_size, overlap))
}

/// Hard-split a chunk the chunker left over budget, preferring the last whitespace.
fn split_to_budget(chunk: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = chunk.trim();
    while char_count(rest) > budget {
        let limit = rest
            .char_indices()
            .nth(budget)
            .map_or(rest.len(), |(offset, _)| offset);
        let cut = match rest[..limit].rfind(char::is_whitespace) {
            Some(space) if space > 0 => space,
            _ => limit,
        };
        pieces.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Prefix every chunk after the first with the tail of its predecessor.
///
/// The tail shrinks to whatever room `chunk_size` leaves; the chunk itself is never cut.
fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunks.len() < 2 || overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<&str> = None;
    for current in &chunks {
        let chunk = match previous {
            None => current.clone(),
            Some(previous) => {
                let needs_space = !previous.ends_with(char::is_whitespace)
                    && !current.starts_with(char::is_whitespace);
                let room = chunk_size
                    .saturating_sub(char_count(current))
                    .saturating_sub(usize::from(needs_space));
                let tail = tail_chars(previous, overlap.min(room)).trim_start();
                let mut combined = String::with_capacity(tail.len() + current.len() + 1);
                if !tail.is_empty() {
                    combined.push_str(tail);
                    if needs_space {
                        combined.push(' ');
                    }
                }
                combined.push_str(current);
                combined
            }
        };
        overlapped.push(chunk);
        previous = Some(current);
    }
    overlapped
}

/// Last `limit` characters of `text`.
fn tail_chars(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    let total = char_count(text);
    if total <= limit {
        return text;
    }
    match text.char_indices().nth(total - limit) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("The tenant pays rent monthly.", CHUNK_SIZE, CHUNK_OVERLAP)
            .expect("chunks");
        assert_eq!(chunks, vec!["The tenant pays rent monthly."]);
    }

    #[test]
    fn whitespace_only_text_has_no_chunks() {
        assert!(chunk_text("  \n\t ", 10, 2).expect("chunks").is_empty());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(matches!(
            chunk_text("hello", 0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
    }

    #[test]
    fn chunks_respect_character_budget_and_overlap() {
        let clause = "The Tenant shall pay a late fee of five percent on overdue rent. ";
        let text = clause.repeat(60);
        let chunks = chunk_text(&text, 300, 60).expect("chunks");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 300, "chunk over budget: {chunk}");
        }
        for pair in chunks.windows(2) {
            let carried: String = pair[1].chars().take(20).collect();
            assert!(
                pair[0].contains(carried.as_str()),
                "no overlap carried into: {}",
                pair[1]
            );
        }
    }

    #[test]
    fn overlap_never_drops_chunk_text() {
        let text = "Deposit of ₹50,000 is refundable within thirty days of vacating. ".repeat(80);
        let chunks = chunk_text(&text, 250, 50).expect("chunks");
        let visible = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        let budgeted = chunk_text(&text, 200, 0).expect("chunks");

        assert_eq!(budgeted.len(), chunks.len());
        for (base, overlapped) in budgeted.iter().zip(&chunks) {
            assert!(overlapped.ends_with(base.as_str()), "lost text in: {overlapped}");
            assert!(overlapped.chars().count() <= 250);
        }
        let kept: String = budgeted.iter().map(|chunk| visible(chunk.as_str())).collect();
        assert_eq!(kept, visible(text.as_str()));
    }

    #[test]
    fn oversized_segments_are_split_on_whitespace() {
        let pieces = split_to_budget("alpha beta gamma delta", 11);
        assert_eq!(pieces, vec!["alpha beta", "gamma delta"]);
        assert_eq!(split_to_budget("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn tail_chars_respects_char_boundaries() {
        assert_eq!(tail_chars("Rent ₹10,000", 7), "₹10,000");
        assert_eq!(tail_chars("abc", 10), "abc");
    }

    #[test]
    fn overlap_joins_with_a_space() {
        let chunks = apply_overlap(vec!["alpha beta".into(), "gamma".into()], 20, 4);
        assert_eq!(chunks, vec!["alpha beta", "beta gamma"]);

        let tight = apply_overlap(vec!["alpha beta".into(), "gamma".into()], 8, 4);
        assert_eq!(tight, vec!["alpha beta", "ta gamma"]);
    }
}
