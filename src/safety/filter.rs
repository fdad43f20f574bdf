//! Forbidden-term response filter
//!
//! Pure, deterministic scan of generated text against a configured term list.
//! Matching is whole-word and case-insensitive; the first matching term wins
//! (later terms are not scanned) and every occurrence of it is replaced with
//! the redaction marker. Filtering already-redacted text is a no-op.

use serde::Serialize;

/// Replacement inserted for each redacted occurrence.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Outcome of filtering one reply.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub filtered_text: String,
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Scans replies for forbidden terms.
pub struct ResponseFilter {
    forbidden_terms: Vec<String>,
}

impl ResponseFilter {
    pub fn new(terms: Vec<String>) -> Self {
        let forbidden_terms = terms
            .into_iter()
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect();
        Self { forbidden_terms }
    }

    pub fn filter(&self, text: &str) -> FilterResult {
        for term in &self.forbidden_terms {
            let (redacted, hits) = redact_whole_word(text, term);
            if hits > 0 {
                return FilterResult {
                    filtered_text: redacted,
                    flagged: true,
                    reason: Some(format!("contains forbidden term \"{}\"", term)),
                };
            }
        }
        FilterResult {
            filtered_text: text.to_string(),
            flagged: false,
            reason: None,
        }
    }
}

/// Replace every whole-word, case-insensitive occurrence of `term` in `text`
/// with the redaction marker, returning the rewritten text and the hit count.
fn redact_whole_word(text: &str, term: &str) -> (String, usize) {
    if term.is_empty() || term.len() > text.len() {
        return (text.to_string(), 0);
    }

    let mut out = String::with_capacity(text.len());
    let mut hits = 0usize;
    let mut i = 0usize;

    while i < text.len() {
        let end = i + term.len();
        let is_match = end <= text.len()
            && text.is_char_boundary(i)
            && text.is_char_boundary(end)
            && text[i..end].eq_ignore_ascii_case(term)
            && boundary_before(text, i)
            && boundary_after(text, end);

        if is_match {
            out.push_str(REDACTION_MARKER);
            hits += 1;
            i = end;
            continue;
        }

        match text[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    (out, hits)
}

fn boundary_before(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .map_or(true, |ch| !ch.is_alphanumeric())
}

fn boundary_after(text: &str, index: usize) -> bool {
    text[index..]
        .chars()
        .next()
        .map_or(true, |ch| !ch.is_alphanumeric())
}
