//! Lexical scoring: accent-folding tokenizer and BM25 over a candidate pool.
//!
//! Everything in this module is pure and synchronous. BM25 here re-scores
//! the candidate set already retrieved by the semantic stage, not the whole
//! corpus.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// BM25 term-frequency saturation parameter.
pub const BM25_K1: f32 = 1.5;
/// BM25 length-normalization parameter.
pub const BM25_B: f32 = 0.75;

/// French stop words dropped during tokenization.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "le", "la", "les", "un", "une", "des", "de", "du", "et", "est", "en", "que", "qui",
        "dans", "pour", "sur", "avec", "ce", "cette", "au", "aux", "a", "son", "sa", "ses",
        "se", "ou", "ne", "pas", "plus", "par", "il", "elle", "ils", "elles", "nous", "vous",
        "je", "tu", "on", "etre", "avoir", "faire", "tout", "tous", "si", "mais",
    ]
    .into_iter()
    .collect()
});

/// Fold accented letters, ligatures, and variant punctuation glyphs to
/// their ASCII base form so lexical matching survives typographic
/// variation (œ→oe, é→e, curly quotes→straight, narrow spaces→space).
pub fn normalize_for_search(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'à' | 'â' | 'ä' => out.push('a'),
            'À' | 'Â' | 'Ä' => out.push('A'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'î' | 'ï' => out.push('i'),
            'Î' | 'Ï' => out.push('I'),
            'ô' | 'ö' => out.push('o'),
            'Ô' | 'Ö' => out.push('O'),
            'ù' | 'û' | 'ü' => out.push('u'),
            'Ù' | 'Û' | 'Ü' => out.push('U'),
            'ÿ' => out.push('y'),
            'Ÿ' => out.push('Y'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '—' | '–' => out.push('-'),
            '\u{202F}' | '\u{A0}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Tokenize text for lexical scoring.
///
/// Folds glyph variants, lower-cases, strips punctuation, and drops stop
/// words and single-character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_for_search(text)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Score each candidate document against the query with BM25.
///
/// `documents` is the semantically pre-filtered candidate pool. A candidate
/// containing no query term scores 0.0; an empty pool yields an empty list.
pub fn bm25_scores(query: &str, documents: &[&str]) -> Vec<f32> {
    if documents.is_empty() {
        return Vec::new();
    }

    let query_tokens = tokenize(query);
    let doc_tokens: Vec<Vec<String>> = documents.iter().map(|doc| tokenize(doc)).collect();
    let n_docs = documents.len() as f32;
    let avg_doc_len =
        doc_tokens.iter().map(|tokens| tokens.len()).sum::<usize>() as f32 / n_docs;

    let mut df: HashMap<&str, usize> = HashMap::new();
    for tokens in &doc_tokens {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for token in unique {
            *df.entry(token).or_insert(0) += 1;
        }
    }

    doc_tokens
        .iter()
        .map(|tokens| {
            let doc_len = tokens.len() as f32;
            let mut tf: HashMap<&str, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token.as_str()).or_insert(0) += 1;
            }

            query_tokens
                .iter()
                .filter_map(|term| {
                    let term_freq = *tf.get(term.as_str())? as f32;
                    let term_df = df.get(term.as_str()).copied().unwrap_or(0) as f32;
                    let idf = ((n_docs - term_df + 0.5) / (term_df + 0.5) + 1.0).ln();
                    let tf_norm = (term_freq * (BM25_K1 + 1.0))
                        / (term_freq
                            + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_doc_len));
                    Some(idf * tf_norm)
                })
                .sum()
        })
        .collect()
}
