use std::collections::HashMap;

use crate::scanner::{Scanner, Token};

/// Punctuation and quote characters stripped from both ends of a candidate
/// word, ASCII and typographic variants alike.
const TRIM_CHARS: &[char] = &[
    '.', ',', '"', '„', '“', '”', '\'', '‘', '’', ';', ':', '(', ')', '[', ']', '{', '}', '–',
    '↑',
];

/// Elements whose content never renders and must not be counted.
const SKIPPED_ELEMENTS: &[&str] = &["script", "noscript"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Word counts sorted ascending by count, ties broken by word.
pub type WordFrequencyTable = Vec<WordCount>;

#[derive(Debug, thiserror::Error)]
#[error("markup scan failed: {0}")]
pub struct ScanError(pub String);

enum Mode {
    Normal,
    SkippingUntil(String),
}

/// Drains the scanner and tallies normalized words from text tokens.
///
/// Text inside script/noscript elements is discarded wholesale: on entering
/// such an element every token is consumed until the matching end tag. An
/// end-of-stream inside a skip region terminates cleanly, so an unclosed
/// script element cannot loop forever. A stream error is surfaced to the
/// caller instead of silently truncating the table.
pub fn extract<S: Scanner>(scanner: &mut S) -> Result<WordFrequencyTable, ScanError> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut mode = Mode::Normal;
    loop {
        let token = scanner.next_token();
        match mode {
            Mode::SkippingUntil(ref name) => match token {
                Token::EndTag(ref end) if end == name => mode = Mode::Normal,
                Token::End => break,
                Token::Error(reason) => return Err(ScanError(reason)),
                _ => {}
            },
            Mode::Normal => match token {
                Token::StartTag(name) if SKIPPED_ELEMENTS.contains(&name.as_str()) => {
                    mode = Mode::SkippingUntil(name);
                }
                Token::Text(text) => tally(&mut counts, &text),
                Token::End => break,
                Token::Error(reason) => return Err(ScanError(reason)),
                Token::StartTag(_) | Token::EndTag(_) => {}
            },
        }
    }
    Ok(into_table(counts))
}

fn tally(counts: &mut HashMap<String, u64>, text: &str) {
    for candidate in text.trim().to_lowercase().split_whitespace() {
        let word = candidate.trim_matches(TRIM_CHARS);
        if !word.is_empty() {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
}

fn into_table(counts: HashMap<String, u64>) -> WordFrequencyTable {
    let mut table: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    table.sort_unstable_by(|a, b| a.count.cmp(&b.count).then_with(|| a.word.cmp(&b.word)));
    table
}
