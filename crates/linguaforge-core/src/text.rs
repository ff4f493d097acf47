//! Language-aware text utilities: tokenization, stop words, and approximate
//! span extraction.
//!
//! Korean is not whitespace-delimited the way Romanian is: an eojeol carries
//! attached particles, so the Korean tokenizer strips a fixed particle list
//! from each chunk instead of treating whitespace tokens as words. This is
//! suffix stripping, not morphological analysis.

use crate::model::Language;

/// Small fixed stop-word sets per language. Function words only; anything a
/// learner could plausibly be tracked on stays out of these lists.
const ROMANIAN_STOP_WORDS: &[&str] = &[
    "și", "de", "la", "cu", "un", "o", "în", "pe", "este", "sunt", "am", "ai", "a", "ce", "nu",
    "mai", "se", "că", "din", "eu", "tu", "el", "ea", "noi", "voi", "ei", "ele", "să", "mă", "te",
];

const ENGLISH_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "to", "of", "in",
    "on", "at", "i", "you", "he", "she", "it", "we", "they", "my", "your", "this", "that", "not",
];

const KOREAN_STOP_WORDS: &[&str] = &[
    "그리고", "하지만", "그런데", "그래서", "저", "나", "너", "우리", "그", "이", "것", "수",
    "있다", "없다", "이다", "아니다",
];

/// Particles stripped from the end of a Korean eojeol, longest first so
/// 으로/에서 win over 로/에.
const KOREAN_PARTICLES: &[&str] = &[
    "에게서", "으로", "에서", "에게", "까지", "부터", "처럼", "은", "는", "이", "가", "을", "를",
    "에", "의", "와", "과", "도", "만", "로",
];

/// Split text into lowercased word tokens for the given language.
pub fn tokenize(text: &str, language: Language) -> Vec<String> {
    match language {
        Language::Korean => tokenize_korean(text),
        Language::Romanian | Language::English => tokenize_alphabetic(text),
    }
}

/// Tokens minus stop words — the "significant words" the vocabulary analysis
/// scores against.
pub fn significant_tokens(text: &str, language: Language) -> Vec<String> {
    tokenize(text, language)
        .into_iter()
        .filter(|t| !is_stop_word(t, language))
        .collect()
}

pub fn is_stop_word(word: &str, language: Language) -> bool {
    let list = match language {
        Language::Romanian => ROMANIAN_STOP_WORDS,
        Language::English => ENGLISH_STOP_WORDS,
        Language::Korean => KOREAN_STOP_WORDS,
    };
    list.contains(&word)
}

/// Minimum token length (in chars) worth tracking as vocabulary. Korean packs
/// full words into single syllable blocks, so one char is enough there.
pub fn min_token_chars(language: Language) -> usize {
    match language {
        Language::Korean => 1,
        Language::Romanian | Language::English => 2,
    }
}

fn tokenize_alphabetic(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphabetic() || c == '-' && !current.is_empty() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current).trim_matches('-').to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current.trim_matches('-').to_string());
    }
    tokens.retain(|t| !t.is_empty());
    tokens
}

fn tokenize_korean(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|chunk| {
            let cleaned: String = chunk.chars().filter(|c| c.is_alphabetic()).collect();
            strip_korean_particles(&cleaned).to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Strip one trailing particle from an eojeol, leaving at least one char.
pub fn strip_korean_particles(word: &str) -> &str {
    for particle in KOREAN_PARTICLES {
        if let Some(stem) = word.strip_suffix(particle) {
            if !stem.is_empty() {
                return stem;
            }
        }
    }
    word
}

/// Best-effort recovery of the text segment around a reported issue position.
///
/// Issues are positional, not span-exact, so this takes a fixed character
/// window around the position (`before` chars back, `after` chars forward).
/// The result is approximate by construction and may clip mid-word at the
/// window edges.
pub fn approximate_span(text: &str, position: usize, before: usize, after: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let pos = position.min(chars.len().saturating_sub(1));
    let start = pos.saturating_sub(before);
    let end = (pos + after).min(chars.len());
    chars[start..end].iter().collect::<String>().trim().to_string()
}

/// Char offset of a byte offset in `text`. Rule matchers report byte offsets;
/// issue positions are char offsets so span recovery stays UTF-8 safe.
pub fn char_position(text: &str, byte_offset: usize) -> usize {
    text.char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .count()
}
