//! Prescription text tokenizer.

/// Split recognized text into cleaned, purely alphabetic, lowercase tokens.
///
/// Digits and punctuation are stripped before splitting, so "Calpol-500,"
/// becomes "calpol" while "co2" becomes "co".
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(clean_word).collect()
}

/// Lowercase whitespace-separated words of one line, with leading and
/// trailing punctuation trimmed. Inner punctuation and digits are kept.
pub fn words(line: &str) -> Vec<String> {
    line.split_whitespace()
        .map(|word| word.trim_matches(is_punctuation).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

fn is_punctuation(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_')
}

/// Normalized word sequence used to compare multi-word names with text.
pub fn phrase_key(text: &str) -> String {
    words(text).join(" ")
}

/// Strip digits and punctuation from one word; keep it only if what remains
/// is non-empty and alphabetic.
pub fn clean_word(word: &str) -> Option<String> {
    let cleaned: String = word
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .filter(|c| !is_punctuation(*c))
        .collect::<String>()
        .to_lowercase();

    (!cleaned.is_empty() && cleaned.chars().all(char::is_alphabetic)).then_some(cleaned)
}
