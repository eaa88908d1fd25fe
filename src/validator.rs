use std::collections::HashSet;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WordFault {
  #[error("send exactly one word, with no spaces")]
  NotOneWord,
  #[error("letters only, no digits or punctuation")]
  NotAlphabetic,
  #[error("that word is too long")]
  TooLong,
  #[error("that word has already been used in this story")]
  AlreadyUsed,
}

// Rules run in order, first failure wins. The returned word keeps the
// submitter's casing; the lowercase form is only the duplicate key.
pub fn validate(raw: &str, used_words: &HashSet<String>, max_len: usize) -> Result<String, WordFault> {
  let word = raw.trim();
  if word.is_empty() || word.chars().any(char::is_whitespace) {
    return Err(WordFault::NotOneWord);
  }
  if !word.chars().all(char::is_alphabetic) {
    return Err(WordFault::NotAlphabetic);
  }
  if word.chars().count() > max_len {
    return Err(WordFault::TooLong);
  }
  if used_words.contains(&word.to_lowercase()) {
    return Err(WordFault::AlreadyUsed);
  }
  Ok(word.to_string())
}
