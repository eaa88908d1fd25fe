pub const EMPTY_STORY_TEXT: &str = "📭 No story was written. The page stayed blank.";

pub fn format_story(words: &[String]) -> String {
  if words.is_empty() {
    return EMPTY_STORY_TEXT.to_string();
  }
  let joined = words.join(" ");
  let mut chars = joined.chars();
  match chars.next() {
    Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
    None => joined,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
  }

  #[test]
  fn empty_story_yields_sentinel() {
    assert_eq!(format_story(&[]), EMPTY_STORY_TEXT);
  }

  #[test]
  fn joins_with_spaces_and_capitalizes_first_word() {
    assert_eq!(format_story(&words(&["once", "upon", "a", "time"])), "Once upon a time");
  }

  #[test]
  fn already_capitalized_word_is_untouched() {
    assert_eq!(format_story(&words(&["Once"])), "Once");
  }
}
