use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chaos::{ChaosEngine, ChaosEvent, FILLER_WORD};
use crate::utils;
use crate::validator::{self, WordFault};

pub type PlayerId = u64;
pub type RoomKey = i64;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_WORD_LEN: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
  pub id: PlayerId,
  pub display_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
  Idle,
  Recruiting,
  Active,
  Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
  pub silent: bool,
  pub scoring: bool,
  pub chaos: bool,
}

impl Default for RoomConfig {
  fn default() -> Self {
    RoomConfig { silent: false, scoring: true, chaos: true }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomFlag {
  Silent,
  Scoring,
  Chaos,
}

impl RoomFlag {
  pub fn parse(raw: &str) -> Option<RoomFlag> {
    match raw {
      "silent" => Some(RoomFlag::Silent),
      "scoring" => Some(RoomFlag::Scoring),
      "chaos" => Some(RoomFlag::Chaos),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      RoomFlag::Silent => "silent",
      RoomFlag::Scoring => "scoring",
      RoomFlag::Chaos => "chaos",
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
  #[error("there is no story recruiting right now, send /story to open one")]
  WrongPhase,
  #[error("you already joined this story")]
  AlreadyJoined,
  #[error("at least {} players are needed to start", MIN_PLAYERS)]
  NotEnoughPlayers,
  #[error("only a group admin can do that")]
  Unprivileged,
  #[error(transparent)]
  InvalidWord(#[from] WordFault),
  #[error("no story is in progress here")]
  NoActiveGame,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
  Announcement,
  Error,
  Final,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
  Room,
  Player(PlayerId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
  pub kind: NoticeKind,
  pub text: String,
  pub recipient: Recipient,
  pub turn_prompt: bool,
}

impl Notice {
  pub fn announcement(text: impl Into<String>) -> Notice {
    Notice { kind: NoticeKind::Announcement, text: text.into(), recipient: Recipient::Room, turn_prompt: false }
  }

  pub fn prompt(text: impl Into<String>) -> Notice {
    Notice { kind: NoticeKind::Announcement, text: text.into(), recipient: Recipient::Room, turn_prompt: true }
  }

  pub fn error(actor: PlayerId, text: impl Into<String>) -> Notice {
    Notice { kind: NoticeKind::Error, text: text.into(), recipient: Recipient::Player(actor), turn_prompt: false }
  }

  pub fn final_story(text: impl Into<String>) -> Notice {
    Notice { kind: NoticeKind::Final, text: text.into(), recipient: Recipient::Room, turn_prompt: false }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Submitted {
  pub scorer: PlayerId,
  pub chaos: Option<ChaosEvent>,
  pub notices: Vec<Notice>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
  pub phase: Phase,
  pub roster: Vec<Player>,
  pub story: Vec<String>,
  pub used_words: HashSet<String>,
  pub turn_index: usize,
  pub timer_epoch: u64,
  pub last_prompt: Option<i32>,
  pub config: RoomConfig,
}

impl Room {
  pub fn new() -> Self {
    Room {
      phase: Phase::Idle,
      roster: Vec::new(),
      story: Vec::new(),
      used_words: HashSet::new(),
      turn_index: 0,
      timer_epoch: 0,
      last_prompt: None,
      config: RoomConfig::default(),
    }
  }

  // Fresh recruiting room; the per-room config flags survive, game state does not.
  pub fn reset(&mut self) -> Notice {
    self.phase = Phase::Recruiting;
    self.roster.clear();
    self.story.clear();
    self.used_words.clear();
    self.turn_index = 0;
    self.timer_epoch += 1;
    self.last_prompt = None;
    Notice::announcement(
      "📖 A new one-word story is being written!\n\nSend /join to take part, then an admin sends /startgame.",
    )
  }

  pub fn join(&mut self, id: PlayerId, display_name: &str) -> Result<Notice, GameError> {
    if self.phase != Phase::Recruiting {
      return Err(GameError::WrongPhase);
    }
    if self.roster.iter().any(|p| p.id == id) {
      return Err(GameError::AlreadyJoined);
    }
    self.roster.push(Player { id, display_name: display_name.to_string() });
    Ok(Notice::announcement(format!(
      "✅ {} joined the story! ({} writing)",
      display_name,
      self.roster.len()
    )))
  }

  pub fn begin(&mut self, privileged: bool) -> Result<Notice, GameError> {
    if !privileged {
      return Err(GameError::Unprivileged);
    }
    if self.phase != Phase::Recruiting {
      return Err(GameError::WrongPhase);
    }
    if self.roster.len() < MIN_PLAYERS {
      return Err(GameError::NotEnoughPlayers);
    }
    self.phase = Phase::Active;
    self.turn_index = 0;
    self.story.clear();
    self.used_words.clear();
    self.timer_epoch += 1;
    let first = &self.roster[0];
    Ok(Notice::prompt(format!(
      "🎬 The story begins!\n\n👉 Your turn, {}! Send one word.",
      first.display_name
    )))
  }

  pub fn submit_word(
    &mut self,
    actor: PlayerId,
    raw: &str,
    chaos: &ChaosEngine,
    rng: &mut impl Rng,
  ) -> Result<Option<Submitted>, GameError> {
    // Out-of-turn and stale messages never disturb state, and are not errors.
    if self.phase != Phase::Active || self.roster[self.turn_index].id != actor {
      return Ok(None);
    }
    let word = validator::validate(raw, &self.used_words, MAX_WORD_LEN)?;
    self.used_words.insert(word.to_lowercase());
    self.story.push(word);

    let mut notices = Vec::new();
    let mut event = None;
    if self.config.chaos {
      event = chaos.roll(rng);
      if let Some(event) = event {
        if let Some(notice) = self.apply_chaos(event) {
          notices.push(notice);
        }
      }
    }

    self.advance_from(actor);
    self.timer_epoch += 1;
    let next = &self.roster[self.turn_index];
    notices.push(Notice::prompt(format!(
      "📜 Story so far:\n{}\n\n👉 Your turn, {}! Send one word.",
      self.story.join(" "),
      next.display_name
    )));
    Ok(Some(Submitted { scorer: actor, chaos: event, notices }))
  }

  pub fn end(&mut self, privileged: bool) -> Result<Notice, GameError> {
    if !privileged {
      return Err(GameError::Unprivileged);
    }
    if self.phase != Phase::Active && self.story.is_empty() {
      return Err(GameError::NoActiveGame);
    }
    self.phase = Phase::Finished;
    self.timer_epoch += 1;
    let text = if self.story.is_empty() {
      utils::EMPTY_STORY_TEXT.to_string()
    } else {
      format!("🎬 The final story:\n\n📜 {}", utils::format_story(&self.story))
    };
    Ok(Notice::final_story(text))
  }

  // Invoked by the registry when a turn timer fires. A timer armed for an
  // older epoch lost a race with a word or a reset and must change nothing.
  pub fn timeout(&mut self, epoch: u64) -> Option<Notice> {
    if self.phase != Phase::Active || epoch != self.timer_epoch {
      return None;
    }
    let skipped = self.roster[self.turn_index].display_name.clone();
    self.turn_index = (self.turn_index + 1) % self.roster.len();
    self.timer_epoch += 1;
    let next = &self.roster[self.turn_index];
    Some(Notice::prompt(format!(
      "⏰ {} ran out of time!\n\n👉 Your turn, {}! Send one word.",
      skipped, next.display_name
    )))
  }

  pub fn configure(&mut self, flag: RoomFlag, on: bool) -> Notice {
    match flag {
      RoomFlag::Silent => self.config.silent = on,
      RoomFlag::Scoring => self.config.scoring = on,
      RoomFlag::Chaos => self.config.chaos = on,
    }
    Notice::announcement(format!(
      "⚙️ Setting '{}' is now {}.",
      flag.name(),
      if on { "on" } else { "off" }
    ))
  }

  fn apply_chaos(&mut self, event: ChaosEvent) -> Option<Notice> {
    match event {
      ChaosEvent::Reverse => {
        self.roster.reverse();
        Some(Notice::announcement("🌀 Chaos! The turn order reverses."))
      }
      ChaosEvent::InsertWord => {
        // Filler is scenery, not a move: it never touches used_words.
        self.story.push(FILLER_WORD.to_string());
        Some(Notice::announcement(format!(
          "🌀 Chaos! A stray \"{}\" sneaks into the story.",
          FILLER_WORD
        )))
      }
      ChaosEvent::NoOp => None,
    }
  }

  // Chaos may have reordered the roster, so rotation restarts from the
  // actor's current seat rather than the pre-event turn index.
  fn advance_from(&mut self, actor: PlayerId) {
    let seat = self
      .roster
      .iter()
      .position(|p| p.id == actor)
      .unwrap_or(self.turn_index);
    self.turn_index = (seat + 1) % self.roster.len();
  }
}

impl Default for Room {
  fn default() -> Self {
    Room::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
  }

  fn no_chaos() -> ChaosEngine {
    ChaosEngine::new(0.0)
  }

  fn recruiting_room(players: usize) -> Room {
    let mut room = Room::new();
    room.reset();
    for i in 0..players {
      let id = i as PlayerId + 1;
      room.join(id, &format!("P{}", id)).unwrap();
    }
    room
  }

  fn active_room(players: usize) -> Room {
    let mut room = recruiting_room(players);
    room.begin(true).unwrap();
    room
  }

  #[test]
  fn fresh_room_is_idle_and_rejects_joins() {
    let mut room = Room::new();
    assert_eq!(room.phase, Phase::Idle);
    assert_eq!(room.join(1, "P1"), Err(GameError::WrongPhase));
  }

  #[test]
  fn reset_opens_recruiting_and_is_idempotent() {
    let mut room = active_room(2);
    room.reset();
    assert_eq!(room.phase, Phase::Recruiting);
    assert!(room.roster.is_empty());
    assert!(room.story.is_empty());
    room.reset();
    assert_eq!(room.phase, Phase::Recruiting);
  }

  #[test]
  fn reset_keeps_the_room_config() {
    let mut room = recruiting_room(0);
    room.configure(RoomFlag::Silent, true);
    room.reset();
    assert!(room.config.silent);
  }

  #[test]
  fn duplicate_join_is_rejected() {
    let mut room = recruiting_room(1);
    assert_eq!(room.join(1, "P1 again"), Err(GameError::AlreadyJoined));
    assert_eq!(room.roster.len(), 1);
  }

  #[test]
  fn begin_requires_two_players() {
    for players in [0, 1] {
      let mut room = recruiting_room(players);
      assert_eq!(room.begin(true), Err(GameError::NotEnoughPlayers));
      assert_eq!(room.phase, Phase::Recruiting);
    }
  }

  #[test]
  fn begin_requires_privilege() {
    let mut room = recruiting_room(2);
    assert_eq!(room.begin(false), Err(GameError::Unprivileged));
  }

  #[test]
  fn join_after_begin_is_rejected() {
    let mut room = active_room(2);
    assert_eq!(room.join(9, "Late"), Err(GameError::WrongPhase));
    assert_eq!(room.roster.len(), 2);
  }

  #[test]
  fn second_begin_is_rejected() {
    let mut room = active_room(2);
    room.submit_word(1, "once", &no_chaos(), &mut rng()).unwrap();
    assert_eq!(room.begin(true), Err(GameError::WrongPhase));
    assert_eq!(room.story.len(), 1);
  }

  #[test]
  fn scenario_once_upon() {
    let mut room = active_room(2);
    let chaos = no_chaos();
    let mut rng = rng();

    let accepted = room.submit_word(1, "Once", &chaos, &mut rng).unwrap();
    assert!(accepted.is_some());
    assert_eq!(room.turn_index, 1);

    // case-insensitive duplicate leaves the turn with P2
    let dup = room.submit_word(2, "once", &chaos, &mut rng);
    assert_eq!(dup, Err(GameError::InvalidWord(WordFault::AlreadyUsed)));
    assert_eq!(room.turn_index, 1);
    assert_eq!(room.story, vec!["Once".to_string()]);

    let accepted = room.submit_word(2, "upon", &chaos, &mut rng).unwrap();
    assert!(accepted.is_some());
    assert_eq!(room.turn_index, 0);
    assert_eq!(room.story, vec!["Once".to_string(), "upon".to_string()]);
  }

  #[test]
  fn story_keeps_casing_and_used_words_are_lowercase() {
    let mut room = active_room(2);
    room.submit_word(1, "Once", &no_chaos(), &mut rng()).unwrap();
    assert_eq!(room.story, vec!["Once".to_string()]);
    assert!(room.used_words.contains("once"));
    assert!(!room.used_words.contains("Once"));
  }

  #[test]
  fn turn_index_follows_n_mod_roster_len() {
    let mut room = active_room(3);
    let chaos = no_chaos();
    let mut rng = rng();
    let words = ["one", "two", "three", "four", "five", "six", "seven"];
    for (n, word) in words.iter().enumerate() {
      let actor = room.roster[room.turn_index].id;
      room.submit_word(actor, word, &chaos, &mut rng).unwrap();
      assert_eq!(room.turn_index, (n + 1) % 3);
    }
    assert_eq!(room.story.len(), words.len());
  }

  #[test]
  fn out_of_turn_submission_is_a_silent_noop() {
    let mut room = active_room(2);
    let before = room.clone();
    let outcome = room.submit_word(2, "sneaky", &no_chaos(), &mut rng()).unwrap();
    assert!(outcome.is_none());
    assert_eq!(room, before);
  }

  #[test]
  fn submission_outside_active_phase_is_a_silent_noop() {
    let mut room = recruiting_room(2);
    let outcome = room.submit_word(1, "early", &no_chaos(), &mut rng()).unwrap();
    assert!(outcome.is_none());
    assert!(room.story.is_empty());
  }

  #[test]
  fn invalid_word_leaves_state_unchanged() {
    let mut room = active_room(2);
    let before = room.clone();
    let err = room.submit_word(1, "two words", &no_chaos(), &mut rng());
    assert_eq!(err, Err(GameError::InvalidWord(WordFault::NotOneWord)));
    assert_eq!(room, before);
  }

  #[test]
  fn timeout_advances_exactly_one_turn_and_keeps_the_story() {
    let mut room = active_room(3);
    let epoch = room.timer_epoch;
    let notice = room.timeout(epoch);
    assert!(notice.is_some());
    assert_eq!(room.turn_index, 1);
    assert!(room.story.is_empty());
  }

  #[test]
  fn stale_timeout_is_ignored() {
    let mut room = active_room(2);
    let old_epoch = room.timer_epoch;
    room.submit_word(1, "once", &no_chaos(), &mut rng()).unwrap();
    let before = room.clone();
    assert!(room.timeout(old_epoch).is_none());
    assert_eq!(room, before);
  }

  #[test]
  fn timeout_after_game_over_is_ignored() {
    let mut room = active_room(2);
    let epoch = room.timer_epoch;
    room.end(true).unwrap();
    assert!(room.timeout(epoch).is_none());
  }

  #[test]
  fn end_requires_privilege() {
    let mut room = active_room(2);
    assert_eq!(room.end(false), Err(GameError::Unprivileged));
    assert_eq!(room.phase, Phase::Active);
  }

  #[test]
  fn end_without_a_game_is_rejected() {
    let mut room = recruiting_room(2);
    assert_eq!(room.end(true), Err(GameError::NoActiveGame));
    let mut idle = Room::new();
    assert_eq!(idle.end(true), Err(GameError::NoActiveGame));
  }

  #[test]
  fn end_with_empty_story_returns_the_sentinel() {
    let mut room = active_room(2);
    let notice = room.end(true).unwrap();
    assert_eq!(notice.kind, NoticeKind::Final);
    assert_eq!(notice.text, utils::EMPTY_STORY_TEXT);
  }

  #[test]
  fn end_joins_and_capitalizes_the_story() {
    let mut room = active_room(2);
    let chaos = no_chaos();
    let mut rng = rng();
    room.submit_word(1, "once", &chaos, &mut rng).unwrap();
    room.submit_word(2, "upon", &chaos, &mut rng).unwrap();
    let notice = room.end(true).unwrap();
    assert!(notice.text.contains("Once upon"));
    assert_eq!(room.phase, Phase::Finished);
  }

  #[test]
  fn reverse_event_flips_the_roster_only() {
    let mut room = active_room(3);
    let notice = room.apply_chaos(ChaosEvent::Reverse);
    assert!(notice.is_some());
    let ids: Vec<PlayerId> = room.roster.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert!(room.story.is_empty());
  }

  #[test]
  fn insert_word_event_bypasses_used_words() {
    let mut room = active_room(2);
    let notice = room.apply_chaos(ChaosEvent::InsertWord);
    assert!(notice.is_some());
    assert_eq!(room.story, vec![FILLER_WORD.to_string()]);
    assert!(room.used_words.is_empty());
    // players may still play the filler word afterwards
    assert!(room.submit_word(1, FILLER_WORD, &no_chaos(), &mut rng()).unwrap().is_some());
  }

  #[test]
  fn noop_event_changes_nothing() {
    let mut room = active_room(2);
    let before = room.clone();
    assert!(room.apply_chaos(ChaosEvent::NoOp).is_none());
    assert_eq!(room, before);
  }

  #[test]
  fn rotation_follows_the_actor_after_a_reverse() {
    // P1 plays, the roster flips to [P3, P2, P1]; the next seat after P1 is P3.
    let mut room = active_room(3);
    room.apply_chaos(ChaosEvent::Reverse);
    room.advance_from(1);
    assert_eq!(room.turn_index, 0);
    assert_eq!(room.roster[room.turn_index].id, 3);
  }

  #[test]
  fn chaotic_submissions_keep_every_invariant() {
    let chaos = ChaosEngine::new(1.0);
    let mut rng = StdRng::seed_from_u64(7);
    let mut room = active_room(3);
    let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel"];
    for word in words {
      let actor = room.roster[room.turn_index].id;
      let outcome = room.submit_word(actor, word, &chaos, &mut rng).unwrap();
      assert!(outcome.is_some());
      assert!(room.turn_index < room.roster.len());
      assert_eq!(room.roster.len(), 3);
      assert!(room.used_words.contains(word));
    }
    // used_words tracks exactly the played words; chaos fillers only pad the story
    assert_eq!(room.used_words.len(), words.len());
    assert!(room.story.len() >= words.len());
  }
}
