use rand::Rng;

pub const FILLER_WORD: &str = "banana";
pub const DEFAULT_CHAOS_PROBABILITY: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChaosEvent {
  Reverse,
  InsertWord,
  NoOp,
}

#[derive(Clone, Copy, Debug)]
pub struct ChaosEngine {
  probability: f64,
}

impl Default for ChaosEngine {
  fn default() -> Self {
    ChaosEngine::new(DEFAULT_CHAOS_PROBABILITY)
  }
}

impl ChaosEngine {
  pub fn new(probability: f64) -> Self {
    ChaosEngine { probability: probability.clamp(0.0, 1.0) }
  }

  pub fn roll(&self, rng: &mut impl Rng) -> Option<ChaosEvent> {
    if !rng.gen_bool(self.probability) {
      return None;
    }
    Some(match rng.gen_range(0..3u8) {
      0 => ChaosEvent::Reverse,
      1 => ChaosEvent::InsertWord,
      _ => ChaosEvent::NoOp,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn zero_probability_never_fires() {
    let chaos = ChaosEngine::new(0.0);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..100 {
      assert_eq!(chaos.roll(&mut rng), None);
    }
  }

  #[test]
  fn full_probability_always_fires() {
    let chaos = ChaosEngine::new(1.0);
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..100 {
      assert!(chaos.roll(&mut rng).is_some());
    }
  }

  #[test]
  fn all_events_are_reachable() {
    let chaos = ChaosEngine::new(1.0);
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen = HashSet::new();
    for _ in 0..300 {
      if let Some(event) = chaos.roll(&mut rng) {
        seen.insert(event);
      }
    }
    assert_eq!(seen.len(), 3);
  }

  #[test]
  fn same_seed_reproduces_the_same_sequence() {
    let chaos = ChaosEngine::new(0.5);
    let mut a = StdRng::seed_from_u64(42);
    let mut b = StdRng::seed_from_u64(42);
    for _ in 0..50 {
      assert_eq!(chaos.roll(&mut a), chaos.roll(&mut b));
    }
  }

  #[test]
  fn probability_is_clamped() {
    let chaos = ChaosEngine::new(7.5);
    let mut rng = StdRng::seed_from_u64(4);
    assert!(chaos.roll(&mut rng).is_some());
  }
}
