use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, Mutex};

use crate::chaos::ChaosEngine;
use crate::persist::{Snapshot, SnapshotStore};
use crate::rooms::{GameError, Notice, Phase, PlayerId, Room, RoomFlag, RoomKey};
use crate::scheduler::TurnScheduler;

pub type SharedRegistry = Arc<Registry>;
pub type NoticeFeed = mpsc::UnboundedSender<(RoomKey, Notice)>;

// Routes every event to its room. The per-room mutex is the serialization
// point shared by chat-driven and timer-driven events; unrelated rooms never
// wait on each other.
pub struct Registry {
  me: Weak<Registry>,
  rooms: Mutex<HashMap<RoomKey, Arc<Mutex<Room>>>>,
  scores: Mutex<HashMap<PlayerId, u32>>,
  scheduler: TurnScheduler,
  store: Option<SnapshotStore>,
  chaos: ChaosEngine,
  rng: Mutex<StdRng>,
  turn_timeout: Duration,
  notices_tx: NoticeFeed,
}

impl Registry {
  pub fn new(store: Option<SnapshotStore>, turn_timeout: Duration, notices_tx: NoticeFeed) -> SharedRegistry {
    Registry::with_parts(store, turn_timeout, ChaosEngine::default(), StdRng::from_entropy(), notices_tx)
  }

  pub fn with_parts(
    store: Option<SnapshotStore>,
    turn_timeout: Duration,
    chaos: ChaosEngine,
    rng: StdRng,
    notices_tx: NoticeFeed,
  ) -> SharedRegistry {
    Arc::new_cyclic(|me| Registry {
      me: me.clone(),
      rooms: Mutex::new(HashMap::new()),
      scores: Mutex::new(HashMap::new()),
      scheduler: TurnScheduler::default(),
      store,
      chaos,
      rng: Mutex::new(rng),
      turn_timeout,
      notices_tx,
    })
  }

  pub async fn new_story(&self, key: RoomKey) -> Notice {
    let room_arc = self.room(key).await;
    let mut room = room_arc.lock().await;
    let notice = room.reset();
    self.scheduler.cancel(key).await;
    drop(room);
    self.persist().await;
    notice
  }

  pub async fn join(&self, key: RoomKey, actor: PlayerId, display_name: &str) -> Result<Notice, GameError> {
    let room_arc = self.room(key).await;
    let notice = room_arc.lock().await.join(actor, display_name)?;
    self.persist().await;
    Ok(notice)
  }

  pub async fn begin(&self, key: RoomKey, privileged: bool) -> Result<Notice, GameError> {
    let room_arc = self.room(key).await;
    let mut room = room_arc.lock().await;
    let notice = room.begin(privileged)?;
    log::info!("room {}: story started with {} players", key, room.roster.len());
    self.arm(key, room.timer_epoch).await;
    drop(room);
    self.persist().await;
    Ok(notice)
  }

  pub async fn submit_word(
    &self,
    key: RoomKey,
    actor: PlayerId,
    raw: &str,
  ) -> Result<Option<Vec<Notice>>, GameError> {
    // a word for a room with no session is chatter, not an event
    let Some(room_arc) = self.existing_room(key).await else {
      return Ok(None);
    };
    let mut room = room_arc.lock().await;
    let outcome = {
      let mut rng = self.rng.lock().await;
      room.submit_word(actor, raw, &self.chaos, &mut *rng)
    }?;
    let Some(submitted) = outcome else {
      return Ok(None);
    };
    if let Some(event) = submitted.chaos {
      log::debug!("room {}: chaos event {:?}", key, event);
    }
    if room.config.scoring {
      *self.scores.lock().await.entry(submitted.scorer).or_insert(0) += 1;
    }
    self.arm(key, room.timer_epoch).await;
    drop(room);
    self.persist().await;
    Ok(Some(submitted.notices))
  }

  pub async fn end(&self, key: RoomKey, privileged: bool) -> Result<Notice, GameError> {
    let room_arc = self.room(key).await;
    let mut room = room_arc.lock().await;
    let notice = room.end(privileged)?;
    log::info!("room {}: story finished with {} words", key, room.story.len());
    self.scheduler.cancel(key).await;
    // finished rooms are discarded, not archived
    self.rooms.lock().await.remove(&key);
    drop(room);
    self.persist().await;
    Ok(notice)
  }

  pub async fn configure(&self, key: RoomKey, privileged: bool, flag: RoomFlag, on: bool) -> Result<Notice, GameError> {
    if !privileged {
      return Err(GameError::Unprivileged);
    }
    let room_arc = self.room(key).await;
    let notice = room_arc.lock().await.configure(flag, on);
    self.persist().await;
    Ok(notice)
  }

  pub async fn leaderboard(&self, limit: usize) -> Vec<(PlayerId, u32)> {
    let scores = self.scores.lock().await;
    let mut entries: Vec<(PlayerId, u32)> = scores.iter().map(|(id, pts)| (*id, *pts)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
  }

  pub async fn roster_names(&self, key: RoomKey) -> HashMap<PlayerId, String> {
    match self.existing_room(key).await {
      Some(room_arc) => {
        let room = room_arc.lock().await;
        room.roster.iter().map(|p| (p.id, p.display_name.clone())).collect()
      }
      None => HashMap::new(),
    }
  }

  // Some(message id) when the room prefers its standing prompt edited in
  // place rather than a fresh announcement.
  pub async fn prompt_target(&self, key: RoomKey) -> Option<i32> {
    let room_arc = self.existing_room(key).await?;
    let room = room_arc.lock().await;
    if room.config.silent { room.last_prompt } else { None }
  }

  pub async fn set_last_prompt(&self, key: RoomKey, message_id: i32) {
    if let Some(room_arc) = self.existing_room(key).await {
      room_arc.lock().await.last_prompt = Some(message_id);
      self.persist().await;
    }
  }

  pub async fn restore(&self, snapshot: Snapshot) {
    let mut rooms = self.rooms.lock().await;
    rooms.clear();
    for (key, room) in snapshot.rooms {
      rooms.insert(key, Arc::new(Mutex::new(room)));
    }
    drop(rooms);
    *self.scores.lock().await = snapshot.scores;
  }

  // A crash must not strand an Active room without its skip timer; the
  // current player gets a full window again.
  pub async fn rearm_restored(&self) {
    for (key, room_arc) in self.room_arcs().await {
      let mut room = room_arc.lock().await;
      if room.phase == Phase::Active {
        room.timer_epoch += 1;
        self.arm(key, room.timer_epoch).await;
      }
    }
  }

  pub async fn snapshot(&self) -> Snapshot {
    let mut rooms = HashMap::new();
    for (key, room_arc) in self.room_arcs().await {
      rooms.insert(key, room_arc.lock().await.clone());
    }
    let scores = self.scores.lock().await.clone();
    Snapshot::new(rooms, scores)
  }

  async fn room(&self, key: RoomKey) -> Arc<Mutex<Room>> {
    self
      .rooms
      .lock()
      .await
      .entry(key)
      .or_insert_with(|| Arc::new(Mutex::new(Room::new())))
      .clone()
  }

  async fn existing_room(&self, key: RoomKey) -> Option<Arc<Mutex<Room>>> {
    self.rooms.lock().await.get(&key).cloned()
  }

  async fn room_arcs(&self) -> Vec<(RoomKey, Arc<Mutex<Room>>)> {
    self.rooms.lock().await.iter().map(|(key, arc)| (*key, Arc::clone(arc))).collect()
  }

  // Caller holds the room lock, so the armed epoch is the one just stored.
  // Returns a boxed (type-erased) future so the arm -> fire_timeout -> arm
  // recursion through the scheduler closure can be Send-checked without a
  // cyclic opaque-type dependency.
  fn arm<'a>(
    &'a self,
    key: RoomKey,
    epoch: u64,
  ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
      let Some(registry) = self.me.upgrade() else { return };
      self
        .scheduler
        .arm(key, self.turn_timeout, async move {
          registry.fire_timeout(key, epoch).await;
        })
        .await;
    })
  }

  async fn fire_timeout(&self, key: RoomKey, epoch: u64) {
    let Some(room_arc) = self.existing_room(key).await else { return };
    let mut room = room_arc.lock().await;
    // drop our own handle first: re-arming through arm() would abort this task
    self.scheduler.forget(key).await;
    let Some(notice) = room.timeout(epoch) else {
      log::debug!("room {}: late timer ignored", key);
      return;
    };
    log::info!("room {}: turn timed out, skipping", key);
    self.arm(key, room.timer_epoch).await;
    drop(room);
    self.persist().await;
    if self.notices_tx.send((key, notice)).is_err() {
      log::debug!("room {}: skip announcement dropped, no consumer", key);
    }
  }

  // Safety net on top of the per-mutation write-through.
  pub async fn flush(&self) {
    self.persist().await;
  }

  async fn persist(&self) {
    let Some(store) = &self.store else { return };
    let snapshot = self.snapshot().await;
    if let Err(err) = store.save(&snapshot).await {
      log::warn!("snapshot write failed, playing from memory only: {}", err);
    }
  }
}
