use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::rooms::RoomKey;

// One skip timer per room. Arming always replaces: a stale timer surviving a
// later arm could skip the wrong player.
#[derive(Default)]
pub struct TurnScheduler {
  timers: Mutex<HashMap<RoomKey, JoinHandle<()>>>,
}

impl TurnScheduler {
  pub async fn arm<F>(&self, room: RoomKey, after: Duration, on_fire: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let handle = tokio::spawn(async move {
      tokio::time::sleep(after).await;
      on_fire.await;
    });
    if let Some(stale) = self.timers.lock().await.insert(room, handle) {
      stale.abort();
    }
  }

  pub async fn cancel(&self, room: RoomKey) {
    if let Some(handle) = self.timers.lock().await.remove(&room) {
      handle.abort();
    }
  }

  // A fired timer drops its own handle before the engine re-arms; going
  // through cancel() would abort the running task mid-skip.
  pub async fn forget(&self, room: RoomKey) {
    self.timers.lock().await.remove(&room);
  }
}
