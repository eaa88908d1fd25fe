use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::rooms::{PlayerId, Room, RoomKey};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub version: u32,
  pub rooms: HashMap<RoomKey, Room>,
  pub scores: HashMap<PlayerId, u32>,
}

impl Snapshot {
  pub fn new(rooms: HashMap<RoomKey, Room>, scores: HashMap<PlayerId, u32>) -> Self {
    Snapshot { version: SNAPSHOT_VERSION, rooms, scores }
  }
}

#[derive(Clone, Debug)]
pub struct SnapshotStore {
  path: PathBuf,
}

impl SnapshotStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    SnapshotStore { path: path.into() }
  }

  // Write-to-temp then rename: a reader never sees a torn snapshot.
  pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(snapshot)?;
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, &self.path).await?;
    Ok(())
  }

  // A missing, corrupt or outdated snapshot starts the bot fresh; losing a
  // save file must never stop the games.
  pub async fn load(&self) -> Option<Snapshot> {
    let content = match fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
      Err(err) => {
        log::warn!("could not read snapshot {}: {}", self.path.display(), err);
        return None;
      }
    };
    let snapshot: Snapshot = match serde_json::from_str(&content) {
      Ok(snapshot) => snapshot,
      Err(err) => {
        log::warn!("corrupt snapshot {}: {}", self.path.display(), err);
        return None;
      }
    };
    if snapshot.version != SNAPSHOT_VERSION {
      log::warn!(
        "snapshot {} has unsupported version {}, starting fresh",
        self.path.display(),
        snapshot.version
      );
      return None;
    }
    Some(snapshot)
  }
}
