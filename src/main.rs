mod chaos;
mod commands;
mod handlers;
mod persist;
mod registry;
mod rooms;
mod scheduler;
mod utils;
mod validator;

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use teloxide::prelude::*;
use tokio::sync::mpsc;

use crate::commands::Command;
use crate::persist::SnapshotStore;
use crate::registry::Registry;

const DEFAULT_DATA_FILE: &str = "storychain.json";
const DEFAULT_TURN_SECS: u64 = 60;

#[tokio::main]
async fn main() {
  pretty_env_logger::init();
  colored::control::set_override(true);
  log::info!("Starting story bot...");

  let bot = Bot::from_env();

  let data_file = std::env::var("STORY_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.to_string());
  let turn_secs = std::env::var("STORY_TURN_SECS")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(DEFAULT_TURN_SECS);

  let store = SnapshotStore::new(&data_file);
  let snapshot = store.load().await;

  let (notices_tx, mut notices_rx) = mpsc::unbounded_channel();
  let registry = Registry::new(Some(store), Duration::from_secs(turn_secs), notices_tx);

  if let Some(snapshot) = snapshot {
    log::info!("restored {} rooms and {} scores from {}", snapshot.rooms.len(), snapshot.scores.len(), data_file);
    registry.restore(snapshot).await;
  }
  registry.rearm_restored().await;

  println!("{}", "!!! The story bot is up !!!".bright_green().bold());

  // timer-driven skip announcements arrive outside any inbound update
  let notice_bot = bot.clone();
  let notice_registry = Arc::clone(&registry);
  tokio::spawn(async move {
    while let Some((room, notice)) = notices_rx.recv().await {
      if let Err(err) = handlers::deliver(&notice_bot, &notice_registry, room, notice).await {
        log::warn!("room {}: could not deliver skip announcement: {}", room, err);
      }
    }
  });

  let flush_registry = Arc::clone(&registry);
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(Duration::from_secs(300));
    loop {
      tick.tick().await;
      flush_registry.flush().await;
    }
  });

  let handler = Update::filter_message()
    .branch(
      dptree::entry()
        .filter_command::<Command>()
        .endpoint(handlers::handle_command),
    )
    .branch(dptree::endpoint(handlers::handle_word));

  Dispatcher::builder(bot, handler)
    .dependencies(dptree::deps![registry])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}
