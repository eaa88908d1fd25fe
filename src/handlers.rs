use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::utils::command::BotCommands;

use crate::commands::Command;
use crate::registry::SharedRegistry;
use crate::rooms::{GameError, Notice, NoticeKind, PlayerId, RoomFlag, RoomKey};

pub async fn handle_command(
  bot: Bot,
  msg: Message,
  cmd: Command,
  registry: SharedRegistry,
) -> ResponseResult<()> {
  match cmd {
    Command::Help => help(bot, msg).await,
    Command::Story => new_story(bot, msg, registry).await,
    Command::Join => join(bot, msg, registry).await,
    Command::Startgame => start_game(bot, msg, registry).await,
    Command::Endstory => end_story(bot, msg, registry).await,
    Command::Scores => scores(bot, msg, registry).await,
    Command::Settings(args) => settings(bot, msg, registry, args).await,
  }
}

// Plain text in an active room is a move for the current player; everything
// else (chatter, out-of-turn words, stale messages) is deliberately ignored.
pub async fn handle_word(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  let Some(user) = msg.from() else { return Ok(()) };
  let Some(text) = msg.text() else { return Ok(()) };
  let room = msg.chat.id.0;

  match registry.submit_word(room, user.id.0, text).await {
    Ok(Some(notices)) => {
      for notice in notices {
        deliver(&bot, &registry, room, notice).await?;
      }
    }
    Ok(None) => {}
    Err(err) => {
      deliver(&bot, &registry, room, Notice::error(user.id.0, format!("❌ {}", err))).await?;
    }
  }
  Ok(())
}

// Renders a notice into the chat. Turn prompts in "silent" rooms edit the
// standing prompt message instead of posting a new one.
pub async fn deliver(bot: &Bot, registry: &SharedRegistry, room: RoomKey, notice: Notice) -> ResponseResult<()> {
  let chat = ChatId(room);
  if notice.kind == NoticeKind::Final {
    log::info!("room {}: delivering final story to {:?}", room, notice.recipient);
  }
  if notice.turn_prompt {
    if let Some(previous) = registry.prompt_target(room).await {
      if bot.edit_message_text(chat, MessageId(previous), &notice.text).await.is_ok() {
        return Ok(());
      }
      // the old prompt may have been deleted; fall through and send fresh
    }
    let sent = bot.send_message(chat, &notice.text).await?;
    registry.set_last_prompt(room, sent.id.0).await;
    return Ok(());
  }
  bot.send_message(chat, notice.text).await?;
  Ok(())
}

async fn help(bot: Bot, msg: Message) -> ResponseResult<()> {
  bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
  Ok(())
}

async fn new_story(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  if msg.chat.is_private() {
    bot.send_message(msg.chat.id, "❌ This game only works in groups.").await?;
    return Ok(());
  }
  let notice = registry.new_story(msg.chat.id.0).await;
  deliver(&bot, &registry, msg.chat.id.0, notice).await
}

async fn join(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  let Some(user) = msg.from() else { return Ok(()) };
  let room = msg.chat.id.0;
  let result = registry.join(room, user.id.0, &user.first_name).await;
  reply(&bot, &registry, room, user.id.0, result).await
}

async fn start_game(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  let Some(user) = msg.from() else { return Ok(()) };
  let room = msg.chat.id.0;
  let privileged = is_privileged(&bot, &msg).await?;
  let result = registry.begin(room, privileged).await;
  reply(&bot, &registry, room, user.id.0, result).await
}

async fn end_story(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  let Some(user) = msg.from() else { return Ok(()) };
  let room = msg.chat.id.0;
  let privileged = is_privileged(&bot, &msg).await?;
  let result = registry.end(room, privileged).await;
  reply(&bot, &registry, room, user.id.0, result).await
}

async fn scores(bot: Bot, msg: Message, registry: SharedRegistry) -> ResponseResult<()> {
  let room = msg.chat.id.0;
  let top = registry.leaderboard(10).await;
  if top.is_empty() {
    bot.send_message(msg.chat.id, "🏆 Nobody has scored a point yet.").await?;
    return Ok(());
  }
  let names = registry.roster_names(room).await;
  let lines = top
    .iter()
    .enumerate()
    .map(|(rank, (id, points))| {
      let name = names.get(id).cloned().unwrap_or_else(|| format!("player {}", id));
      format!("{}. {}: {} pt{}", rank + 1, name, points, if *points == 1 { "" } else { "s" })
    })
    .collect::<Vec<_>>()
    .join("\n");
  bot.send_message(msg.chat.id, format!("🏆 Scoreboard:\n{}", lines)).await?;
  Ok(())
}

async fn settings(bot: Bot, msg: Message, registry: SharedRegistry, args: String) -> ResponseResult<()> {
  let Some(user) = msg.from() else { return Ok(()) };
  let room = msg.chat.id.0;

  let mut parts = args.split_whitespace();
  let flag = parts.next().and_then(RoomFlag::parse);
  let value = match parts.next() {
    Some("on") => Some(true),
    Some("off") => Some(false),
    _ => None,
  };
  let (Some(flag), Some(on)) = (flag, value) else {
    bot
      .send_message(msg.chat.id, "Usage: /settings <silent|scoring|chaos> <on|off>")
      .await?;
    return Ok(());
  };

  let privileged = is_privileged(&bot, &msg).await?;
  let result = registry.configure(room, privileged, flag, on).await;
  reply(&bot, &registry, room, user.id.0, result).await
}

async fn reply(
  bot: &Bot,
  registry: &SharedRegistry,
  room: RoomKey,
  actor: PlayerId,
  result: Result<Notice, GameError>,
) -> ResponseResult<()> {
  match result {
    Ok(notice) => deliver(bot, registry, room, notice).await,
    Err(err) => deliver(bot, registry, room, Notice::error(actor, format!("❌ {}", err))).await,
  }
}

// Privilege is a host concern: group admins qualify, and a private chat with
// the bot is trivially privileged.
async fn is_privileged(bot: &Bot, msg: &Message) -> ResponseResult<bool> {
  let Some(user) = msg.from() else { return Ok(false) };
  if msg.chat.is_private() {
    return Ok(true);
  }
  let admins = bot.get_chat_administrators(msg.chat.id).await?;
  Ok(admins.iter().any(|member| member.user.id == user.id))
}
