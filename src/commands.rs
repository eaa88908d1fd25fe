use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "One-word story commands:")]
pub enum Command {
  #[command(description = "Show this help text")]
  Help,
  #[command(description = "Open a new story and start recruiting writers")]
  Story,
  #[command(description = "Join the story being set up")]
  Join,
  #[command(description = "Start the game (admins only)")]
  Startgame,
  #[command(description = "Finish the story and print it (admins only)")]
  Endstory,
  #[command(description = "Show the scoreboard")]
  Scores,
  #[command(description = "Toggle a room flag (admins only). Usage: /settings <silent|scoring|chaos> <on|off>")]
  Settings(String),
}
