// `/scoreboard` commands.

use super::{unknown_command, Invocation, Reply};
use crate::bot::Bot;
use crate::error::Result;

pub async fn handle(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    match inv.command.as_str() {
        "spawn" => spawn(bot, inv).await,
        "add" => add(bot, inv).await,
        _ => Err(unknown_command(inv)),
    }
}

async fn spawn(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let channel_id = inv.channel_option("channel")?;
    let message = bot.scoreboard.setup(channel_id).await?;
    Ok(Reply::ephemeral(format!(
        "Scoreboard spawned in <#{}>.",
        message.channel_id
    )))
}

async fn add(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let line = bot
        .scoreboard
        .add_score(
            inv.str_option("attacking_gang")?,
            inv.int_option("attacking_score")?,
            inv.str_option("defending_gang")?,
            inv.int_option("defending_score")?,
        )
        .await?;
    Ok(Reply::ephemeral(format!("Added `{line}` to the scoreboard.")))
}
