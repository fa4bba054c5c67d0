// `/gangs` commands.

use super::{unknown_command, Invocation, Reply};
use crate::bot::Bot;
use crate::error::Result;

pub async fn handle(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    match inv.command.as_str() {
        "create" => create(bot, inv).await,
        "delete" => delete(bot, inv).await,
        "edit" => edit(bot, inv).await,
        "list" => list(bot).await,
        _ => Err(unknown_command(inv)),
    }
}

async fn create(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let gang = bot.gangs.create(inv.str_option("name")?).await?;
    Ok(Reply::ephemeral(format!("Gang '{}' created.", gang.name)))
}

async fn delete(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let gang = bot.gangs.get_by_name(inv.str_option("name")?).await?;
    let removed = bot.gangs.delete(&gang).await?;
    let content = match removed {
        0 => format!("Gang '{}' deleted.", gang.name),
        1 => format!("Gang '{}' deleted along with 1 war.", gang.name),
        n => format!("Gang '{}' deleted along with {n} wars.", gang.name),
    };
    Ok(Reply::ephemeral(content))
}

async fn edit(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let gang = bot.gangs.get_by_name(inv.str_option("old_name")?).await?;
    let renamed = bot
        .gangs
        .update_name(&gang, inv.str_option("new_name")?)
        .await?;
    Ok(Reply::ephemeral(format!(
        "Gang '{}' renamed to '{}'.",
        gang.name, renamed.name
    )))
}

async fn list(bot: &Bot) -> Result<Reply> {
    let gangs = bot.gangs.get_all().await?;
    if gangs.is_empty() {
        return Ok(Reply::ephemeral("No gangs yet."));
    }
    let lines: Vec<String> = gangs
        .iter()
        .map(|g| format!("`#{}` {}", g.id, g.name))
        .collect();
    Ok(Reply::ephemeral(lines.join("\n")))
}
