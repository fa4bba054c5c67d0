// `/wars` commands: duels between two gangs, recorded in the ledger.

use std::collections::HashMap;

use super::{unknown_command, Invocation, Reply};
use crate::bot::Bot;
use crate::error::Result;
use crate::ledger::DEFAULT_RECENT_LIMIT;
use crate::scoreboard::format_line;

pub async fn handle(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    match inv.command.as_str() {
        "create" => create(bot, inv).await,
        "delete" => delete(bot, inv).await,
        "edit" => edit(bot, inv).await,
        "recent" => recent(bot, inv).await,
        "gang" => by_gang(bot, inv).await,
        _ => Err(unknown_command(inv)),
    }
}

async fn create(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let attacking_score = inv.int_option("attacking_score")?;
    let defending_score = inv.int_option("defending_score")?;
    let attacker = bot.gangs.get_by_name(inv.str_option("attacking_gang")?).await?;
    let defender = bot.gangs.get_by_name(inv.str_option("defending_gang")?).await?;

    let duel = bot
        .wars
        .create(&attacker, attacking_score, &defender, defending_score)
        .await?;

    let mut content = format!(
        "War created between '{}' and '{}'. War ID: {}",
        attacker.name, defender.name, duel.id
    );

    let war = &bot.settings.war;
    if war.updates {
        let announcement = format!(
            "War #{}: {}",
            duel.id,
            format_line(&attacker.name, attacking_score, defending_score, &defender.name)
        );
        if let Err(e) = bot.transport.send(war.update_channel_id, &announcement).await {
            tracing::warn!(
                duel_id = duel.id,
                channel_id = war.update_channel_id,
                error = %e,
                "War announcement failed"
            );
            content.push_str(&format!(" (The war announcement could not be posted: {e})"));
        }
    }

    Ok(Reply::ephemeral(content))
}

async fn delete(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let war_id = inv.int_option("war_id")?;
    let duel = bot.wars.get_by_id(war_id).await?;
    bot.wars.delete(&duel).await?;
    Ok(Reply::ephemeral(format!("War with ID {war_id} deleted.")))
}

async fn edit(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let war_id = inv.int_option("war_id")?;
    let attacking_score = inv.int_option("attacking_score")?;
    let defending_score = inv.int_option("defending_score")?;

    let duel = bot.wars.get_by_id(war_id).await?;
    let duel = bot
        .wars
        .update_scores(&duel, attacking_score, defending_score)
        .await?;
    Ok(Reply::ephemeral(format!(
        "War with ID {} updated to {} - {}.",
        duel.id, duel.attacking_score, duel.defending_score
    )))
}

async fn recent(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let limit = match inv.opt_int_option("limit")? {
        Some(n) => n.clamp(0, 50) as u32,
        None => DEFAULT_RECENT_LIMIT,
    };
    let wars = bot.wars.summaries(limit).await?;
    if wars.is_empty() {
        return Ok(Reply::ephemeral("No wars recorded yet."));
    }
    let lines: Vec<String> = wars
        .iter()
        .map(|w| {
            format!(
                "`#{}` {}",
                w.id,
                format_line(
                    &w.attacking_gang,
                    w.attacking_score,
                    w.defending_score,
                    &w.defending_gang
                )
            )
        })
        .collect();
    Ok(Reply::ephemeral(lines.join("\n")))
}

async fn by_gang(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    let gang = bot.gangs.get_by_name(inv.str_option("name")?).await?;
    let duels = bot.wars.get_by_gang(&gang).await?;
    if duels.is_empty() {
        return Ok(Reply::ephemeral(format!(
            "Gang '{}' has not fought any wars.",
            gang.name
        )));
    }

    let names: HashMap<i64, String> = bot
        .gangs
        .get_all()
        .await?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();
    let name_of = |id: i64| names.get(&id).map(String::as_str).unwrap_or("?");

    let mut lines = vec![format!("Wars involving '{}':", gang.name)];
    lines.extend(duels.iter().map(|d| {
        format!(
            "`#{}` {}",
            d.id,
            format_line(
                name_of(d.attacking_gang_id),
                d.attacking_score,
                d.defending_score,
                name_of(d.defending_gang_id)
            )
        )
    }));
    Ok(Reply::ephemeral(lines.join("\n")))
}
