// Debug-only commands: `/database` maintenance and `/ping`.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{unknown_command, Invocation, Reply};
use crate::bot::Bot;
use crate::db::Gang;
use crate::error::Result;

const FAKE_GANGS: usize = 6;
const FAKE_DUELS: usize = 8;

pub async fn handle_database(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    match inv.command.as_str() {
        "flush" => flush(bot).await,
        "fake_data" => fake_data(bot).await,
        _ => Err(unknown_command(inv)),
    }
}

pub async fn handle_ping(bot: &Bot, inv: &Invocation) -> Result<Reply> {
    if !inv.command.is_empty() {
        return Err(unknown_command(inv));
    }
    tracing::info!(uptime_seconds = bot.uptime_seconds(), "Ping Pong!");
    Ok(Reply::public("pong"))
}

async fn flush(bot: &Bot) -> Result<Reply> {
    let (duels, gangs) = bot.db.flush().await?;
    tracing::warn!(duels, gangs, "Database flushed");
    Ok(Reply::ephemeral(
        "Database flushed (all gangs and duels deleted).",
    ))
}

async fn fake_data(bot: &Bot) -> Result<Reply> {
    let mut gangs: Vec<Gang> = Vec::with_capacity(FAKE_GANGS);
    for i in 1..=FAKE_GANGS {
        let name = format!("Gang_{i}");
        // Reuse gangs left by an earlier run; a full registry surfaces as is.
        let gang = match bot.db.get_gang_by_name(&name).await? {
            Some(gang) => gang,
            None => bot.gangs.create(&name).await?,
        };
        gangs.push(gang);
    }

    // Pick every pairing up front; the thread RNG must not live across awaits.
    let pairings: Vec<(usize, i64, usize, i64)> = {
        let mut rng = rand::thread_rng();
        let indices: Vec<usize> = (0..gangs.len()).collect();
        (0..FAKE_DUELS)
            .map(|_| {
                let picked: Vec<usize> = indices.choose_multiple(&mut rng, 2).copied().collect();
                (
                    picked[0],
                    rng.gen_range(0..=10),
                    picked[1],
                    rng.gen_range(0..=10),
                )
            })
            .collect()
    };

    let mut created = 0;
    for (attacker, attacking_score, defender, defending_score) in pairings {
        match bot
            .wars
            .create(&gangs[attacker], attacking_score, &gangs[defender], defending_score)
            .await
        {
            Ok(_) => created += 1,
            Err(e) => tracing::warn!(error = %e, "Skipped fake duel"),
        }
    }

    Ok(Reply::ephemeral(format!(
        "Fake data added: {} gangs, {created} duels.",
        gangs.len()
    )))
}
