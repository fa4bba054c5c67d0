// Duel ledger: scored contests between two distinct gangs.

use std::sync::Arc;

use crate::db::{Database, Duel, DuelSummary, Gang};
use crate::error::{is_foreign_key_violation, Result, ScoreError};

/// Number of duels returned by `get_recent` when the caller has no preference.
pub const DEFAULT_RECENT_LIMIT: u32 = 6;

fn check_scores(attacking_score: i64, defending_score: i64) -> Result<()> {
    if attacking_score < 0 {
        return Err(ScoreError::invalid(
            "attacking_score",
            "Scores cannot be negative.",
        ));
    }
    if defending_score < 0 {
        return Err(ScoreError::invalid(
            "defending_score",
            "Scores cannot be negative.",
        ));
    }
    Ok(())
}

pub struct DuelLedger {
    db: Arc<Database>,
}

impl DuelLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        attacker: &Gang,
        attacking_score: i64,
        defender: &Gang,
        defending_score: i64,
    ) -> Result<Duel> {
        if attacker.id == defender.id {
            return Err(ScoreError::invalid(
                "defending_gang",
                format!("Gang '{}' cannot duel itself.", attacker.name),
            ));
        }
        check_scores(attacking_score, defending_score)?;

        let duel = self
            .db
            .insert_duel(attacker.id, attacking_score, defender.id, defending_score)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ScoreError::not_found(
                        "gang",
                        format!(
                            "Gang '{}' or '{}' no longer exists.",
                            attacker.name, defender.name
                        ),
                    )
                } else {
                    e.into()
                }
            })?;

        tracing::info!(
            duel_id = duel.id,
            attacker = %attacker.name,
            defender = %defender.name,
            attacking_score,
            defending_score,
            "Duel created"
        );
        Ok(duel)
    }

    pub async fn delete(&self, duel: &Duel) -> Result<()> {
        if !self.db.delete_duel(duel.id).await? {
            return Err(Self::missing(duel.id));
        }
        tracing::info!(duel_id = duel.id, "Duel deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Duel> {
        self.db
            .get_duel(id)
            .await?
            .ok_or_else(|| Self::missing(id))
    }

    pub async fn get_by_gang(&self, gang: &Gang) -> Result<Vec<Duel>> {
        Ok(self.db.duels_by_gang(gang.id).await?)
    }

    pub async fn get_all(&self) -> Result<Vec<Duel>> {
        Ok(self.db.list_duels().await?)
    }

    /// At most `limit` duels, most recently created first.
    pub async fn get_recent(&self, limit: u32) -> Result<Vec<Duel>> {
        Ok(self.db.recent_duels(i64::from(limit)).await?)
    }

    /// Like `get_recent`, with gang names resolved.
    pub async fn summaries(&self, limit: u32) -> Result<Vec<DuelSummary>> {
        Ok(self.db.duel_summaries(i64::from(limit)).await?)
    }

    pub async fn update_scores(
        &self,
        duel: &Duel,
        attacking_score: i64,
        defending_score: i64,
    ) -> Result<Duel> {
        check_scores(attacking_score, defending_score)?;

        if !self
            .db
            .update_duel_scores(duel.id, attacking_score, defending_score)
            .await?
        {
            return Err(Self::missing(duel.id));
        }

        tracing::info!(duel_id = duel.id, attacking_score, defending_score, "Duel scores updated");
        Ok(Duel {
            attacking_score,
            defending_score,
            ..duel.clone()
        })
    }

    fn missing(id: i64) -> ScoreError {
        ScoreError::not_found("war_id", format!("No war found with ID {id}."))
    }
}
