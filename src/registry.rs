// Gang registry: name rules and gang lifecycle on top of the record store.

use std::sync::Arc;

use crate::config::GangSettings;
use crate::db::{Database, Gang};
use crate::error::{is_unique_violation, Result, ScoreError};

pub struct GangRegistry {
    db: Arc<Database>,
    limits: GangSettings,
}

impl GangRegistry {
    pub fn new(db: Arc<Database>, limits: GangSettings) -> Self {
        Self { db, limits }
    }

    /// Trim and check a candidate gang name.
    fn validate_name<'a>(&self, name: &'a str) -> Result<&'a str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ScoreError::invalid("name", "Gang name cannot be empty."));
        }
        let limit = self.limits.name_length_limit;
        if trimmed.chars().count() > limit {
            return Err(ScoreError::invalid(
                "name",
                format!("Gang name '{trimmed}' is longer than {limit} characters."),
            ));
        }
        Ok(trimmed)
    }

    fn name_taken(name: &str) -> ScoreError {
        ScoreError::conflict("name", format!("A gang with the name '{name}' already exists."))
    }

    pub async fn create(&self, name: &str) -> Result<Gang> {
        let name = self.validate_name(name)?;

        if self.db.get_gang_by_name(name).await?.is_some() {
            return Err(Self::name_taken(name));
        }

        let max = self.limits.max_gangs;
        if self.db.count_gangs().await? >= max as i64 {
            return Err(ScoreError::conflict(
                "name",
                format!("The limit of {max} gangs has been reached."),
            ));
        }

        // A concurrent create can slip past the check above; the UNIQUE
        // constraint decides the winner.
        let gang = self.db.insert_gang(name).await.map_err(|e| {
            if is_unique_violation(&e) {
                Self::name_taken(name)
            } else {
                e.into()
            }
        })?;

        tracing::info!(gang_id = gang.id, name = %gang.name, "Gang created");
        Ok(gang)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Gang> {
        self.db
            .get_gang(id)
            .await?
            .ok_or_else(|| ScoreError::not_found("gang_id", format!("No gang found with ID {id}.")))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Gang> {
        let name = name.trim();
        self.db.get_gang_by_name(name).await?.ok_or_else(|| {
            ScoreError::not_found("name", format!("No gang found with the name '{name}'."))
        })
    }

    pub async fn get_all(&self) -> Result<Vec<Gang>> {
        Ok(self.db.list_gangs().await?)
    }

    /// Rename a gang. Renaming a gang to its current name is a no-op.
    pub async fn update_name(&self, gang: &Gang, new_name: &str) -> Result<Gang> {
        // Checked before the length limit, which may have shrunk since the
        // name was stored.
        if new_name.trim() == gang.name {
            return self.get_by_id(gang.id).await;
        }
        let new_name = self.validate_name(new_name)?;

        if let Some(existing) = self.db.get_gang_by_name(new_name).await? {
            if existing.id == gang.id {
                return Ok(existing);
            }
            return Err(Self::name_taken(new_name));
        }

        let renamed = self.db.rename_gang(gang.id, new_name).await.map_err(|e| {
            if is_unique_violation(&e) {
                Self::name_taken(new_name)
            } else {
                e.into()
            }
        })?;
        if !renamed {
            return Err(ScoreError::not_found(
                "gang_id",
                format!("No gang found with ID {}.", gang.id),
            ));
        }

        tracing::info!(gang_id = gang.id, from = %gang.name, to = %new_name, "Gang renamed");
        self.get_by_id(gang.id).await
    }

    /// Delete a gang and every duel it takes part in.
    /// Returns the number of duels removed alongside it.
    pub async fn delete(&self, gang: &Gang) -> Result<u64> {
        match self.db.delete_gang(gang.id).await? {
            Some(removed) => {
                tracing::info!(
                    gang_id = gang.id,
                    name = %gang.name,
                    duels_removed = removed,
                    "Gang deleted"
                );
                Ok(removed)
            }
            None => Err(ScoreError::not_found(
                "name",
                format!("No gang found with the name '{}'.", gang.name),
            )),
        }
    }
}
