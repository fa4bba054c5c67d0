// Record store for gangs, duels and the scoreboard reference (SQLite via sqlx).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gang {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Duel {
    pub id: i64,
    pub attacking_gang_id: i64,
    pub defending_gang_id: i64,
    pub attacking_score: i64,
    pub defending_score: i64,
    pub created_at: String,
}

/// A duel joined with the names of both gangs, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DuelSummary {
    pub id: i64,
    pub attacking_gang: String,
    pub attacking_score: i64,
    pub defending_gang: String,
    pub defending_score: i64,
    pub created_at: String,
}

/// The remembered scoreboard message. One row per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoreboardRow {
    pub channel_id: i64,
    pub message_id: i64,
    pub updated_at: String,
}

const GANG_COLUMNS: &str = "id, name, created_at";
const DUEL_COLUMNS: &str =
    "id, attacking_gang_id, defending_gang_id, attacking_score, defending_score, created_at";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and make sure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let db = Self::connect(database_url).await?;
        db.initialize().await?;
        Ok(db)
    }

    /// Connect without touching the schema.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is its own database, so
        // keep exactly one alive for the lifetime of the pool.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Create the tables if they do not exist. Safe to call on every startup.
    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gangs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS duels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attacking_gang_id INTEGER NOT NULL REFERENCES gangs(id) ON DELETE CASCADE,
                defending_gang_id INTEGER NOT NULL REFERENCES gangs(id) ON DELETE CASCADE,
                attacking_score INTEGER NOT NULL DEFAULT 0 CHECK (attacking_score >= 0),
                defending_score INTEGER NOT NULL DEFAULT 0 CHECK (defending_score >= 0),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (attacking_gang_id <> defending_gang_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_duels_attacking_gang ON duels(attacking_gang_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_duels_defending_gang ON duels(defending_gang_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scoreboard (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                channel_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Release the pool. Closing twice is a no-op.
    pub async fn close(&self) {
        if self.pool.is_closed() {
            tracing::debug!("Database connection is already closed");
            return;
        }
        self.pool.close().await;
        tracing::info!("Database connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    // ── Gangs ─────────────────────────────────────────────────────────

    pub async fn insert_gang(&self, name: &str) -> Result<Gang, sqlx::Error> {
        sqlx::query_as::<_, Gang>(&format!(
            "INSERT INTO gangs (name) VALUES (?) RETURNING {GANG_COLUMNS}"
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_gang(&self, id: i64) -> Result<Option<Gang>, sqlx::Error> {
        sqlx::query_as::<_, Gang>(&format!("SELECT {GANG_COLUMNS} FROM gangs WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_gang_by_name(&self, name: &str) -> Result<Option<Gang>, sqlx::Error> {
        sqlx::query_as::<_, Gang>(&format!("SELECT {GANG_COLUMNS} FROM gangs WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_gangs(&self) -> Result<Vec<Gang>, sqlx::Error> {
        sqlx::query_as::<_, Gang>(&format!("SELECT {GANG_COLUMNS} FROM gangs ORDER BY id"))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_gangs(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM gangs")
            .fetch_one(&self.pool)
            .await
    }

    /// Returns `false` when no gang has the given id.
    pub async fn rename_gang(&self, id: i64, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE gangs SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a gang together with every duel that references it.
    /// Returns the number of duels removed, or `None` if the gang did not exist.
    pub async fn delete_gang(&self, id: i64) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM duels WHERE attacking_gang_id = ? OR defending_gang_id = ?",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM gangs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(removed))
    }

    // ── Duels ─────────────────────────────────────────────────────────

    pub async fn insert_duel(
        &self,
        attacking_gang_id: i64,
        attacking_score: i64,
        defending_gang_id: i64,
        defending_score: i64,
    ) -> Result<Duel, sqlx::Error> {
        sqlx::query_as::<_, Duel>(&format!(
            "INSERT INTO duels (attacking_gang_id, defending_gang_id, attacking_score, defending_score) VALUES (?, ?, ?, ?) RETURNING {DUEL_COLUMNS}"
        ))
        .bind(attacking_gang_id)
        .bind(defending_gang_id)
        .bind(attacking_score)
        .bind(defending_score)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_duel(&self, id: i64) -> Result<Option<Duel>, sqlx::Error> {
        sqlx::query_as::<_, Duel>(&format!("SELECT {DUEL_COLUMNS} FROM duels WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_duels(&self) -> Result<Vec<Duel>, sqlx::Error> {
        sqlx::query_as::<_, Duel>(&format!("SELECT {DUEL_COLUMNS} FROM duels ORDER BY id"))
            .fetch_all(&self.pool)
            .await
    }

    /// Newest first, by insertion order.
    pub async fn recent_duels(&self, limit: i64) -> Result<Vec<Duel>, sqlx::Error> {
        sqlx::query_as::<_, Duel>(&format!(
            "SELECT {DUEL_COLUMNS} FROM duels ORDER BY id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Duels where the gang is either attacker or defender.
    pub async fn duels_by_gang(&self, gang_id: i64) -> Result<Vec<Duel>, sqlx::Error> {
        sqlx::query_as::<_, Duel>(&format!(
            "SELECT {DUEL_COLUMNS} FROM duels WHERE attacking_gang_id = ? OR defending_gang_id = ? ORDER BY id"
        ))
        .bind(gang_id)
        .bind(gang_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn duel_summaries(&self, limit: i64) -> Result<Vec<DuelSummary>, sqlx::Error> {
        sqlx::query_as::<_, DuelSummary>(
            r#"
            SELECT d.id, a.name AS attacking_gang, d.attacking_score,
                   g.name AS defending_gang, d.defending_score, d.created_at
            FROM duels d
            JOIN gangs a ON a.id = d.attacking_gang_id
            JOIN gangs g ON g.id = d.defending_gang_id
            ORDER BY d.id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_duel_scores(
        &self,
        id: i64,
        attacking_score: i64,
        defending_score: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE duels SET attacking_score = ?, defending_score = ? WHERE id = ?")
                .bind(attacking_score)
                .bind(defending_score)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_duel(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM duels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every duel, then every gang. Returns `(duels, gangs)` removed.
    pub async fn flush(&self) -> Result<(u64, u64), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let duels = sqlx::query("DELETE FROM duels")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let gangs = sqlx::query("DELETE FROM gangs")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok((duels, gangs))
    }

    // ── Scoreboard reference ──────────────────────────────────────────

    pub async fn get_scoreboard(&self) -> Result<Option<ScoreboardRow>, sqlx::Error> {
        sqlx::query_as::<_, ScoreboardRow>(
            "SELECT channel_id, message_id, updated_at FROM scoreboard WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn set_scoreboard(
        &self,
        channel_id: i64,
        message_id: i64,
    ) -> Result<ScoreboardRow, sqlx::Error> {
        sqlx::query_as::<_, ScoreboardRow>(
            r#"
            INSERT INTO scoreboard (id, channel_id, message_id) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                channel_id = excluded.channel_id,
                message_id = excluded.message_id,
                updated_at = datetime('now')
            RETURNING channel_id, message_id, updated_at
        "#,
        )
        .bind(channel_id)
        .bind(message_id)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = test_db().await;
        db.insert_gang("Alpha").await.unwrap();
        db.initialize().await.unwrap();
        db.initialize().await.unwrap();
        assert_eq!(db.list_gangs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_twice() {
        let db = test_db().await;
        assert!(!db.is_closed());
        db.close().await;
        assert!(db.is_closed());
        db.close().await;
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_gang_crud() {
        let db = test_db().await;

        let alpha = db.insert_gang("Alpha").await.unwrap();
        assert_eq!(alpha.name, "Alpha");
        let beta = db.insert_gang("Beta").await.unwrap();
        assert!(beta.id > alpha.id);

        let fetched = db.get_gang_by_name("Beta").await.unwrap().unwrap();
        assert_eq!(fetched.id, beta.id);
        assert!(db.get_gang(999).await.unwrap().is_none());
        assert!(db.get_gang_by_name("beta").await.unwrap().is_none());

        assert!(db.rename_gang(alpha.id, "Gamma").await.unwrap());
        assert!(!db.rename_gang(999, "Nope").await.unwrap());
        assert_eq!(db.get_gang(alpha.id).await.unwrap().unwrap().name, "Gamma");
        assert_eq!(db.count_gangs().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_gang_name_unique() {
        let db = test_db().await;
        db.insert_gang("Alpha").await.unwrap();
        let err = db.insert_gang("Alpha").await.unwrap_err();
        assert!(crate::error::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_delete_gang_cascades() {
        let db = test_db().await;
        let a = db.insert_gang("A").await.unwrap();
        let b = db.insert_gang("B").await.unwrap();
        let c = db.insert_gang("C").await.unwrap();
        db.insert_duel(a.id, 1, b.id, 2).await.unwrap();
        db.insert_duel(b.id, 3, a.id, 4).await.unwrap();
        let kept = db.insert_duel(b.id, 5, c.id, 6).await.unwrap();

        assert_eq!(db.delete_gang(a.id).await.unwrap(), Some(2));
        assert_eq!(db.delete_gang(a.id).await.unwrap(), None);

        let duels = db.list_duels().await.unwrap();
        assert_eq!(duels, vec![kept]);
    }

    #[tokio::test]
    async fn test_duel_constraints() {
        let db = test_db().await;
        let a = db.insert_gang("A").await.unwrap();
        let b = db.insert_gang("B").await.unwrap();

        assert!(db.insert_duel(a.id, 0, a.id, 0).await.is_err());
        assert!(db.insert_duel(a.id, -1, b.id, 0).await.is_err());

        let err = db.insert_duel(a.id, 0, 999, 0).await.unwrap_err();
        assert!(crate::error::is_foreign_key_violation(&err));
    }

    #[tokio::test]
    async fn test_recent_duels_newest_first() {
        let db = test_db().await;
        let a = db.insert_gang("A").await.unwrap();
        let b = db.insert_gang("B").await.unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(db.insert_duel(a.id, i, b.id, 0).await.unwrap().id);
        }

        let recent = db.recent_duels(3).await.unwrap();
        let recent_ids: Vec<i64> = recent.iter().map(|d| d.id).collect();
        assert_eq!(recent_ids, vec![ids[4], ids[3], ids[2]]);

        let summaries = db.duel_summaries(10).await.unwrap();
        assert_eq!(summaries.len(), 5);
        assert_eq!(summaries[0].id, ids[4]);
        assert_eq!(summaries[0].attacking_gang, "A");
        assert_eq!(summaries[0].defending_gang, "B");
        assert_eq!(summaries[0].attacking_score, 4);
    }

    #[tokio::test]
    async fn test_update_and_delete_duel() {
        let db = test_db().await;
        let a = db.insert_gang("A").await.unwrap();
        let b = db.insert_gang("B").await.unwrap();
        let duel = db.insert_duel(a.id, 3, b.id, 5).await.unwrap();

        assert!(db.update_duel_scores(duel.id, 4, 5).await.unwrap());
        let fetched = db.get_duel(duel.id).await.unwrap().unwrap();
        assert_eq!((fetched.attacking_score, fetched.defending_score), (4, 5));

        assert!(db.delete_duel(duel.id).await.unwrap());
        assert!(!db.delete_duel(duel.id).await.unwrap());
        assert!(!db.update_duel_scores(duel.id, 1, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_flush() {
        let db = test_db().await;
        let a = db.insert_gang("A").await.unwrap();
        let b = db.insert_gang("B").await.unwrap();
        db.insert_duel(a.id, 1, b.id, 1).await.unwrap();

        assert_eq!(db.flush().await.unwrap(), (1, 2));
        assert!(db.list_gangs().await.unwrap().is_empty());
        assert!(db.list_duels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoreboard_reference_upsert() {
        let db = test_db().await;
        assert!(db.get_scoreboard().await.unwrap().is_none());

        db.set_scoreboard(10, 100).await.unwrap();
        let row = db.set_scoreboard(20, 200).await.unwrap();
        assert_eq!((row.channel_id, row.message_id), (20, 200));

        let stored = db.get_scoreboard().await.unwrap().unwrap();
        assert_eq!((stored.channel_id, stored.message_id), (20, 200));
    }
}
