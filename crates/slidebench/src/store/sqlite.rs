//! SQLite store built on diesel.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use super::models::{CallRow, GameRow, MoveRow, NewCallRow, NewMoveRow, RunRow};
use super::{RunStore, StoreError, TraceRecorder, schema};
use crate::records::{Game, GameId, ModelCallRecord, MoveRecord, Run, RunId};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applied to every connection. Writers from concurrent runs wait for the
/// lock instead of failing, and readers never block writers.
const CONNECTION_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;\
                                  PRAGMA journal_mode = WAL;\
                                  PRAGMA synchronous = NORMAL;";

/// Store persisted in a SQLite database file.
///
/// Each operation opens its own connection, so `":memory:"` does not work
/// here: every call would see a fresh empty database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path`, creating it and applying pending
    /// migrations as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path))]
    pub fn open(db_path: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;
        info!(path = %store.db_path, migrations = applied.len(), "SQLite store ready");
        Ok(store)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e))
        })?;
        conn.batch_execute(CONNECTION_PRAGMAS)?;
        Ok(conn)
    }
}

impl TraceRecorder for SqliteStore {
    #[instrument(skip(self, record), fields(run_id = %record.run_id, move_index = record.move_index))]
    fn record_move(&self, record: MoveRecord) -> Result<(), StoreError> {
        let row = NewMoveRow::from_record(&record)?;
        let mut conn = self.connection()?;
        diesel::insert_into(schema::move_records::table)
            .values(&row)
            .execute(&mut conn)?;
        debug!("Move record appended");
        Ok(())
    }

    #[instrument(skip(self, record), fields(run_id = %record.run_id, request_id = %record.request_id))]
    fn record_model_call(&self, record: ModelCallRecord) -> Result<(), StoreError> {
        let row = NewCallRow::from_record(&record)?;
        let mut conn = self.connection()?;
        diesel::insert_into(schema::model_calls::table)
            .values(&row)
            .execute(&mut conn)?;
        debug!("Model call appended");
        Ok(())
    }

    #[instrument(skip(self))]
    fn get_moves(&self, run_id: RunId) -> Result<Vec<MoveRecord>, StoreError> {
        let mut conn = self.connection()?;
        let rows = schema::move_records::table
            .filter(schema::move_records::run_id.eq(run_id.to_string()))
            .order(schema::move_records::id.asc())
            .select(MoveRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(MoveRow::into_record).collect()
    }

    #[instrument(skip(self))]
    fn get_call_logs(&self, run_id: RunId) -> Result<Vec<ModelCallRecord>, StoreError> {
        let mut conn = self.connection()?;
        let rows = schema::model_calls::table
            .filter(schema::model_calls::run_id.eq(run_id.to_string()))
            .order(schema::model_calls::id.asc())
            .select(CallRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(CallRow::into_record).collect()
    }

    #[instrument(skip(self))]
    fn call_latencies(&self) -> Result<Vec<u64>, StoreError> {
        let mut conn = self.connection()?;
        let latencies = schema::model_calls::table
            .select(schema::model_calls::latency_ms)
            .load::<i64>(&mut conn)?;
        Ok(latencies.into_iter().map(|ms| ms as u64).collect())
    }
}

impl RunStore for SqliteStore {
    #[instrument(skip(self))]
    fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StoreError> {
        let mut conn = self.connection()?;
        let row = schema::runs::table
            .find(run_id.to_string())
            .select(RunRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(RunRow::into_run).transpose()
    }

    #[instrument(skip(self, run), fields(run_id = %run.id, status = %run.status))]
    fn set_run(&self, run: &Run) -> Result<(), StoreError> {
        let row = RunRow::from_run(run);
        let mut conn = self.connection()?;
        diesel::insert_into(schema::runs::table)
            .values(&row)
            .on_conflict(schema::runs::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn get_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError> {
        let mut conn = self.connection()?;
        let row = schema::games::table
            .find(game_id.to_string())
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(GameRow::into_game).transpose()
    }

    #[instrument(skip(self, game), fields(game_id = %game.id, status = %game.status))]
    fn set_game(&self, game: &Game) -> Result<(), StoreError> {
        let row = GameRow::from_game(game)?;
        let mut conn = self.connection()?;
        diesel::insert_into(schema::games::table)
            .values(&row)
            .on_conflict(schema::games::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut conn = self.connection()?;
        let rows = schema::runs::table
            .order(schema::runs::created_at.desc())
            .select(RunRow::as_select())
            .load(&mut conn)?;
        info!(count = rows.len(), "Runs loaded");
        rows.into_iter().map(RunRow::into_run).collect()
    }
}
