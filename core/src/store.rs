//! SQLite snapshot store.
//!
//! RULE: Only store.rs talks to the database.
//! The engine hands it finished snapshots through `SnapshotSink`; it never
//! executes SQL directly.

use rusqlite::{params, Connection, OptionalExtension};
use crate::{
    error::FlowResult,
    snapshot::{Snapshot, SnapshotSink},
    types::{Iteration, RunId},
};

pub struct SnapshotStore {
    conn:   Connection,
    run_id: RunId,
}

impl SnapshotStore {
    /// Open (or create) the snapshot database at `path`.
    pub fn open(path: &str, run_id: RunId) -> FlowResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, run_id })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(run_id: RunId) -> FlowResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, run_id })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FlowResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_snapshots.sql"))?;
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, version: &str, params_json: &str) -> FlowResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, params_json) VALUES (?1, ?2, ?3)",
            params![self.run_id, version, params_json],
        )?;
        Ok(())
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(
        &self,
        iteration: Iteration,
        model_time: f64,
        state_json: &str,
    ) -> FlowResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (run_id, iteration, model_time, state_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![self.run_id, iteration as i64, model_time, state_json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot_before(
        &self,
        iteration: Iteration,
    ) -> FlowResult<Option<(Iteration, String)>> {
        let result = self.conn.query_row(
            "SELECT iteration, state_json FROM snapshot
             WHERE run_id = ?1 AND iteration <= ?2
             ORDER BY iteration DESC LIMIT 1",
            params![self.run_id, iteration as i64],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
        ).optional()?;
        Ok(result)
    }

    /// All snapshots of this run, in iteration order.
    pub fn snapshots_for_run(&self) -> FlowResult<Vec<(Iteration, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT iteration, state_json FROM snapshot
             WHERE run_id = ?1 ORDER BY iteration ASC"
        )?;
        let rows = stmt.query_map(params![self.run_id], |row| {
            Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?))
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn snapshot_count(&self) -> FlowResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshot WHERE run_id = ?1",
            params![self.run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl SnapshotSink for SnapshotStore {
    fn emit(&mut self, snapshot: &Snapshot) -> FlowResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.save_snapshot(snapshot.iteration, snapshot.model_time, &json)?;
        log::debug!("Snapshot stored at iteration {}", snapshot.iteration);
        Ok(())
    }
}
