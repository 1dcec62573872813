use anyhow::Result;
use log::info;
use rusqlite::Connection;

/// Versioned schema migrations keyed off `user_version`.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        info!("Applying journal migration 1 (suggestions table)");
        let tx = conn.transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS suggestions (
                 id TEXT PRIMARY KEY,
                 description TEXT NOT NULL,
                 confidence REAL NOT NULL,
                 state TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 action_count INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_suggestions_created_at
                 ON suggestions(created_at);",
        )?;
        tx.pragma_update(None, "user_version", 1)?;
        tx.commit()?;
    }

    Ok(())
}
