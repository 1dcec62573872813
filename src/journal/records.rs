use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use crate::engine::Suggestion;

use super::Journal;

/// Flat audit row for one suggestion. Written once, when the suggestion
/// reaches a terminal state; never read back by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: String,
    pub description: String,
    pub confidence: f64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub action_count: usize,
}

impl From<&Suggestion> for SuggestionRecord {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            id: suggestion.id.clone(),
            description: suggestion.description.clone(),
            confidence: suggestion.confidence,
            state: suggestion.state.as_str().to_string(),
            created_at: suggestion.created_at,
            action_count: suggestion.plan.len(),
        }
    }
}

fn row_to_record(row: &Row) -> Result<SuggestionRecord> {
    let created_at: String = row.get("created_at")?;
    Ok(SuggestionRecord {
        id: row.get("id")?,
        description: row.get("description")?,
        confidence: row.get("confidence")?,
        state: row.get("state")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|err| anyhow!("invalid created_at '{created_at}': {err}"))?
            .with_timezone(&Utc),
        action_count: row.get::<_, i64>("action_count")? as usize,
    })
}

impl Journal {
    pub async fn append_suggestion(&self, record: SuggestionRecord) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO suggestions
                     (id, description, confidence, state, created_at, action_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.description,
                    record.confidence,
                    record.state,
                    record.created_at.to_rfc3339(),
                    record.action_count as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn recent_suggestions(&self, limit: usize) -> Result<Vec<SuggestionRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, description, confidence, state, created_at, action_count
                 FROM suggestions
                 ORDER BY created_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit as i64])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Region};
    use crate::engine::SuggestionState;

    fn sample(description: &str) -> SuggestionRecord {
        let mut suggestion = Suggestion::new(
            description.into(),
            0.91,
            vec![Action::Click {
                target: "Save".into(),
                region: Some(Region::around_point(450, 320)),
            }],
        );
        suggestion.state = SuggestionState::Executed;
        SuggestionRecord::from(&suggestion)
    }

    #[tokio::test]
    async fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.sqlite3")).unwrap();

        journal.append_suggestion(sample("first")).await.unwrap();
        journal.append_suggestion(sample("second")).await.unwrap();

        let records = journal.recent_suggestions(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.state == "Executed"));
        assert!(records.iter().all(|r| r.action_count == 1));
    }

    #[tokio::test]
    async fn limit_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.sqlite3")).unwrap();
        for i in 0..5 {
            journal
                .append_suggestion(sample(&format!("s{i}")))
                .await
                .unwrap();
        }
        let records = journal.recent_suggestions(3).await.unwrap();
        assert_eq!(records.len(), 3);
    }
}
