// SQLite archive of exported conversation snapshots

use crate::conversation::ExportData;
use crate::error::{DuetError, Result};
use crate::logging;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub id: String,
    pub topic: String,
    pub participant_a: String,
    pub participant_b: String,
    pub turn_count: i64,
    pub version: String,
    pub exported_at: String,
    pub saved_at: String,
}

pub struct TranscriptArchive {
    conn: Mutex<Connection>,
}

impl TranscriptArchive {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS transcripts (
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                participant_a TEXT NOT NULL,
                participant_b TEXT NOT NULL,
                turn_count INTEGER NOT NULL,
                version TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                exported_at TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcripts_saved ON transcripts(saved_at);
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DuetError::InvalidConfig("archive connection poisoned".to_string()))?;
        f(&conn)
    }

    /// Insert or replace the snapshot stored under `id`.
    pub fn save(&self, id: &str, data: &ExportData) -> Result<TranscriptSummary> {
        let snapshot = serde_json::to_string(data)?;
        let summary = TranscriptSummary {
            id: id.to_string(),
            topic: data.scenario.topic.clone(),
            participant_a: data.participant_a.name.clone(),
            participant_b: data.participant_b.name.clone(),
            turn_count: data.turns.len() as i64,
            version: data.version.clone(),
            exported_at: data.exported_at.clone(),
            saved_at: Utc::now().to_rfc3339(),
        };

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO transcripts
                 (id, topic, participant_a, participant_b, turn_count, version, snapshot, exported_at, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    summary.id,
                    summary.topic,
                    summary.participant_a,
                    summary.participant_b,
                    summary.turn_count,
                    summary.version,
                    snapshot,
                    summary.exported_at,
                    summary.saved_at
                ],
            )?;
            Ok(())
        })?;

        logging::log_session(Some(id), &format!("Archived transcript with {} turns", summary.turn_count));
        Ok(summary)
    }

    pub fn load(&self, id: &str) -> Result<Option<ExportData>> {
        let snapshot: Option<String> = self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT snapshot FROM transcripts WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match snapshot {
            Some(json) => Ok(Some(ExportData::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Most recently saved first.
    pub fn list(&self, limit: usize) -> Result<Vec<TranscriptSummary>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, topic, participant_a, participant_b, turn_count, version, exported_at, saved_at
                 FROM transcripts
                 ORDER BY saved_at DESC, rowid DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(TranscriptSummary {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                    participant_a: row.get(2)?,
                    participant_b: row.get(3)?,
                    turn_count: row.get(4)?,
                    version: row.get(5)?,
                    exported_at: row.get(6)?,
                    saved_at: row.get(7)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM transcripts WHERE id = ?1", params![id])?)
        })?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationState, ConversationTurn, ParticipantId};
    use crate::ocean::OceanProfile;
    use crate::signals::Sentiment;

    fn snapshot(turns: usize) -> ExportData {
        let mut state = ConversationState::default();
        for _ in 0..turns {
            let turn = ConversationTurn::new(
                state.next_turn_number(),
                state.current_speaker,
                "Let's go over the options.".to_string(),
                Vec::new(),
                Vec::new(),
                Sentiment::Positive,
                OceanProfile::uniform(55.5),
            );
            state.commit_turn(turn).unwrap();
        }
        state.export()
    }

    #[test]
    fn test_save_load_round_trip() {
        let archive = TranscriptArchive::open_in_memory().unwrap();
        let data = snapshot(3);
        let summary = archive.save("conv-1", &data).unwrap();
        assert_eq!(summary.turn_count, 3);
        assert_eq!(summary.participant_b, "Michael Torres");

        let loaded = archive.load("conv-1").unwrap().unwrap();
        assert_eq!(loaded, data);
        assert_eq!(loaded.turns[1].speaker, ParticipantId::B);
        assert!(archive.load("nope").unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_and_lists() {
        let archive = TranscriptArchive::open_in_memory().unwrap();
        archive.save("a", &snapshot(1)).unwrap();
        archive.save("b", &snapshot(2)).unwrap();
        archive.save("a", &snapshot(4)).unwrap();

        let list = archive.list(10).unwrap();
        assert_eq!(list.len(), 2);
        let a = list.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.turn_count, 4);
        assert_eq!(archive.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_save_accepts_multibyte_id() {
        let archive = TranscriptArchive::open_in_memory().unwrap();
        archive.save("aéééé", &snapshot(1)).unwrap();
        assert_eq!(archive.load("aéééé").unwrap().unwrap().turns.len(), 1);
    }

    #[test]
    fn test_delete() {
        let archive = TranscriptArchive::open_in_memory().unwrap();
        archive.save("a", &snapshot(0)).unwrap();
        assert!(archive.delete("a").unwrap());
        assert!(!archive.delete("a").unwrap());
        assert!(archive.list(10).unwrap().is_empty());
    }
}
