//! Persist high scores to disk (XDG config or ~/.config/matchtui), JSON,
//! top 10 per time-limit mode.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::error;

const FILENAME: &str = "highscores.json";
const MAX_ENTRIES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub score: u32,
    pub player: String,
    pub date: String,
}

/// High-score tables keyed by time-limit mode ("30", "60", "180", ...).
/// Load/save failures degrade to defaults; the game never crashes over a
/// bad scores file.
#[derive(Debug)]
pub struct HighScoreStore {
    path: PathBuf,
    tables: BTreeMap<String, Vec<ScoreEntry>>,
}

/// Returns the path to the scores file (config dir / matchtui / highscores.json).
fn config_path() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    base.join("matchtui").join(FILENAME)
}

impl HighScoreStore {
    /// Store at the default XDG location.
    pub fn open_default() -> Self {
        Self::open(config_path())
    }

    /// Store at an explicit path. Missing or corrupt files give an empty
    /// table with an error log.
    pub fn open(path: PathBuf) -> Self {
        let tables = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(t) => t,
                Err(e) => {
                    error!(path = %path.display(), %e, "corrupt high score file, starting fresh");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, tables }
    }

    fn mode_key(limit: u32) -> String {
        limit.to_string()
    }

    /// Best score for a time-limit mode, 0 when none recorded.
    pub fn best_score(&self, limit: u32) -> u32 {
        self.tables
            .get(&Self::mode_key(limit))
            .and_then(|v| v.iter().map(|e| e.score).max())
            .unwrap_or(0)
    }

    /// Top `n` entries for a mode, best first.
    pub fn top_n(&self, limit: u32, n: usize) -> Vec<ScoreEntry> {
        self.tables
            .get(&Self::mode_key(limit))
            .map(|v| v.iter().take(n).cloned().collect())
            .unwrap_or_default()
    }

    /// Record a finished game. Returns whether it is a new record for the
    /// mode. Save failures are logged and the result stands in memory.
    pub fn submit(&mut self, limit: u32, score: u32, player: &str) -> bool {
        let is_record = score > self.best_score(limit);
        let table = self.tables.entry(Self::mode_key(limit)).or_default();
        table.push(ScoreEntry {
            score,
            player: player.to_string(),
            date: Local::now().to_rfc3339(),
        });
        table.sort_by(|a, b| b.score.cmp(&a.score));
        table.truncate(MAX_ENTRIES);

        if let Err(e) = self.save() {
            error!(path = %self.path.display(), %e, "failed to save high scores");
        }
        is_record
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.tables)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> HighScoreStore {
        let path = std::env::temp_dir().join(format!(
            "matchtui-test-{tag}-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        HighScoreStore::open(path)
    }

    #[test]
    fn test_empty_store_defaults() {
        let store = temp_store("empty");
        assert_eq!(store.best_score(180), 0);
        assert!(store.top_n(180, 10).is_empty());
    }

    #[test]
    fn test_submit_and_best() {
        let mut store = temp_store("submit");
        assert!(store.submit(60, 500, "Player"));
        assert!(!store.submit(60, 300, "Player"));
        assert!(store.submit(60, 900, "Player"));
        assert_eq!(store.best_score(60), 900);
        // Modes are independent.
        assert_eq!(store.best_score(180), 0);
        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_table_keeps_top_ten_sorted() {
        let mut store = temp_store("topten");
        for score in 0..15 {
            store.submit(30, score * 100, "Player");
        }
        let top = store.top_n(30, 20);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].score, 1400);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let mut store = temp_store("roundtrip");
        store.submit(180, 1200, "Ada");
        let path = store.path.clone();
        let reloaded = HighScoreStore::open(path.clone());
        assert_eq!(reloaded.best_score(180), 1200);
        assert_eq!(reloaded.top_n(180, 1)[0].player, "Ada");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = std::env::temp_dir().join(format!(
            "matchtui-test-corrupt-{}.json",
            std::process::id()
        ));
        fs::write(&path, "not json {{{").unwrap();
        let store = HighScoreStore::open(path.clone());
        assert_eq!(store.best_score(180), 0);
        let _ = fs::remove_file(&path);
    }
}
