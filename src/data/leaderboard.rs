//! Leaderboard metadata and the replay → observation join.
//!
//! A replay only records the song hash, the difficulty name and the player's
//! jump distance; the map's NJS lives on the leaderboard. Leaderboards are read
//! from a local cache directory of JSON documents (one per leaderboard), which
//! is how they are stored after being downloaded.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::replay::ReplaySummary;
use crate::domain::Observation;
use crate::error::AppError;

/// One cached leaderboard document. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    #[serde(default)]
    pub id: String,
    pub song: SongInfo,
    pub difficulty: DifficultyInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongInfo {
    pub hash: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyInfo {
    pub difficulty_name: String,
    #[serde(default)]
    pub mode_name: String,
    pub njs: f64,
}

/// Anything that can resolve `(song hash, difficulty)` to difficulty metadata.
pub trait LeaderboardStore {
    fn lookup(&self, song_hash: &str, difficulty: &str) -> Option<&DifficultyInfo>;
}

/// Key under which a cached leaderboard hash is stored: the lowercase
/// leading token (`"ABC123 WIP"` → `"abc123"`).
pub fn leaderboard_hash_key(hash: &str) -> String {
    hash.trim()
        .to_lowercase()
        .split(' ')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Canonical form of a replay's song hash.
///
/// Replays may also carry a `_` suffix (`"abc123_2"`); only the text before
/// it is compared against the cached leaderboard keys.
pub fn normalize_hash(hash: &str) -> String {
    let key = leaderboard_hash_key(hash);
    match key.find('_') {
        Some(idx) => key[..idx].to_string(),
        None => key,
    }
}

fn normalize_difficulty(name: &str) -> String {
    name.trim().to_lowercase()
}

/// In-memory leaderboard index keyed by normalized hash and difficulty name.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardCache {
    entries: HashMap<(String, String), DifficultyInfo>,
}

impl LeaderboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = LeaderboardRecord>) -> Self {
        let mut cache = Self::new();
        for record in records {
            cache.insert(record);
        }
        cache
    }

    /// Add a record. The first record seen for a key wins.
    pub fn insert(&mut self, record: LeaderboardRecord) {
        let key = (
            leaderboard_hash_key(&record.song.hash),
            normalize_difficulty(&record.difficulty.difficulty_name),
        );
        self.entries.entry(key).or_insert(record.difficulty);
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    ///
    /// Files that fail to parse are logged and skipped; a missing or
    /// unreadable directory is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, AppError> {
        let read = fs::read_dir(dir).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to read leaderboard cache '{}': {e}", dir.display()),
            )
        })?;

        let mut paths = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| {
                AppError::new(
                    2,
                    format!("Failed to list leaderboard cache '{}': {e}", dir.display()),
                )
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut cache = Self::new();
        for path in paths {
            let text = match fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable leaderboard");
                    continue;
                }
            };
            match serde_json::from_str::<LeaderboardRecord>(&text) {
                Ok(record) => cache.insert(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed leaderboard"),
            }
        }

        debug!(dir = %dir.display(), entries = cache.len(), "leaderboard cache loaded");
        Ok(cache)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LeaderboardStore for LeaderboardCache {
    fn lookup(&self, song_hash: &str, difficulty: &str) -> Option<&DifficultyInfo> {
        self.entries
            .get(&(normalize_hash(song_hash), normalize_difficulty(difficulty)))
    }
}

/// What to do with a replay whose leaderboard is not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Fail the whole join.
    #[default]
    Strict,
    /// Log and leave the replay out.
    SkipMissing,
}

/// Result of joining replays with leaderboard metadata.
#[derive(Debug, Clone, Default)]
pub struct JoinedObservations {
    pub observations: Vec<Observation>,
    /// `(hash, difficulty)` of replays left out because no leaderboard matched.
    pub missing: Vec<(String, String)>,
    /// Replays left out because the NJS or JD was not a finite number.
    pub invalid: usize,
}

/// Pair every replay's jump distance with its map's NJS.
pub fn join_observations(
    replays: &[ReplaySummary],
    store: &dyn LeaderboardStore,
    policy: JoinPolicy,
) -> Result<JoinedObservations, AppError> {
    let mut joined = JoinedObservations::default();

    for replay in replays {
        let Some(diff) = store.lookup(&replay.hash, &replay.difficulty) else {
            match policy {
                JoinPolicy::Strict => {
                    return Err(AppError::new(
                        3,
                        format!(
                            "Can't find leaderboard for {} and {}",
                            replay.hash, replay.difficulty
                        ),
                    ));
                }
                JoinPolicy::SkipMissing => {
                    warn!(hash = %replay.hash, difficulty = %replay.difficulty, "no leaderboard for replay");
                    joined
                        .missing
                        .push((replay.hash.clone(), replay.difficulty.clone()));
                    continue;
                }
            }
        };

        let obs = Observation::new(diff.njs, replay.jump_distance);
        if !obs.is_finite() {
            warn!(hash = %replay.hash, difficulty = %replay.difficulty, "non-finite NJS/JD, replay skipped");
            joined.invalid += 1;
            continue;
        }
        joined.observations.push(obs);
    }

    Ok(joined)
}
