//! Replay summaries.
//!
//! Decoding binary replay files is out of scope; replays arrive as a JSON
//! array of the three fields the pipeline needs:
//!
//! ```json
//! [{ "hash": "abc123", "difficulty": "ExpertPlus", "jumpDistance": 18.2 }]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    /// Song hash as recorded in the replay (may carry decorations).
    pub hash: String,
    /// Difficulty name as recorded in the replay.
    pub difficulty: String,
    pub jump_distance: f64,
}

pub fn read_replay_summaries(path: &Path) -> Result<Vec<ReplaySummary>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::new(2, format!("Failed to read replays '{}': {e}", path.display()))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid replays JSON '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_camel_case_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replays.json");
        fs::write(
            &path,
            r#"[{"hash":"ABC","difficulty":"Expert","jumpDistance":18.25,"player":"x"}]"#,
        )
        .unwrap();

        let replays = read_replay_summaries(&path).unwrap();
        assert_eq!(
            replays,
            vec![ReplaySummary {
                hash: "ABC".to_string(),
                difficulty: "Expert".to_string(),
                jump_distance: 18.25,
            }]
        );
    }

    #[test]
    fn malformed_file_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replays.json");
        fs::write(&path, r#"{"hash":"ABC"}"#).unwrap();
        assert_eq!(read_replay_summaries(&path).unwrap_err().exit_code(), 2);
    }
}
