//! Persist jump-distance tables.
//!
//! Each kept regime becomes one JSON array of `{ "njs", "jumpDistance" }`
//! rows, the format in-game JD mods import directly.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::app::pipeline::SelectedRegime;
use crate::domain::JdPair;
use crate::error::AppError;

/// `<player>_regime<rank>.json`, with the player label reduced to safe
/// file-name characters.
pub fn table_file_name(player: &str, rank: usize) -> String {
    let mut label: String = player
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if label.is_empty() {
        label.push_str("player");
    }
    format!("{label}_regime{rank}.json")
}

/// Write one table as a pretty-printed JSON array.
pub fn write_table_json(path: &Path, table: &[JdPair]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create table JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"   "));
    table
        .serialize(&mut ser)
        .map_err(|e| AppError::new(2, format!("Failed to write table JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write table JSON: {e}")))?;
    Ok(())
}

/// Write every selected regime's table into `dir` (created if needed).
///
/// Returns the written paths in rank order. Existing files with the same
/// name are overwritten, so re-running on the same data is idempotent.
pub fn write_tables(dir: &Path, player: &str, selected: &[SelectedRegime]) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;

    let mut written = Vec::with_capacity(selected.len());
    for sel in selected {
        let path = dir.join(table_file_name(player, sel.rank));
        write_table_json(&path, &sel.table)?;
        info!(path = %path.display(), rank = sel.rank, rows = sel.table.len(), "jump-distance table written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_deterministic_and_safe() {
        assert_eq!(table_file_name("76561198", 1), "76561198_regime1.json");
        assert_eq!(table_file_name("a b/c", 2), "a_b_c_regime2.json");
        assert_eq!(table_file_name("  ", 1), "player_regime1.json");
    }

    #[test]
    fn table_json_is_a_plain_array_with_game_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        let table = vec![
            JdPair {
                njs: 8.0,
                jump_distance: 22.5,
            },
            JdPair {
                njs: 8.5,
                jump_distance: 22.25,
            },
        ];
        write_table_json(&path, &table).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n   {\n      \"njs\": 8.0,"), "{text}");

        let back: Vec<JdPair> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn unwritable_path_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_table_json(&dir.path().join("missing").join("t.json"), &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
