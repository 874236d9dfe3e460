// Reading compstate files from disk.
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::types::{ArenaId, MatchNumber};

// Read and parse one YAML file, attaching the path to any failure.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| Error::Schema {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_yaml::from_str(&text).map_err(|e| Error::Schema {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// Read a file that is allowed to be absent.
pub fn read_yaml_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_yaml(path).map(Some)
}

// List the scoresheets under one score directory. The layout is
// <dir>/<ArenaId>/<MatchNumber>.yaml; anything else in there is ignored.
pub fn scoresheet_files(dir: &Path) -> Result<Vec<(ArenaId, MatchNumber, PathBuf)>> {
    let mut found = Vec::new();
    if !dir.exists() {
        return Ok(found);
    }

    for arena_entry in list_dir(dir)? {
        if !arena_entry.is_dir() {
            continue;
        }
        let arena: ArenaId = match arena_entry.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        for sheet in list_dir(&arena_entry)? {
            let stem = match sheet.file_stem().and_then(|n| n.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            if sheet.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }

            let num: MatchNumber = stem.parse().map_err(|_| Error::Schema {
                path: sheet.clone(),
                message: "scoresheet file name is not a match number".to_string(),
            })?;
            found.push((arena.clone(), num, sheet));
        }
    }

    // Deterministic order regardless of how the filesystem lists entries.
    found.sort();
    return Ok(found);
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::Schema {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::Schema {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        paths.push(entry.path());
    }
    return Ok(paths);
}
