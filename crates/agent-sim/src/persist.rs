//! Small filesystem helpers shared by the stores.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::error::StoreError;

/// Ids that end up in file names must be plain path components. `__` is
/// reserved as the separator in relationship pair keys.
pub(crate) fn validate_id(what: &str, id: &str) -> Result<(), StoreError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains("__")
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        Err(StoreError::Validation(format!("invalid {} {:?}", what, id)))
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    Ok(())
}

/// Write pretty JSON, renamed into place so readers never see a partial file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::serialization(path, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

/// Read a JSON record. Missing files are `Ok(None)`; unreadable or corrupt
/// files are errors.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::serialization(path, e))
}

/// Like [`read_json`], but failures are logged and read as absent.
pub(crate) fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    read_json(path).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable record");
        None
    })
}

pub(crate) fn append_text(path: &Path, text: &str) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_must_be_plain_file_names() {
        for id in ["agent_a", "byte-wizard", "a_b"] {
            assert!(validate_id("agent id", id).is_ok(), "{id}");
        }
        for id in ["", ".", "..", "../x", "a/b", "a\\b", "a\nb", "a__b"] {
            assert!(validate_id("agent id", id).unwrap_err().is_validation(), "{id:?}");
        }
    }
}
