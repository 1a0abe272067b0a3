use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::discovery::{PackMetadata, PACK_METADATA_FILE};

/// Creates `<game_data_dir>/<internal_name>/pack.json`. Returns false when
/// the name is unusable, the folder already exists, or any write fails.
pub fn create_pack(game_data_dir: &Path, internal_name: &str, metadata: &PackMetadata) -> bool {
    if !is_valid_pack_name(internal_name) {
        error!(pack = internal_name, "pack_name_invalid");
        return false;
    }
    let pack_dir = game_data_dir.join(internal_name);
    if pack_dir.exists() {
        error!(pack = internal_name, path = %pack_dir.display(), "pack_already_exists");
        return false;
    }

    let mut metadata = metadata.clone();
    if metadata.name.trim().is_empty() {
        metadata.name = internal_name.to_string();
    }
    let text = match serde_json::to_string_pretty(&metadata) {
        Ok(text) => text,
        Err(source) => {
            error!(pack = internal_name, error = %source, "pack_metadata_encode_failed");
            return false;
        }
    };

    let result = fs::create_dir_all(&pack_dir)
        .and_then(|_| write_text_atomic(&pack_dir.join(PACK_METADATA_FILE), &text));
    match result {
        Ok(()) => {
            info!(pack = internal_name, path = %pack_dir.display(), "pack_created");
            true
        }
        Err(source) => {
            error!(pack = internal_name, error = %source, "pack_create_failed");
            false
        }
    }
}

fn is_valid_pack_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Writes through a sibling temp file so readers never see a partial file.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text.as_bytes())?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("pack.json");
    path.with_file_name(format!("{file_name}.tmp"))
}
