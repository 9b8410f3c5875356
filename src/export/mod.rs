// Export module - writes the declarations and the human-readable statement

pub mod statement;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub use statement::write_statement;

pub const DIVIDENDS_FILE: &str = "Doh_Div.json";
pub const SECURITIES_FILE: &str = "Doh_KDVP.json";
pub const DERIVATIVES_FILE: &str = "D_IFI.json";

/// Write `bytes` to `dir/name` through a temporary file, so a reader never
/// sees a half-written file
pub fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let path = dir.join(name);
    let tmp_path = dir.join(format!(".{}.tmp", name));
    fs::write(&tmp_path, bytes).with_context(|| format!("Failed to write {:?}", tmp_path))?;
    fs::rename(&tmp_path, &path).with_context(|| format!("Failed to finalize {:?}", path))?;

    info!("Wrote {:?}", path);
    Ok(path)
}

/// Serialize fully in memory, then write atomically
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let mut bytes = serde_json::to_vec_pretty(value).with_context(|| format!("Failed to serialize {}", name))?;
    bytes.push(b'\n');
    write_atomic(dir, name, &bytes)
}
