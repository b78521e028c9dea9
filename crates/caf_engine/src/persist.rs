use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes downloaded results into one directory, replacing files atomically
/// (temp file in the same directory, then rename).
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `filename` is sanitized first, so service-provided names cannot escape `dir`.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(sanitize_filename(filename));
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

const MAX_FILENAME_CHARS: usize = 120;
const MAX_EXTENSION_CHARS: usize = 16;

/// Reduces a service-provided name to a single safe path component.
pub fn sanitize_filename(input: &str) -> String {
    // Keep only the last component of anything that looks like a path.
    let last = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let mut cleaned: String = last
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        return "result.bin".to_string();
    }
    if cleaned.chars().count() > MAX_FILENAME_CHARS {
        cleaned = truncate_keeping_extension(&cleaned);
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.insert(0, '_');
    }
    cleaned
}

fn truncate_keeping_extension(name: &str) -> String {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().count() <= MAX_EXTENSION_CHARS);
    match extension {
        Some(ext) => {
            let stem_chars = MAX_FILENAME_CHARS - ext.chars().count() - 1;
            let stem: String = name.chars().take(stem_chars).collect();
            format!("{stem}.{ext}")
        }
        None => name.chars().take(MAX_FILENAME_CHARS).collect(),
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}
