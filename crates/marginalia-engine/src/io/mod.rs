use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use relative_path::{RelativePath, RelativePathBuf};
use sha2::{Digest, Sha256};

use crate::error::EngineError;
use crate::models::{FileChunk, FullFile, guess_language};

/// Files above this size only report `truncated` on chunks that stop before
/// the last line.
pub const SOFT_SIZE_BYTES: u64 = 2 * 1024 * 1024;
/// Files above this size report every chunk as `truncated`.
pub const HARD_SIZE_BYTES: u64 = 5 * 1024 * 1024;
/// Default cap for whole-file reads.
pub const FULL_READ_LIMIT_BYTES: u64 = 5 * 1024 * 1024;
/// Leading bytes sniffed for NUL or invalid UTF-8.
pub const SNIFF_BYTES: usize = 64 * 1024;

/// Size thresholds applied by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub soft_bytes: u64,
    pub hard_bytes: u64,
    pub full_read_bytes: u64,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            soft_bytes: SOFT_SIZE_BYTES,
            hard_bytes: HARD_SIZE_BYTES,
            full_read_bytes: FULL_READ_LIMIT_BYTES,
        }
    }
}

/// Resolve `relative_path` under `root`, refusing anything that escapes it
/// (`..` segments, symlinks pointing outside).
pub fn resolve(relative_path: &RelativePath, root: &Path) -> Result<PathBuf, EngineError> {
    let root = root.canonicalize()?;
    let absolute_path = relative_path.to_path(&root);
    if !absolute_path.exists() {
        return Err(EngineError::NotFound(relative_path.to_string()));
    }
    let canonical = absolute_path.canonicalize()?;
    if !canonical.starts_with(&root) {
        return Err(EngineError::InvalidPath(relative_path.to_string()));
    }
    if !canonical.is_file() {
        return Err(EngineError::NotFound(relative_path.to_string()));
    }
    Ok(canonical)
}

/// Read up to `max_lines` lines starting at 1-based `start_line`.
///
/// Lines are joined with `\n`; a trailing line break in the file does not add
/// an empty last line. A `start_line` below 1 reads from the first line.
pub fn read_chunk(
    relative_path: &RelativePath,
    root: &Path,
    start_line: usize,
    max_lines: usize,
    limits: &ReadLimits,
) -> Result<FileChunk, EngineError> {
    let absolute_path = resolve(relative_path, root)?;
    if is_non_text(&absolute_path, SNIFF_BYTES)? {
        return Err(EngineError::NonText(relative_path.to_string()));
    }
    let size = fs::metadata(&absolute_path)?.len();

    let start_line = start_line.max(1);
    let end_target = start_line.saturating_add(max_lines).saturating_sub(1);
    let reader = BufReader::new(fs::File::open(&absolute_path)?);
    let mut total_lines = 0usize;
    let mut lines: Vec<String> = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => EngineError::NonText(relative_path.to_string()),
            _ => EngineError::Io(e),
        })?;
        let line_no = i + 1;
        if (start_line..=end_target).contains(&line_no) {
            lines.push(line);
        }
        total_lines = line_no;
    }

    // A start past the end yields an empty chunk positioned just before it.
    let end_line = end_target.min(total_lines).max(start_line - 1);
    let truncated =
        size > limits.hard_bytes || (size > limits.soft_bytes && end_line < total_lines);

    log::debug!(
        "Read {relative_path} lines {start_line}..={end_line} of {total_lines} ({size} bytes)"
    );

    Ok(FileChunk {
        path: relative_path.to_relative_path_buf(),
        language: guess_language(relative_path).to_string(),
        size,
        total_lines,
        start_line,
        end_line,
        content: lines.join("\n"),
        truncated,
    })
}

/// Read a whole file, bounded by `limits.full_read_bytes`.
pub fn read_full(
    relative_path: &RelativePath,
    root: &Path,
    limits: &ReadLimits,
) -> Result<FullFile, EngineError> {
    let absolute_path = resolve(relative_path, root)?;
    let size = fs::metadata(&absolute_path)?.len();
    if size > limits.full_read_bytes {
        return Err(EngineError::OverLimit {
            path: relative_path.to_string(),
            size,
            limit: limits.full_read_bytes,
        });
    }
    let bytes = fs::read(&absolute_path)?;
    if bytes.contains(&0) {
        return Err(EngineError::NonText(relative_path.to_string()));
    }
    let content =
        String::from_utf8(bytes).map_err(|_| EngineError::NonText(relative_path.to_string()))?;
    Ok(FullFile {
        path: relative_path.to_relative_path_buf(),
        language: guess_language(relative_path).to_string(),
        size,
        digest: digest_hex(&content),
        content,
    })
}

/// Hex SHA-256 of `content`.
pub fn digest_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// List every regular file under `root` as root-relative paths, sorted.
/// Hidden entries and `node_modules` are skipped.
pub fn scan_documents(root: &Path) -> Result<Vec<RelativePathBuf>, EngineError> {
    if !root.is_dir() {
        return Err(EngineError::InvalidPath(root.display().to_string()));
    }
    let mut files = Vec::new();
    scan_directory_recursive(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(
    root: &Path,
    dir: &Path,
    files: &mut Vec<RelativePathBuf>,
) -> Result<(), EngineError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            scan_directory_recursive(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root)
            && let Ok(relative) = RelativePathBuf::from_path(relative)
        {
            files.push(relative);
        }
    }
    Ok(())
}

fn is_non_text(path: &Path, sample: usize) -> Result<bool, EngineError> {
    let mut buf = Vec::with_capacity(sample);
    fs::File::open(path)?
        .take(sample as u64)
        .read_to_end(&mut buf)?;
    if buf.contains(&0) {
        return Ok(true);
    }
    match std::str::from_utf8(&buf) {
        Ok(_) => Ok(false),
        // A multi-byte character cut by the sample boundary is still text.
        Err(e) => Ok(e.error_len().is_some()),
    }
}
