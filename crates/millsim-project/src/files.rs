//! NC input files and path encoding.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::Result;

/// An NC program referenced by a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl NcFile {
    /// Track `path`, which should be absolute, remembering its current
    /// modification time.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = modification_time(&path);
        Self { path, modified }
    }

    /// Absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to `dir`.
    pub fn relative_to(&self, dir: &Path) -> PathBuf {
        relative_path(&self.path, dir)
    }

    /// True if the modification time differs from the last check.
    ///
    /// A file that appears or disappears also counts as changed.
    pub fn changed(&mut self) -> bool {
        let current = modification_time(&self.path);
        if current != self.modified {
            self.modified = current;
            return true;
        }
        false
    }
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Express absolute `path` relative to absolute directory `base`.
///
/// Paths on a different root come back unchanged.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_path_buf();
    }

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part);
    }
    out
}

/// Escape a file name for the space separated `nc-files` list.
pub fn encode_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\t' => out.push_str("%07"),
            '\n' => out.push_str("%0A"),
            '\x0B' => out.push_str("%0B"),
            '\r' => out.push_str("%0D"),
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`encode_filename`].
///
/// Any `%XX` hex pair is decoded, with `%07` standing for tab. A `%` not
/// followed by two hex digits is kept as is.
pub fn decode_filename(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Some(byte) = hex_pair(bytes[i + 1], bytes[i + 2]) {
                out.push(if byte == 0x07 { b'\t' } else { byte });
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let digit = |b: u8| (b as char).to_digit(16);
    Some((digit(hi)? * 16 + digit(lo)?) as u8)
}
