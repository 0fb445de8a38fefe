//! Filesystem access for the file tools
//!
//! Thin synchronous wrappers over `std::fs` that translate I/O failures into
//! [`FileError`]. Writes are not atomic: a failed write may leave a truncated
//! file behind.

use std::fs;
use std::path::Path;

use crate::error::FileError;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
    Other,
}

/// A single directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    /// Render the entry the way `list_files` shows it
    pub fn display_line(&self) -> String {
        match self.kind {
            EntryKind::Directory => format!("📁 {}/", self.name),
            EntryKind::File => format!("📄 {}", self.name),
            EntryKind::Other => format!("   {}", self.name),
        }
    }
}

/// List the entries of a directory, directories first, each group by name
pub fn list_dir(path: impl AsRef<Path>) -> Result<Vec<DirEntry>, FileError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let metadata = fs::metadata(path).map_err(|e| FileError::from_io(&display, e))?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory { path: display });
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| FileError::from_io(&display, e))? {
        let entry = entry.map_err(|e| FileError::from_io(&display, e))?;

        // Follow symlinks so a link to a directory lists as a directory
        let kind = match fs::metadata(entry.path()) {
            Ok(m) if m.is_dir() => EntryKind::Directory,
            Ok(m) if m.is_file() => EntryKind::File,
            _ => EntryKind::Other,
        };

        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }

    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Read a whole file as UTF-8 text
pub fn read_text(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let bytes = fs::read(path).map_err(|e| FileError::from_io(&display, e))?;
    String::from_utf8(bytes).map_err(|e| FileError::Decode {
        path: display,
        message: e.to_string(),
    })
}

/// Create or overwrite a file, creating missing parent directories.
///
/// Returns the number of bytes written.
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<usize, FileError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| FileError::from_io(parent.display().to_string(), e))?;
        }
    }

    fs::write(path, content).map_err(|e| FileError::from_io(&display, e))?;
    Ok(content.len())
}
