//! Local copy of the container's main file.
//!
//! Inbound `file` frames are written to disk; edits made to that copy are
//! read back and sent as `write_file`. The last synced text is remembered so
//! our own writes are never echoed to the backend. An edit the backend has
//! not accepted yet stays on disk until it is sent.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::FileMessage;

#[derive(Debug)]
pub struct FileMirror {
    path: PathBuf,
    last_synced: Option<String>,
    /// A local edit whose save was refused.
    unsaved: bool,
}

impl FileMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_synced: None,
            unsaved: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write backend contents to the mirror. Returns `false` when the file
    /// already held exactly this text or holds an edit not yet saved.
    pub fn apply_inbound(&mut self, file: &FileMessage) -> Result<bool> {
        self.last_synced = Some(file.content.clone());
        if self.unsaved && self.path.exists() {
            info!(path = %self.path.display(), "keeping unsaved local edit");
            return Ok(false);
        }
        if fs::read_to_string(&self.path).ok().as_deref() == Some(file.content.as_str()) {
            debug!(path = %self.path.display(), "mirror already up to date");
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, &file.content)?;
        info!(
            path = %self.path.display(),
            remote = %file.file_path,
            bytes = file.content.len(),
            "mirrored file"
        );
        Ok(true)
    }

    /// Read the mirror after a change notification. Returns the contents to
    /// send when they differ from what was last synced.
    pub fn pending_change(&mut self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "mirror removed");
                self.unsaved = false;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if self.last_synced.as_deref() == Some(content.as_str()) {
            self.unsaved = false;
            return Ok(None);
        }
        Ok(Some(content))
    }

    /// The backend accepted `content`.
    pub fn mark_synced(&mut self, content: String) {
        self.last_synced = Some(content);
        self.unsaved = false;
    }

    /// The save was refused; keep the edit until it can be sent.
    pub fn mark_unsaved(&mut self) {
        self.unsaved = true;
    }

    pub fn has_unsaved(&self) -> bool {
        self.unsaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> FileMessage {
        FileMessage {
            file_path: String::new(),
            content: content.to_string(),
        }
    }

    #[test]
    fn inbound_content_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("main.py");
        let mut mirror = FileMirror::new(&path);

        assert!(mirror.apply_inbound(&file("print(1)\n")).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "print(1)\n");
        assert!(!mirror.apply_inbound(&file("print(1)\n")).unwrap());
    }

    #[test]
    fn own_writes_are_not_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        let mut mirror = FileMirror::new(&path);

        mirror.apply_inbound(&file("a = 1")).unwrap();
        assert_eq!(mirror.pending_change().unwrap(), None);
    }

    #[test]
    fn local_edits_are_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        let mut mirror = FileMirror::new(&path);
        mirror.apply_inbound(&file("a = 1")).unwrap();

        fs::write(&path, "a = 2").unwrap();
        let change = mirror.pending_change().unwrap();
        assert_eq!(change.as_deref(), Some("a = 2"));
        mirror.mark_synced("a = 2".into());
        assert_eq!(mirror.pending_change().unwrap(), None);
    }

    #[test]
    fn refused_edit_stays_pending_and_survives_inbound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        fs::write(&path, "print(2)").unwrap();
        let mut mirror = FileMirror::new(&path);

        assert_eq!(mirror.pending_change().unwrap().as_deref(), Some("print(2)"));
        mirror.mark_unsaved();
        assert!(mirror.has_unsaved());

        assert!(!mirror.apply_inbound(&file("print(1)")).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "print(2)");
        assert_eq!(mirror.pending_change().unwrap().as_deref(), Some("print(2)"));
    }

    #[test]
    fn reverted_edit_clears_unsaved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        let mut mirror = FileMirror::new(&path);
        mirror.apply_inbound(&file("a = 1")).unwrap();

        fs::write(&path, "a = 2").unwrap();
        mirror.pending_change().unwrap();
        mirror.mark_unsaved();
        fs::write(&path, "a = 1").unwrap();
        assert_eq!(mirror.pending_change().unwrap(), None);
        assert!(!mirror.has_unsaved());

        assert!(mirror.apply_inbound(&file("a = 3")).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = 3");
    }

    #[test]
    fn missing_file_is_not_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = FileMirror::new(dir.path().join("gone.py"));
        assert_eq!(mirror.pending_change().unwrap(), None);
    }
}
