// Image Insertion Pipeline and installer upload flow
// Files become storage objects under generated keys; the document or
// record is only touched once the upload has succeeded

use std::cell::Cell;

use chrono::Utc;
use regex::Regex;
use thiserror::Error;

use crate::catalog::Software;
use crate::richtext::commands::{EditorCommand, TutorialEditor};
use crate::store::{ObjectStorage, StoreError};

pub const TUTORIAL_IMAGE_BUCKET: &str = "tutorial-images";
pub const INSTALLER_BUCKET: &str = "installers";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("not an image: {0}")]
    NotAnImage(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// A picked, pasted or dropped file
#[derive(Debug, Clone)]
pub struct FileBlob {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileBlob {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Generates collision-resistant storage keys from a millisecond
/// timestamp and the sanitized original filename
///
/// Timestamps are bumped to stay strictly monotonic, so keys generated
/// within the same millisecond never collide.
pub struct StorageKeys {
    last_ms: Cell<i64>,
}

impl StorageKeys {
    pub fn new() -> Self {
        StorageKeys {
            last_ms: Cell::new(0),
        }
    }

    pub fn key_for(&self, filename: &str) -> String {
        let mut now = Utc::now().timestamp_millis();
        if now <= self.last_ms.get() {
            now = self.last_ms.get() + 1;
        }
        self.last_ms.set(now);
        format!("{}-{}", now, sanitize_filename(filename))
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_filename(name: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
    let cleaned = re.replace_all(name, "-");
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Ingest a file into the tutorial document
///
/// Non-image files are rejected before any storage call. The image
/// reference is inserted at the current selection only after the
/// upload succeeded, so a failed upload leaves the document untouched.
/// Returns the public URL of the stored image.
pub fn ingest_image(
    editor: &mut TutorialEditor,
    storage: &dyn ObjectStorage,
    keys: &StorageKeys,
    blob: &FileBlob,
) -> Result<String, UploadError> {
    if !blob.is_image() {
        return Err(UploadError::NotAnImage(blob.mime.clone()));
    }

    let key = keys.key_for(&blob.name);
    storage.upload(TUTORIAL_IMAGE_BUCKET, &key, &blob.bytes)?;
    let url = storage.public_url(TUTORIAL_IMAGE_BUCKET, &key);

    editor.apply(EditorCommand::InsertImage { url: url.clone() });
    Ok(url)
}

/// Replace a software package's installer binary
///
/// Removes the previous object if any, uploads the new blob under a
/// fresh key, then updates the record's installer path, download URL
/// and updated-at timestamp. On failure the record is left unchanged;
/// persisting the updated record is the caller's job.
pub fn replace_installer(
    record: &mut Software,
    storage: &dyn ObjectStorage,
    keys: &StorageKeys,
    blob: &FileBlob,
) -> Result<(), UploadError> {
    if let Some(old_key) = &record.installer_path {
        storage.delete(INSTALLER_BUCKET, old_key)?;
    }

    let key = keys.key_for(&blob.name);
    storage.upload(INSTALLER_BUCKET, &key, &blob.bytes)?;
    let url = storage.public_url(INSTALLER_BUCKET, &key);

    record.installer_path = Some(key);
    record.download_url = Some(url);
    record.updated_at = Utc::now();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SoftwareDraft;
    use crate::store::memory::MemoryStore;

    fn png_blob(name: &str) -> FileBlob {
        FileBlob::new(name, "image/png", b"png bytes".to_vec())
    }

    #[test]
    fn test_non_image_never_uploads_or_mutates() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();
        let mut editor = TutorialEditor::from_markup("some text");

        let blob = FileBlob::new("notes.txt", "text/plain", b"hello".to_vec());
        let result = ingest_image(&mut editor, &store, &keys, &blob);

        assert!(matches!(result, Err(UploadError::NotAnImage(_))));
        assert_eq!(store.object_count(TUTORIAL_IMAGE_BUCKET), 0);
        assert_eq!(editor.serialize(), "some text");
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_ingest_inserts_image_after_upload() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();
        let mut editor = TutorialEditor::from_markup("");

        let url = ingest_image(&mut editor, &store, &keys, &png_blob("shot.png")).unwrap();

        assert!(url.starts_with("memory://tutorial-images/"));
        assert!(url.ends_with("-shot.png"));
        assert_eq!(store.object_count(TUTORIAL_IMAGE_BUCKET), 1);
        assert_eq!(editor.serialize(), format!("![]({})", url));
        assert!(editor.can_undo());
    }

    #[test]
    fn test_failed_upload_leaves_document_untouched() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();
        let mut editor = TutorialEditor::from_markup("keep me");

        store.fail_uploads(true);
        let result = ingest_image(&mut editor, &store, &keys, &png_blob("shot.png"));

        assert!(matches!(result, Err(UploadError::Storage(_))));
        assert_eq!(editor.serialize(), "keep me");
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_each_ingest_is_independent() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();
        let mut editor = TutorialEditor::from_markup("");

        let first = ingest_image(&mut editor, &store, &keys, &png_blob("a.png")).unwrap();
        let second = ingest_image(&mut editor, &store, &keys, &png_blob("a.png")).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.object_count(TUTORIAL_IMAGE_BUCKET), 2);
        assert_eq!(editor.serialize(), format!("![]({})![]({})", first, second));
    }

    #[test]
    fn test_keys_are_monotonic() {
        let keys = StorageKeys::new();
        let a = keys.key_for("pic.png");
        let b = keys.key_for("pic.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_sanitizes_filename() {
        let keys = StorageKeys::new();
        let key = keys.key_for("my photo (1).png");
        assert!(key.ends_with("my-photo-1-.png"), "got {}", key);

        let empty = keys.key_for("???");
        assert!(empty.ends_with("-file"), "got {}", empty);
    }

    #[test]
    fn test_replace_installer_swaps_object_and_updates_record() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();

        let mut record = Software::create(SoftwareDraft {
            name: "MatLab".to_string(),
            ..Default::default()
        });
        store.upload(INSTALLER_BUCKET, "111-old.exe", b"old").unwrap();
        record.installer_path = Some("111-old.exe".to_string());
        let before_update = record.updated_at;

        let blob = FileBlob::new("setup.exe", "application/octet-stream", b"new".to_vec());
        replace_installer(&mut record, &store, &keys, &blob).unwrap();

        assert!(store.object(INSTALLER_BUCKET, "111-old.exe").is_none());
        assert_eq!(store.object_count(INSTALLER_BUCKET), 1);

        let new_key = record.installer_path.clone().unwrap();
        assert!(new_key.ends_with("-setup.exe"));
        assert_eq!(
            record.download_url.as_deref(),
            Some(format!("memory://installers/{}", new_key).as_str())
        );
        assert!(record.updated_at >= before_update);
    }

    #[test]
    fn test_replace_installer_failure_leaves_record_unchanged() {
        let store = MemoryStore::new();
        let keys = StorageKeys::new();

        let mut record = Software::create(SoftwareDraft {
            name: "SPSS".to_string(),
            ..Default::default()
        });
        let before = record.clone();

        store.fail_uploads(true);
        let blob = FileBlob::new("setup.exe", "application/octet-stream", b"new".to_vec());
        assert!(replace_installer(&mut record, &store, &keys, &blob).is_err());
        assert_eq!(record, before);
    }
}
