use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::models::Snapshot;
use crate::storage::SnapshotStore;

/// Snapshot store backed by a single UTF-8 JSON file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Snapshot>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Pretty JSON with four-space indentation and unescaped non-ASCII text.
fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    snapshot.serialize(&mut ser)?;
    Ok(buf)
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self) -> Snapshot {
        match self.read().await {
            Ok(Some(snapshot)) => {
                debug!("Loaded {} listings from {:?}", snapshot.len(), self.path);
                snapshot
            }
            Ok(None) => {
                info!("Old data file {:?} not found. Starting fresh.", self.path);
                Snapshot::new()
            }
            Err(e) => {
                error!(error = %e, "Error loading old data from {:?}", self.path);
                Snapshot::new()
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = encode(snapshot)?;
        self.write_bytes(&bytes).await?;
        debug!("💾 Saved {} listings to {:?}", snapshot.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{widget, Listing};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(tmp.path().join("old_data.json"));

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("old_data.json");
        tokio::fs::write(&path, b"[{\"data\": ").await.unwrap();

        let store = JsonSnapshotStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_documents() {
        let tmp = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(tmp.path().join("state").join("old_data.json"));

        let snapshot = vec![
            widget("a", "آپارتمان", Some("300")),
            Listing::new(json!({ "widget_type": "BANNER", "data": { "extra": [1, 2, 3] } })),
        ];
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await, snapshot);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_is_readable_utf8() {
        let tmp = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(tmp.path().join("old_data.json"));
        store.save(&vec![widget("a", "آپارتمان", None)]).await.unwrap();

        let text = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(text.contains("آپارتمان"));
        assert!(text.starts_with("[\n    {"));
    }

    #[tokio::test]
    async fn test_field_order_survives_save() {
        let tmp = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(tmp.path().join("old_data.json"));
        let received = r#"[{"widget_type":"POST_ROW","data":{"title":"t","action":{"payload":{"token":"a"}},"image_url":"x"}}]"#;
        let snapshot: Snapshot = serde_json::from_str(received).unwrap();
        store.save(&snapshot).await.unwrap();

        let text = tokio::fs::read_to_string(store.path()).await.unwrap();
        let pos = |key: &str| text.find(&format!("\"{key}\"")).unwrap();
        assert!(pos("widget_type") < pos("data"));
        assert!(pos("title") < pos("action"));
        assert!(pos("action") < pos("image_url"));

        let compact: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(compact.to_string(), received);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        // A directory in place of the target file makes the rename fail
        let path = tmp.path().join("old_data.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let store = JsonSnapshotStore::new(&path);
        assert!(store.save(&vec![widget("a", "t", None)]).await.is_err());
    }
}
