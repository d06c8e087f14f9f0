use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::identity::domain::embedding_store::{EmbeddingStore, StoreError};
use crate::identity::domain::identity_record::IdentityRecord;
use crate::shared::model_resolver::partial_path;

/// Embedding store backed by a single JSON array document.
///
/// Every append rewrites the whole file: the new document is written to a
/// sibling file with `.part` appended to its name, synced, then renamed over the original.
pub struct JsonEmbeddingStore {
    path: PathBuf,
}

impl JsonEmbeddingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn persist(&self, records: &[IdentityRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(records)
            .map_err(|e| self.write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        let temp_path = partial_path(&self.path);
        let result = write_synced(&temp_path, &json)
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(self.write_err(e));
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl EmbeddingStore for JsonEmbeddingStore {
    fn load(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records: Vec<IdentityRecord> =
            serde_json::from_str(&json).map_err(|e| self.corrupt(e.to_string()))?;

        let mut dimensions = None;
        for (i, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|e| self.corrupt(format!("record {i}: {e}")))?;
            let expected = *dimensions.get_or_insert(record.dimensions());
            if record.dimensions() != expected {
                return Err(self.corrupt(format!(
                    "record {i} has {} dimensions, expected {expected}",
                    record.dimensions()
                )));
            }
        }

        log::debug!(
            "Loaded {} identities from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    fn append(&mut self, record: IdentityRecord) -> Result<(), StoreError> {
        let mut records = self.load()?;
        if let Some(existing) = records.first() {
            if existing.dimensions() != record.dimensions() {
                return Err(StoreError::DimensionMismatch {
                    expected: existing.dimensions(),
                    actual: record.dimensions(),
                });
            }
        }
        records.push(record);
        self.persist(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, embedding: Vec<f32>) -> IdentityRecord {
        IdentityRecord::new(name, embedding).unwrap()
    }

    fn store_in(dir: &tempfile::TempDir) -> JsonEmbeddingStore {
        JsonEmbeddingStore::new(dir.path().join("faces_db.json"))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().unwrap().is_empty());
    }

    #[test]
    fn test_append_then_load_preserves_order_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let records = vec![
            record("alice", vec![0.1, -0.25, 3.5e-4]),
            record("bob", vec![1.0 / 3.0, 0.7, -0.123_456_79]),
            record("carol", vec![-7.5e-6, 12345.678, 0.999_999_9]),
        ];
        for r in &records {
            store.append(r.clone()).unwrap();
        }

        let loaded = store_in(&dir).load().unwrap();

        assert_eq!(loaded.len(), records.len());
        for (got, want) in loaded.iter().zip(&records) {
            assert_eq!(got.name(), want.name());
            let got_bits: Vec<u32> = got.embedding().iter().map(|v| v.to_bits()).collect();
            let want_bits: Vec<u32> = want.embedding().iter().map(|v| v.to_bits()).collect();
            assert_eq!(got_bits, want_bits);
        }
    }

    #[test]
    fn test_duplicate_names_both_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(record("dave", vec![1.0, 0.0])).unwrap();
        store.append(record("dave", vec![0.0, 1.0])).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].embedding(), &[0.0, 1.0]);
    }

    #[test]
    fn test_file_format_is_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(record("erin", vec![0.5, 0.25])).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"name": "erin", "embedding": [0.5, 0.25]}])
        );
    }

    #[test]
    fn test_accepts_externally_written_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[{"name": "frank", "embedding": [1, 2.5, -3]}]"#,
        )
        .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded[0].embedding(), &[1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_truncated_file_is_corrupt_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"[{"name": "gina", "embedding": [0.1, 0."#).unwrap();

        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_wrong_types_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"[{"name": 7, "embedding": "abc"}]"#).unwrap();

        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_empty_name_on_disk_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"[{"name": "", "embedding": [1.0]}]"#).unwrap();

        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_zero_embedding_on_disk_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"[{"name": "a", "embedding": [0.0, 0.0]}]"#).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("zero norm"));
    }

    #[test]
    fn test_mixed_dimensions_on_disk_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[{"name": "a", "embedding": [1.0, 0.0]}, {"name": "b", "embedding": [1.0]}]"#,
        )
        .unwrap();

        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_append_to_corrupt_store_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        fs::write(store.path(), "not json").unwrap();

        let result = store.append(record("hank", vec![1.0]));

        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "not json");
    }

    #[test]
    fn test_append_with_other_dimensions_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(record("ivy", vec![1.0, 0.0, 0.0])).unwrap();

        let result = store.append(record("jack", vec![1.0, 0.0]));

        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonEmbeddingStore::new(dir.path().join("a").join("b").join("db.json"));
        store.append(record("kim", vec![1.0])).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(record("lee", vec![1.0, 2.0])).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(partial_path(store.path())).unwrap();
        let result = store.append(record("max", vec![3.0, 4.0]));

        assert!(matches!(result, Err(StoreError::Write { .. })));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name(), "lee");
    }

    #[test]
    fn test_no_temp_file_left_after_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(record("nia", vec![1.0])).unwrap();
        assert!(!partial_path(store.path()).exists());
    }

    #[test]
    fn test_sibling_store_ending_in_part_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut part_store = JsonEmbeddingStore::new(dir.path().join("faces.part"));
        let mut json_store = JsonEmbeddingStore::new(dir.path().join("faces.json"));

        part_store.append(record("olga", vec![1.0, 0.0])).unwrap();
        json_store.append(record("pia", vec![0.0, 1.0])).unwrap();
        part_store.append(record("quinn", vec![0.6, 0.8])).unwrap();

        let names = |store: &JsonEmbeddingStore| -> Vec<String> {
            store.load().unwrap().iter().map(|r| r.name().to_string()).collect()
        };
        assert_eq!(names(&part_store), vec!["olga", "quinn"]);
        assert_eq!(names(&json_store), vec!["pia"]);
        assert!(!dir.path().join("faces.part.part").exists());
    }
}
