//! A thread-safe in-memory storage for the currently active feature set. [`FeatureStore`]
//! provides concurrent access for readers (evaluation) and writers (whatever refreshes the
//! features, e.g. a periodic fetcher).
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::features::{ClientFeatures, Feature, Segment, SegmentId, TryParse};
use crate::{Result, Str, Timestamp};

/// Read access to an ingested feature set.
///
/// Evaluation goes through this trait, so callers can plug in their own storage instead of
/// [`FeatureSnapshot`].
pub trait Repository: Send + Sync {
    /// Find a feature by name.
    fn get_toggle(&self, name: &str) -> Option<&Feature>;
    /// All known features, in a stable order.
    fn get_toggles(&self) -> Vec<&Feature>;
    /// Find a segment by id.
    fn get_segment(&self, id: SegmentId) -> Option<&Segment>;
}

/// An immutable, indexed view of one client features document.
///
/// Features that fail to parse are dropped at ingestion with a warning, so one malformed
/// feature cannot take down the rest of the document.
#[derive(Debug, Default)]
pub struct FeatureSnapshot {
    /// Timestamp when the snapshot was built.
    pub fetched_at: Timestamp,
    /// Version of the client features document this was built from.
    pub version: u32,
    features: HashMap<Str, Feature>,
    segments: HashMap<SegmentId, Segment>,
}

impl FeatureSnapshot {
    /// Index a parsed client features document.
    pub fn new(document: ClientFeatures) -> FeatureSnapshot {
        let mut features = HashMap::new();
        for feature in document.features {
            match feature {
                TryParse::Parsed(feature) => {
                    features.insert(feature.name.clone(), feature);
                }
                TryParse::ParseFailed(raw) => {
                    let feature_name = raw
                        .get("name")
                        .and_then(|name| name.as_str())
                        .unwrap_or("<unnamed>");
                    log::warn!(target: "toggle",
                               feature_name;
                               "dropping a feature that failed to parse");
                }
            }
        }
        let segments = document
            .segments
            .into_iter()
            .map(|segment| (segment.id, segment))
            .collect();

        FeatureSnapshot {
            fetched_at: Utc::now(),
            version: document.version,
            features,
            segments,
        }
    }

    /// Parse a client features document from JSON and index it.
    pub fn from_json(json: &str) -> Result<FeatureSnapshot> {
        let document: ClientFeatures = serde_json::from_str(json)?;
        Ok(FeatureSnapshot::new(document))
    }
}

impl Repository for FeatureSnapshot {
    fn get_toggle(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    fn get_toggles(&self) -> Vec<&Feature> {
        let mut toggles: Vec<&Feature> = self.features.values().collect();
        toggles.sort_by(|a, b| a.name.cmp(&b.name));
        toggles
    }

    fn get_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }
}

/// `FeatureStore` provides a thread-safe (`Sync`) storage for the active snapshot that allows
/// concurrent access for readers and writers.
///
/// The snapshot itself is always immutable and can only be replaced completely.
#[derive(Default)]
pub struct FeatureStore {
    snapshot: RwLock<Option<Arc<FeatureSnapshot>>>,
}

impl FeatureStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        FeatureStore::default()
    }

    /// Get the currently-active snapshot. Returns None if nothing has been stored yet.
    pub fn snapshot(&self) -> Option<Arc<FeatureSnapshot>> {
        // self.snapshot.read() should always return Ok(). Err() is possible only if the lock
        // is poisoned (a writer panicked while holding the lock), which should never happen.
        let snapshot = self
            .snapshot
            .read()
            .expect("thread holding snapshot lock should not panic");

        snapshot.clone()
    }

    /// Replace the active snapshot.
    pub fn set_snapshot(&self, snapshot: Arc<FeatureSnapshot>) {
        let mut snapshot_slot = self
            .snapshot
            .write()
            .expect("thread holding snapshot lock should not panic");

        *snapshot_slot = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{FeatureSnapshot, FeatureStore, Repository};

    #[test]
    fn malformed_features_are_dropped_at_ingestion() {
        let _ = env_logger::builder().is_test(true).try_init();

        let snapshot = FeatureSnapshot::from_json(
            r#"{
              "version": 2,
              "features": [
                {"name": "good", "enabled": true, "strategies": []},
                {"name": "bad", "enabled": "not-a-bool"},
                {"name": "alsoGood", "enabled": false, "strategies": []}
              ]
            }"#,
        )
        .unwrap();

        assert!(snapshot.get_toggle("good").is_some());
        assert!(snapshot.get_toggle("alsoGood").is_some());
        assert!(snapshot.get_toggle("bad").is_none());
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn invalid_document_is_an_error() {
        let result = FeatureSnapshot::from_json("{not json");
        assert!(result.is_err());
    }

    #[test]
    fn toggles_come_back_in_a_stable_order() {
        let snapshot = FeatureSnapshot::from_json(
            r#"{
              "version": 2,
              "features": [
                {"name": "zebra", "enabled": true, "strategies": []},
                {"name": "aardvark", "enabled": true, "strategies": []},
                {"name": "koala", "enabled": true, "strategies": []}
              ]
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = snapshot
            .get_toggles()
            .iter()
            .map(|feature| feature.name.as_ref())
            .collect();
        assert_eq!(names, vec!["aardvark", "koala", "zebra"]);
    }

    #[test]
    fn segments_are_indexed_by_id() {
        let snapshot = FeatureSnapshot::from_json(
            r#"{
              "version": 2,
              "features": [],
              "segments": [
                {"id": 1, "name": "beta-testers", "constraints": []},
                {"id": 7, "name": "internal", "constraints": []}
              ]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.get_segment(1).unwrap().name, "beta-testers");
        assert_eq!(snapshot.get_segment(7).unwrap().name, "internal");
        assert!(snapshot.get_segment(2).is_none());
    }

    #[test]
    fn can_set_snapshot_from_another_thread() {
        let store = Arc::new(FeatureStore::new());

        assert!(store.snapshot().is_none());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set_snapshot(Arc::new(
                    FeatureSnapshot::from_json(r#"{"version": 2, "features": []}"#).unwrap(),
                ))
            })
            .join();
        }

        assert!(store.snapshot().is_some());
    }
}
