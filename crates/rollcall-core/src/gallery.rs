//! In-memory gallery of enrolled face descriptors.
//!
//! The gallery owns the (identity, descriptor) pairs for the process
//! lifetime: loaded at startup, appended on enrollment, never evicted.
//! Readers take cheap immutable snapshots; writers publish new entries
//! atomically, so a snapshot observes an entry fully or not at all.

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::types::Descriptor;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("descriptor length {got} does not match gallery dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("empty descriptor for identity {0}")]
    EmptyDescriptor(String),
}

/// One enrolled (identity, descriptor) pair.
///
/// An identity may appear more than once; `add` never deduplicates and
/// the matcher tries every entry.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub identity: String,
    pub descriptor: Descriptor,
}

/// Immutable, index-aligned view of the gallery at one point in time.
#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    entries: Arc<Vec<GalleryEntry>>,
}

impl GallerySnapshot {
    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared, append-only descriptor store.
///
/// Copy-on-write behind an `RwLock`: `add` mutates in place when no
/// snapshot is outstanding and clones otherwise, so concurrent readers
/// never see a half-constructed entry.
#[derive(Debug, Default)]
pub struct Gallery {
    entries: RwLock<Arc<Vec<GalleryEntry>>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry. The first entry fixes the gallery dimension;
    /// later entries must match it.
    pub fn add(&self, identity: impl Into<String>, descriptor: Descriptor) -> Result<(), GalleryError> {
        let identity = identity.into();
        if descriptor.is_empty() {
            return Err(GalleryError::EmptyDescriptor(identity));
        }

        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(first) = guard.first() {
            if first.descriptor.len() != descriptor.len() {
                return Err(GalleryError::DimensionMismatch {
                    expected: first.descriptor.len(),
                    got: descriptor.len(),
                });
            }
        }

        tracing::debug!(identity = %identity, dimension = descriptor.len(), "gallery entry added");
        Arc::make_mut(&mut guard).push(GalleryEntry {
            identity,
            descriptor,
        });
        Ok(())
    }

    /// Current immutable view, safe to read while `add` runs concurrently.
    pub fn snapshot(&self) -> GallerySnapshot {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        GallerySnapshot {
            entries: Arc::clone(&guard),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_add_and_snapshot() {
        let gallery = Gallery::new();
        gallery.add("S1", desc(&[1.0, 0.0])).unwrap();
        gallery.add("S2", desc(&[0.0, 1.0])).unwrap();

        let snap = gallery.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.entries()[0].identity, "S1");
        assert_eq!(snap.entries()[1].identity, "S2");
    }

    #[test]
    fn test_duplicate_identity_retains_both() {
        let gallery = Gallery::new();
        gallery.add("S1", desc(&[1.0, 0.0])).unwrap();
        gallery.add("S1", desc(&[0.9, 0.1])).unwrap();

        let snap = gallery.snapshot();
        assert_eq!(snap.len(), 2);
        assert!(snap.entries().iter().all(|e| e.identity == "S1"));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let gallery = Gallery::new();
        gallery.add("S1", desc(&[1.0, 0.0])).unwrap();
        let err = gallery.add("S2", desc(&[1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::DimensionMismatch { expected: 2, got: 3 }
        ));
        // Gallery unchanged by the rejected add.
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_empty_descriptor_rejected() {
        let gallery = Gallery::new();
        assert!(gallery.add("S1", desc(&[])).is_err());
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_later_adds() {
        let gallery = Gallery::new();
        gallery.add("S1", desc(&[1.0])).unwrap();
        let snap = gallery.snapshot();
        gallery.add("S2", desc(&[2.0])).unwrap();

        assert_eq!(snap.len(), 1);
        assert_eq!(gallery.snapshot().len(), 2);
    }

    #[test]
    fn test_concurrent_add_and_snapshot() {
        use std::sync::Arc as StdArc;

        let gallery = StdArc::new(Gallery::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let g = StdArc::clone(&gallery);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        g.add(format!("W{w}-{i}"), Descriptor::new(vec![w as f32, i as f32]))
                            .unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let g = StdArc::clone(&gallery);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = g.snapshot();
                        // Every visible entry is fully constructed.
                        for entry in snap.entries() {
                            assert!(!entry.identity.is_empty());
                            assert_eq!(entry.descriptor.len(), 2);
                        }
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }
        assert_eq!(gallery.len(), 400);
    }
}
