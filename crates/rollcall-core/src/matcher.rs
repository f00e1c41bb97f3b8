//! Nearest-descriptor matching against a gallery snapshot.

use crate::gallery::GallerySnapshot;
use crate::types::Descriptor;

/// Default distance threshold for a positive match, calibrated for
/// normalized 128/512-dim descriptor spaces.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Best-candidate outcome of a gallery comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Identity of the nearest gallery entry.
    pub identity: String,
    /// Euclidean distance to that entry.
    pub distance: f32,
}

/// Strategy for comparing a probe descriptor against a gallery snapshot.
pub trait Matcher {
    /// Return the best match at or under `threshold`, or `None` when the
    /// gallery is empty or the nearest entry is too far.
    fn best_match(
        &self,
        probe: &Descriptor,
        snapshot: &GallerySnapshot,
        threshold: f32,
    ) -> Option<MatchResult>;
}

/// Euclidean-distance matcher with a stable argmin.
///
/// Ties are broken by first occurrence in gallery order (strict `<`),
/// so identical distances always resolve to the earliest-enrolled entry.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn best_match(
        &self,
        probe: &Descriptor,
        snapshot: &GallerySnapshot,
        threshold: f32,
    ) -> Option<MatchResult> {
        let mut best_distance = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, entry) in snapshot.entries().iter().enumerate() {
            let distance = probe.euclidean_distance(&entry.descriptor);
            if distance < best_distance {
                best_distance = distance;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_distance <= threshold => Some(MatchResult {
                identity: snapshot.entries()[idx].identity.clone(),
                distance: best_distance,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::Gallery;

    fn snapshot_of(entries: &[(&str, &[f32])]) -> GallerySnapshot {
        let gallery = Gallery::new();
        for (id, values) in entries {
            gallery.add(*id, Descriptor::new(values.to_vec())).unwrap();
        }
        gallery.snapshot()
    }

    #[test]
    fn test_empty_gallery_no_match() {
        let snap = Gallery::new().snapshot();
        let probe = Descriptor::new(vec![1.0, 0.0]);
        assert!(EuclideanMatcher.best_match(&probe, &snap, 0.6).is_none());
    }

    #[test]
    fn test_nearest_entry_wins() {
        let snap = snapshot_of(&[("far", &[5.0, 5.0]), ("near", &[0.1, 0.0])]);
        let probe = Descriptor::new(vec![0.0, 0.0]);

        let result = EuclideanMatcher.best_match(&probe, &snap, 0.6).unwrap();
        assert_eq!(result.identity, "near");
        assert!((result.distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let snap = snapshot_of(&[("S1", &[0.6, 0.0])]);
        let probe = Descriptor::new(vec![0.0, 0.0]);

        // Distance exactly equals the threshold.
        assert!(EuclideanMatcher.best_match(&probe, &snap, 0.6).is_some());
        assert!(EuclideanMatcher.best_match(&probe, &snap, 0.59).is_none());
    }

    #[test]
    fn test_over_threshold_no_match_regardless_of_gallery_size() {
        let entries: Vec<(String, Descriptor)> = (0..50)
            .map(|i| (format!("S{i}"), Descriptor::new(vec![10.0 + i as f32, 0.0])))
            .collect();
        let gallery = Gallery::new();
        for (id, d) in entries {
            gallery.add(id, d).unwrap();
        }
        let probe = Descriptor::new(vec![0.0, 0.0]);
        assert!(EuclideanMatcher
            .best_match(&probe, &gallery.snapshot(), 0.6)
            .is_none());
    }

    #[test]
    fn test_tie_broken_by_first_occurrence() {
        // Both entries sit at identical distance from the probe.
        let snap = snapshot_of(&[("first", &[0.3, 0.0]), ("second", &[-0.3, 0.0])]);
        let probe = Descriptor::new(vec![0.0, 0.0]);

        let result = EuclideanMatcher.best_match(&probe, &snap, 0.6).unwrap();
        assert_eq!(result.identity, "first");
    }

    #[test]
    fn test_deterministic_for_stable_gallery_order() {
        let snap = snapshot_of(&[("a", &[0.2, 0.1]), ("b", &[0.1, 0.2]), ("c", &[0.4, 0.4])]);
        let probe = Descriptor::new(vec![0.0, 0.0]);

        let first = EuclideanMatcher.best_match(&probe, &snap, 0.6);
        for _ in 0..10 {
            assert_eq!(EuclideanMatcher.best_match(&probe, &snap, 0.6), first);
        }
    }

    #[test]
    fn test_duplicate_identity_entries_all_tried() {
        // Second enrollment of S1 is the nearer one; it must still match.
        let snap = snapshot_of(&[("S1", &[5.0, 5.0]), ("S1", &[0.1, 0.0])]);
        let probe = Descriptor::new(vec![0.0, 0.0]);

        let result = EuclideanMatcher.best_match(&probe, &snap, 0.6).unwrap();
        assert_eq!(result.identity, "S1");
        assert!(result.distance < 0.2);
    }
}
