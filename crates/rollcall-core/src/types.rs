use serde::{Deserialize, Serialize};

/// Face descriptor vector produced by the encoding oracle.
///
/// Treated as opaque except for the Euclidean distance between two
/// descriptors of equal length. All descriptors in one gallery share
/// a single length (enforced at [`Gallery::add`](crate::Gallery::add)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two descriptors.
    ///
    /// Zips the shorter length if the two differ; callers that need the
    /// equal-length invariant get it from the gallery, not from here.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Axis-aligned region of a detected face within a frame, in pixels
/// of the buffer the detector ran on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Attendance decision for one detected face, with the exact wire
/// spellings the streaming response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Matched, registered, and attendance was recorded by this frame.
    Verified,
    /// Matched and registered, but attendance already existed today
    /// (including a commit lost to a concurrent frame).
    #[serde(rename = "Already Marked")]
    AlreadyMarked,
    /// No gallery match above threshold, or a match whose identity is
    /// absent from the student registry.
    #[serde(rename = "No Record Found")]
    NoRecordFound,
    /// Matched and registered, but the attendance store was unavailable
    /// for this face. Recoverable; other faces in the frame are unaffected.
    Unverified,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Descriptor::new(vec![1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_symmetric() {
        let a = Descriptor::new(vec![0.1, 0.7, -0.3]);
        let b = Descriptor::new(vec![-0.2, 0.5, 0.9]);
        assert!((a.euclidean_distance(&b) - b.euclidean_distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_decision_wire_names() {
        assert_eq!(serde_json::to_string(&Decision::Verified).unwrap(), "\"Verified\"");
        assert_eq!(
            serde_json::to_string(&Decision::AlreadyMarked).unwrap(),
            "\"Already Marked\""
        );
        assert_eq!(
            serde_json::to_string(&Decision::NoRecordFound).unwrap(),
            "\"No Record Found\""
        );
        assert_eq!(serde_json::to_string(&Decision::Unverified).unwrap(), "\"Unverified\"");
    }
}
