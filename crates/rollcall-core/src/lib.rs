//! rollcall-core — Face descriptor gallery and matching engine.
//!
//! Holds the in-memory gallery of enrolled face descriptors, the
//! nearest-descriptor matcher, and the trait seam for the external
//! face-detection/encoding oracle. No I/O lives here.

pub mod gallery;
pub mod matcher;
pub mod oracle;
pub mod types;

pub use gallery::{Gallery, GalleryError, GallerySnapshot};
pub use matcher::{EuclideanMatcher, MatchResult, Matcher};
pub use oracle::{FaceOracle, OracleError};
pub use types::{Decision, Descriptor, FaceRegion};
