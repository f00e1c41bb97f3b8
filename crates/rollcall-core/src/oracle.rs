//! Trait seam for the external face-detection/encoding oracle.
//!
//! The oracle is an external capability: given an image it finds face
//! regions and produces a fixed-length descriptor per region. The
//! pipeline consumes this boundary; it never implements it.

use image::RgbImage;
use thiserror::Error;

use crate::types::{Descriptor, FaceRegion};

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle invocation failed: {0}")]
    Invocation(String),
    #[error("oracle returned malformed output: {0}")]
    MalformedOutput(String),
}

/// Face detection and descriptor encoding, supplied externally.
///
/// Calls are bounded synchronous operations; callers run them off the
/// async runtime. Errors are non-fatal to frame processing and are
/// treated as "no faces in this frame".
pub trait FaceOracle: Send + Sync {
    /// Detect face regions in the image, in detection order.
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceRegion>, OracleError>;

    /// Compute the descriptor for one detected region, or `None` when the
    /// region yields no usable encoding.
    fn encode(&self, image: &RgbImage, region: &FaceRegion)
        -> Result<Option<Descriptor>, OracleError>;
}
