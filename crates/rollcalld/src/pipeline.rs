//! Per-frame pipeline: decode, downsample, detect, match, gate, emit.
//!
//! Each frame is processed independently; nothing carries over to the
//! next frame except through the gallery and the attendance store. No
//! per-frame error may end the session: undecodable frames are dropped
//! silently, oracle failures count as zero faces, and a store failure
//! affects only the face being decided.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Local;
use image::imageops::{self, FilterType};
use image::RgbImage;
use rollcall_core::{
    Decision, Descriptor, EuclideanMatcher, FaceOracle, Gallery, Matcher,
};
use rollcall_store::{AttendanceGate, Store, StoreError, StudentProfile};
use serde::Serialize;

const UNKNOWN_NAME: &str = "Unknown";

/// One per-face record of the frame response.
#[derive(Debug, Clone, Serialize)]
pub struct FaceResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub name: String,
    pub status: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl FaceResult {
    fn unknown(status: Decision) -> Self {
        Self {
            student_id: None,
            name: UNKNOWN_NAME.to_owned(),
            status,
            photo_url: None,
            program: None,
            section: None,
        }
    }

    fn registered(profile: StudentProfile, status: Decision) -> Self {
        Self {
            student_id: Some(profile.id),
            name: profile.name,
            status,
            photo_url: profile.photo_url,
            program: Some(profile.program),
            section: Some(profile.section),
        }
    }
}

/// Response for one frame: one record per detected face, in detection order.
#[derive(Debug, Clone, Serialize)]
pub struct FrameResponse {
    pub faces: Vec<FaceResult>,
}

/// Shared frame-processing pipeline. Clones share the gallery, store,
/// and oracle, so any number of sessions may run over one pipeline.
#[derive(Clone)]
pub struct Pipeline {
    gallery: Arc<Gallery>,
    store: Store,
    gate: AttendanceGate,
    oracle: Arc<dyn FaceOracle>,
    match_threshold: f32,
    frame_scale: f32,
}

impl Pipeline {
    pub fn new(
        gallery: Arc<Gallery>,
        store: Store,
        oracle: Arc<dyn FaceOracle>,
        match_threshold: f32,
        frame_scale: f32,
    ) -> Self {
        let gate = AttendanceGate::new(store.clone());
        Self {
            gallery,
            store,
            gate,
            oracle,
            match_threshold,
            frame_scale,
        }
    }

    /// Process one inbound frame payload (base64, with or without a
    /// `data:...;base64,` header).
    ///
    /// Returns `None` only for undecodable payloads, which are dropped
    /// without surfacing an error to the caller.
    pub async fn process_frame(&self, payload: String) -> Option<FrameResponse> {
        let oracle = Arc::clone(&self.oracle);
        let scale = self.frame_scale;

        let probes = tokio::task::spawn_blocking(move || {
            let frame = decode_frame(&payload)?;
            let small = downsample(&frame, scale);
            Some(probe_descriptors(oracle.as_ref(), &small))
        })
        .await
        .unwrap_or_else(|error| {
            tracing::warn!(%error, "frame task failed");
            None
        })?;

        tracing::debug!(probes = probes.len(), "frame decoded");

        let mut faces = Vec::with_capacity(probes.len());
        for probe in &probes {
            faces.push(self.decide(probe).await);
        }
        Some(FrameResponse { faces })
    }

    /// Match one probe and run it through registry and gate.
    async fn decide(&self, probe: &Descriptor) -> FaceResult {
        let snapshot = self.gallery.snapshot();
        let Some(matched) =
            EuclideanMatcher.best_match(probe, &snapshot, self.match_threshold)
        else {
            return FaceResult::unknown(Decision::NoRecordFound);
        };

        tracing::debug!(
            identity = %matched.identity,
            distance = matched.distance,
            "gallery match"
        );

        let profile = match self.store.student(&matched.identity).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                // Face matches an enrolled descriptor but the id is not in
                // the registry; reported exactly like a geometric no-match.
                tracing::warn!(identity = %matched.identity, "matched face has no registry record");
                return FaceResult::unknown(Decision::NoRecordFound);
            }
            Err(error) => return self.store_failure(&matched.identity, error),
        };

        let now = Local::now();
        let (date, time) = (now.date_naive(), now.time());

        match self.gate.check(&matched.identity, date).await {
            Ok(true) => FaceResult::registered(profile, Decision::AlreadyMarked),
            Ok(false) => match self.gate.commit(&matched.identity, date, time).await {
                Ok(true) => FaceResult::registered(profile, Decision::Verified),
                // Lost the race to a concurrent frame.
                Ok(false) => FaceResult::registered(profile, Decision::AlreadyMarked),
                Err(error) => self.store_failure(&matched.identity, error),
            },
            Err(error) => self.store_failure(&matched.identity, error),
        }
    }

    /// Store unavailable while deciding this face. Recoverable: the face
    /// is reported Unverified and the rest of the frame proceeds.
    fn store_failure(&self, identity: &str, error: StoreError) -> FaceResult {
        tracing::warn!(identity, %error, "attendance store unavailable for face");
        FaceResult {
            student_id: Some(identity.to_owned()),
            name: UNKNOWN_NAME.to_owned(),
            status: Decision::Unverified,
            photo_url: None,
            program: None,
            section: None,
        }
    }
}

/// Strip an optional data-URL header and decode base64 + image bytes.
fn decode_frame(payload: &str) -> Option<RgbImage> {
    let b64 = payload
        .split_once(',')
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    let bytes = BASE64.decode(b64.trim()).ok()?;
    let image = image::load_from_memory(&bytes).ok()?;
    Some(image.to_rgb8())
}

/// Downsample by a fixed linear factor to bound detection cost.
fn downsample(frame: &RgbImage, scale: f32) -> RgbImage {
    if !(scale > 0.0 && scale < 1.0) {
        return frame.clone();
    }
    let w = ((frame.width() as f32 * scale).round() as u32).max(1);
    let h = ((frame.height() as f32 * scale).round() as u32).max(1);
    imageops::resize(frame, w, h, FilterType::Triangle)
}

/// Detect faces and encode each, in detection order. Oracle failures are
/// treated as zero faces for the frame.
fn probe_descriptors(oracle: &dyn FaceOracle, frame: &RgbImage) -> Vec<Descriptor> {
    let regions = match oracle.detect(frame) {
        Ok(regions) => regions,
        Err(error) => {
            tracing::warn!(%error, "face detection failed, treating as zero faces");
            return Vec::new();
        }
    };

    let mut probes = Vec::with_capacity(regions.len());
    for region in &regions {
        match oracle.encode(frame, region) {
            Ok(Some(descriptor)) => probes.push(descriptor),
            Ok(None) => tracing::debug!(?region, "region yielded no descriptor"),
            Err(error) => tracing::warn!(%error, "face encoding failed for region"),
        }
    }
    probes
}
