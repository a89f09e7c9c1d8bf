//! Per-frame attendance pipeline: detect → match → liveness → mark → log.

use crate::detector::Detector;
use crate::ledger::{AttendanceLog, AttendanceRecord, LedgerError};
use crate::liveness::LivenessGate;
use crate::matcher::DistanceMatcher;
use crate::references::ReferenceStore;
use crate::tracker::SessionTracker;
use crate::types::FaceRegion;
use crate::verifier::Verifier;
use chrono::NaiveTime;
use image::RgbImage;

/// Decision for one detected face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    /// No reference accepted, or the face could not be cropped.
    NoMatch,
    /// Matched a name not yet seen, but failed the liveness gate. Not logged.
    Spoof(String),
    /// First sighting this session; a record was appended.
    Marked(String),
    /// Matched a name already recorded this session.
    AlreadyMarked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceOutcome {
    pub region: FaceRegion,
    pub status: MatchStatus,
}

/// What happened in one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameReport {
    /// Detection failed or found nothing.
    NoFace,
    Faces(Vec<FaceOutcome>),
}

impl FrameReport {
    pub fn outcomes(&self) -> &[FaceOutcome] {
        match self {
            FrameReport::NoFace => &[],
            FrameReport::Faces(outcomes) => outcomes,
        }
    }
}

/// Owns everything one attendance run mutates or consults.
pub struct AttendanceSession<D, V> {
    detector: D,
    verifier: V,
    references: ReferenceStore,
    matcher: DistanceMatcher,
    liveness: LivenessGate,
    tracker: SessionTracker,
    log: AttendanceLog,
}

impl<D: Detector, V: Verifier> AttendanceSession<D, V> {
    pub fn new(
        detector: D,
        verifier: V,
        references: ReferenceStore,
        matcher: DistanceMatcher,
        liveness: LivenessGate,
        log: AttendanceLog,
    ) -> Self {
        Self {
            detector,
            verifier,
            references,
            matcher,
            liveness,
            tracker: SessionTracker::new(),
            log,
        }
    }

    /// Run the pipeline on one frame, logging first sightings stamped `now`.
    ///
    /// Detection and verification failures are absorbed; only a failed log
    /// append is returned as an error.
    pub fn process_frame(&mut self, frame: &RgbImage, now: NaiveTime) -> Result<FrameReport, LedgerError> {
        let faces = match self.detector.detect(frame) {
            Ok(faces) if !faces.is_empty() => faces,
            Ok(_) => return Ok(FrameReport::NoFace),
            Err(e) => {
                tracing::debug!(error = %e, "face detection failed for frame");
                return Ok(FrameReport::NoFace);
            }
        };

        let mut outcomes = Vec::with_capacity(faces.len());
        for face in &faces {
            let region = face.region();
            let status = self.classify(frame, region, now)?;
            outcomes.push(FaceOutcome { region, status });
        }
        Ok(FrameReport::Faces(outcomes))
    }

    fn classify(&mut self, frame: &RgbImage, region: FaceRegion, now: NaiveTime) -> Result<MatchStatus, LedgerError> {
        let Some(crop) = region.crop(frame) else {
            tracing::debug!(?region, "face region outside frame");
            return Ok(MatchStatus::NoMatch);
        };

        let result = self.matcher.compare(&mut self.verifier, &self.references, &crop);
        let Some(name) = result.name else {
            return Ok(MatchStatus::NoMatch);
        };

        if self.tracker.is_marked(&name) {
            return Ok(MatchStatus::AlreadyMarked(name));
        }

        if !self.liveness.is_live(&region, crop.dimensions()) {
            tracing::debug!(name = %name, ?region, "match rejected by liveness gate");
            return Ok(MatchStatus::Spoof(name));
        }

        self.log.append(&AttendanceRecord::new(name.as_str(), now))?;
        self.tracker.mark(&name);
        Ok(MatchStatus::Marked(name))
    }

    pub fn references(&self) -> &ReferenceStore {
        &self.references
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }
}
