//! Best-match selection of a probe face across the reference store.

use crate::references::ReferenceStore;
use crate::verifier::Verifier;
use image::RgbImage;

/// Default maximum (exclusive) verification distance for a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.35;

/// Result of matching one probe face against every reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Name of the accepted reference, if any.
    pub name: Option<String>,
    /// Distance of the accepted reference.
    pub distance: Option<f32>,
    /// References whose comparison failed and were skipped.
    pub skipped: usize,
}

impl MatchResult {
    pub fn matched(&self) -> bool {
        self.name.is_some()
    }
}

/// Picks the lowest-distance verified reference strictly below `threshold`.
///
/// Every reference is compared; a failed comparison skips only that
/// reference. On equal distances the earlier reference wins.
#[derive(Debug, Clone, Copy)]
pub struct DistanceMatcher {
    pub threshold: f32,
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl DistanceMatcher {
    pub fn compare<V: Verifier + ?Sized>(
        &self,
        verifier: &mut V,
        references: &ReferenceStore,
        probe: &RgbImage,
    ) -> MatchResult {
        let mut best: Option<(&str, f32)> = None;
        let mut skipped = 0usize;

        for reference in references.iter() {
            let verification = match verifier.verify(reference, probe) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(name = %reference.name, error = %e, "verification failed, skipping reference");
                    skipped += 1;
                    continue;
                }
            };

            let lowest = best.map_or(f32::INFINITY, |(_, d)| d);
            if verification.verified
                && verification.distance < lowest
                && verification.distance < self.threshold
            {
                best = Some((reference.name.as_str(), verification.distance));
            }
        }

        MatchResult {
            name: best.map(|(name, _)| name.to_string()),
            distance: best.map(|(_, d)| d),
            skipped,
        }
    }
}
