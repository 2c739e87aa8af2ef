//! Noding diagnostics: timing, counts, and other metrics for each phase.
//!
//! These diagnostics are permanent instrumentation intended for tuning
//! the grid scale and for spotting pathological inputs. They are
//! collected by
//! [`SnapRoundingNoder::compute_nodes_with_diagnostics`](crate::SnapRoundingNoder::compute_nodes_with_diagnostics)
//! alongside the noding result.
//!
//! Duration measurements use [`std::time::Duration`] (platform-agnostic).
//! Timestamps come from a caller-supplied [`Clock`]; [`WebClock`] uses the
//! `web-time` crate, which uses `performance.now()` on WASM and
//! `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::segment_string::SegmentString;
use crate::types::NodingError;
use crate::validating::NodingValidator;

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Clock that reports zero for everything, used when nobody asked for
/// timings.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single noding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodingDiagnostics {
    /// Phase 1: exact intersections and near vertices between input segments.
    pub intersections: StageDiagnostics,
    /// Phase 2: one hot pixel per distinct rounded vertex.
    pub vertex_pixels: StageDiagnostics,
    /// Phase 3: snapping every input segment to the pixels it crosses.
    pub segment_snapping: StageDiagnostics,
    /// Phase 4: splitting at vertices whose pixel is a node.
    pub vertex_snapping: StageDiagnostics,
    /// Phase 5: cutting strings into fragments.
    pub splitting: StageDiagnostics,
    /// Phase 6: snapping the rounded fragments to the pixels they cross.
    pub resnapping: StageDiagnostics,
    /// Optional phase 7: scanning fragments for residual crossings.
    pub validation: Option<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all phases.
    pub summary: NodingSummary,
}

/// Diagnostics for a single phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this phase (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Phase-specific metrics.
    pub metrics: StageMetrics,
}

/// Phase-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    Intersections {
        /// Number of indexed input segments.
        segment_count: usize,
        /// Segment pairs whose envelopes were close enough to test.
        pair_count: usize,
        /// Intersection points interior to a segment.
        interior_count: usize,
        /// Vertices found within the nearness tolerance of a segment.
        near_vertex_count: usize,
        /// Tolerance used for the near-vertex test.
        nearness: f64,
    },
    VertexPixels {
        /// Input vertices visited.
        vertex_count: usize,
        /// Distinct hot pixels after this phase.
        pixel_count: usize,
        /// Hot pixels marked as nodes after this phase.
        node_pixel_count: usize,
    },
    SegmentSnapping {
        /// Segments queried against the pixel index.
        segment_count: usize,
        /// Candidate pixels returned by the index.
        candidate_count: usize,
        /// Candidates that intersected their segment.
        snap_count: usize,
    },
    VertexSnapping {
        /// Vertices of rounded strings visited.
        vertex_count: usize,
        /// Vertices that became split points.
        node_count: usize,
    },
    Splitting {
        /// Strings surviving rounding (at least two distinct points).
        string_count: usize,
        /// Strings that collapsed to a single point and were dropped.
        collapsed_count: usize,
        /// Fragments produced.
        fragment_count: usize,
        /// Total points across all fragments.
        point_count: usize,
    },
    Resnapping {
        /// Passes over the fragments, including the final one that found
        /// nothing to add.
        round_count: usize,
        /// Pixels inserted into rounded segments.
        snap_count: usize,
        /// Fragments after the last pass.
        fragment_count: usize,
    },
    Validation {
        /// Fragments scanned.
        fragment_count: usize,
        /// Whether the output is fully noded.
        valid: bool,
    },
}

/// High-level summary counts for a noding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodingSummary {
    /// Grid scale used.
    pub scale: f64,
    /// Number of input strings.
    pub input_string_count: usize,
    /// Total input vertices.
    pub input_vertex_count: usize,
    /// Distinct hot pixels.
    pub hot_pixel_count: usize,
    /// Hot pixels that became nodes.
    pub node_count: usize,
    /// Output fragments.
    pub fragment_count: usize,
}

impl NodingDiagnostics {
    /// Validate `fragments`, recording the phase in these diagnostics.
    ///
    /// The validation time is added to `total_duration`.
    ///
    /// # Errors
    ///
    /// Returns [`NodingError::NonNodedIntersection`] if the fragments are
    /// not fully noded.
    pub fn record_validation<D, C: Clock>(
        &mut self,
        fragments: &[SegmentString<D>],
        clock: &C,
    ) -> Result<(), NodingError> {
        let start = clock.now();
        let result = NodingValidator::new(fragments).check_valid();
        let duration = clock.elapsed(&start);
        self.validation = Some(StageDiagnostics {
            duration,
            metrics: StageMetrics::Validation {
                fragment_count: fragments.len(),
                valid: result.is_ok(),
            },
        });
        self.total_duration += duration;
        result
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Noding Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} strings, {} vertices (scale {})",
            self.summary.input_string_count, self.summary.input_vertex_count, self.summary.scale,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<20} {:>10} {:>10}  {}",
            "Phase", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![
            ("Intersections", &self.intersections),
            ("Vertex Pixels", &self.vertex_pixels),
            ("Segment Snapping", &self.segment_snapping),
            ("Vertex Snapping", &self.vertex_snapping),
            ("Splitting", &self.splitting),
            ("Re-snapping", &self.resnapping),
        ];
        if let Some(ref v) = self.validation {
            stages.push(("Validation", v));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<20} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Hot pixels: {}  |  Nodes: {}  |  Fragments: {}",
            self.summary.hot_pixel_count, self.summary.node_count, self.summary.fragment_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format phase metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Intersections {
            segment_count,
            pair_count,
            interior_count,
            near_vertex_count,
            nearness,
        } => format!(
            "{segment_count} segs, {pair_count} pairs, {interior_count} interior, {near_vertex_count} near (tol={nearness:e})",
        ),
        StageMetrics::VertexPixels {
            vertex_count,
            pixel_count,
            node_pixel_count,
        } => format!("{vertex_count} vertices -> {pixel_count} pixels ({node_pixel_count} nodes)"),
        StageMetrics::SegmentSnapping {
            segment_count,
            candidate_count,
            snap_count,
        } => format!("{segment_count} segs, {candidate_count} candidates, {snap_count} snaps"),
        StageMetrics::VertexSnapping {
            vertex_count,
            node_count,
        } => format!("{node_count}/{vertex_count} vertices split"),
        StageMetrics::Splitting {
            string_count,
            collapsed_count,
            fragment_count,
            point_count,
        } => format!(
            "{string_count} strings ({collapsed_count} collapsed) -> {fragment_count} fragments, {point_count} pts",
        ),
        StageMetrics::Resnapping {
            round_count,
            snap_count,
            fragment_count,
        } => format!("{round_count} rounds, {snap_count} snaps -> {fragment_count} fragments"),
        StageMetrics::Validation {
            fragment_count,
            valid,
        } => format!(
            "{fragment_count} fragments, {}",
            if *valid { "valid" } else { "NOT NODED" }
        ),
    }
}
