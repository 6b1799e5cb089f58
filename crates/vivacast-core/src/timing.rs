//! Overlay timing compiler.
//!
//! A footer overlay must be visible during a fixed interval of the *original*
//! source's timeline, but the source gets cut into segments before the
//! overlay is burned in. [`compile`] translates the absolute visibility
//! window into a segment-relative, clamped, phase-annotated timing function.
//!
//! Everything here is pure: phase boundaries are plain seconds and the
//! animation curves are deterministic functions of phase progress, so the
//! compositing layer can render them into whatever expression syntax its
//! engine wants.

use serde::{Deserialize, Serialize};

/// Comparison slack for boundary arithmetic on probed durations.
const EPSILON: f64 = 1e-9;

/// The absolute visibility interval of the footer overlay, expressed in the
/// original source's timeline, plus the animation leg durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayWindow {
    /// Seconds from the start of the original source at which the overlay
    /// becomes visible.
    pub start_abs: f64,
    /// Seconds from the start of the original source at which the overlay
    /// is gone again.
    pub end_abs: f64,
    /// Duration of the entry animation.
    pub entry: f64,
    /// Duration of the exit animation.
    pub exit: f64,
}

impl OverlayWindow {
    /// Check the window for internal consistency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.end_abs <= self.start_abs {
            return Err(crate::Error::Validation(format!(
                "overlay window end ({}) must be after start ({})",
                self.end_abs, self.start_abs
            )));
        }
        if self.start_abs < 0.0 || self.entry < 0.0 || self.exit < 0.0 {
            return Err(crate::Error::Validation(
                "overlay window times must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// The timing-relevant view of a segment: where it starts within the
/// original source and how long it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    /// Seconds from the start of the original source at which this segment
    /// begins.
    pub offset: f64,
    /// Length of the segment in seconds.
    pub duration: f64,
}

/// Kind of one phase in the compiled timing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Overlay not shown.
    Hidden,
    /// Overlay growing from its minimal footprint to full size.
    Enter,
    /// Overlay at full size, static.
    Hold,
    /// Overlay shrinking back to its minimal footprint.
    Exit,
}

/// One phase of the compiled timing, in the segment's own timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase start, seconds from segment start.
    pub start: f64,
    /// Phase end, seconds from segment start.
    pub end: f64,
    /// What the overlay does during this phase.
    pub kind: PhaseKind,
}

impl Phase {
    fn new(start: f64, end: f64, kind: PhaseKind) -> Self {
        Self { start, end, kind }
    }

    /// Progress through this phase at time `t`, clamped to `[0, 1]`.
    pub fn progress(&self, t: f64) -> f64 {
        let len = self.end - self.start;
        if len <= 0.0 {
            return 1.0;
        }
        ((t - self.start) / len).clamp(0.0, 1.0)
    }
}

/// Policy for a window whose true exit lies beyond the segment end.
///
/// The source material this tool replaces disagreed with itself here, so
/// the choice is explicit configuration rather than an accident of which
/// script ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Play the exit animation anyway, re-anchored to finish exactly at the
    /// clamped visibility end. The viewer sees a normal-speed exit that just
    /// happens earlier than the absolute window said.
    #[default]
    TruncatedExit,
    /// Hold the overlay at full size until the clamped end and cut. The true
    /// exit would have happened in a later segment.
    InstantCut,
}

/// Segment-relative, clamped, phase-annotated visibility function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTiming {
    /// Whether the window intersects this segment at all.
    pub visible: bool,
    /// Ordered phases covering `[0, segment.duration]` when visible.
    /// Empty when not visible.
    pub phases: Vec<Phase>,
}

impl CompiledTiming {
    /// Timing for a segment the window never touches.
    pub fn invisible() -> Self {
        Self {
            visible: false,
            phases: Vec::new(),
        }
    }

    /// First instant at which the overlay is on screen, if any.
    pub fn visible_start(&self) -> Option<f64> {
        self.phases
            .iter()
            .find(|p| p.kind != PhaseKind::Hidden)
            .map(|p| p.start)
    }

    /// Last instant at which the overlay is on screen, if any.
    pub fn visible_end(&self) -> Option<f64> {
        self.phases
            .iter()
            .rev()
            .find(|p| p.kind != PhaseKind::Hidden)
            .map(|p| p.end)
    }
}

/// Compile an absolute overlay window against one segment.
///
/// Translates the window into the segment's own timeline, clamps it to the
/// segment bounds, and lays out entry/hold/exit phases. Returns an invisible
/// timing when the window misses the segment entirely; that is a defined
/// degenerate outcome, never an error.
///
/// Edge behavior:
/// - window entirely before or after the segment: not visible;
/// - only the window's tail inside the segment: the overlay appears already
///   expanded at `t = 0` (its entry played before this segment began);
/// - only the window's head inside the segment: exit handling follows
///   `policy`.
pub fn compile(window: &OverlayWindow, segment: &SegmentSpan, policy: EdgePolicy) -> CompiledTiming {
    let rel_start = window.start_abs - segment.offset;
    let rel_end = window.end_abs - segment.offset;

    if rel_end <= EPSILON || rel_start >= segment.duration - EPSILON {
        return CompiledTiming::invisible();
    }

    let vis_start = rel_start.max(0.0);
    let vis_end = rel_end.min(segment.duration);

    // Entry that happened before this segment began is not replayed.
    let entry = if rel_start < 0.0 { 0.0 } else { window.entry };
    // Exit that would happen after this segment ends follows the policy.
    let exit = if rel_end > segment.duration + EPSILON {
        match policy {
            EdgePolicy::TruncatedExit => window.exit,
            EdgePolicy::InstantCut => 0.0,
        }
    } else {
        window.exit
    };

    let mut phases = Vec::with_capacity(5);
    if vis_start > EPSILON {
        phases.push(Phase::new(0.0, vis_start, PhaseKind::Hidden));
    }

    let visible_len = vis_end - vis_start;
    if entry + exit >= visible_len {
        // No room for animation: single static hold avoids negative-length
        // phases.
        phases.push(Phase::new(vis_start, vis_end, PhaseKind::Hold));
    } else {
        if entry > 0.0 {
            phases.push(Phase::new(vis_start, vis_start + entry, PhaseKind::Enter));
        }
        phases.push(Phase::new(vis_start + entry, vis_end - exit, PhaseKind::Hold));
        if exit > 0.0 {
            phases.push(Phase::new(vis_end - exit, vis_end, PhaseKind::Exit));
        }
    }

    if vis_end < segment.duration - EPSILON {
        phases.push(Phase::new(vis_end, segment.duration, PhaseKind::Hidden));
    }

    CompiledTiming {
        visible: true,
        phases,
    }
}

/// Deterministic animation curve evaluated per phase.
///
/// `width_factor` and `height_factor` map entry progress `[0, 1]` to the
/// fraction of the overlay's full width/height on screen. Exit phases are
/// mirrored by evaluating at `1 - progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationCurve {
    /// Both dimensions scale linearly with progress.
    Linear,
    /// Both dimensions follow a sine ease-out.
    SineEase,
    /// The footer first grows to full height as a thin vertical sliver
    /// (first half of the phase), then expands to full width (second half).
    #[default]
    GrowThenExpand,
}

impl AnimationCurve {
    /// Width fraction at entry progress `p`.
    pub fn width_factor(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        match self {
            AnimationCurve::Linear => p,
            AnimationCurve::SineEase => (p * std::f64::consts::FRAC_PI_2).sin(),
            AnimationCurve::GrowThenExpand => (2.0 * p - 1.0).clamp(0.0, 1.0),
        }
    }

    /// Height fraction at entry progress `p`.
    pub fn height_factor(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        match self {
            AnimationCurve::Linear => p,
            AnimationCurve::SineEase => (p * std::f64::consts::FRAC_PI_2).sin(),
            AnimationCurve::GrowThenExpand => (2.0 * p).clamp(0.0, 1.0),
        }
    }
}
