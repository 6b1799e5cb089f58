//! Segment splitter.
//!
//! Cuts one source video into N ordered sub-segments at the given time
//! boundaries. Each segment carries its offset, the time within the
//! original source at which it begins, which is what the overlay timing
//! compiler keys on.

use std::path::PathBuf;

use vivacast_av::{actions, probe_duration};
use vivacast_core::timing::SegmentSpan;
use vivacast_core::{Error, Result};

use crate::context::PipelineContext;

/// A probed source video, immutable once created.
#[derive(Debug, Clone)]
pub struct SourceVideo {
    pub path: PathBuf,
    /// Total duration in seconds.
    pub duration: f64,
}

/// A time-bounded extract of a source video.
#[derive(Debug, Clone)]
pub struct Segment {
    pub path: PathBuf,
    /// Seconds from the start of the source at which this segment begins.
    pub offset: f64,
    /// Length of the segment in seconds.
    pub duration: f64,
}

impl Segment {
    /// Timing-compiler view of this segment.
    pub fn span(&self) -> SegmentSpan {
        SegmentSpan {
            offset: self.offset,
            duration: self.duration,
        }
    }
}

/// Cut `source` at the given ascending boundaries, producing N = len + 1
/// segments.
///
/// Segment files are registered for cleanup before extraction runs, so a
/// partially written cut is collected even when the engine fails mid-way.
/// When `split.reprobe_after_cut` is set (the default), each extracted file
/// is re-probed: stream-copy cuts snap to keyframes and the actual duration
/// can differ from the request by up to one GOP.
pub async fn split(
    ctx: &PipelineContext,
    source: &SourceVideo,
    boundaries: &[f64],
) -> Result<Vec<Segment>> {
    validate_boundaries(boundaries, source.duration)?;

    let ffmpeg = ctx.tools.require("ffmpeg")?;
    let count = boundaries.len() + 1;

    let mut segments = Vec::with_capacity(count);
    for index in 0..count {
        let start = if index == 0 {
            0.0
        } else {
            boundaries[index - 1]
        };
        let end = if index == count - 1 {
            source.duration
        } else {
            boundaries[index]
        };
        let requested = end - start;

        let output = ctx.work_dir.join(format!("part{}.mp4", index + 1));
        ctx.artifacts.register(&output);

        tracing::info!(
            "Cutting {} [{start:.3}s..{end:.3}s] -> {}",
            source.path.display(),
            output.display()
        );

        // The last cut runs to the end of the input rather than trusting a
        // computed length against the probed total.
        let length = (index < count - 1).then_some(requested);
        actions::extract(&ffmpeg, &source.path, start, length, &output).await?;

        let duration = if ctx.config.split.reprobe_after_cut {
            let ffprobe = ctx.tools.require("ffprobe")?;
            probe_duration(&ffprobe, &output).await?
        } else {
            requested
        };

        segments.push(Segment {
            path: output,
            offset: start,
            duration,
        });
    }

    Ok(segments)
}

fn validate_boundaries(boundaries: &[f64], source_duration: f64) -> Result<()> {
    let mut previous = 0.0;
    for &boundary in boundaries {
        if boundary <= previous {
            return Err(Error::Validation(format!(
                "split boundaries must be strictly ascending and positive (got {boundary} after {previous})"
            )));
        }
        if boundary >= source_duration {
            return Err(Error::Validation(format!(
                "split boundary {boundary} is beyond the source duration {source_duration}"
            )));
        }
        previous = boundary;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_must_ascend() {
        assert!(validate_boundaries(&[100.0, 200.0], 600.0).is_ok());
        assert!(validate_boundaries(&[], 600.0).is_ok());
        assert!(validate_boundaries(&[200.0, 100.0], 600.0).is_err());
        assert!(validate_boundaries(&[0.0], 600.0).is_err());
        assert!(validate_boundaries(&[600.0], 600.0).is_err());
    }

    #[test]
    fn segment_span_mirrors_fields() {
        let segment = Segment {
            path: PathBuf::from("part2.mp4"),
            offset: 300.0,
            duration: 299.5,
        };
        let span = segment.span();
        assert_eq!(span.offset, 300.0);
        assert_eq!(span.duration, 299.5);
    }
}
