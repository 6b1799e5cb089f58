//! Overlay compositing request builder.
//!
//! Translates a segment's compiled timing plus the two static images into a
//! declarative [`CompositingRequest`]. Segments the overlay window never
//! touches degrade to a logo-only request; that is a defined outcome, not an
//! error.

use std::path::{Path, PathBuf};

use vivacast_av::{actions, CompositingRequest, FooterLayer};
use vivacast_core::config::OverlayConfig;
use vivacast_core::timing::{self, SegmentSpan};
use vivacast_core::Result;

use crate::context::PipelineContext;
use crate::split::Segment;

/// Build the compositing request for one segment.
pub fn build_request(
    overlay: &OverlayConfig,
    logo: &Path,
    footer: &Path,
    segment: &SegmentSpan,
) -> CompositingRequest {
    let timing = timing::compile(&overlay.window(), segment, overlay.edge_policy);

    let footer_layer = if timing.visible {
        Some(FooterLayer {
            image: footer.to_path_buf(),
            timing,
            curve: overlay.curve,
            height_fraction: overlay.footer_height_fraction,
            min_width: overlay.footer_min_width,
        })
    } else {
        tracing::info!(
            "Overlay window misses segment at offset {:.3}s; applying logo only",
            segment.offset
        );
        None
    };

    CompositingRequest {
        video: PathBuf::new(),
        logo: logo.to_path_buf(),
        logo_height: overlay.logo_height,
        footer: footer_layer,
    }
}

/// Composite the overlay onto `segment`, producing a new rendered artifact.
///
/// The rendered file supersedes the pre-overlay segment; both stay
/// registered, and the superseded input is collected at cleanup.
pub async fn apply(
    ctx: &PipelineContext,
    segment: &Segment,
    logo: &Path,
    footer: &Path,
    output: &Path,
) -> Result<PathBuf> {
    let ffmpeg = ctx.tools.require("ffmpeg")?;

    let mut request = build_request(&ctx.config.overlay, logo, footer, &segment.span());
    request.video = segment.path.clone();

    if let Some(layer) = request.footer.as_ref() {
        tracing::info!(
            "Footer visible on {} between {:.2}s and {:.2}s",
            segment.path.display(),
            layer.timing.visible_start().unwrap_or_default(),
            layer.timing.visible_end().unwrap_or_default()
        );
    }

    ctx.artifacts.register(output);
    actions::composite(&ffmpeg, &request, output, &ctx.config.encode).await?;
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay_config() -> OverlayConfig {
        OverlayConfig::default()
    }

    #[test]
    fn intersecting_segment_gets_footer() {
        let span = SegmentSpan {
            offset: 0.0,
            duration: 300.0,
        };
        let request = build_request(
            &overlay_config(),
            Path::new("logo.png"),
            Path::new("footer.png"),
            &span,
        );
        assert!(request.has_footer());
        let footer = request.footer.unwrap();
        assert_eq!(footer.image, PathBuf::from("footer.png"));
        assert_eq!(footer.height_fraction, 0.5);
    }

    #[test]
    fn missed_segment_gets_logo_only() {
        // Default window is [240, 300]; this segment starts at 300.
        let span = SegmentSpan {
            offset: 300.0,
            duration: 300.0,
        };
        let request = build_request(
            &overlay_config(),
            Path::new("logo.png"),
            Path::new("footer.png"),
            &span,
        );
        assert!(!request.has_footer());
        assert!(request.footer.is_none());
        assert_eq!(request.logo_height, 120);
    }

    #[test]
    fn request_is_deterministic() {
        let span = SegmentSpan {
            offset: 120.0,
            duration: 480.0,
        };
        let a = build_request(
            &overlay_config(),
            Path::new("logo.png"),
            Path::new("footer.png"),
            &span,
        );
        let b = build_request(
            &overlay_config(),
            Path::new("logo.png"),
            Path::new("footer.png"),
            &span,
        );
        assert_eq!(a.filter_graph(), b.filter_graph());
    }
}
