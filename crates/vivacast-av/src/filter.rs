//! Typed compositing requests and their ffmpeg filter graph rendering.
//!
//! The animation math lives in `vivacast_core::timing`; this module only
//! translates an already-compiled timing into the compositing engine's
//! textual expression syntax. The generated `scale` expressions are piecewise
//! `if(lt(t,...))` chains, one branch per phase, evaluated per frame.

use std::path::PathBuf;

use vivacast_core::timing::{AnimationCurve, CompiledTiming, Phase, PhaseKind};

/// Declarative request consumed by the compositing engine.
///
/// The logo is always composited as a small fixed-corner element. The footer
/// layer is present only when the overlay window intersects the segment.
#[derive(Debug, Clone)]
pub struct CompositingRequest {
    /// Segment video to composite onto.
    pub video: PathBuf,
    /// Logo image, always visible.
    pub logo: PathBuf,
    /// Logo height in pixels; width follows the image aspect ratio.
    pub logo_height: u32,
    /// Animated footer layer, absent for segments the window misses.
    pub footer: Option<FooterLayer>,
}

/// The animated footer layer of a compositing request.
#[derive(Debug, Clone)]
pub struct FooterLayer {
    /// Footer image.
    pub image: PathBuf,
    /// Compiled, segment-relative visibility function.
    pub timing: CompiledTiming,
    /// Animation curve for entry/exit phases.
    pub curve: AnimationCurve,
    /// Full footer height as a fraction of the image height.
    pub height_fraction: f64,
    /// Minimal on-screen width in pixels during staged animation.
    pub min_width: f64,
}

impl CompositingRequest {
    /// Whether this request carries an active footer layer.
    pub fn has_footer(&self) -> bool {
        self.footer.as_ref().is_some_and(|f| f.timing.visible)
    }

    /// Render the full `-filter_complex` graph. The final video stream is
    /// labelled `[outv]`.
    pub fn filter_graph(&self) -> String {
        let logo_chain = format!(
            "[1:v]scale=-1:{logo_h}[logo]",
            logo_h = self.logo_height
        );

        match self.footer.as_ref().filter(|f| f.timing.visible) {
            None => format!("{logo_chain};[0:v][logo]overlay=W-w-1:15[outv]"),
            Some(footer) => {
                let width = piecewise(&footer.timing.phases, |p| footer.width_expr(p));
                let height = piecewise(&footer.timing.phases, |p| footer.height_expr(p));
                format!(
                    "{logo_chain};\
                     [2:v]format=rgba,scale=w='{width}':h='{height}':eval=frame[footer];\
                     [0:v][logo]overlay=W-w-1:15[base];\
                     [base][footer]overlay=x='(W-w)/2':y=H-h[outv]"
                )
            }
        }
    }
}

impl FooterLayer {
    /// Width expression for one phase, in pixels of the footer input.
    fn width_expr(&self, phase: &Phase) -> String {
        match phase.kind {
            PhaseKind::Hidden => "0".to_string(),
            PhaseKind::Hold => "iw".to_string(),
            PhaseKind::Enter => curve_width(&self.curve, &entry_progress(phase), self.min_width),
            PhaseKind::Exit => curve_width(&self.curve, &exit_progress(phase), self.min_width),
        }
    }

    /// Height expression for one phase, in pixels of the footer input.
    fn height_expr(&self, phase: &Phase) -> String {
        let full = format!("ih*{}", num(self.height_fraction));
        match phase.kind {
            PhaseKind::Hidden => "0".to_string(),
            PhaseKind::Hold => full,
            PhaseKind::Enter => curve_height(&self.curve, &entry_progress(phase), &full),
            PhaseKind::Exit => curve_height(&self.curve, &exit_progress(phase), &full),
        }
    }
}

/// Progress through an entry phase as an expression of `t`.
fn entry_progress(phase: &Phase) -> String {
    format!(
        "(t-{})/{}",
        num(phase.start),
        num(phase.end - phase.start)
    )
}

/// Mirrored progress for exit phases.
fn exit_progress(phase: &Phase) -> String {
    format!("(1-{})", entry_progress(phase))
}

fn curve_width(curve: &AnimationCurve, p: &str, min_width: f64) -> String {
    match curve {
        AnimationCurve::Linear => format!("({p})*iw"),
        AnimationCurve::SineEase => format!("sin(({p})*PI/2)*iw"),
        // Width stays at the sliver minimum through the first half, then
        // expands; max() keeps the sliver visible either way.
        AnimationCurve::GrowThenExpand => {
            format!("max((2*({p})-1)*iw,{})", num(min_width))
        }
    }
}

fn curve_height(curve: &AnimationCurve, p: &str, full: &str) -> String {
    match curve {
        AnimationCurve::Linear => format!("({p})*{full}"),
        AnimationCurve::SineEase => format!("sin(({p})*PI/2)*{full}"),
        AnimationCurve::GrowThenExpand => format!("min(2*({p}),1)*{full}"),
    }
}

/// Fold ordered phases into one nested `if(lt(t,end),...)` chain.
fn piecewise(phases: &[Phase], mut branch: impl FnMut(&Phase) -> String) -> String {
    let mut expr = String::from("0");
    for phase in phases.iter().rev() {
        expr = format!("if(lt(t,{}),{},{})", num(phase.end), branch(phase), expr);
    }
    expr
}

/// Format a number without trailing zeros, keeping sub-second precision.
pub(crate) fn num(v: f64) -> String {
    let s = format!("{v:.6}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivacast_core::timing::{compile, EdgePolicy, OverlayWindow, SegmentSpan};

    fn request_with_footer(timing: CompiledTiming) -> CompositingRequest {
        CompositingRequest {
            video: PathBuf::from("part1.mp4"),
            logo: PathBuf::from("logo.png"),
            logo_height: 120,
            footer: Some(FooterLayer {
                image: PathBuf::from("footer.png"),
                timing,
                curve: AnimationCurve::GrowThenExpand,
                height_fraction: 0.5,
                min_width: 10.0,
            }),
        }
    }

    fn compiled() -> CompiledTiming {
        let window = OverlayWindow {
            start_abs: 240.0,
            end_abs: 300.0,
            entry: 2.0,
            exit: 2.0,
        };
        let segment = SegmentSpan {
            offset: 0.0,
            duration: 300.0,
        };
        compile(&window, &segment, EdgePolicy::TruncatedExit)
    }

    #[test]
    fn logo_only_graph() {
        let request = CompositingRequest {
            video: PathBuf::from("part2.mp4"),
            logo: PathBuf::from("logo.png"),
            logo_height: 120,
            footer: None,
        };
        assert!(!request.has_footer());
        assert_eq!(
            request.filter_graph(),
            "[1:v]scale=-1:120[logo];[0:v][logo]overlay=W-w-1:15[outv]"
        );
    }

    #[test]
    fn invisible_footer_degrades_to_logo_only() {
        let request = request_with_footer(CompiledTiming::invisible());
        assert!(!request.has_footer());
        assert!(!request.filter_graph().contains("[footer]"));
    }

    #[test]
    fn animated_graph_structure() {
        let request = request_with_footer(compiled());
        assert!(request.has_footer());
        let graph = request.filter_graph();
        assert!(graph.contains("format=rgba"));
        assert!(graph.contains("eval=frame"));
        assert!(graph.contains("[base][footer]overlay=x='(W-w)/2':y=H-h[outv]"));
        // Phase boundaries appear as branch cutoffs.
        assert!(graph.contains("if(lt(t,240)"));
        assert!(graph.contains("if(lt(t,242)"));
        assert!(graph.contains("if(lt(t,298)"));
        assert!(graph.contains("if(lt(t,300)"));
    }

    #[test]
    fn grow_then_expand_keeps_sliver_width() {
        let request = request_with_footer(compiled());
        let graph = request.filter_graph();
        assert!(graph.contains("max((2*((t-240)/2)-1)*iw,10)"));
        assert!(graph.contains("min(2*((t-240)/2),1)*ih*0.5"));
    }

    #[test]
    fn exit_phase_mirrors_progress() {
        let request = request_with_footer(compiled());
        let graph = request.filter_graph();
        assert!(graph.contains("(1-(t-298)/2)"));
    }

    #[test]
    fn piecewise_order_matches_phases() {
        let phases = compiled().phases;
        let expr = piecewise(&phases, |p| match p.kind {
            PhaseKind::Hidden => "h".into(),
            PhaseKind::Enter => "e".into(),
            PhaseKind::Hold => "o".into(),
            PhaseKind::Exit => "x".into(),
        });
        // Earliest phase forms the outermost branch.
        assert!(expr.starts_with("if(lt(t,240),h,"));
        assert!(expr.ends_with("0))))"));
    }

    #[test]
    fn num_formatting() {
        assert_eq!(num(240.0), "240");
        assert_eq!(num(240.125), "240.125");
        assert_eq!(num(0.5), "0.5");
    }

    #[test]
    fn sine_curve_renders_trig() {
        let mut request = request_with_footer(compiled());
        request.footer.as_mut().unwrap().curve = AnimationCurve::SineEase;
        let graph = request.filter_graph();
        assert!(graph.contains("sin(((t-240)/2)*PI/2)*iw"));
    }
}
