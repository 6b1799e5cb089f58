//! Relay driver: streams the planned sequence to the destination endpoint.
//!
//! State machine `Idle -> Starting -> Streaming -> {Completed | Failed}`.
//! While streaming, a one-second ticker reports remaining time against the
//! planned total; the tick loop is observational only and is torn down the
//! instant the transport process exits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use vivacast_core::config::{EncodeConfig, RelayConfig};
use vivacast_core::{Error, Result};

use crate::context::ProgressSender;

/// Observable relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Starting,
    Streaming,
    Completed,
    Failed(i32),
}

/// Drives the transport process for one broadcast.
#[derive(Debug)]
pub struct RelayDriver {
    program: PathBuf,
    relay: RelayConfig,
    encode: EncodeConfig,
    state: RelayState,
}

impl RelayDriver {
    pub fn new(program: impl Into<PathBuf>, relay: RelayConfig, encode: EncodeConfig) -> Self {
        Self {
            program: program.into(),
            relay,
            encode,
            state: RelayState::Idle,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Transport invocation for the given manifest and destination.
    ///
    /// Reads the concat manifest in real time (`-re`), normalizes to the
    /// configured frame size with letterboxing, and muxes FLV for RTMP-style
    /// endpoints.
    pub fn args(&self, manifest: &Path, stream_url: &str) -> Vec<String> {
        let w = self.encode.width;
        let h = self.encode.height;
        let scale = format!(
            "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        );
        vec![
            "-re".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            manifest.to_string_lossy().into_owned(),
            "-vf".into(),
            scale,
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.encode.video_preset.clone(),
            "-maxrate".into(),
            self.relay.maxrate.clone(),
            "-bufsize".into(),
            self.relay.bufsize.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-g".into(),
            self.relay.gop.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            self.relay.audio_bitrate.clone(),
            "-ar".into(),
            self.encode.audio_rate.to_string(),
            "-f".into(),
            "flv".into(),
            stream_url.to_string(),
        ]
    }

    /// Run the relay to completion.
    ///
    /// Exit code `0` resolves to `Completed` and `Ok(())`; any nonzero code
    /// resolves to `Failed` and [`Error::Relay`] carrying that code so the
    /// process boundary can forward it. Cancellation kills the transport and
    /// reports as a relay failure.
    pub async fn run(
        &mut self,
        manifest: &Path,
        stream_url: &str,
        total_duration: f64,
        cancellation: &CancellationToken,
        progress: &ProgressSender,
    ) -> Result<()> {
        self.state = RelayState::Starting;
        tracing::info!(
            "Starting relay of {} ({total_duration:.1}s planned)",
            manifest.display()
        );

        // Engine diagnostics go straight to the operator's terminal; on a
        // nonzero exit the code alone is not enough to act on.
        let mut child = Command::new(&self.program)
            .args(self.args(manifest, stream_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.state = RelayState::Failed(1);
                Error::tool("relay", format!("failed to spawn {}: {e}", self.program.display()))
            })?;

        self.state = RelayState::Streaming;
        let started = Instant::now();

        // First tick one second after start, then every second. Skipped ticks
        // (a slow subscriber) are dropped, not replayed.
        let mut ticker = interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let status = loop {
            tokio::select! {
                // Exit detection always wins over a coincident tick.
                biased;
                status = child.wait() => {
                    break status.map_err(|e| Error::tool("relay", format!("wait failed: {e}")))?;
                }
                _ = cancellation.cancelled() => {
                    tracing::warn!("Relay cancelled; terminating transport");
                    let _ = child.kill().await;
                    self.state = RelayState::Failed(1);
                    return Err(Error::pipeline("relay", "cancelled"));
                }
                _ = ticker.tick() => {
                    let elapsed = started.elapsed().as_secs_f64();
                    let left = remaining(total_duration, elapsed);
                    let pct = if total_duration > 0.0 {
                        ((elapsed / total_duration) * 100.0).min(100.0) as f32
                    } else {
                        0.0
                    };
                    progress.send(pct, &format!("streaming, {left:.0}s remaining"));
                    tracing::info!("Streaming: {elapsed:.0}s elapsed, {left:.0}s remaining");
                }
            }
        };

        if status.success() {
            self.state = RelayState::Completed;
            tracing::info!("Relay completed after {:.0}s", started.elapsed().as_secs_f64());
            Ok(())
        } else {
            let code = status.code().unwrap_or(1);
            self.state = RelayState::Failed(code);
            Err(Error::Relay { code })
        }
    }
}

/// Seconds of broadcast left, floored at zero.
pub fn remaining(total_duration: f64, elapsed: f64) -> f64 {
    (total_duration - elapsed).max(0.0)
}
