use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use crate::error::KioskError;
use crate::models::{CapturedFrame, Orientation};

use super::backend::{CameraBackend, CameraFeed};
use super::crop::{crop_to_target, encode_jpeg};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns the camera feed and the countdown token for the current session.
///
/// The feed is a scoped resource: every exit path out of CAMERA (capture,
/// cancellation, navigation away, error) runs through `close` or
/// `take_feed`, so no hardware handle outlives the guest session.
pub struct CaptureEngine {
    backend: Arc<dyn CameraBackend>,
    feed: Option<Box<dyn CameraFeed>>,
    countdown: Option<CancellationToken>,
}

impl CaptureEngine {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            feed: None,
            countdown: None,
        }
    }

    /// Acquire the camera. Already-open feeds are kept as-is so a retry
    /// after a transient error is cheap.
    pub fn open(&mut self, orientation: Orientation) -> Result<(), KioskError> {
        if self.feed.is_some() {
            return Ok(());
        }
        let feed = self
            .backend
            .open(orientation)
            .map_err(|err| KioskError::HardwareUnavailable(format!("{err:#}")))?;
        log_info!("camera feed opened");
        self.feed = Some(feed);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.feed.is_some()
    }

    /// Release the hardware and abort any running countdown. Idempotent.
    pub fn close(&mut self) {
        self.cancel_countdown();
        if self.feed.take().is_some() {
            log_info!("camera feed released");
        }
    }

    pub fn begin_countdown(&mut self) -> Result<CancellationToken> {
        if self.feed.is_none() {
            bail!("camera is not open");
        }
        if self.countdown.is_some() {
            bail!("countdown already running");
        }
        let token = CancellationToken::new();
        self.countdown = Some(token.clone());
        Ok(token)
    }

    /// Stop the countdown at the current tick. The feed stays live and no
    /// frame is produced.
    pub fn cancel_countdown(&mut self) {
        if let Some(token) = self.countdown.take() {
            token.cancel();
            log_info!("countdown cancelled, camera feed stays live");
        }
    }

    /// Clear the countdown slot after it ran to completion.
    pub fn finish_countdown(&mut self) {
        self.countdown = None;
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.is_some()
    }

    /// Hand the feed to the capture stage. The engine no longer owns it; the
    /// capture stage drops it as soon as the still exists.
    pub fn take_feed(&mut self) -> Option<Box<dyn CameraFeed>> {
        self.feed.take()
    }
}

/// Grab one still, normalize it to the target dimensions and JPEG-encode it.
///
/// Consumes the feed: the hardware is released the moment the raw frame is
/// in memory, which coincides with the transition out of CAMERA. Blocking;
/// run on a blocking thread.
pub fn capture_still(
    mut feed: Box<dyn CameraFeed>,
    orientation: Orientation,
) -> Result<CapturedFrame, KioskError> {
    let started = Instant::now();

    let raw = match feed.grab() {
        Ok(raw) => raw,
        Err(err) => {
            log_warn!("frame grab failed: {err:#}");
            return Err(KioskError::HardwareUnavailable(format!("{err:#}")));
        }
    };
    drop(feed);

    let (raw_w, raw_h) = raw.dimensions();
    let framed = crop_to_target(&raw, orientation);
    let (width, height) = framed.dimensions();

    let jpeg = encode_jpeg(&framed)
        .map_err(|err| KioskError::HardwareUnavailable(format!("frame encode failed: {err:#}")))?;

    log_info!(
        "captured {raw_w}x{raw_h} feed frame -> {width}x{height} jpeg ({} bytes) in {}ms",
        jpeg.len(),
        started.elapsed().as_millis()
    );

    Ok(CapturedFrame {
        jpeg,
        width,
        height,
    })
}
