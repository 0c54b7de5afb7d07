use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use log::{error, warn};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use crate::models::Orientation;

/// A live camera feed. Whoever holds the box owns the hardware; dropping it
/// releases the device.
pub trait CameraFeed: Send {
    fn grab(&mut self) -> Result<RgbImage>;
}

pub trait CameraBackend: Send + Sync {
    fn open(&self, orientation: Orientation) -> Result<Box<dyn CameraFeed>>;
}

enum FeedCommand {
    Grab(mpsc::Sender<Result<RgbImage>>),
    Shutdown,
}

/// Default backend: first native device at its highest native resolution.
///
/// The device handle lives on a dedicated worker thread and is driven over a
/// command channel, so the feed handle itself can move freely between tasks.
/// The target ratio is enforced later by the crop stage, so the physical
/// format does not matter here.
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    fn open(&self, _orientation: Orientation) -> Result<Box<dyn CameraFeed>> {
        let (sender, commands) = mpsc::channel::<FeedCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let worker = thread::Builder::new()
            .name("camera-feed".into())
            .spawn(move || {
                let mut camera = match open_native_camera() {
                    Ok(camera) => {
                        let _ = ready_tx.send(Ok(()));
                        camera
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(command) = commands.recv() {
                    match command {
                        FeedCommand::Grab(reply) => {
                            let _ = reply.send(grab_frame(&mut camera));
                        }
                        FeedCommand::Shutdown => break,
                    }
                }

                if let Err(err) = camera.stop_stream() {
                    warn!("camera stream did not stop cleanly: {err}");
                }
            })
            .context("failed to spawn camera worker thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("camera worker exited before reporting readiness"))??;

        Ok(Box::new(NokhwaFeed {
            sender,
            worker: Some(worker),
        }))
    }
}

fn open_native_camera() -> Result<Camera> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera =
        Camera::new(CameraIndex::Index(0), requested).context("no usable camera device")?;
    camera
        .open_stream()
        .context("camera stream refused to open")?;
    Ok(camera)
}

fn grab_frame(camera: &mut Camera) -> Result<RgbImage> {
    let buffer = camera.frame().context("camera frame grab failed")?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .context("camera frame decode failed")?;
    // Rebuild from the raw container; nokhwa links its own image version.
    let (width, height) = (decoded.width(), decoded.height());
    RgbImage::from_raw(width, height, decoded.into_raw())
        .ok_or_else(|| anyhow!("camera frame had inconsistent dimensions"))
}

struct NokhwaFeed {
    sender: mpsc::Sender<FeedCommand>,
    worker: Option<JoinHandle<()>>,
}

impl CameraFeed for NokhwaFeed {
    fn grab(&mut self) -> Result<RgbImage> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.sender
            .send(FeedCommand::Grab(reply_tx))
            .map_err(|_| anyhow!("camera worker is gone"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("camera worker died mid-grab"))?
    }
}

impl Drop for NokhwaFeed {
    fn drop(&mut self) {
        let _ = self.sender.send(FeedCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("camera worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use image::Rgb;

    /// Backend producing solid-color frames of a fixed size, or refusing to
    /// open at all, for driving the engine and controller in tests.
    pub(crate) struct StaticBackend {
        pub width: u32,
        pub height: u32,
        pub fail_open: bool,
    }

    impl StaticBackend {
        pub fn working(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                fail_open: false,
            }
        }

        pub fn broken() -> Self {
            Self {
                width: 0,
                height: 0,
                fail_open: true,
            }
        }
    }

    impl CameraBackend for StaticBackend {
        fn open(&self, _orientation: Orientation) -> Result<Box<dyn CameraFeed>> {
            if self.fail_open {
                anyhow::bail!("device revoked");
            }
            Ok(Box::new(StaticFeed {
                width: self.width,
                height: self.height,
            }))
        }
    }

    struct StaticFeed {
        width: u32,
        height: u32,
    }

    impl CameraFeed for StaticFeed {
        fn grab(&mut self) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(
                self.width,
                self.height,
                Rgb([120, 90, 60]),
            ))
        }
    }
}
