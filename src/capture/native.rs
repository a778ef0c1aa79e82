/// Native camera capture
///
/// On desktop the "platform camera" is the primary capture device, driven
/// through ffmpeg to grab exactly one frame. The device contract mirrors a
/// mobile camera plugin: fixed quality, no editing, rear/primary camera,
/// result delivered as a data URI.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{data_uri, AcquisitionError, CaptureOrigin, ImageCapture, ImageSource};

/// JPEG quality requested from the camera (percent)
pub const PHOTO_QUALITY: u8 = 90;

/// Longest a single photo request may take before it is abandoned
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// Which physical camera to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    /// Environment-facing, the primary device on desktops
    Rear,
    Front,
}

/// Options for a single photo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoOptions {
    pub quality: u8,
    pub allow_editing: bool,
    pub facing: CameraFacing,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            quality: PHOTO_QUALITY,
            allow_editing: false,
            facing: CameraFacing::Rear,
        }
    }
}

/// A camera the platform can take a single photo with
///
/// `get_photo` resolves once the photo is taken and returns it as a
/// self-contained data URI. Dropping the future abandons the capture.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn name(&self) -> String;

    /// Whether the device can be used right now
    fn is_available(&self) -> bool;

    async fn get_photo(&self, options: &PhotoOptions) -> Result<String, AcquisitionError>;
}

/// Primary capture device grabbed through ffmpeg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCamera {
    input_format: &'static str,
    device: String,
}

impl FfmpegCamera {
    /// A Video4Linux device node
    pub fn v4l2(device: impl Into<String>) -> Self {
        Self {
            input_format: "v4l2",
            device: device.into(),
        }
    }

    /// The platform's primary capture device, if the platform has one
    pub fn locate() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Self::v4l2("/dev/video0"))
        } else if cfg!(target_os = "macos") {
            // avfoundation devices are indices, take the first real camera
            let listing = avfoundation_device_listing()?;
            let index = camera_indices(&listing).into_iter().next()?;
            Some(Self {
                input_format: "avfoundation",
                device: index,
            })
        } else {
            None
        }
    }

    /// Whether this process can actually open the device
    fn device_usable(&self) -> bool {
        if self.input_format != "v4l2" {
            // avfoundation indices come straight from ffmpeg's own listing
            return true;
        }

        match OpenOptions::new().read(true).open(Path::new(&self.device)) {
            Ok(_) => true,
            Err(e) => {
                debug!("Cannot open {}: {}", self.device, e);
                false
            }
        }
    }
}

#[async_trait]
impl CameraDevice for FfmpegCamera {
    fn name(&self) -> String {
        format!("{} {}", self.input_format, self.device)
    }

    fn is_available(&self) -> bool {
        self.device_usable() && ffmpeg_runs()
    }

    async fn get_photo(&self, options: &PhotoOptions) -> Result<String, AcquisitionError> {
        if options.facing == CameraFacing::Front {
            debug!("Desktop exposes a single primary camera, ignoring front facing request");
        }
        if options.allow_editing {
            debug!("No in-place editor on desktop, returning the frame as captured");
        }

        // Scratch JPEG, removed when `target` drops
        let target = tempfile::Builder::new()
            .prefix("crate_scan_")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| AcquisitionError::Platform(format!("failed to create temp file: {}", e)))?;

        // Grab exactly one frame; the child is killed if this future is dropped
        let qscale = ffmpeg_qscale(options.quality).to_string();
        let output = tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", self.input_format, "-i", self.device.as_str()])
            .args(["-frames:v", "1"])
            .args(["-q:v", qscale.as_str()])
            .arg(target.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AcquisitionError::Platform(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_ffmpeg_failure(&self.device, &stderr));
        }

        let bytes = tokio::fs::read(target.path())
            .await
            .map_err(|e| AcquisitionError::from_io(target.path(), &e))?;

        if bytes.is_empty() {
            return Err(AcquisitionError::EmptyImage);
        }

        Ok(data_uri::encode("image/jpeg", &bytes))
    }
}

/// Map a 0-100 quality percentage onto ffmpeg's 2 (best) .. 31 (worst) JPEG scale
pub fn ffmpeg_qscale(quality: u8) -> u8 {
    let quality = quality.min(100) as u32;
    (2 + (100 - quality) * 29 / 100) as u8
}

fn classify_ffmpeg_failure(device: &str, stderr: &str) -> AcquisitionError {
    if stderr.contains("Permission denied") || stderr.contains("not authorized") {
        AcquisitionError::PermissionDenied(device.to_string())
    } else if stderr.is_empty() {
        AcquisitionError::Platform("ffmpeg exited without output".to_string())
    } else {
        AcquisitionError::Platform(stderr.to_string())
    }
}

fn ffmpeg_runs() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// ffmpeg's avfoundation device listing (printed on stderr)
fn avfoundation_device_listing() -> Option<String> {
    // Exits non-zero by design since there is no real input
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""])
        .stdin(Stdio::null())
        .output()
        .ok()?;
    Some(String::from_utf8_lossy(&output.stderr).into_owned())
}

/// Indices of the cameras in an avfoundation device listing
///
/// Only the video section counts, and screen capture inputs are skipped.
fn camera_indices(listing: &str) -> Vec<String> {
    let mut in_video = false;
    let mut indices = Vec::new();

    for line in listing.lines() {
        if line.contains("AVFoundation video devices:") {
            in_video = true;
            continue;
        }
        if line.contains("AVFoundation audio devices:") {
            break;
        }
        if !in_video {
            continue;
        }

        // "[AVFoundation indev @ 0x..] [0] FaceTime HD Camera"
        let entry = line.split_once("] ").map(|(_, rest)| rest).unwrap_or(line);
        let Some((index, name)) = entry.strip_prefix('[').and_then(|e| e.split_once("] ")) else {
            continue;
        };
        if index.parse::<u32>().is_ok() && !name.starts_with("Capture screen") {
            indices.push(index.to_string());
        }
    }

    indices
}

/// The usable primary camera, located once per process
fn primary_camera() -> Option<&'static FfmpegCamera> {
    static PRIMARY: OnceLock<Option<FfmpegCamera>> = OnceLock::new();

    PRIMARY
        .get_or_init(|| {
            let camera = FfmpegCamera::locate().filter(|camera| camera.is_available());
            match &camera {
                Some(camera) => info!("🔍 Native camera capability: true ({})", camera.name()),
                None => info!("🔍 Native camera capability: false"),
            }
            camera
        })
        .as_ref()
}

/// Whether this process can capture from a native camera
///
/// Checked on first use and cached for the lifetime of the process.
pub fn native_capture_supported() -> bool {
    primary_camera().is_some()
}

/// The native camera variant of `ImageSource`
pub struct NativeCamera {
    device: Arc<dyn CameraDevice>,
    options: PhotoOptions,
    timeout: Duration,
}

impl NativeCamera {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            options: PhotoOptions::default(),
            timeout: CAPTURE_TIMEOUT,
        }
    }

    /// The platform camera, when the capability check found one
    pub fn detect() -> Option<Self> {
        if !native_capture_supported() {
            return None;
        }
        primary_camera().map(|camera| Self::new(Arc::new(camera.clone())))
    }
}

#[async_trait]
impl ImageSource for NativeCamera {
    fn origin(&self) -> CaptureOrigin {
        CaptureOrigin::NativeCamera
    }

    async fn acquire(&self) -> Result<ImageCapture, AcquisitionError> {
        info!(
            "📷 Requesting photo from {} (quality {})",
            self.device.name(),
            self.options.quality
        );

        // A device that never delivers must not leave the scan pending forever
        let uri = tokio::time::timeout(self.timeout, self.device.get_photo(&self.options))
            .await
            .map_err(|_| {
                warn!("⚠️  No photo from {} after {:?}", self.device.name(), self.timeout);
                AcquisitionError::Platform("camera timed out".to_string())
            })??;

        ImageCapture::from_data_uri(&uri, CaptureOrigin::NativeCamera)
    }
}
