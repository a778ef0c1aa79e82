use chrono::Local;
use iced::widget::{button, column, container, row, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use std::sync::Arc;
use tracing::{info, warn};

mod capture;
mod config;
mod logging;
mod scan;

use capture::{AcquisitionError, AcquisitionService, CaptureOrigin, ImageCapture};
use config::ScannerConfig;
use scan::decoder::DigestDecoder;
use scan::flow::{CameraScan, ScanFlow};
use scan::reference::ReferenceSet;
use scan::{Resolver, ScanResult};

/// How the user feeds a barcode in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    Camera,
    Manual,
}

/// Scanner screen state
struct CrateGuardian {
    /// Acquisition + resolution, shared with background tasks
    flow: ScanFlow,
    mode: ScanMode,
    manual_code: String,
    /// A scan is running; further scans are refused until it returns
    scanning: bool,
    result: Option<ScanResult>,
    /// Photo from the last camera scan
    preview: Option<iced::widget::image::Handle>,
    /// Where and when that photo was taken
    capture_note: Option<String>,
    /// Last acquisition failure, shown with a retry button
    error: Option<String>,
    source_label: &'static str,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    SetMode(ScanMode),
    /// User clicked "Start Scan"
    StartScan,
    CameraScanned(Result<CameraScan, AcquisitionError>),
    ManualCodeChanged(String),
    SubmitManual,
    ManualScanned(Option<ScanResult>),
    ViewDetails,
    RegisterCrate,
    Reset,
}

impl CrateGuardian {
    fn new() -> (Self, Task<Message>) {
        let config = load_config();

        // Configured dataset, or the demo crates when it cannot be read
        let reference = config.reference_set().unwrap_or_else(|e| {
            warn!("⚠️  Could not load reference dataset ({}), using demo crates", e);
            ReferenceSet::demo()
        });
        if reference.is_empty() {
            warn!("⚠️  Reference dataset is empty, every scan will be reported as not found");
        }

        // Camera or file picker is decided here, once

        let acquisition = Arc::new(AcquisitionService::new());
        let resolver = Arc::new(Resolver::new(reference, DigestDecoder::demo()));
        let flow = ScanFlow::new(acquisition, resolver, config.scan_delay());

        info!(
            "🎨 Crate Guardian scanner ready with {} reference crates",
            flow.reference_len()
        );

        let source_label = if flow.native_camera() {
            CaptureOrigin::NativeCamera.label()
        } else {
            CaptureOrigin::FilePicker.label()
        };

        (
            CrateGuardian {
                flow,
                mode: ScanMode::Camera,
                manual_code: String::new(),
                scanning: false,
                result: None,
                preview: None,
                capture_note: None,
                error: None,
                source_label,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SetMode(mode) => {
                self.mode = mode;
                // A camera failure means nothing once the user switched away
                self.error = None;
                Task::none()
            }
            Message::StartScan => {
                // One scan at a time, the button is disabled meanwhile
                if self.scanning {
                    return Task::none();
                }
                self.begin_scan();

                // Acquire, wait and resolve in the background
                Task::perform(self.flow.clone().scan_camera(), Message::CameraScanned)
            }
            Message::CameraScanned(outcome) => {
                self.scanning = false;
                match outcome {
                    Ok(scan) => {
                        // Show the photo next to what it resolved to
                        self.preview = Some(iced::widget::image::Handle::from_bytes(
                            scan.capture.bytes().to_vec(),
                        ));
                        self.capture_note = Some(capture_note(&scan.capture));
                        self.result = Some(scan.result);
                    }
                    // Dismissing the dialog or camera is not an error
                    Err(e) if e.is_cancellation() => {}
                    Err(e) => {
                        self.error = Some(e.to_string());
                    }
                }
                Task::none()
            }
            Message::ManualCodeChanged(code) => {
                self.manual_code = code;
                Task::none()
            }
            Message::SubmitManual => {
                // Enter on a blank field does nothing
                if self.scanning || self.manual_code.trim().is_empty() {
                    return Task::none();
                }
                self.begin_scan();
                Task::perform(
                    self.flow.clone().scan_manual(self.manual_code.clone()),
                    Message::ManualScanned,
                )
            }
            Message::ManualScanned(result) => {
                self.scanning = false;
                self.result = result;
                Task::none()
            }
            // Detail and registration screens are out of scope, log only
            Message::ViewDetails => {
                if let Some(crate_id) = self.result.as_ref().and_then(|r| r.crate_id.as_deref()) {
                    info!("View details for crate {}", crate_id);
                }
                Task::none()
            }
            Message::RegisterCrate => {
                if let Some(result) = &self.result {
                    info!("Register new crate with barcode {}", result.barcode);
                }
                Task::none()
            }
            Message::Reset => {
                self.result = None;
                self.preview = None;
                self.capture_note = None;
                self.error = None;
                self.manual_code.clear();
                Task::none()
            }
        }
    }

    /// Clear the previous outcome; each scan replaces it wholesale
    fn begin_scan(&mut self) {
        self.scanning = true;
        self.result = None;
        self.preview = None;
        self.capture_note = None;
        self.error = None;
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let mode_toggle = row![
            mode_button("Camera", ScanMode::Camera, self.mode),
            mode_button("Manual", ScanMode::Manual, self.mode),
        ]
        .spacing(8);

        let scanner: Element<Message> = match self.mode {
            ScanMode::Camera => {
                let label = if self.scanning { "Scanning..." } else { "Start Scan" };
                column![
                    text(if self.scanning {
                        "Scanning..."
                    } else {
                        "Position barcode in frame"
                    })
                    .size(16),
                    button(label)
                        .on_press_maybe((!self.scanning).then_some(Message::StartScan))
                        .padding(10),
                ]
                .spacing(12)
                .align_x(Alignment::Center)
                .into()
            }
            ScanMode::Manual => {
                let can_submit = !self.scanning && !self.manual_code.trim().is_empty();
                column![
                    text_input("Enter barcode (e.g. WH001234)", &self.manual_code)
                        .on_input(Message::ManualCodeChanged)
                        .on_submit(Message::SubmitManual)
                        .padding(10),
                    button(if self.scanning { "Looking up..." } else { "Look Up" })
                        .on_press_maybe(can_submit.then_some(Message::SubmitManual))
                        .padding(10),
                ]
                .spacing(12)
                .into()
            }
        };

        let mut content: Column<Message> = column![
            text("Barcode Scanner").size(36),
            text("Scan or enter barcode to find crate information").size(16),
            mode_toggle,
            scanner,
        ]
        .spacing(20)
        .padding(40)
        .max_width(640.0)
        .align_x(Alignment::Center);

        // Retry only makes sense for camera scans
        if let (ScanMode::Camera, Some(error)) = (self.mode, &self.error) {
            content = content.push(
                column![
                    text(format!("⚠️  {}", error)).size(16),
                    button("Try Again").on_press(Message::StartScan).padding(10),
                ]
                .spacing(8)
                .align_x(Alignment::Center),
            );
        }

        if let Some(handle) = &self.preview {
            content = content.push(iced::widget::image(handle.clone()).height(Length::Fixed(200.0)));
        }

        if let Some(note) = &self.capture_note {
            content = content.push(text(note).size(12));
        }

        if let Some(result) = &self.result {
            content = content.push(result_card(result));
        }

        content = content.push(text(format!("Image source: {}", self.source_label)).size(12));

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn mode_button(label: &str, mode: ScanMode, current: ScanMode) -> Element<'_, Message> {
    let style = if mode == current {
        button::primary
    } else {
        button::secondary
    };
    button(text(label))
        .style(style)
        .on_press(Message::SetMode(mode))
        .padding(8)
        .into()
}

/// "Native camera, 14:02:11 (640x480)" style caption for a photo
fn capture_note(capture: &ImageCapture) -> String {
    let (width, height) = capture.dimensions();
    format!(
        "{}, {} ({}x{})",
        capture.origin().label(),
        capture.captured_at().with_timezone(&Local).format("%H:%M:%S"),
        width,
        height
    )
}

fn result_card(result: &ScanResult) -> Element<'_, Message> {
    if result.found {
        column![
            text("✅ Crate Found").size(24),
            text(format!("Barcode: {}", result.barcode)),
            text(format!("Crate ID: {}", result.crate_id.as_deref().unwrap_or("-"))),
            text(format!("Customer: {}", result.customer_name.as_deref().unwrap_or("-"))),
            text(format!(
                "Status: {}",
                result.status.map(|s| s.label()).unwrap_or("-")
            )),
            row![
                button("View Details").on_press(Message::ViewDetails).padding(10),
                button("Scan Another").on_press(Message::Reset).padding(10),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .into()
    } else {
        column![
            text("❌ Crate Not Found").size(24),
            text(format!("No crate found with barcode: {}", result.barcode)),
            row![
                button("Register New Crate").on_press(Message::RegisterCrate).padding(10),
                button("Scan Another").on_press(Message::Reset).padding(10),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .into()
    }
}

/// Config from the user's config directory, defaults when absent or broken
fn load_config() -> ScannerConfig {
    let Some(path) = ScannerConfig::default_path() else {
        return ScannerConfig::default();
    };

    ScannerConfig::load(&path).unwrap_or_else(|e| {
        warn!("⚠️  Ignoring config {}: {}", path.display(), e);
        ScannerConfig::default()
    })
}

fn main() -> iced::Result {
    logging::init();

    iced::application("Crate Guardian", CrateGuardian::update, CrateGuardian::view)
        .theme(CrateGuardian::theme)
        .centered()
        .run_with(CrateGuardian::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn screen() -> CrateGuardian {
        let acquisition = Arc::new(AcquisitionService::from_detected(None));
        let resolver = Arc::new(Resolver::new(ReferenceSet::demo(), DigestDecoder::demo()));
        CrateGuardian {
            flow: ScanFlow::new(acquisition, resolver, Duration::ZERO),
            mode: ScanMode::Camera,
            manual_code: String::new(),
            scanning: false,
            result: None,
            preview: None,
            capture_note: None,
            error: None,
            source_label: CaptureOrigin::FilePicker.label(),
        }
    }

    #[test]
    fn test_mode_switch_clears_camera_error() {
        let mut app = screen();
        let _ = app.update(Message::CameraScanned(Err(AcquisitionError::Platform(
            "camera timed out".to_string(),
        ))));
        assert_eq!(app.error.as_deref(), Some("camera rejected the capture: camera timed out"));
        assert!(!app.scanning);

        let _ = app.update(Message::SetMode(ScanMode::Manual));
        assert_eq!(app.mode, ScanMode::Manual);
        assert_eq!(app.error, None);
    }

    #[test]
    fn test_cancelled_scan_leaves_no_error() {
        let mut app = screen();
        app.scanning = true;
        let _ = app.update(Message::CameraScanned(Err(AcquisitionError::Cancelled)));
        assert!(!app.scanning);
        assert_eq!(app.error, None);
        assert_eq!(app.capture_note, None);
    }

    #[test]
    fn test_capture_note_names_origin_and_size() {
        let capture =
            ImageCapture::from_bytes(capture::test_png(8, 6, 30), CaptureOrigin::FilePicker).unwrap();
        let note = capture_note(&capture);
        assert!(note.starts_with("File picker fallback, "));
        assert!(note.ends_with("(8x6)"));
    }
}
