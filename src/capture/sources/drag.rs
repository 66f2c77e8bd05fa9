//! Windows capture via manual drag selection.
//!
//! Windows ships no single interactive region-capture CLI, so the region
//! comes from the pointer instead: the user arms the capture with Enter,
//! then drags the rectangle out with the left button held. The primary
//! monitor is grabbed whole and cropped to the selection.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use device_query::{DeviceQuery, DeviceState};
use image::DynamicImage;
use tokio::task;

use crate::capture::region::SelectionRect;
use crate::capture::sources::CaptureSource;
use crate::capture::types::CaptureError;

const BUTTON_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// device_query's left mouse button index.
const LEFT_BUTTON: usize = 1;

pub struct DragSelectSource;

#[async_trait]
impl CaptureSource for DragSelectSource {
    fn name(&self) -> &'static str {
        "drag-select"
    }

    fn is_available(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn capture(&self, target: &Path) -> Result<(), CaptureError> {
        let path = target.to_path_buf();
        task::spawn_blocking(move || capture_selection(&path))
            .await
            .map_err(|e| CaptureError::ToolFailed(format!("capture task failed to join: {e}")))?
    }
}

fn capture_selection(target: &Path) -> Result<(), CaptureError> {
    let rect = select_region()?;
    let screen = grab_primary_monitor()?;
    let rect = rect
        .clamp_to(screen.width(), screen.height())
        .ok_or(CaptureError::EmptySelection)?;
    write_cropped_png(&screen, rect, target)
}

/// Two-click selection protocol: Enter arms the capture and records the
/// pointer, then the drag end point is wherever the left button is
/// released.
fn select_region() -> Result<SelectionRect, CaptureError> {
    println!("Press Enter to arm capture, then drag the region with the left button held...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let device = DeviceState::new();
    let start = device.get_mouse().coords;
    log::debug!("Capture armed at pointer position {start:?}");

    loop {
        if left_button_down(&device) {
            break;
        }
        std::thread::sleep(BUTTON_POLL_INTERVAL);
    }
    let end = loop {
        let mouse = device.get_mouse();
        if !mouse.button_pressed.get(LEFT_BUTTON).copied().unwrap_or(false) {
            break mouse.coords;
        }
        std::thread::sleep(BUTTON_POLL_INTERVAL);
    };
    log::debug!("Drag released at pointer position {end:?}");

    SelectionRect::from_corners(start, end).ok_or(CaptureError::EmptySelection)
}

fn left_button_down(device: &DeviceState) -> bool {
    device
        .get_mouse()
        .button_pressed
        .get(LEFT_BUTTON)
        .copied()
        .unwrap_or(false)
}

fn grab_primary_monitor() -> Result<DynamicImage, CaptureError> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| CaptureError::ToolFailed(format!("failed to enumerate monitors: {e}")))?;
    let primary = monitors
        .into_iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| xcap::Monitor::all().ok()?.into_iter().next())
        .ok_or_else(|| CaptureError::ToolFailed("no monitor found".into()))?;
    let image = primary
        .capture_image()
        .map_err(|e| CaptureError::ToolFailed(format!("screen capture failed: {e}")))?;
    Ok(DynamicImage::ImageRgba8(image))
}

fn write_cropped_png(
    screen: &DynamicImage,
    rect: SelectionRect,
    target: &Path,
) -> Result<(), CaptureError> {
    screen
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .save_with_format(target, image::ImageFormat::Png)
        .map_err(|e| CaptureError::ToolFailed(format!("failed to write screenshot: {e}")))
}
