use std::time::Duration;

use anyhow::Result;

use crate::{ColorFrame, DepthRange, DisplayFrame, GrayFrame, PointCloudFrame};

/// A borrowed pixel buffer in one of the layouts the windows understand.
#[derive(Debug, Clone, Copy)]
pub enum ImageView<'a> {
    Bgra(&'a ColorFrame),
    Gray(&'a GrayFrame),
}

impl ImageView<'_> {
    pub fn width(&self) -> u32 {
        match self {
            ImageView::Bgra(frame) => frame.width,
            ImageView::Gray(frame) => frame.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            ImageView::Bgra(frame) => frame.height,
            ImageView::Gray(frame) => frame.height,
        }
    }
}

/// Named 2-D image windows plus the keyboard poll that drives the main loop.
pub trait ImageWindows {
    fn show(&mut self, name: &str, image: ImageView<'_>) -> Result<()>;

    /// Waits up to `delay` for a key press and returns its code.
    fn wait_key(&mut self, delay: Duration) -> Result<Option<i32>>;

    fn destroy_all(&mut self) -> Result<()>;
}

/// A 3-D viewer that renders a colored point cloud widget.
pub trait CloudViewer {
    fn show_origin(&mut self, scale: f64) -> Result<()>;

    fn show_cloud(&mut self, id: &str, cloud: &PointCloudFrame, color: &ColorFrame) -> Result<()>;

    /// Advances the viewer's render loop by one tick.
    fn spin_once(&mut self) -> Result<()>;

    /// Whether the user closed the viewer.
    fn was_stopped(&self) -> bool;

    fn close(&mut self) -> Result<()>;
}

pub fn color_window_name(device_index: u32) -> String {
    format!("color (kinect {device_index})")
}

pub fn depth_window_name(device_index: u32) -> String {
    format!("transformed depth (kinect {device_index})")
}

pub fn viewer_name(device_index: u32) -> String {
    format!("point cloud (kinect {device_index})")
}

pub const CLOUD_WIDGET: &str = "cloud";

/// Shows whatever the frame holds; a missing input silently skips its output.
pub fn present<W, V>(
    frame: &DisplayFrame,
    device_index: u32,
    depth_range: DepthRange,
    windows: &mut W,
    viewer: &mut V,
) -> Result<()>
where
    W: ImageWindows + ?Sized,
    V: CloudViewer + ?Sized,
{
    if let Some(color) = &frame.color {
        windows.show(&color_window_name(device_index), ImageView::Bgra(color))?;
    }

    if let Some(depth) = &frame.transformed_depth {
        let gray = depth.to_gray(depth_range);
        windows.show(&depth_window_name(device_index), ImageView::Gray(&gray))?;
    }

    if let (Some(cloud), Some(color)) = (&frame.point_cloud, &frame.color) {
        viewer.show_cloud(CLOUD_WIDGET, cloud, color)?;
        viewer.spin_once()?;
    }

    Ok(())
}
