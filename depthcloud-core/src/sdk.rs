use std::{fmt::Debug, time::Duration};

use serde::Deserialize;

use crate::DeviceConfig;

/// A failed call into the camera SDK, carrying the name of the operation and
/// the raw result code it returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to {operation} ({code:#x})")]
pub struct SdkError {
    pub operation: &'static str,
    pub code: i32,
}

impl SdkError {
    pub fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

/// Outcome of a blocking capture wait.
#[derive(Debug)]
pub enum WaitResult<C> {
    Succeeded(C),
    Timeout,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ImageFormat {
    ColorMjpg,
    ColorNv12,
    ColorYuy2,
    ColorBgra32,
    Depth16,
    Ir16,
    Custom8,
    Custom16,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ColorResolution {
    Off,
    R720p,
    R1080p,
    R1440p,
    R1536p,
    R2160p,
    R3072p,
}

impl ColorResolution {
    /// Width and height in pixels, `None` when the color camera is off.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            ColorResolution::Off => None,
            ColorResolution::R720p => Some((1280, 720)),
            ColorResolution::R1080p => Some((1920, 1080)),
            ColorResolution::R1440p => Some((2560, 1440)),
            ColorResolution::R1536p => Some((2048, 1536)),
            ColorResolution::R2160p => Some((3840, 2160)),
            ColorResolution::R3072p => Some((4096, 3072)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DepthMode {
    Off,
    NfovBinned,
    NfovUnbinned,
    WfovBinned,
    WfovUnbinned,
    PassiveIr,
}

impl DepthMode {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            DepthMode::Off => None,
            DepthMode::NfovBinned => Some((320, 288)),
            DepthMode::NfovUnbinned => Some((640, 576)),
            DepthMode::WfovBinned => Some((512, 512)),
            DepthMode::WfovUnbinned | DepthMode::PassiveIr => Some((1024, 1024)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Fps {
    Fps5,
    Fps15,
    Fps30,
}

impl Fps {
    pub fn frame_interval(&self) -> Duration {
        match self {
            Fps::Fps5 => Duration::from_millis(200),
            Fps::Fps15 => Duration::from_micros(66_667),
            Fps::Fps30 => Duration::from_micros(33_333),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WiredSyncMode {
    Standalone,
    Master,
    Subordinate,
}

/// Which camera's geometry a point cloud is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationType {
    Depth,
    Color,
}

/// The boundary to a depth-camera SDK.
///
/// Handles are plain values owned by the caller; every handle obtained from
/// one of these calls has to be given back through the matching release call
/// exactly once, and is not used again afterwards. [`crate::Session`] and the guards in this crate take care of
/// that, so most code never calls these methods directly.
pub trait DepthSdk {
    type Device;
    type Capture;
    type Image;
    type Transformation;
    type Calibration: Debug;

    fn installed_count(&self) -> u32;

    fn device_open(&self, index: u32) -> SdkResult<Self::Device>;
    fn device_close(&self, device: &mut Self::Device);
    fn device_start_cameras(&self, device: &Self::Device, config: &DeviceConfig) -> SdkResult<()>;
    fn device_stop_cameras(&self, device: &Self::Device);
    fn device_get_calibration(
        &self,
        device: &Self::Device,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> SdkResult<Self::Calibration>;

    /// Blocks until a capture is available; `None` waits forever.
    fn device_get_capture(
        &self,
        device: &Self::Device,
        timeout: Option<Duration>,
    ) -> WaitResult<Self::Capture>;

    fn capture_get_color_image(&self, capture: &Self::Capture) -> Option<Self::Image>;
    fn capture_get_depth_image(&self, capture: &Self::Capture) -> Option<Self::Image>;
    fn capture_release(&self, capture: &mut Self::Capture);

    fn image_create(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        stride_bytes: u32,
    ) -> SdkResult<Self::Image>;
    fn image_release(&self, image: &mut Self::Image);
    fn image_format(&self, image: &Self::Image) -> ImageFormat;
    fn image_width(&self, image: &Self::Image) -> u32;
    fn image_height(&self, image: &Self::Image) -> u32;
    fn image_stride(&self, image: &Self::Image) -> u32;
    fn image_buffer<'a>(&self, image: &'a Self::Image) -> &'a [u8];

    fn transformation_create(&self, calibration: &Self::Calibration) -> SdkResult<Self::Transformation>;
    fn transformation_destroy(&self, transformation: &mut Self::Transformation);
    fn transformation_depth_image_to_color_camera(
        &self,
        transformation: &Self::Transformation,
        depth_image: &Self::Image,
        transformed_depth_image: &mut Self::Image,
    ) -> SdkResult<()>;
    fn transformation_depth_image_to_point_cloud(
        &self,
        transformation: &Self::Transformation,
        depth_image: &Self::Image,
        camera: CalibrationType,
        xyz_image: &mut Self::Image,
    ) -> SdkResult<()>;
}
