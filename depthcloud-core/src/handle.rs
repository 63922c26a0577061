//! Scoped owners for SDK handles.
//!
//! Each guard gives its handle back to the SDK when it is dropped, so a handle
//! is released exactly once on every path out of a scope, `?` included.

use std::time::Duration;

use crate::{
    CalibrationType, ColorResolution, DepthMode, DepthSdk, DeviceConfig, ImageFormat, SdkResult,
    WaitResult,
};

pub struct Device<'s, S: DepthSdk> {
    sdk: &'s S,
    raw: S::Device,
    index: u32,
}

impl<'s, S: DepthSdk> Device<'s, S> {
    pub fn open(sdk: &'s S, index: u32) -> SdkResult<Self> {
        let raw = sdk.device_open(index)?;
        Ok(Self {
            sdk,
            raw,
            index,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn start_cameras(&self, config: &DeviceConfig) -> SdkResult<()> {
        self.sdk.device_start_cameras(&self.raw, config)
    }

    pub fn calibration(
        &self,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> SdkResult<S::Calibration> {
        self.sdk
            .device_get_calibration(&self.raw, depth_mode, color_resolution)
    }

    pub fn capture(&self, timeout: Option<Duration>) -> WaitResult<Capture<'s, S>> {
        match self.sdk.device_get_capture(&self.raw, timeout) {
            WaitResult::Succeeded(raw) => WaitResult::Succeeded(Capture {
                sdk: self.sdk,
                raw,
            }),
            WaitResult::Timeout => WaitResult::Timeout,
            WaitResult::Failed => WaitResult::Failed,
        }
    }
}

impl<S: DepthSdk> Drop for Device<'_, S> {
    fn drop(&mut self) {
        // stopping a device that never started streaming is a no-op for the sdk
        self.sdk.device_stop_cameras(&self.raw);
        self.sdk.device_close(&mut self.raw);
        log::trace!("closed device {}", self.index);
    }
}

pub struct Capture<'s, S: DepthSdk> {
    sdk: &'s S,
    raw: S::Capture,
}

impl<'s, S: DepthSdk> Capture<'s, S> {
    pub fn color_image(&self) -> Option<Image<'s, S>> {
        self.sdk
            .capture_get_color_image(&self.raw)
            .map(|raw| Image::from_raw(self.sdk, raw))
    }

    pub fn depth_image(&self) -> Option<Image<'s, S>> {
        self.sdk
            .capture_get_depth_image(&self.raw)
            .map(|raw| Image::from_raw(self.sdk, raw))
    }
}

impl<S: DepthSdk> Drop for Capture<'_, S> {
    fn drop(&mut self) {
        self.sdk.capture_release(&mut self.raw);
        log::trace!("released capture");
    }
}

pub struct Image<'s, S: DepthSdk> {
    sdk: &'s S,
    raw: S::Image,
}

impl<'s, S: DepthSdk> Image<'s, S> {
    fn from_raw(sdk: &'s S, raw: S::Image) -> Self {
        Self {
            sdk,
            raw,
        }
    }

    pub fn create(
        sdk: &'s S,
        format: ImageFormat,
        width: u32,
        height: u32,
        stride_bytes: u32,
    ) -> SdkResult<Self> {
        let raw = sdk.image_create(format, width, height, stride_bytes)?;
        Ok(Self::from_raw(sdk, raw))
    }

    pub fn format(&self) -> ImageFormat {
        self.sdk.image_format(&self.raw)
    }

    pub fn width(&self) -> u32 {
        self.sdk.image_width(&self.raw)
    }

    pub fn height(&self) -> u32 {
        self.sdk.image_height(&self.raw)
    }

    pub fn stride(&self) -> u32 {
        self.sdk.image_stride(&self.raw)
    }

    pub fn buffer(&self) -> &[u8] {
        self.sdk.image_buffer(&self.raw)
    }
}

impl<S: DepthSdk> Drop for Image<'_, S> {
    fn drop(&mut self) {
        self.sdk.image_release(&mut self.raw);
        log::trace!("released image");
    }
}

pub struct Transformation<'s, S: DepthSdk> {
    sdk: &'s S,
    raw: S::Transformation,
}

impl<'s, S: DepthSdk> Transformation<'s, S> {
    pub fn create(sdk: &'s S, calibration: &S::Calibration) -> SdkResult<Self> {
        let raw = sdk.transformation_create(calibration)?;
        Ok(Self {
            sdk,
            raw,
        })
    }

    pub fn depth_image_to_color_camera(
        &self,
        depth_image: &Image<'s, S>,
        transformed_depth_image: &mut Image<'s, S>,
    ) -> SdkResult<()> {
        self.sdk.transformation_depth_image_to_color_camera(
            &self.raw,
            &depth_image.raw,
            &mut transformed_depth_image.raw,
        )
    }

    pub fn depth_image_to_point_cloud(
        &self,
        depth_image: &Image<'s, S>,
        camera: CalibrationType,
        xyz_image: &mut Image<'s, S>,
    ) -> SdkResult<()> {
        self.sdk.transformation_depth_image_to_point_cloud(
            &self.raw,
            &depth_image.raw,
            camera,
            &mut xyz_image.raw,
        )
    }
}

impl<S: DepthSdk> Drop for Transformation<'_, S> {
    fn drop(&mut self) {
        self.sdk.transformation_destroy(&mut self.raw);
        log::trace!("destroyed transformation");
    }
}
