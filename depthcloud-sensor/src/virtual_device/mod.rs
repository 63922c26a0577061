//! An in-process stand-in for a depth camera.
//!
//! It follows the same handle rules as the vendor SDK, so the whole pipeline
//! can run without hardware. Depth and color come from a ray-traced scene; the
//! two cameras share an optical center, so registration is a resample from
//! one pinhole grid to the other.

mod scene;

use std::{
    cell::RefCell,
    thread::sleep,
    time::{Duration, Instant},
};

use depthcloud_core::{
    CalibrationType, ColorResolution, DepthMode, DepthSdk, DeviceConfig, ImageFormat, SdkError,
    SdkResult, WaitResult,
};
use serde::Deserialize;

use crate::pinhole_camera::PinholeCamera;
use scene::Scene;

const RESULT_FAILED: i32 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VirtualCfg {
    pub device_count: u32,
    // every wait times out once this many captures were delivered
    pub frame_limit: Option<u64>,
    // leave depth out of every n-th capture; only honoured for unsynchronized streams
    pub drop_depth_every: Option<u64>,
}

impl Default for VirtualCfg {
    fn default() -> Self {
        Self {
            device_count: 1,
            frame_limit: None,
            drop_depth_every: None,
        }
    }
}

impl VirtualCfg {
    pub fn finalize(self) -> VirtualSdk {
        let devices = (0..self.device_count).map(|_| DeviceState::default()).collect();
        VirtualSdk {
            cfg: self,
            devices: RefCell::new(devices),
        }
    }
}

#[derive(Default)]
struct DeviceState {
    open: bool,
    streaming: Option<Streaming>,
}

struct Streaming {
    config: DeviceConfig,
    depth_camera: PinholeCamera,
    color_camera: PinholeCamera,
    next_frame_at: Instant,
    frames: u64,
}

pub struct VirtualSdk {
    cfg: VirtualCfg,
    devices: RefCell<Vec<DeviceState>>,
}

#[derive(Debug)]
pub struct VirtualDevice {
    index: u32,
}

#[derive(Debug)]
pub struct VirtualCapture {
    color: Option<VirtualImage>,
    depth: Option<VirtualImage>,
}

#[derive(Debug, Clone)]
pub struct VirtualImage {
    format: ImageFormat,
    width: u32,
    height: u32,
    stride: u32,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct VirtualCalibration {
    pub depth_mode: DepthMode,
    pub color_resolution: ColorResolution,
    pub depth_camera: PinholeCamera,
    pub color_camera: PinholeCamera,
}

#[derive(Debug)]
pub struct VirtualTransformation {
    depth_camera: PinholeCamera,
    color_camera: PinholeCamera,
}

fn failed(operation: &'static str) -> SdkError {
    SdkError::new(operation, RESULT_FAILED)
}

/// Horizontal and vertical field of view in degrees.
fn depth_fov(depth_mode: DepthMode) -> Option<(f64, f64)> {
    match depth_mode {
        DepthMode::NfovBinned | DepthMode::NfovUnbinned => Some((75.0, 65.0)),
        DepthMode::WfovBinned | DepthMode::WfovUnbinned => Some((120.0, 120.0)),
        DepthMode::Off | DepthMode::PassiveIr => None,
    }
}

fn color_fov(color_resolution: ColorResolution) -> (f64, f64) {
    match color_resolution {
        ColorResolution::R1536p | ColorResolution::R3072p => (90.0, 74.3),
        _ => (90.0, 59.0),
    }
}

fn cameras(
    depth_mode: DepthMode,
    color_resolution: ColorResolution,
) -> Option<(PinholeCamera, PinholeCamera)> {
    let (depth_width, depth_height) = depth_mode.dimensions()?;
    let (depth_h_fov, depth_v_fov) = depth_fov(depth_mode)?;
    let (color_width, color_height) = color_resolution.dimensions()?;
    let (color_h_fov, color_v_fov) = color_fov(color_resolution);
    Some((
        PinholeCamera::from_fov(depth_width, depth_height, depth_h_fov, depth_v_fov),
        PinholeCamera::from_fov(color_width, color_height, color_h_fov, color_v_fov),
    ))
}

fn bytes_per_pixel(format: ImageFormat) -> Option<u32> {
    match format {
        ImageFormat::ColorBgra32 => Some(4),
        ImageFormat::Depth16 | ImageFormat::Ir16 | ImageFormat::Custom16 => Some(2),
        ImageFormat::Custom8 => Some(1),
        // layout is up to the caller
        ImageFormat::Custom => Some(0),
        ImageFormat::ColorMjpg | ImageFormat::ColorNv12 | ImageFormat::ColorYuy2 => None,
    }
}

impl VirtualImage {
    fn packed(format: ImageFormat, width: u32, height: u32, bytes_per_pixel: u32, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            stride: width * bytes_per_pixel,
            data,
        }
    }

    fn depth_at(&self, col: u32, row: u32) -> u16 {
        let offset = (row * self.stride + col * 2) as usize;
        u16::from_ne_bytes([self.data[offset], self.data[offset + 1]])
    }

    fn set_depth(&mut self, col: u32, row: u32, depth: u16) {
        let offset = (row * self.stride + col * 2) as usize;
        self.data[offset..offset + 2].copy_from_slice(&depth.to_ne_bytes());
    }

    fn set_point(&mut self, col: u32, row: u32, xyz: [i16; 3]) {
        let offset = (row * self.stride + col * 6) as usize;
        for (i, value) in xyz.iter().enumerate() {
            self.data[offset + 2 * i..offset + 2 * i + 2].copy_from_slice(&value.to_ne_bytes());
        }
    }

    fn is(&self, format: ImageFormat, camera: &PinholeCamera) -> bool {
        self.format == format && self.width == camera.cols() && self.height == camera.rows()
    }
}

impl VirtualSdk {
    fn with_device<T>(
        &self,
        device: &VirtualDevice,
        f: impl FnOnce(&mut DeviceState) -> T,
    ) -> T {
        let mut devices = self.devices.borrow_mut();
        f(&mut devices[device.index as usize])
    }

    fn validate(config: &DeviceConfig) -> SdkResult<()> {
        let supported = config.color_format == ImageFormat::ColorBgra32
            && config.color_resolution != ColorResolution::Off
            && depth_fov(config.depth_mode).is_some();
        if supported {
            Ok(())
        } else {
            log::warn!("virtual device cannot stream {config:?}");
            Err(failed("start cameras"))
        }
    }
}

impl DepthSdk for VirtualSdk {
    type Device = VirtualDevice;
    type Capture = VirtualCapture;
    type Image = VirtualImage;
    type Transformation = VirtualTransformation;
    type Calibration = VirtualCalibration;

    fn installed_count(&self) -> u32 {
        self.cfg.device_count
    }

    fn device_open(&self, index: u32) -> SdkResult<VirtualDevice> {
        let mut devices = self.devices.borrow_mut();
        match devices.get_mut(index as usize) {
            Some(state) if !state.open => {
                state.open = true;
                Ok(VirtualDevice { index })
            }
            _ => Err(failed("open device")),
        }
    }

    fn device_close(&self, device: &mut VirtualDevice) {
        self.with_device(device, |state| *state = DeviceState::default());
    }

    fn device_start_cameras(&self, device: &VirtualDevice, config: &DeviceConfig) -> SdkResult<()> {
        Self::validate(config)?;
        let (depth_camera, color_camera) = cameras(config.depth_mode, config.color_resolution)
            .ok_or_else(|| failed("start cameras"))?;
        self.with_device(device, |state| {
            if state.streaming.is_some() {
                return Err(failed("start cameras"));
            }
            state.streaming = Some(Streaming {
                config: config.clone(),
                depth_camera,
                color_camera,
                next_frame_at: Instant::now(),
                frames: 0,
            });
            Ok(())
        })
    }

    fn device_stop_cameras(&self, device: &VirtualDevice) {
        self.with_device(device, |state| state.streaming = None);
    }

    fn device_get_calibration(
        &self,
        _device: &VirtualDevice,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> SdkResult<VirtualCalibration> {
        let (depth_camera, color_camera) =
            cameras(depth_mode, color_resolution).ok_or_else(|| failed("get calibration"))?;
        Ok(VirtualCalibration {
            depth_mode,
            color_resolution,
            depth_camera,
            color_camera,
        })
    }

    fn device_get_capture(
        &self,
        device: &VirtualDevice,
        timeout: Option<Duration>,
    ) -> WaitResult<VirtualCapture> {
        let frame_limit = self.cfg.frame_limit;
        let drop_depth_every = self.cfg.drop_depth_every;

        // decide under the borrow, sleep and render outside of it
        let ready = self.with_device(device, |state| {
            let streaming = state.streaming.as_mut()?;
            if frame_limit.is_some_and(|limit| streaming.frames >= limit) {
                return Some(Err(timeout));
            }
            let wait = streaming.next_frame_at.saturating_duration_since(Instant::now());
            if timeout.is_some_and(|timeout| wait > timeout) {
                return Some(Err(timeout));
            }
            let frame = streaming.frames;
            streaming.frames += 1;
            streaming.next_frame_at = streaming.next_frame_at.max(Instant::now()) + streaming.config.camera_fps.frame_interval();
            let with_depth = streaming.config.synchronized_images_only
                || !drop_depth_every.is_some_and(|n| n > 0 && frame % n == n - 1);
            Some(Ok((
                wait,
                frame,
                with_depth,
                streaming.depth_camera.clone(),
                streaming.color_camera.clone(),
            )))
        });

        let (wait, frame, with_depth, depth_camera, color_camera) = match ready {
            None => return WaitResult::Failed,
            Some(Err(timeout)) => {
                if let Some(timeout) = timeout {
                    sleep(timeout);
                }
                return WaitResult::Timeout;
            }
            Some(Ok(ready)) => ready,
        };
        sleep(wait);

        let scene = Scene::at_frame(frame);
        let color = VirtualImage::packed(
            ImageFormat::ColorBgra32,
            color_camera.cols(),
            color_camera.rows(),
            4,
            scene.render_color(&color_camera),
        );
        let depth = with_depth.then(|| {
            VirtualImage::packed(
                ImageFormat::Depth16,
                depth_camera.cols(),
                depth_camera.rows(),
                2,
                scene.render_depth(&depth_camera),
            )
        });
        log::trace!("virtual capture {frame} (depth: {with_depth})");

        WaitResult::Succeeded(VirtualCapture {
            color: Some(color),
            depth,
        })
    }

    fn capture_get_color_image(&self, capture: &VirtualCapture) -> Option<VirtualImage> {
        capture.color.clone()
    }

    fn capture_get_depth_image(&self, capture: &VirtualCapture) -> Option<VirtualImage> {
        capture.depth.clone()
    }

    fn capture_release(&self, _capture: &mut VirtualCapture) {}

    fn image_create(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        stride_bytes: u32,
    ) -> SdkResult<VirtualImage> {
        let bytes_per_pixel = bytes_per_pixel(format).ok_or_else(|| failed("create image"))?;
        if width == 0 || height == 0 || stride_bytes == 0 || stride_bytes < width * bytes_per_pixel {
            return Err(failed("create image"));
        }
        Ok(VirtualImage {
            format,
            width,
            height,
            stride: stride_bytes,
            data: vec![0; (stride_bytes * height) as usize],
        })
    }

    fn image_release(&self, _image: &mut VirtualImage) {}

    fn image_format(&self, image: &VirtualImage) -> ImageFormat {
        image.format
    }

    fn image_width(&self, image: &VirtualImage) -> u32 {
        image.width
    }

    fn image_height(&self, image: &VirtualImage) -> u32 {
        image.height
    }

    fn image_stride(&self, image: &VirtualImage) -> u32 {
        image.stride
    }

    fn image_buffer<'a>(&self, image: &'a VirtualImage) -> &'a [u8] {
        &image.data
    }

    fn transformation_create(&self, calibration: &VirtualCalibration) -> SdkResult<VirtualTransformation> {
        Ok(VirtualTransformation {
            depth_camera: calibration.depth_camera.clone(),
            color_camera: calibration.color_camera.clone(),
        })
    }

    fn transformation_destroy(&self, _transformation: &mut VirtualTransformation) {}

    fn transformation_depth_image_to_color_camera(
        &self,
        transformation: &VirtualTransformation,
        depth_image: &VirtualImage,
        transformed_depth_image: &mut VirtualImage,
    ) -> SdkResult<()> {
        let depth_camera = &transformation.depth_camera;
        let color_camera = &transformation.color_camera;
        if !depth_image.is(ImageFormat::Depth16, depth_camera)
            || !transformed_depth_image.is(ImageFormat::Depth16, color_camera)
        {
            return Err(failed("transform depth image to color camera"));
        }

        for row in 0..color_camera.rows() {
            for col in 0..color_camera.cols() {
                let (x, y) = color_camera.unproject(col, row);
                let depth = depth_camera
                    .project(x, y)
                    .map_or(0, |(depth_col, depth_row)| depth_image.depth_at(depth_col, depth_row));
                transformed_depth_image.set_depth(col, row, depth);
            }
        }
        Ok(())
    }

    fn transformation_depth_image_to_point_cloud(
        &self,
        transformation: &VirtualTransformation,
        depth_image: &VirtualImage,
        camera: CalibrationType,
        xyz_image: &mut VirtualImage,
    ) -> SdkResult<()> {
        let pinhole = match camera {
            CalibrationType::Depth => &transformation.depth_camera,
            CalibrationType::Color => &transformation.color_camera,
        };
        if !depth_image.is(ImageFormat::Depth16, pinhole)
            || xyz_image.format != ImageFormat::Custom
            || (xyz_image.width, xyz_image.height) != (depth_image.width, depth_image.height)
            || xyz_image.stride < xyz_image.width * 6
        {
            return Err(failed("transform depth image to point cloud"));
        }

        for row in 0..pinhole.rows() {
            for col in 0..pinhole.cols() {
                let z = depth_image.depth_at(col, row);
                let xyz = if z == 0 {
                    [0; 3]
                } else {
                    let (x, y) = pinhole.unproject(col, row);
                    let z = z as f64;
                    [
                        (x * z).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16,
                        (y * z).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16,
                        z.min(i16::MAX as f64) as i16,
                    ]
                };
                xyz_image.set_point(col, row, xyz);
            }
        }
        Ok(())
    }
}
