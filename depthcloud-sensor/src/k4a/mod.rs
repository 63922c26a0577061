//! Azure Kinect backend over the vendor's C library.

mod ffi;

use std::{
    fmt,
    mem::MaybeUninit,
    ptr::{self, NonNull},
    time::Duration,
};

use depthcloud_core::{
    CalibrationType, ColorResolution, DepthMode, DepthSdk, DeviceConfig, Fps, ImageFormat,
    SdkError, SdkResult, WaitResult, WiredSyncMode,
};

use ffi::*;

pub struct K4aDevice(NonNull<std::ffi::c_void>);
pub struct K4aCapture(NonNull<std::ffi::c_void>);
pub struct K4aImage(NonNull<std::ffi::c_void>);
pub struct K4aTransformation(NonNull<std::ffi::c_void>);

/// Factory calibration as returned by the device.
pub struct K4aCalibration(k4a_calibration_t);

impl fmt::Debug for K4aCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = &self.0.depth_camera_calibration;
        let color = &self.0.color_camera_calibration;
        f.debug_struct("K4aCalibration")
            .field("depth_resolution", &(depth.resolution_width, depth.resolution_height))
            .field("depth_intrinsics", &&depth.intrinsics.parameters[..4])
            .field("color_resolution", &(color.resolution_width, color.resolution_height))
            .field("color_intrinsics", &&color.intrinsics.parameters[..4])
            .field("color_to_depth_translation", &color.extrinsics.translation)
            .finish()
    }
}

/// The system-wide Azure Kinect runtime.
#[derive(Debug, Default)]
pub struct K4aSdk;

fn check(operation: &'static str, result: k4a_result_t) -> SdkResult<()> {
    if result == K4A_RESULT_SUCCEEDED {
        Ok(())
    } else {
        Err(SdkError::new(operation, result))
    }
}

fn image_format(format: ImageFormat) -> k4a_image_format_t {
    match format {
        ImageFormat::ColorMjpg => K4A_IMAGE_FORMAT_COLOR_MJPG,
        ImageFormat::ColorNv12 => K4A_IMAGE_FORMAT_COLOR_NV12,
        ImageFormat::ColorYuy2 => K4A_IMAGE_FORMAT_COLOR_YUY2,
        ImageFormat::ColorBgra32 => K4A_IMAGE_FORMAT_COLOR_BGRA32,
        ImageFormat::Depth16 => K4A_IMAGE_FORMAT_DEPTH16,
        ImageFormat::Ir16 => K4A_IMAGE_FORMAT_IR16,
        ImageFormat::Custom8 => K4A_IMAGE_FORMAT_CUSTOM8,
        ImageFormat::Custom16 => K4A_IMAGE_FORMAT_CUSTOM16,
        ImageFormat::Custom => K4A_IMAGE_FORMAT_CUSTOM,
    }
}

fn from_image_format(format: k4a_image_format_t) -> ImageFormat {
    match format {
        K4A_IMAGE_FORMAT_COLOR_MJPG => ImageFormat::ColorMjpg,
        K4A_IMAGE_FORMAT_COLOR_NV12 => ImageFormat::ColorNv12,
        K4A_IMAGE_FORMAT_COLOR_YUY2 => ImageFormat::ColorYuy2,
        K4A_IMAGE_FORMAT_COLOR_BGRA32 => ImageFormat::ColorBgra32,
        K4A_IMAGE_FORMAT_DEPTH16 => ImageFormat::Depth16,
        K4A_IMAGE_FORMAT_IR16 => ImageFormat::Ir16,
        K4A_IMAGE_FORMAT_CUSTOM8 => ImageFormat::Custom8,
        K4A_IMAGE_FORMAT_CUSTOM16 => ImageFormat::Custom16,
        _ => ImageFormat::Custom,
    }
}

fn color_resolution(resolution: ColorResolution) -> k4a_color_resolution_t {
    match resolution {
        ColorResolution::Off => 0,
        ColorResolution::R720p => 1,
        ColorResolution::R1080p => 2,
        ColorResolution::R1440p => 3,
        ColorResolution::R1536p => 4,
        ColorResolution::R2160p => 5,
        ColorResolution::R3072p => 6,
    }
}

fn depth_mode(mode: DepthMode) -> k4a_depth_mode_t {
    match mode {
        DepthMode::Off => 0,
        DepthMode::NfovBinned => 1,
        DepthMode::NfovUnbinned => 2,
        DepthMode::WfovBinned => 3,
        DepthMode::WfovUnbinned => 4,
        DepthMode::PassiveIr => 5,
    }
}

fn device_configuration(config: &DeviceConfig) -> k4a_device_configuration_t {
    k4a_device_configuration_t {
        color_format: image_format(config.color_format),
        color_resolution: color_resolution(config.color_resolution),
        depth_mode: depth_mode(config.depth_mode),
        camera_fps: match config.camera_fps {
            Fps::Fps5 => 0,
            Fps::Fps15 => 1,
            Fps::Fps30 => 2,
        },
        synchronized_images_only: config.synchronized_images_only,
        depth_delay_off_color_usec: 0,
        wired_sync_mode: match config.wired_sync_mode {
            WiredSyncMode::Standalone => 0,
            WiredSyncMode::Master => 1,
            WiredSyncMode::Subordinate => 2,
        },
        subordinate_delay_off_master_usec: 0,
        disable_streaming_indicator: false,
    }
}

fn timeout_ms(timeout: Option<Duration>) -> i32 {
    timeout.map_or(K4A_WAIT_INFINITE, |timeout| {
        timeout.as_millis().min(i32::MAX as u128) as i32
    })
}

impl DepthSdk for K4aSdk {
    type Device = K4aDevice;
    type Capture = K4aCapture;
    type Image = K4aImage;
    type Transformation = K4aTransformation;
    type Calibration = K4aCalibration;

    fn installed_count(&self) -> u32 {
        unsafe { k4a_device_get_installed_count() }
    }

    fn device_open(&self, index: u32) -> SdkResult<K4aDevice> {
        let mut handle: k4a_device_t = ptr::null_mut();
        check("open device", unsafe { k4a_device_open(index, &mut handle) })?;
        NonNull::new(handle)
            .map(K4aDevice)
            .ok_or(SdkError::new("open device", -1))
    }

    fn device_close(&self, device: &mut K4aDevice) {
        unsafe { k4a_device_close(device.0.as_ptr()) }
    }

    fn device_start_cameras(&self, device: &K4aDevice, config: &DeviceConfig) -> SdkResult<()> {
        let configuration = device_configuration(config);
        check("start cameras", unsafe {
            k4a_device_start_cameras(device.0.as_ptr(), &configuration)
        })
    }

    fn device_stop_cameras(&self, device: &K4aDevice) {
        unsafe { k4a_device_stop_cameras(device.0.as_ptr()) }
    }

    fn device_get_calibration(
        &self,
        device: &K4aDevice,
        depth: DepthMode,
        color: ColorResolution,
    ) -> SdkResult<K4aCalibration> {
        let mut calibration = MaybeUninit::<k4a_calibration_t>::uninit();
        check("get calibration", unsafe {
            k4a_device_get_calibration(
                device.0.as_ptr(),
                depth_mode(depth),
                color_resolution(color),
                calibration.as_mut_ptr(),
            )
        })?;
        Ok(K4aCalibration(unsafe { calibration.assume_init() }))
    }

    fn device_get_capture(&self, device: &K4aDevice, timeout: Option<Duration>) -> WaitResult<K4aCapture> {
        let mut handle: k4a_capture_t = ptr::null_mut();
        let result = unsafe { k4a_device_get_capture(device.0.as_ptr(), &mut handle, timeout_ms(timeout)) };
        match result {
            K4A_WAIT_RESULT_SUCCEEDED => match NonNull::new(handle) {
                Some(handle) => WaitResult::Succeeded(K4aCapture(handle)),
                None => WaitResult::Failed,
            },
            K4A_WAIT_RESULT_TIMEOUT => WaitResult::Timeout,
            _ => WaitResult::Failed,
        }
    }

    fn capture_get_color_image(&self, capture: &K4aCapture) -> Option<K4aImage> {
        NonNull::new(unsafe { k4a_capture_get_color_image(capture.0.as_ptr()) }).map(K4aImage)
    }

    fn capture_get_depth_image(&self, capture: &K4aCapture) -> Option<K4aImage> {
        NonNull::new(unsafe { k4a_capture_get_depth_image(capture.0.as_ptr()) }).map(K4aImage)
    }

    fn capture_release(&self, capture: &mut K4aCapture) {
        unsafe { k4a_capture_release(capture.0.as_ptr()) }
    }

    fn image_create(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        stride_bytes: u32,
    ) -> SdkResult<K4aImage> {
        let mut handle: k4a_image_t = ptr::null_mut();
        check("create image", unsafe {
            k4a_image_create(
                image_format(format),
                width as i32,
                height as i32,
                stride_bytes as i32,
                &mut handle,
            )
        })?;
        NonNull::new(handle)
            .map(K4aImage)
            .ok_or(SdkError::new("create image", -1))
    }

    fn image_release(&self, image: &mut K4aImage) {
        unsafe { k4a_image_release(image.0.as_ptr()) }
    }

    fn image_format(&self, image: &K4aImage) -> ImageFormat {
        from_image_format(unsafe { k4a_image_get_format(image.0.as_ptr()) })
    }

    fn image_width(&self, image: &K4aImage) -> u32 {
        unsafe { k4a_image_get_width_pixels(image.0.as_ptr()) }.max(0) as u32
    }

    fn image_height(&self, image: &K4aImage) -> u32 {
        unsafe { k4a_image_get_height_pixels(image.0.as_ptr()) }.max(0) as u32
    }

    fn image_stride(&self, image: &K4aImage) -> u32 {
        unsafe { k4a_image_get_stride_bytes(image.0.as_ptr()) }.max(0) as u32
    }

    fn image_buffer<'a>(&self, image: &'a K4aImage) -> &'a [u8] {
        let handle = image.0.as_ptr();
        let buffer = unsafe { k4a_image_get_buffer(handle) };
        if buffer.is_null() {
            return &[];
        }
        // the buffer lives as long as the image handle, which `image` keeps alive
        unsafe { std::slice::from_raw_parts(buffer, k4a_image_get_size(handle)) }
    }

    fn transformation_create(&self, calibration: &K4aCalibration) -> SdkResult<K4aTransformation> {
        NonNull::new(unsafe { k4a_transformation_create(&calibration.0) })
            .map(K4aTransformation)
            .ok_or(SdkError::new("create transformation", -1))
    }

    fn transformation_destroy(&self, transformation: &mut K4aTransformation) {
        unsafe { k4a_transformation_destroy(transformation.0.as_ptr()) }
    }

    fn transformation_depth_image_to_color_camera(
        &self,
        transformation: &K4aTransformation,
        depth_image: &K4aImage,
        transformed_depth_image: &mut K4aImage,
    ) -> SdkResult<()> {
        check("transform depth image to color camera", unsafe {
            k4a_transformation_depth_image_to_color_camera(
                transformation.0.as_ptr(),
                depth_image.0.as_ptr(),
                transformed_depth_image.0.as_ptr(),
            )
        })
    }

    fn transformation_depth_image_to_point_cloud(
        &self,
        transformation: &K4aTransformation,
        depth_image: &K4aImage,
        camera: CalibrationType,
        xyz_image: &mut K4aImage,
    ) -> SdkResult<()> {
        let camera = match camera {
            CalibrationType::Depth => 0,
            CalibrationType::Color => 1,
        };
        check("transform depth image to point cloud", unsafe {
            k4a_transformation_depth_image_to_point_cloud(
                transformation.0.as_ptr(),
                depth_image.0.as_ptr(),
                camera,
                xyz_image.0.as_ptr(),
            )
        })
    }
}
