//! The subset of the Azure Kinect C API used by [`super::K4aSdk`].

#![allow(non_camel_case_types)]

use std::ffi::{c_int, c_void};

pub type k4a_device_t = *mut c_void;
pub type k4a_capture_t = *mut c_void;
pub type k4a_image_t = *mut c_void;
pub type k4a_transformation_t = *mut c_void;

pub type k4a_result_t = c_int;
pub const K4A_RESULT_SUCCEEDED: k4a_result_t = 0;

pub type k4a_wait_result_t = c_int;
pub const K4A_WAIT_RESULT_SUCCEEDED: k4a_wait_result_t = 0;
pub const K4A_WAIT_RESULT_TIMEOUT: k4a_wait_result_t = 2;

pub const K4A_WAIT_INFINITE: i32 = -1;

pub type k4a_image_format_t = c_int;
pub const K4A_IMAGE_FORMAT_COLOR_MJPG: k4a_image_format_t = 0;
pub const K4A_IMAGE_FORMAT_COLOR_NV12: k4a_image_format_t = 1;
pub const K4A_IMAGE_FORMAT_COLOR_YUY2: k4a_image_format_t = 2;
pub const K4A_IMAGE_FORMAT_COLOR_BGRA32: k4a_image_format_t = 3;
pub const K4A_IMAGE_FORMAT_DEPTH16: k4a_image_format_t = 4;
pub const K4A_IMAGE_FORMAT_IR16: k4a_image_format_t = 5;
pub const K4A_IMAGE_FORMAT_CUSTOM8: k4a_image_format_t = 6;
pub const K4A_IMAGE_FORMAT_CUSTOM16: k4a_image_format_t = 7;
pub const K4A_IMAGE_FORMAT_CUSTOM: k4a_image_format_t = 8;

pub type k4a_color_resolution_t = c_int;
pub type k4a_depth_mode_t = c_int;
pub type k4a_fps_t = c_int;
pub type k4a_wired_sync_mode_t = c_int;
pub type k4a_calibration_type_t = c_int;
pub type k4a_calibration_model_type_t = c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct k4a_device_configuration_t {
    pub color_format: k4a_image_format_t,
    pub color_resolution: k4a_color_resolution_t,
    pub depth_mode: k4a_depth_mode_t,
    pub camera_fps: k4a_fps_t,
    pub synchronized_images_only: bool,
    pub depth_delay_off_color_usec: i32,
    pub wired_sync_mode: k4a_wired_sync_mode_t,
    pub subordinate_delay_off_master_usec: u32,
    pub disable_streaming_indicator: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct k4a_calibration_extrinsics_t {
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct k4a_calibration_intrinsics_t {
    pub type_: k4a_calibration_model_type_t,
    pub parameter_count: u32,
    // union of the named Brown-Conrady coefficients and a flat array
    pub parameters: [f32; 15],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct k4a_calibration_camera_t {
    pub extrinsics: k4a_calibration_extrinsics_t,
    pub intrinsics: k4a_calibration_intrinsics_t,
    pub resolution_width: c_int,
    pub resolution_height: c_int,
    pub metric_radius: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct k4a_calibration_t {
    pub depth_camera_calibration: k4a_calibration_camera_t,
    pub color_camera_calibration: k4a_calibration_camera_t,
    pub extrinsics: [[k4a_calibration_extrinsics_t; 4]; 4],
    pub depth_mode: k4a_depth_mode_t,
    pub color_resolution: k4a_color_resolution_t,
}

#[link(name = "k4a")]
extern "C" {
    pub fn k4a_device_get_installed_count() -> u32;
    pub fn k4a_device_open(index: u32, device_handle: *mut k4a_device_t) -> k4a_result_t;
    pub fn k4a_device_close(device_handle: k4a_device_t);
    pub fn k4a_device_start_cameras(
        device_handle: k4a_device_t,
        config: *const k4a_device_configuration_t,
    ) -> k4a_result_t;
    pub fn k4a_device_stop_cameras(device_handle: k4a_device_t);
    pub fn k4a_device_get_calibration(
        device_handle: k4a_device_t,
        depth_mode: k4a_depth_mode_t,
        color_resolution: k4a_color_resolution_t,
        calibration: *mut k4a_calibration_t,
    ) -> k4a_result_t;
    pub fn k4a_device_get_capture(
        device_handle: k4a_device_t,
        capture_handle: *mut k4a_capture_t,
        timeout_in_ms: i32,
    ) -> k4a_wait_result_t;

    pub fn k4a_capture_get_color_image(capture_handle: k4a_capture_t) -> k4a_image_t;
    pub fn k4a_capture_get_depth_image(capture_handle: k4a_capture_t) -> k4a_image_t;
    pub fn k4a_capture_release(capture_handle: k4a_capture_t);

    pub fn k4a_image_create(
        format: k4a_image_format_t,
        width_pixels: c_int,
        height_pixels: c_int,
        stride_bytes: c_int,
        image_handle: *mut k4a_image_t,
    ) -> k4a_result_t;
    pub fn k4a_image_get_buffer(image_handle: k4a_image_t) -> *mut u8;
    pub fn k4a_image_get_size(image_handle: k4a_image_t) -> usize;
    pub fn k4a_image_get_format(image_handle: k4a_image_t) -> k4a_image_format_t;
    pub fn k4a_image_get_width_pixels(image_handle: k4a_image_t) -> c_int;
    pub fn k4a_image_get_height_pixels(image_handle: k4a_image_t) -> c_int;
    pub fn k4a_image_get_stride_bytes(image_handle: k4a_image_t) -> c_int;
    pub fn k4a_image_release(image_handle: k4a_image_t);

    pub fn k4a_transformation_create(calibration: *const k4a_calibration_t) -> k4a_transformation_t;
    pub fn k4a_transformation_destroy(transformation_handle: k4a_transformation_t);
    pub fn k4a_transformation_depth_image_to_color_camera(
        transformation_handle: k4a_transformation_t,
        depth_image: k4a_image_t,
        transformed_depth_image: k4a_image_t,
    ) -> k4a_result_t;
    pub fn k4a_transformation_depth_image_to_point_cloud(
        transformation_handle: k4a_transformation_t,
        depth_image: k4a_image_t,
        camera: k4a_calibration_type_t,
        xyz_image: k4a_image_t,
    ) -> k4a_result_t;
}
