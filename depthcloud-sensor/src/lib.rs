pub mod pinhole_camera;
pub mod virtual_device;

#[cfg(feature = "k4a")]
pub mod k4a;
