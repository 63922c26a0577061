use sophus::{
    core::linalg::VecF64, image::ImageSize,
    sensor::camera_enum::perspective_camera::PinholeCameraF64,
};

/// An undistorted pinhole model for one sensor of the virtual device.
#[derive(Clone, Debug)]
pub struct PinholeCamera {
    pub model: PinholeCameraF64,
}

impl PinholeCamera {
    pub fn new(model: PinholeCameraF64) -> Self {
        Self { model }
    }

    /// Centered principal point, focal lengths from the full field of view in
    /// degrees.
    pub fn from_fov(width: u32, height: u32, horizontal_fov: f64, vertical_fov: f64) -> Self {
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let fx = cx / (horizontal_fov.to_radians() / 2.0).tan();
        let fy = cy / (vertical_fov.to_radians() / 2.0).tan();
        Self::new(PinholeCameraF64::from_params_and_size(
            &VecF64::<4>::new(fx, fy, cx, cy),
            ImageSize::new(width as usize, height as usize),
        ))
    }

    pub fn cols(&self) -> u32 {
        self.model.image_size().width as u32
    }

    pub fn rows(&self) -> u32 {
        self.model.image_size().height as u32
    }

    /// Pixel center to a ray `(x, y, 1)` on the normalized image plane.
    pub fn unproject(&self, col: u32, row: u32) -> (f64, f64) {
        let pixel = VecF64::<2>::new(col as f64 + 0.5, row as f64 + 0.5);
        let ray = self.model.cam_unproj_with_z(&pixel, 1.0);
        (ray[0], ray[1])
    }

    /// Normalized image plane to the pixel that contains it.
    pub fn project(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let pixel = self.model.cam_proj(&VecF64::<3>::new(x, y, 1.0));
        let col = pixel[0].floor();
        let row = pixel[1].floor();
        let inside = col >= 0.0 && row >= 0.0 && col < self.cols() as f64 && row < self.rows() as f64;
        inside.then_some((col as u32, row as u32))
    }
}
