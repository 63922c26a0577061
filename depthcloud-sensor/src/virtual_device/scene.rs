use crate::pinhole_camera::PinholeCamera;

const BACK_PLANE_MM: f64 = 2500.0;
const SPHERE_RADIUS_MM: f64 = 250.0;
const SPHERE_DEPTH_MM: f64 = 1500.0;
const SPHERE_SWING_MM: f64 = 300.0;
const CHECKER_MM: f64 = 200.0;

/// A sphere swinging left and right in front of a checkered wall, seen from
/// the origin looking down +Z.
pub(super) struct Scene {
    center: [f64; 3],
}

pub(super) struct Hit {
    pub depth_mm: f64,
    pub shade: [u8; 3],
}

impl Scene {
    pub fn at_frame(frame: u64) -> Self {
        let phase = frame as f64 * 0.05;
        Self {
            center: [SPHERE_SWING_MM * phase.sin(), 0.0, SPHERE_DEPTH_MM],
        }
    }

    /// Traces the ray `(x, y, 1)`; the returned depth is the Z coordinate.
    pub fn trace(&self, x: f64, y: f64) -> Hit {
        let direction = [x, y, 1.0];
        let a = dot(&direction, &direction);
        let b = -2.0 * dot(&direction, &self.center);
        let c = dot(&self.center, &self.center) - SPHERE_RADIUS_MM * SPHERE_RADIUS_MM;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let s = (-b - discriminant.sqrt()) / (2.0 * a);
            if s > 0.0 && s < BACK_PLANE_MM {
                let normal_z = (s - self.center[2]) / SPHERE_RADIUS_MM;
                let light = (0.3 + 0.7 * (-normal_z).clamp(0.0, 1.0)) * 255.0;
                return Hit {
                    depth_mm: s,
                    shade: [(light * 0.2) as u8, (light * 0.5) as u8, light as u8],
                };
            }
        }

        let cell = (x * BACK_PLANE_MM / CHECKER_MM).floor() as i64 + (y * BACK_PLANE_MM / CHECKER_MM).floor() as i64;
        let level = if cell.rem_euclid(2) == 0 { 200 } else { 90 };
        Hit {
            depth_mm: BACK_PLANE_MM,
            shade: [level, level, level],
        }
    }

    pub fn render_depth(&self, camera: &PinholeCamera) -> Vec<u8> {
        let mut data = Vec::with_capacity((camera.cols() * camera.rows()) as usize * 2);
        for row in 0..camera.rows() {
            for col in 0..camera.cols() {
                let (x, y) = camera.unproject(col, row);
                let depth = self.trace(x, y).depth_mm.round() as u16;
                data.extend_from_slice(&depth.to_ne_bytes());
            }
        }
        data
    }

    /// BGRA, fully opaque.
    pub fn render_color(&self, camera: &PinholeCamera) -> Vec<u8> {
        let mut data = Vec::with_capacity((camera.cols() * camera.rows()) as usize * 4);
        for row in 0..camera.rows() {
            for col in 0..camera.cols() {
                let (x, y) = camera.unproject(col, row);
                let [b, g, r] = self.trace(x, y).shade;
                data.extend_from_slice(&[b, g, r, 255]);
            }
        }
        data
    }
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
