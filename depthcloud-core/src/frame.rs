use bytemuck::Pod;

use crate::{handle::Image, DepthRange, DepthSdk, Error};

/// A display-ready, tightly packed row-major pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<P> {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<P>,
}

/// BGRA color.
pub type ColorFrame = Frame<[u8; 4]>;
/// Depth in millimetres, 0 where there is no measurement.
pub type DepthFrame = Frame<u16>;
/// Per-pixel X/Y/Z in millimetres.
pub type PointCloudFrame = Frame<[i16; 3]>;
/// 8-bit single channel visualization.
pub type GrayFrame = Frame<u8>;

impl<P: Pod> Frame<P> {
    /// Copies a native image out of SDK memory, dropping any row padding.
    pub fn from_image<S: DepthSdk>(what: &'static str, image: &Image<'_, S>) -> Result<Self, Error> {
        Self::from_bytes(what, image.width(), image.height(), image.stride(), image.buffer())
    }

    pub fn from_bytes(
        what: &'static str,
        width: u32,
        height: u32,
        stride: u32,
        buffer: &[u8],
    ) -> Result<Self, Error> {
        let row_bytes = width as usize * std::mem::size_of::<P>();
        let stride = stride as usize;
        if stride < row_bytes {
            return Err(Error::UnexpectedImage {
                what,
                reason: format!("stride {stride} is narrower than a row of {row_bytes} bytes"),
            });
        }
        if buffer.len() < stride * height as usize {
            return Err(Error::UnexpectedImage {
                what,
                reason: format!(
                    "buffer holds {} bytes, expected {}",
                    buffer.len(),
                    stride * height as usize
                ),
            });
        }

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        if row_bytes > 0 {
            for row in buffer.chunks(stride).take(height as usize) {
                pixels.extend(
                    row[..row_bytes]
                        .chunks_exact(std::mem::size_of::<P>())
                        .map(bytemuck::pod_read_unaligned::<P>),
                );
            }
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

impl<P> Frame<P> {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }
}

impl DepthFrame {
    /// Linear remap of `range` onto 255..0, near bright and far dark.
    pub fn to_gray(&self, range: DepthRange) -> GrayFrame {
        let near = range.near_mm as f32;
        let span = (range.far_mm as f32 - near).max(1.0);
        let pixels = self
            .pixels
            .iter()
            .map(|&d| (255.0 * (range.far_mm as f32 - d as f32) / span).round().clamp(0.0, 255.0) as u8)
            .collect();
        GrayFrame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: [f32; 3],
    pub rgb: [u8; 3],
}

impl PointCloudFrame {
    /// Pairs every measured point with the color pixel it was projected from.
    pub fn colored_points<'a>(&'a self, color: &'a ColorFrame) -> impl Iterator<Item = ColoredPoint> + 'a {
        let aligned = self.width == color.width && self.height == color.height;
        if !aligned {
            log::debug!(
                "point cloud {}x{} does not match color {}x{}",
                self.width,
                self.height,
                color.width,
                color.height
            );
        }
        self.pixels
            .iter()
            .zip(color.pixels.iter())
            .take(if aligned { self.pixels.len() } else { 0 })
            .filter(|(xyz, _)| xyz[2] > 0)
            .map(|(xyz, bgra)| ColoredPoint {
                position: [xyz[0] as f32, xyz[1] as f32, xyz[2] as f32],
                rgb: [bgra[2], bgra[1], bgra[0]],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_row_padding() {
        // 2x2 u16 image with 2 bytes of padding per row
        let buffer = [1u8, 0, 2, 0, 0xff, 0xff, 3, 0, 4, 0, 0xff, 0xff];
        let frame = DepthFrame::from_bytes("depth", 2, 2, 6, &buffer).unwrap();
        assert_eq!(frame.pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = DepthFrame::from_bytes("depth", 4, 4, 8, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedImage { what: "depth", .. }));
    }

    #[test]
    fn rejects_narrow_stride() {
        let err = ColorFrame::from_bytes("color", 4, 1, 8, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedImage { what: "color", .. }));
    }

    #[test]
    fn gray_remap_matches_fixed_scale() {
        let depth = DepthFrame {
            width: 5,
            height: 1,
            pixels: vec![0, 1000, 2500, 5000, 9000],
        };
        let gray = depth.to_gray(DepthRange::default());
        assert_eq!(gray.pixels, vec![255, 204, 128, 0, 0]);
    }

    #[test]
    fn gray_remap_with_near_offset() {
        let depth = DepthFrame {
            width: 3,
            height: 1,
            pixels: vec![200, 500, 800],
        };
        let gray = depth.to_gray(DepthRange {
            near_mm: 500,
            far_mm: 1000,
        });
        assert_eq!(gray.pixels, vec![255, 255, 102]);
    }

    #[test]
    fn gray_remap_with_empty_or_inverted_range() {
        let depth = DepthFrame {
            width: 4,
            height: 1,
            pixels: vec![0, 999, 1000, 1001],
        };
        let empty = depth.to_gray(DepthRange {
            near_mm: 1000,
            far_mm: 1000,
        });
        assert_eq!(empty.pixels, vec![255, 255, 0, 0]);

        let inverted = depth.to_gray(DepthRange {
            near_mm: 2000,
            far_mm: 1000,
        });
        assert_eq!(inverted.pixels, vec![255, 255, 0, 0]);
    }

    #[test]
    fn colored_points_skip_missing_depth() {
        let cloud = PointCloudFrame {
            width: 2,
            height: 1,
            pixels: vec![[10, -20, 700], [0, 0, 0]],
        };
        let color = ColorFrame {
            width: 2,
            height: 1,
            pixels: vec![[1, 2, 3, 255], [4, 5, 6, 255]],
        };
        let points: Vec<_> = cloud.colored_points(&color).collect();
        assert_eq!(
            points,
            vec![ColoredPoint {
                position: [10.0, -20.0, 700.0],
                rgb: [3, 2, 1],
            }]
        );
    }

    #[test]
    fn colored_points_need_matching_sizes() {
        let cloud = PointCloudFrame {
            width: 1,
            height: 1,
            pixels: vec![[1, 1, 1]],
        };
        let color = ColorFrame {
            width: 2,
            height: 1,
            pixels: vec![[0; 4]; 2],
        };
        assert_eq!(cloud.colored_points(&color).count(), 0);
    }
}
