use std::{collections::HashSet, time::Duration};

use anyhow::Result;
use depthcloud_core::{ImageView, ImageWindows};
use opencv::{
    core::{Mat, Scalar, CV_8UC1, CV_8UC4},
    highgui,
    prelude::*,
};

/// OpenCV highgui windows, created lazily the first time a name is shown.
#[derive(Debug, Default)]
pub struct HighGuiWindows {
    named: HashSet<String>,
}

impl HighGuiWindows {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageWindows for HighGuiWindows {
    fn show(&mut self, name: &str, image: ImageView<'_>) -> Result<()> {
        if !self.named.contains(name) {
            highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
            self.named.insert(name.to_owned());
            log::debug!("opened window {name:?}");
        }
        let mat = image_to_mat(image)?;
        highgui::imshow(name, &mat)?;
        Ok(())
    }

    fn wait_key(&mut self, delay: Duration) -> Result<Option<i32>> {
        let delay = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX).max(1);
        let key = highgui::wait_key(delay)?;
        Ok((key >= 0).then_some(key))
    }

    fn destroy_all(&mut self) -> Result<()> {
        if !self.named.is_empty() {
            highgui::destroy_all_windows()?;
            self.named.clear();
        }
        Ok(())
    }
}

/// Copies a borrowed frame into an owned `Mat` of matching type.
pub fn image_to_mat(image: ImageView<'_>) -> opencv::Result<Mat> {
    let (typ, bytes): (i32, &[u8]) = match image {
        ImageView::Bgra(frame) => (CV_8UC4, bytemuck::cast_slice(&frame.pixels)),
        ImageView::Gray(frame) => (CV_8UC1, &frame.pixels),
    };
    mat_from_bytes(image.height() as i32, image.width() as i32, typ, bytes)
}

pub(crate) fn mat_from_bytes(rows: i32, cols: i32, typ: i32, bytes: &[u8]) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(rows, cols, typ, Scalar::all(0.))?;
    let data = mat.data_bytes_mut()?;
    if data.len() != bytes.len() {
        return Err(opencv::Error::new(
            opencv::core::StsUnmatchedSizes,
            format!("{rows}x{cols} mat holds {} bytes, got {}", data.len(), bytes.len()),
        ));
    }
    data.copy_from_slice(bytes);
    Ok(mat)
}
