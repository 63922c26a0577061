use std::collections::HashSet;

use anyhow::Result;
use depthcloud_core::{CloudViewer, ColorFrame, PointCloudFrame};
use opencv::{
    core::{CV_32FC3, CV_8UC3},
    prelude::*,
    viz,
};

use crate::highgui_windows::mat_from_bytes;

/// An in-process OpenCV viz window.
pub struct VizViewer {
    window: viz::Viz3d,
    clouds: CloudWidgets,
}

impl VizViewer {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            window: viz::Viz3d::new(name)?,
            clouds: CloudWidgets::default(),
        })
    }
}

impl CloudViewer for VizViewer {
    fn show_origin(&mut self, scale: f64) -> Result<()> {
        let origin = viz::WCameraPosition::new(scale)?;
        self.window.show_widget_def("origin", &origin)?;
        Ok(())
    }

    fn show_cloud(&mut self, id: &str, cloud: &PointCloudFrame, color: &ColorFrame) -> Result<()> {
        let (xyz, bgr) = split_points(cloud, color);
        match self.clouds.update(id, !xyz.is_empty()) {
            WidgetUpdate::Show => {
                let n = xyz.len() as i32;
                let xyz = mat_from_bytes(1, n, CV_32FC3, bytemuck::cast_slice(&xyz))?;
                let bgr = mat_from_bytes(1, n, CV_8UC3, bytemuck::cast_slice(&bgr))?;
                let widget = viz::WCloud::new(&xyz, &bgr)?;
                self.window.show_widget_def(id, &widget)?;
            }
            WidgetUpdate::Remove => self.window.remove_widget(id)?,
            WidgetUpdate::Nothing => {}
        }
        Ok(())
    }

    fn spin_once(&mut self) -> Result<()> {
        self.window.spin_once_def()?;
        Ok(())
    }

    fn was_stopped(&self) -> bool {
        self.window.was_stopped().unwrap_or(true)
    }

    fn close(&mut self) -> Result<()> {
        self.window.close()?;
        Ok(())
    }
}

/// Positions and BGR colors of every measured point.
fn split_points(cloud: &PointCloudFrame, color: &ColorFrame) -> (Vec<[f32; 3]>, Vec<[u8; 3]>) {
    cloud
        .colored_points(color)
        .map(|point| {
            let [r, g, b] = point.rgb;
            (point.position, [b, g, r])
        })
        .unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidgetUpdate {
    Show,
    Remove,
    Nothing,
}

// viz refuses to remove a widget id it does not hold
#[derive(Debug, Default)]
struct CloudWidgets {
    shown: HashSet<String>,
}

impl CloudWidgets {
    fn update(&mut self, id: &str, has_points: bool) -> WidgetUpdate {
        if has_points {
            self.shown.insert(id.to_owned());
            WidgetUpdate::Show
        } else if self.shown.remove(id) {
            WidgetUpdate::Remove
        } else {
            WidgetUpdate::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_removes_the_previous_cloud() {
        let mut clouds = CloudWidgets::default();
        assert_eq!(clouds.update("cloud", false), WidgetUpdate::Nothing);
        assert_eq!(clouds.update("cloud", true), WidgetUpdate::Show);
        assert_eq!(clouds.update("cloud", false), WidgetUpdate::Remove);
        assert_eq!(clouds.update("cloud", false), WidgetUpdate::Nothing);
    }

    #[test]
    fn points_are_split_into_positions_and_bgr() {
        let cloud = PointCloudFrame {
            width: 2,
            height: 1,
            pixels: vec![[1, 2, 3], [0, 0, 0]],
        };
        let color = ColorFrame {
            width: 2,
            height: 1,
            pixels: vec![[10, 20, 30, 255], [40, 50, 60, 255]],
        };
        let (xyz, bgr) = split_points(&cloud, &color);
        assert_eq!(xyz, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(bgr, vec![[10, 20, 30]]);
    }

    #[test]
    fn frame_without_depth_has_no_points() {
        let cloud = PointCloudFrame {
            width: 1,
            height: 1,
            pixels: vec![[0, 0, 0]],
        };
        let color = ColorFrame {
            width: 1,
            height: 1,
            pixels: vec![[0, 0, 0, 255]],
        };
        let (xyz, bgr) = split_points(&cloud, &color);
        assert!(xyz.is_empty() && bgr.is_empty());
    }
}
