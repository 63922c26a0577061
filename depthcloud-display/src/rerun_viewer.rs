use anyhow::Result;
use depthcloud_core::{CloudViewer, ColorFrame, PointCloudFrame};
use rerun::{RecordingStream, RecordingStreamBuilder};

/// Streams the point cloud to a rerun viewer process.
///
/// The viewer runs out of process, so closing its window is not observable
/// here and [`CloudViewer::was_stopped`] stays `false`.
pub struct RerunViewer {
    rec: RecordingStream,
    frame: i64,
}

impl RerunViewer {
    /// Spawns a native viewer and connects to it.
    pub fn spawn(name: &str) -> Result<Self> {
        let rec = RecordingStreamBuilder::new(name.to_owned()).spawn()?;
        log::info!("streaming {name:?} to rerun");
        Ok(Self::with_stream(rec))
    }

    pub fn with_stream(rec: RecordingStream) -> Self {
        Self { rec, frame: 0 }
    }
}

impl CloudViewer for RerunViewer {
    fn show_origin(&mut self, scale: f64) -> Result<()> {
        let s = scale as f32;
        self.rec.log_static(
            "origin",
            &rerun::Arrows3D::from_vectors([[s, 0., 0.], [0., s, 0.], [0., 0., s]]).with_colors([
                rerun::Color::from_rgb(255, 0, 0),
                rerun::Color::from_rgb(0, 255, 0),
                rerun::Color::from_rgb(0, 0, 255),
            ]),
        )?;
        Ok(())
    }

    fn show_cloud(&mut self, id: &str, cloud: &PointCloudFrame, color: &ColorFrame) -> Result<()> {
        self.rec.set_time_sequence("frame", self.frame);
        let (positions, colors): (Vec<[f32; 3]>, Vec<rerun::Color>) = cloud
            .colored_points(color)
            .map(|p| (p.position, rerun::Color::from_rgb(p.rgb[0], p.rgb[1], p.rgb[2])))
            .unzip();
        log::trace!("logging {} points to {id:?}", positions.len());
        self.rec.log(id, &rerun::Points3D::new(positions).with_colors(colors))?;
        Ok(())
    }

    fn spin_once(&mut self) -> Result<()> {
        self.frame += 1;
        Ok(())
    }

    fn was_stopped(&self) -> bool {
        false
    }

    fn close(&mut self) -> Result<()> {
        self.rec.flush_blocking();
        Ok(())
    }
}
