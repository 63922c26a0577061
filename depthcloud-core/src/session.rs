use std::time::Duration;

use crate::{
    handle::{Device, Image, Transformation},
    CalibrationType, ColorFrame, DepthFrame, DepthSdk, DeviceConfig, Error, ImageFormat,
    PointCloudFrame, SessionCfg, WaitResult,
};

/// An open, streaming camera together with its depth-to-color transformation.
pub struct Session<'s, S: DepthSdk> {
    // fields drop in declaration order: the transformation goes before the device
    transformation: Transformation<'s, S>,
    device: Device<'s, S>,
    sdk: &'s S,
    config: DeviceConfig,
    capture_timeout: Option<Duration>,
}

/// Result of one blocking wait on the device.
pub enum Acquired<'s, S: DepthSdk> {
    Frame(NativeFrame<'s, S>),
    Timeout,
}

/// The SDK images produced for one capture. Any of them may be missing.
pub struct NativeFrame<'s, S: DepthSdk> {
    pub color: Option<Image<'s, S>>,
    pub depth: Option<Image<'s, S>>,
    pub transformed_depth: Option<Image<'s, S>>,
    pub point_cloud: Option<Image<'s, S>>,
}

/// Display-ready copies of a [`NativeFrame`].
#[derive(Debug, Clone, Default)]
pub struct DisplayFrame {
    pub color: Option<ColorFrame>,
    pub transformed_depth: Option<DepthFrame>,
    pub point_cloud: Option<PointCloudFrame>,
}

impl<'s, S: DepthSdk> Session<'s, S> {
    pub fn open(sdk: &'s S, cfg: &SessionCfg) -> Result<Self, Error> {
        let installed = sdk.installed_count();
        if installed == 0 {
            return Err(Error::NoDevice);
        }
        log::debug!("{installed} device(s) installed");

        let device = Device::open(sdk, cfg.device_index)?;
        log::info!("opened device {}", cfg.device_index);

        device.start_cameras(&cfg.device)?;
        log::info!(
            "streaming {:?} color at {:?}, depth {:?}, {:?}",
            cfg.device.color_format,
            cfg.device.color_resolution,
            cfg.device.depth_mode,
            cfg.device.camera_fps
        );

        let calibration = device.calibration(cfg.device.depth_mode, cfg.device.color_resolution)?;
        log::debug!("calibration: {calibration:?}");

        let transformation = Transformation::create(sdk, &calibration)?;

        Ok(Self {
            transformation,
            device,
            sdk,
            config: cfg.device.clone(),
            capture_timeout: cfg.capture_timeout(),
        })
    }

    pub fn device_index(&self) -> u32 {
        self.device.index()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Waits for the next capture and runs registration and projection on it.
    ///
    /// The capture itself is released before this returns; the images it
    /// yielded are owned by the returned frame.
    pub fn acquire(&self) -> Result<Acquired<'s, S>, Error> {
        let capture = match self.device.capture(self.capture_timeout) {
            WaitResult::Succeeded(capture) => capture,
            WaitResult::Timeout => return Ok(Acquired::Timeout),
            WaitResult::Failed => return Err(Error::CaptureFailed),
        };

        let color = capture.color_image();
        let depth = capture.depth_image();

        let transformed_depth = match &depth {
            Some(depth) => self.register(depth, color.as_ref())?,
            None => {
                log::debug!("no depth image in capture, skipping registration");
                None
            }
        };

        let point_cloud = match &transformed_depth {
            Some(transformed_depth) => Some(self.project(transformed_depth)?),
            None => None,
        };

        drop(capture);

        Ok(Acquired::Frame(NativeFrame {
            color,
            depth,
            transformed_depth,
            point_cloud,
        }))
    }

    /// Resamples `depth` into the color camera's pixel grid.
    fn register(
        &self,
        depth: &Image<'s, S>,
        color: Option<&Image<'s, S>>,
    ) -> Result<Option<Image<'s, S>>, Error> {
        let (width, height) = match color {
            Some(color) => (color.width(), color.height()),
            None => match self.config.color_resolution.dimensions() {
                Some(dimensions) => dimensions,
                None => {
                    log::debug!("color camera is off, skipping registration");
                    return Ok(None);
                }
            },
        };

        let stride_bytes = width * std::mem::size_of::<u16>() as u32;
        let mut transformed =
            Image::create(self.sdk, ImageFormat::Depth16, width, height, stride_bytes)?;
        self.transformation
            .depth_image_to_color_camera(depth, &mut transformed)?;
        Ok(Some(transformed))
    }

    /// Turns registered depth into one XYZ triple per color pixel.
    fn project(&self, transformed_depth: &Image<'s, S>) -> Result<Image<'s, S>, Error> {
        let width = transformed_depth.width();
        let height = transformed_depth.height();
        let stride_bytes = width * 3 * std::mem::size_of::<i16>() as u32;
        let mut xyz = Image::create(self.sdk, ImageFormat::Custom, width, height, stride_bytes)?;
        self.transformation.depth_image_to_point_cloud(
            transformed_depth,
            CalibrationType::Color,
            &mut xyz,
        )?;
        Ok(xyz)
    }

    /// Tears the session down. Dropping it does the same, without the log line.
    pub fn close(self) {
        let index = self.device.index();
        drop(self);
        log::info!("closed device {index}");
    }
}

impl<S: DepthSdk> NativeFrame<'_, S> {
    /// Copies every present image into display memory and releases the native
    /// handles.
    pub fn into_display(self) -> Result<DisplayFrame, Error> {
        let NativeFrame {
            color,
            depth,
            transformed_depth,
            point_cloud,
        } = self;
        drop(depth);

        Ok(DisplayFrame {
            color: color
                .map(|image| ColorFrame::from_image("color", &image))
                .transpose()?,
            transformed_depth: transformed_depth
                .map(|image| DepthFrame::from_image("transformed depth", &image))
                .transpose()?,
            point_cloud: point_cloud
                .map(|image| PointCloudFrame::from_image("point cloud", &image))
                .transpose()?,
        })
    }
}
