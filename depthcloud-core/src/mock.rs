//! Scripted SDK and display doubles that count every handle they hand out.

use std::{
    cell::{Cell, RefCell},
    collections::{HashSet, VecDeque},
    time::Duration,
};

use anyhow::Result;

use crate::{
    CalibrationType, CloudViewer, ColorFrame, ColorResolution, DepthMode, DepthSdk, DeviceConfig,
    ImageFormat, ImageView, ImageWindows, PointCloudFrame, SdkError, SdkResult, WaitResult,
};

const FAILED: i32 = 1;

#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Capture { color: bool, depth: bool },
    Timeout,
    Failed,
}

pub const BOTH: Scripted = Scripted::Capture {
    color: true,
    depth: true,
};

#[derive(Debug, Default)]
pub struct Ledger {
    pub opened: u32,
    pub closed: u32,
    pub started: u32,
    pub stopped: u32,
    pub transformations_created: u32,
    pub transformations_destroyed: u32,
    pub capture_waits: u32,
    pub captures_released: u32,
    pub images_created: u32,
    pub images_released: u32,
    pub live: HashSet<u64>,
    // live handle count at the moment each capture wait started
    pub live_at_wait: Vec<usize>,
}

pub struct MockDevice(u64);

pub struct MockCapture {
    id: u64,
    color: bool,
    depth: bool,
}

pub struct MockTransformation(u64);

#[derive(Debug)]
pub struct MockCalibration {
    pub depth_mode: DepthMode,
    pub color_resolution: ColorResolution,
}

pub struct MockImage {
    id: u64,
    format: ImageFormat,
    width: u32,
    height: u32,
    stride: u32,
    data: Vec<u8>,
}

pub struct MockSdk {
    pub installed: u32,
    pub color_size: (u32, u32),
    pub depth_size: (u32, u32),
    pub fail_on: Option<&'static str>,
    pub ledger: RefCell<Ledger>,
    script: RefCell<VecDeque<Scripted>>,
    next_id: Cell<u64>,
}

impl MockSdk {
    /// Once the script runs out every wait times out.
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            installed: 1,
            color_size: (8, 6),
            depth_size: (4, 3),
            fail_on: None,
            ledger: RefCell::new(Ledger::default()),
            script: RefCell::new(script.into_iter().collect()),
            next_id: Cell::new(1),
        }
    }

    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    fn check(&self, operation: &'static str) -> SdkResult<()> {
        if self.fail_on == Some(operation) {
            Err(SdkError::new(operation, FAILED))
        } else {
            Ok(())
        }
    }

    fn track(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.ledger.borrow_mut().live.insert(id);
        id
    }

    fn untrack(&self, id: u64) {
        let removed = self.ledger.borrow_mut().live.remove(&id);
        assert!(removed, "handle {id} released twice or never acquired");
    }

    fn new_image(&self, format: ImageFormat, width: u32, height: u32, stride: u32, fill: &[u8]) -> MockImage {
        let mut data = vec![0u8; (stride * height) as usize];
        for row in data.chunks_mut(stride as usize) {
            for (i, byte) in row.iter_mut().enumerate() {
                *byte = fill[i % fill.len()];
            }
        }
        MockImage {
            id: self.track(),
            format,
            width,
            height,
            stride,
            data,
        }
    }

    pub fn live(&self) -> usize {
        self.ledger.borrow().live.len()
    }
}

impl DepthSdk for MockSdk {
    type Device = MockDevice;
    type Capture = MockCapture;
    type Image = MockImage;
    type Transformation = MockTransformation;
    type Calibration = MockCalibration;

    fn installed_count(&self) -> u32 {
        self.installed
    }

    fn device_open(&self, _index: u32) -> SdkResult<MockDevice> {
        self.check("open device")?;
        self.ledger.borrow_mut().opened += 1;
        Ok(MockDevice(self.track()))
    }

    fn device_close(&self, device: &mut MockDevice) {
        self.untrack(device.0);
        self.ledger.borrow_mut().closed += 1;
    }

    fn device_start_cameras(&self, _device: &MockDevice, _config: &DeviceConfig) -> SdkResult<()> {
        self.check("start cameras")?;
        self.ledger.borrow_mut().started += 1;
        Ok(())
    }

    fn device_stop_cameras(&self, _device: &MockDevice) {
        self.ledger.borrow_mut().stopped += 1;
    }

    fn device_get_calibration(
        &self,
        _device: &MockDevice,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> SdkResult<MockCalibration> {
        self.check("get calibration")?;
        Ok(MockCalibration {
            depth_mode,
            color_resolution,
        })
    }

    fn device_get_capture(&self, _device: &MockDevice, _timeout: Option<Duration>) -> WaitResult<MockCapture> {
        {
            let mut ledger = self.ledger.borrow_mut();
            ledger.capture_waits += 1;
            // the device and the transformation stay open across frames
            let live = ledger.live.len().saturating_sub(2);
            ledger.live_at_wait.push(live);
        }
        match self.script.borrow_mut().pop_front() {
            Some(Scripted::Capture { color, depth }) => WaitResult::Succeeded(MockCapture {
                id: self.track(),
                color,
                depth,
            }),
            Some(Scripted::Failed) => WaitResult::Failed,
            Some(Scripted::Timeout) | None => WaitResult::Timeout,
        }
    }

    fn capture_get_color_image(&self, capture: &MockCapture) -> Option<MockImage> {
        capture.color.then(|| {
            let (width, height) = self.color_size;
            self.new_image(ImageFormat::ColorBgra32, width, height, width * 4, &[10, 20, 30, 255])
        })
    }

    fn capture_get_depth_image(&self, capture: &MockCapture) -> Option<MockImage> {
        capture.depth.then(|| {
            let (width, height) = self.depth_size;
            self.new_image(ImageFormat::Depth16, width, height, width * 2, &1000u16.to_ne_bytes())
        })
    }

    fn capture_release(&self, capture: &mut MockCapture) {
        self.untrack(capture.id);
        self.ledger.borrow_mut().captures_released += 1;
    }

    fn image_create(&self, format: ImageFormat, width: u32, height: u32, stride_bytes: u32) -> SdkResult<MockImage> {
        self.check("create image")?;
        self.ledger.borrow_mut().images_created += 1;
        Ok(self.new_image(format, width, height, stride_bytes, &[0]))
    }

    fn image_release(&self, image: &mut MockImage) {
        self.untrack(image.id);
        self.ledger.borrow_mut().images_released += 1;
    }

    fn image_format(&self, image: &MockImage) -> ImageFormat {
        image.format
    }

    fn image_width(&self, image: &MockImage) -> u32 {
        image.width
    }

    fn image_height(&self, image: &MockImage) -> u32 {
        image.height
    }

    fn image_stride(&self, image: &MockImage) -> u32 {
        image.stride
    }

    fn image_buffer<'a>(&self, image: &'a MockImage) -> &'a [u8] {
        &image.data
    }

    fn transformation_create(&self, _calibration: &MockCalibration) -> SdkResult<MockTransformation> {
        self.check("create transformation")?;
        self.ledger.borrow_mut().transformations_created += 1;
        Ok(MockTransformation(self.track()))
    }

    fn transformation_destroy(&self, transformation: &mut MockTransformation) {
        self.untrack(transformation.0);
        self.ledger.borrow_mut().transformations_destroyed += 1;
    }

    fn transformation_depth_image_to_color_camera(
        &self,
        _transformation: &MockTransformation,
        depth_image: &MockImage,
        transformed_depth_image: &mut MockImage,
    ) -> SdkResult<()> {
        self.check("transform depth to color")?;
        assert_eq!(depth_image.format, ImageFormat::Depth16);
        assert_eq!(transformed_depth_image.format, ImageFormat::Depth16);
        for pixel in transformed_depth_image.data.chunks_exact_mut(2) {
            pixel.copy_from_slice(&1500u16.to_ne_bytes());
        }
        Ok(())
    }

    fn transformation_depth_image_to_point_cloud(
        &self,
        _transformation: &MockTransformation,
        depth_image: &MockImage,
        camera: CalibrationType,
        xyz_image: &mut MockImage,
    ) -> SdkResult<()> {
        self.check("transform depth to point cloud")?;
        assert_eq!(camera, CalibrationType::Color);
        assert_eq!(xyz_image.format, ImageFormat::Custom);
        assert_eq!((xyz_image.width, xyz_image.height), (depth_image.width, depth_image.height));
        for point in xyz_image.data.chunks_exact_mut(6) {
            point[4..6].copy_from_slice(&1500i16.to_ne_bytes());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingWindows {
    pub shown: Vec<(String, u32, u32)>,
    pub keys: VecDeque<i32>,
    pub key_polls: u32,
    pub destroyed: u32,
}

impl RecordingWindows {
    pub fn shown_in(&self, name: &str) -> Vec<(u32, u32)> {
        self.shown
            .iter()
            .filter(|(window, _, _)| window == name)
            .map(|(_, width, height)| (*width, *height))
            .collect()
    }
}

impl ImageWindows for RecordingWindows {
    fn show(&mut self, name: &str, image: ImageView<'_>) -> Result<()> {
        self.shown.push((name.to_owned(), image.width(), image.height()));
        Ok(())
    }

    fn wait_key(&mut self, _delay: Duration) -> Result<Option<i32>> {
        self.key_polls += 1;
        Ok(self.keys.pop_front())
    }

    fn destroy_all(&mut self) -> Result<()> {
        self.destroyed += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingViewer {
    pub origin: Option<f64>,
    // widget id and number of points per update
    pub clouds: Vec<(String, usize)>,
    pub spins: u32,
    pub stop_after_spins: Option<u32>,
    pub closed: u32,
}

impl CloudViewer for RecordingViewer {
    fn show_origin(&mut self, scale: f64) -> Result<()> {
        self.origin = Some(scale);
        Ok(())
    }

    fn show_cloud(&mut self, id: &str, cloud: &PointCloudFrame, color: &ColorFrame) -> Result<()> {
        assert_eq!((cloud.width, cloud.height), (color.width, color.height));
        self.clouds.push((id.to_owned(), cloud.len()));
        Ok(())
    }

    fn spin_once(&mut self) -> Result<()> {
        self.spins += 1;
        Ok(())
    }

    fn was_stopped(&self) -> bool {
        self.stop_after_spins.is_some_and(|n| self.spins >= n)
    }

    fn close(&mut self) -> Result<()> {
        self.closed += 1;
        Ok(())
    }
}
