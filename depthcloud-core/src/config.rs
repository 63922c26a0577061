use std::time::Duration;

use serde::Deserialize;

use crate::{ColorResolution, DepthMode, Fps, ImageFormat, WiredSyncMode};

/// The record handed to the SDK when streaming starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub color_format: ImageFormat,
    pub color_resolution: ColorResolution,
    pub depth_mode: DepthMode,
    pub camera_fps: Fps,
    pub synchronized_images_only: bool,
    pub wired_sync_mode: WiredSyncMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            color_format: ImageFormat::ColorBgra32,
            color_resolution: ColorResolution::R720p,
            depth_mode: DepthMode::NfovUnbinned,
            camera_fps: Fps::Fps30,
            synchronized_images_only: true,
            wired_sync_mode: WiredSyncMode::Standalone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    pub device_index: u32,
    pub device: DeviceConfig,
    // None waits forever
    pub capture_timeout_ms: Option<u32>,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            device_index: 0,
            device: DeviceConfig::default(),
            capture_timeout_ms: None,
        }
    }
}

impl SessionCfg {
    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_ms
            .map(|ms| Duration::from_millis(ms as u64))
    }
}

/// Depth interval, in millimetres, mapped onto the 8-bit depth window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DepthRange {
    pub near_mm: u16,
    pub far_mm: u16,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self {
            near_mm: 0,
            far_mm: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerCfg {
    pub session: SessionCfg,
    pub depth_range: DepthRange,
    pub exit_key: char,
    pub wait_key_delay_ms: u32,
    pub origin_scale: f64,
}

impl Default for ViewerCfg {
    fn default() -> Self {
        Self {
            session: SessionCfg::default(),
            depth_range: DepthRange::default(),
            exit_key: 'q',
            wait_key_delay_ms: 30,
            origin_scale: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: ViewerCfg = serde_json::from_str(
            r#"{ "session": { "device_index": 2, "device": { "depth_mode": "WfovBinned" } }, "exit_key": "x" }"#,
        )
        .unwrap();

        assert_eq!(cfg.session.device_index, 2);
        assert_eq!(cfg.session.device.depth_mode, DepthMode::WfovBinned);
        assert_eq!(cfg.session.device.color_resolution, ColorResolution::R720p);
        assert!(cfg.session.device.synchronized_images_only);
        assert_eq!(cfg.session.capture_timeout(), None);
        assert_eq!(cfg.exit_key, 'x');
        assert_eq!(cfg.wait_key_delay_ms, 30);
        assert_eq!(cfg.depth_range, DepthRange::default());
    }

    #[test]
    fn finite_capture_timeout() {
        let cfg = SessionCfg {
            capture_timeout_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(cfg.capture_timeout(), Some(Duration::from_millis(250)));
    }
}
