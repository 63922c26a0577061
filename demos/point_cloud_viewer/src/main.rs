use clap::Parser;
use depthcloud_core::{viewer_name, SessionCfg, ViewerCfg};
use depthcloud_display::HighGuiWindows;

/// Show color, registered depth and a colored point cloud from one depth camera.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Index of the camera to open
    #[arg(value_name = "DEVICE_INDEX", default_value_t = 0)]
    device_index: u32,
}

#[cfg(feature = "k4a")]
fn sdk() -> depthcloud_sensor::k4a::K4aSdk {
    depthcloud_sensor::k4a::K4aSdk
}

#[cfg(not(feature = "k4a"))]
fn sdk() -> depthcloud_sensor::virtual_device::VirtualSdk {
    depthcloud_sensor::virtual_device::VirtualCfg::default().finalize()
}

#[cfg(feature = "viz")]
fn viewer(name: &str) -> anyhow::Result<depthcloud_display::VizViewer> {
    depthcloud_display::VizViewer::new(name)
}

#[cfg(not(feature = "viz"))]
fn viewer(name: &str) -> anyhow::Result<depthcloud_display::RerunViewer> {
    depthcloud_display::RerunViewer::spawn(name)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = ViewerCfg {
        session: SessionCfg {
            device_index: args.device_index,
            ..Default::default()
        },
        ..Default::default()
    };

    let sdk = sdk();
    let viewer = viewer(&viewer_name(args.device_index))?;
    let exit = cfg.finalize(&sdk, HighGuiWindows::new(), viewer).run()?;
    log::info!("exit: {exit:?}");
    Ok(())
}
