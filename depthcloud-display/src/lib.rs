mod highgui_windows;
pub use highgui_windows::*;
mod rerun_viewer;
pub use rerun_viewer::*;
#[cfg(feature = "viz")]
mod viz_viewer;
#[cfg(feature = "viz")]
pub use viz_viewer::*;
