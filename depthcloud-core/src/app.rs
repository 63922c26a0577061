use std::time::Duration;

use anyhow::Result;

use crate::{
    present, Acquired, CloudViewer, DepthSdk, ImageWindows, Session, ViewerCfg,
};

/// Why the main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    UserRequested,
    ViewerClosed,
    CaptureTimeout,
}

enum State<'s, S: DepthSdk> {
    Initializing,
    Running(Session<'s, S>),
    ShuttingDown(Session<'s, S>, Exit),
}

/// Grab, register, project and show frames until the user or the device stops
/// the loop.
pub struct PointCloudApp<'s, S: DepthSdk, W, V> {
    sdk: &'s S,
    cfg: ViewerCfg,
    windows: W,
    viewer: V,
    frames: u64,
}

impl ViewerCfg {
    pub fn finalize<S, W, V>(self, sdk: &S, windows: W, viewer: V) -> PointCloudApp<'_, S, W, V>
    where
        S: DepthSdk,
        W: ImageWindows,
        V: CloudViewer,
    {
        PointCloudApp {
            sdk,
            cfg: self,
            windows,
            viewer,
            frames: 0,
        }
    }
}

impl<'s, S, W, V> PointCloudApp<'s, S, W, V>
where
    S: DepthSdk,
    W: ImageWindows,
    V: CloudViewer,
{
    pub fn windows(&self) -> &W {
        &self.windows
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn windows_mut(&mut self) -> &mut W {
        &mut self.windows
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    /// Runs the loop to completion. Native handles and display resources are
    /// released on every way out, including errors.
    pub fn run(&mut self) -> Result<Exit> {
        let mut state = State::Initializing;
        loop {
            state = match self.advance(state) {
                Ok(State::ShuttingDown(session, exit)) => {
                    session.close();
                    self.close_display()?;
                    log::info!("stopped after {} frame(s): {exit:?}", self.frames);
                    return Ok(exit);
                }
                Ok(next) => next,
                Err(err) => {
                    if let Err(close_err) = self.close_display() {
                        log::warn!("failed to close display: {close_err:#}");
                    }
                    log::info!("aborted after {} frame(s)", self.frames);
                    return Err(err);
                }
            };
        }
    }

    fn advance(&mut self, state: State<'s, S>) -> Result<State<'s, S>> {
        Ok(match state {
            State::Initializing => {
                let session = Session::open(self.sdk, &self.cfg.session)?;
                self.viewer.show_origin(self.cfg.origin_scale)?;
                State::Running(session)
            }
            State::Running(session) => match self.step(&session)? {
                Some(exit) => State::ShuttingDown(session, exit),
                None => State::Running(session),
            },
            State::ShuttingDown(session, exit) => State::ShuttingDown(session, exit),
        })
    }

    fn step(&mut self, session: &Session<'s, S>) -> Result<Option<Exit>> {
        let native = match session.acquire()? {
            Acquired::Frame(native) => native,
            Acquired::Timeout => {
                log::warn!("timed out waiting for a capture");
                return Ok(Some(Exit::CaptureTimeout));
            }
        };
        let frame = native.into_display()?;
        self.frames += 1;

        present(
            &frame,
            session.device_index(),
            self.cfg.depth_range,
            &mut self.windows,
            &mut self.viewer,
        )?;

        let delay = Duration::from_millis(self.cfg.wait_key_delay_ms as u64);
        if self.windows.wait_key(delay)? == Some(u32::from(self.cfg.exit_key) as i32) {
            return Ok(Some(Exit::UserRequested));
        }
        if self.viewer.was_stopped() {
            return Ok(Some(Exit::ViewerClosed));
        }
        Ok(None)
    }

    fn close_display(&mut self) -> Result<()> {
        let windows = self.windows.destroy_all();
        self.viewer.close()?;
        windows
    }
}
