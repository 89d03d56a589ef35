use std::time::Instant;

use crate::graphics::SharedGraphics;
use crate::time::{FrameClock, FrameTime};

use super::{App, AppControl, ScriptError, ScriptHost};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// `load` has not run yet.
    Uninitialized,
    /// `load` ran; no tick yet.
    Ready,
    /// The last tick ran every callback cleanly.
    Running,
    /// The last `load` or tick had a failing callback. Ticking continues.
    Errored,
}

/// Runs the script lifecycle against the graphics context.
///
/// Each tick: deliver finished loads, measure dt, `update(dt)`, clear and
/// reset the transform stack, `draw()`, present. A failing callback is
/// logged and abandons only the rest of that callback.
pub struct FrameLoop<H> {
    graphics: SharedGraphics,
    host: H,
    clock: FrameClock,
    state: LoopState,
    error_count: u64,
    last_error: Option<ScriptError>,
}

impl<H: ScriptHost> FrameLoop<H> {
    pub fn new(graphics: SharedGraphics, host: H) -> Self {
        Self {
            graphics,
            host,
            clock: FrameClock::new(),
            state: LoopState::Uninitialized,
            error_count: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of callback failures so far.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn graphics(&self) -> &SharedGraphics {
        &self.graphics
    }

    /// Invokes `load` once and starts timing from `now`.
    ///
    /// Returns the `load` failure, if any, after reporting it. Calling this
    /// again is a no-op.
    pub fn start(&mut self, now: Instant) -> Result<(), ScriptError> {
        if self.state != LoopState::Uninitialized {
            log::debug!("frame loop already started");
            return Ok(());
        }

        let result = self.host.load();
        self.state = LoopState::Ready;
        if let Err(err) = &result {
            self.report(err.clone());
        }

        self.clock.reset(now);
        log::info!("frame loop started");
        result
    }

    /// Runs one frame. Returns `None` before [`start`](Self::start).
    pub fn tick(&mut self, now: Instant) -> Option<FrameTime> {
        if self.state == LoopState::Uninitialized {
            log::warn!("tick before start ignored");
            return None;
        }

        self.graphics.borrow_mut().pump_loads();

        let ft = self.clock.tick_at(now);
        let mut clean = true;

        if let Err(err) = self.host.update(ft.dt) {
            self.report(err);
            clean = false;
        }

        self.graphics.borrow_mut().begin_frame();

        if let Err(err) = self.host.draw() {
            self.report(err);
            clean = false;
        }

        self.graphics.borrow_mut().end_frame();

        self.state = if clean { LoopState::Running } else { LoopState::Errored };
        Some(ft)
    }

    fn report(&mut self, err: ScriptError) {
        log::error!("script error in {}", err);
        self.error_count += 1;
        self.last_error = Some(err);
        self.state = LoopState::Errored;
    }
}

impl<H: ScriptHost> App for FrameLoop<H> {
    fn on_frame(&mut self, now: Instant) -> AppControl {
        self.tick(now);
        if self.graphics.borrow().device_lost() {
            return AppControl::Exit;
        }
        AppControl::Continue
    }
}
