use std::time::Instant;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the window runtime.
pub trait App {
    /// Called when the window asks to close. Returning `Continue` keeps it open.
    fn on_close_requested(&mut self) -> AppControl {
        AppControl::Exit
    }

    /// Called once per redraw with the time the redraw was handled.
    fn on_frame(&mut self, now: Instant) -> AppControl;
}
