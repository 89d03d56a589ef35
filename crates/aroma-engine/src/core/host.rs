use thiserror::Error;

/// A lifecycle callback that raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{callback}: {message}")]
pub struct ScriptError {
    /// `"load"`, `"update"` or `"draw"`.
    pub callback: &'static str,
    /// The script runtime's message, traceback included when available.
    pub message: String,
}

impl ScriptError {
    pub fn new(callback: &'static str, message: impl Into<String>) -> Self {
        Self { callback, message: message.into() }
    }
}

/// The scripted program's lifecycle hooks.
///
/// Every hook is optional on the script side: an absent callback returns
/// `Ok(())`.
pub trait ScriptHost {
    fn load(&mut self) -> Result<(), ScriptError>;
    fn update(&mut self, dt: f32) -> Result<(), ScriptError>;
    fn draw(&mut self) -> Result<(), ScriptError>;
}
