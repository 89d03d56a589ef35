//! Lua scripting adapter for aroma.
//!
//! Exposes a `love.graphics` subset to Lua 5.4 and implements
//! [`ScriptHost`](aroma_engine::core::ScriptHost) by calling the script's
//! `love.load`, `love.update(dt)` and `love.draw` hooks.
//!
//! All argument checking happens in this crate; the engine only sees typed
//! calls.

mod api;
pub mod args;
pub mod image;
mod host;

pub use host::LuaHost;
pub use image::LuaImage;
