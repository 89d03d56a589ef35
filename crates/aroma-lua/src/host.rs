use std::path::Path;

use anyhow::{Context, Result};
use mlua::{Function, IntoLuaMulti, Lua, Table, Value};

use aroma_engine::core::{ScriptError, ScriptHost};
use aroma_engine::graphics::SharedGraphics;

use crate::api;

/// A Lua 5.4 state with the `love` API installed.
///
/// Lifecycle hooks are looked up on the `love` table at every call, so a
/// script may define or replace them at any time.
pub struct LuaHost {
    lua: Lua,
    love: Table,
    graphics: SharedGraphics,
}

impl LuaHost {
    pub fn new(graphics: SharedGraphics) -> Result<Self> {
        let lua = Lua::new();
        let love = api::install(&lua, &graphics)
            .map_err(lua_error)
            .context("failed to install the love API")?;
        lua.globals()
            .set("love", love.clone())
            .map_err(lua_error)
            .context("failed to set the love global")?;
        Ok(Self { lua, love, graphics })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn graphics(&self) -> &SharedGraphics {
        &self.graphics
    }

    /// Runs a chunk. `chunk_name` shows up in error messages.
    pub fn exec(&self, source: &str, chunk_name: &str) -> Result<()> {
        log::debug!("running chunk {chunk_name}");
        self.lua
            .load(source)
            .set_name(format!("@{chunk_name}"))
            .exec()
            .map_err(lua_error)
            .with_context(|| format!("failed to run {chunk_name}"))
    }

    pub fn exec_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.exec(&source, &path.display().to_string())
    }

    fn hook(&self, name: &str) -> Option<Function> {
        match self.love.get::<Value>(name) {
            Ok(Value::Function(f)) => Some(f),
            _ => None,
        }
    }

    fn call(&self, name: &'static str, args: impl IntoLuaMulti) -> Result<(), ScriptError> {
        let Some(f) = self.hook(name) else { return Ok(()) };
        f.call::<()>(args)
            .map_err(|e| ScriptError::new(name, e.to_string()))
    }
}

/// `mlua::Error` is not `Send + Sync` without mlua's `send` feature, so it
/// cannot carry anyhow context directly.
fn lua_error(err: mlua::Error) -> anyhow::Error {
    anyhow::anyhow!("{err}")
}

impl ScriptHost for LuaHost {
    fn load(&mut self) -> Result<(), ScriptError> {
        self.call("load", ())
    }

    fn update(&mut self, dt: f32) -> Result<(), ScriptError> {
        self.call("update", f64::from(dt))
    }

    fn draw(&mut self) -> Result<(), ScriptError> {
        self.call("draw", ())
    }
}
