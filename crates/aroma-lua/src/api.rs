//! The `love.graphics` table.

use mlua::{IntoLuaMulti, Lua, Table, Value, Variadic};

use aroma_engine::graphics::{Graphics, SharedGraphics};
use aroma_engine::paint::Color;
use aroma_engine::render::{DrawMode, ImageDraw};

use crate::args::Args;
use crate::image::LuaImage;

/// Builds the `love` table with its `graphics` sub-table.
pub fn install(lua: &Lua, graphics: &SharedGraphics) -> mlua::Result<Table> {
    let gfx = lua.create_table()?;

    add(lua, &gfx, graphics, "setBackgroundColor", |g, args| {
        let color = color_args(&args)?;
        with_graphics(g, |g| g.set_background_color(color))
    })?;
    add(lua, &gfx, graphics, "getBackgroundColor", |g, _| {
        with_graphics(g, |g| color_tuple(g.background_color()))
    })?;
    add(lua, &gfx, graphics, "setColor", |g, args| {
        let color = color_args(&args)?;
        with_graphics(g, |g| g.set_color(color))
    })?;
    add(lua, &gfx, graphics, "getColor", |g, _| with_graphics(g, |g| color_tuple(g.color())))?;

    add(lua, &gfx, graphics, "push", |g, args| {
        with_graphics(g, Graphics::push)?.map_err(|e| args.error(e))
    })?;
    add(lua, &gfx, graphics, "pop", |g, args| {
        with_graphics(g, Graphics::pop)?.map_err(|e| args.error(e))
    })?;
    add(lua, &gfx, graphics, "origin", |g, _| with_graphics(g, Graphics::origin))?;
    add(lua, &gfx, graphics, "translate", |g, args| {
        let (tx, ty) = (args.number(1)? as f32, args.number(2)? as f32);
        with_graphics(g, |g| g.translate(tx, ty))
    })?;
    add(lua, &gfx, graphics, "rotate", |g, args| {
        let angle = args.number(1)? as f32;
        with_graphics(g, |g| g.rotate(angle))
    })?;
    add(lua, &gfx, graphics, "scale", |g, args| {
        let sx = args.number(1)?;
        let sy = args.opt_number(2, sx)?;
        with_graphics(g, |g| g.scale(sx as f32, sy as f32))
    })?;

    add(lua, &gfx, graphics, "polygon", |g, args| {
        let mode = DrawMode::parse(&args.string(1)?)
            .and_then(DrawMode::drawable)
            .map_err(|e| args.error(e))?;
        let coords: Vec<f32> = args.numbers_or_table(2)?.into_iter().map(|v| v as f32).collect();
        with_graphics(g, |g| g.polygon(mode, &coords))?.map_err(|e| args.error(e))
    })?;

    let image_graphics = graphics.clone();
    let new_image = lua.create_function(move |lua, values: Variadic<Value>| {
        let args = Args::new(lua, "newImage", values);
        let path = args.string(1)?;
        let (id, releaser) = with_graphics(&image_graphics, |g| (g.new_image(path.clone()), g.releaser()))?;
        Ok(LuaImage::new(id, path, image_graphics.clone(), releaser))
    })?;
    gfx.set("newImage", new_image)?;

    add(lua, &gfx, graphics, "draw", |g, args| {
        let id = args.image(1)?;
        let sx = args.opt_number(5, 1.0)?;
        let placement = ImageDraw {
            x: args.opt_number(2, 0.0)? as f32,
            y: args.opt_number(3, 0.0)? as f32,
            angle: args.opt_number(4, 0.0)? as f32,
            sx: sx as f32,
            sy: args.opt_number(6, sx)? as f32,
            ox: args.opt_number(7, 0.0)? as f32,
            oy: args.opt_number(8, 0.0)? as f32,
        };
        // Images that are not ready draw nothing.
        with_graphics(g, |g| {
            g.draw_image(id, &placement);
        })
    })?;

    add(lua, &gfx, graphics, "getWidth", |g, _| with_graphics(g, |g| g.viewport().width))?;
    add(lua, &gfx, graphics, "getHeight", |g, _| with_graphics(g, |g| g.viewport().height))?;
    add(lua, &gfx, graphics, "getDimensions", |g, _| {
        with_graphics(g, |g| (g.viewport().width, g.viewport().height))
    })?;

    let love = lua.create_table()?;
    love.set("graphics", gfx)?;
    Ok(love)
}

/// Registers `name` as a function taking dynamically checked arguments.
fn add<R, F>(lua: &Lua, table: &Table, graphics: &SharedGraphics, name: &'static str, f: F) -> mlua::Result<()>
where
    R: IntoLuaMulti,
    F: Fn(&SharedGraphics, Args<'_>) -> mlua::Result<R> + 'static,
{
    let graphics = graphics.clone();
    let func = lua.create_function(move |lua, values: Variadic<Value>| f(&graphics, Args::new(lua, name, values)))?;
    table.set(name, func)
}

fn with_graphics<R>(graphics: &SharedGraphics, f: impl FnOnce(&mut Graphics) -> R) -> mlua::Result<R> {
    let mut g = graphics
        .try_borrow_mut()
        .map_err(|_| mlua::Error::RuntimeError("graphics context is busy".into()))?;
    Ok(f(&mut g))
}

/// `r, g, b[, a]` as numbers, or one `{r, g, b[, a]}` table.
fn color_args(args: &Args<'_>) -> mlua::Result<Color> {
    let channels = match args.get(1) {
        Some(Value::Table(_)) => args.numbers_or_table(1)?,
        _ => {
            let mut c = vec![args.number(1)?, args.number(2)?, args.number(3)?];
            if args.len() >= 4 {
                c.push(args.number(4)?);
            }
            c
        }
    };
    Color::from_channels(&channels).map_err(|e| args.error(e))
}

fn color_tuple(c: Color) -> (f32, f32, f32, f32) {
    (c.r, c.g, c.b, c.a)
}
