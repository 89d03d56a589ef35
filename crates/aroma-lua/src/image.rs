use mlua::{MetaMethod, UserData, UserDataMethods};

use aroma_engine::graphics::{ImageReleaser, SharedGraphics};
use aroma_engine::image::ImageId;

/// Script-side handle of an image.
///
/// Size queries read the engine record live, so they report 0 until the
/// load completes. When Lua collects the handle the record is queued for
/// destruction; the engine drains that queue at the next tick.
pub struct LuaImage {
    id: ImageId,
    path: String,
    graphics: SharedGraphics,
    releaser: ImageReleaser,
}

impl LuaImage {
    pub fn new(id: ImageId, path: String, graphics: SharedGraphics, releaser: ImageReleaser) -> Self {
        Self { id, path, graphics, releaser }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    fn dimensions(&self) -> mlua::Result<(u32, u32)> {
        let g = self
            .graphics
            .try_borrow()
            .map_err(|_| mlua::Error::RuntimeError("graphics context is busy".into()))?;
        Ok((g.image_width(self.id), g.image_height(self.id)))
    }
}

impl Drop for LuaImage {
    fn drop(&mut self) {
        log::trace!("releasing image {}", self.path);
        self.releaser.release(self.id);
    }
}

impl UserData for LuaImage {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getWidth", |_, this, ()| Ok(this.dimensions()?.0));
        methods.add_method("getHeight", |_, this, ()| Ok(this.dimensions()?.1));
        methods.add_method("getDimensions", |_, this, ()| this.dimensions());
        methods.add_method("type", |_, _, ()| Ok("Image"));

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Image({})", this.path))
        });
    }
}
