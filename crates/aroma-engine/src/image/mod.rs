//! Image resources and the asynchronous texture-loading protocol.
//!
//! Lifecycle of one image:
//! 1. `ImageTable::insert` allocates a `Pending` record and hands back an
//!    [`ImageId`], which doubles as the correlation token for the load.
//! 2. The [`TextureLoader`] receives a [`LoadRequest`] carrying a one-shot
//!    [`LoadReply`] and answers it whenever the texture exists (or failed).
//! 3. The table observes the reply (via `poll` or `complete`) and moves the
//!    record to `Ready` or `Failed`, exactly once.
//! 4. When the script drops its handle the record is removed; a bound texture
//!    is released through the loader. Replies for removed records go nowhere.

mod loader;
mod manual;
mod table;

pub use loader::{LoadOutcome, LoadReply, LoadRequest, TextureId, TextureLoader, load_channel};
pub use manual::{ManualLoader, ManualLoaderHandle};
pub use table::{ImageId, ImageRecord, ImageState, ImageTable};
