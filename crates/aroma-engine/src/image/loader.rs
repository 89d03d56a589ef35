use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::ImageId;

/// GPU texture identity owned by the loader. `0` means "no texture".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const NONE: TextureId = TextureId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Result of one load. A zero texture id reports failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

impl LoadOutcome {
    #[inline]
    pub const fn loaded(texture: TextureId, width: u32, height: u32) -> Self {
        Self { texture, width, height }
    }

    #[inline]
    pub const fn failed() -> Self {
        Self { texture: TextureId::NONE, width: 0, height: 0 }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.texture.is_none()
    }
}

/// Response half of a one-shot load channel.
#[derive(Debug)]
pub struct LoadReply {
    tx: Sender<LoadOutcome>,
}

impl LoadReply {
    /// Delivers the outcome.
    ///
    /// Returns the outcome back when nobody is listening any more (the image
    /// was destroyed before the load finished), so the caller can free the
    /// texture it just created.
    pub fn send(self, outcome: LoadOutcome) -> Result<(), LoadOutcome> {
        match self.tx.try_send(outcome) {
            Ok(()) => Ok(()),
            Err(TrySendError::Disconnected(o)) | Err(TrySendError::Full(o)) => Err(o),
        }
    }
}

/// Creates the one-shot channel for a single load.
pub fn load_channel() -> (LoadReply, Receiver<LoadOutcome>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (LoadReply { tx }, rx)
}

/// One pending texture load.
#[derive(Debug)]
pub struct LoadRequest {
    pub token: ImageId,
    pub path: String,
    pub reply: LoadReply,
}

/// External collaborator that turns paths into GPU textures.
///
/// Implementations may finish loads at any later point; the engine never
/// blocks on them. Loads cannot be cancelled and have no timeout.
pub trait TextureLoader {
    /// Starts an asynchronous load. Must not block.
    fn request_load(&mut self, request: LoadRequest);

    /// Frees a texture previously reported through a [`LoadReply`].
    fn release_texture(&mut self, texture: TextureId);

    /// Gives the loader a chance to finish work on the main thread.
    ///
    /// Called once per tick before completions are collected.
    fn pump(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_reaches_receiver() {
        let (reply, rx) = load_channel();
        reply.send(LoadOutcome::loaded(TextureId(3), 4, 5)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), LoadOutcome::loaded(TextureId(3), 4, 5));
    }

    #[test]
    fn reply_to_dropped_receiver_returns_outcome() {
        let (reply, rx) = load_channel();
        drop(rx);
        let outcome = LoadOutcome::loaded(TextureId(9), 1, 1);
        assert_eq!(reply.send(outcome), Err(outcome));
    }
}
