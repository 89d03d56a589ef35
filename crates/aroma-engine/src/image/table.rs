use crossbeam_channel::{Receiver, TryRecvError};

use super::{LoadOutcome, TextureId};

/// Stable handle to an image record.
///
/// Slot index plus generation: once a record is removed its id never matches
/// a later record that reuses the slot, so late completions cannot land on
/// the wrong image.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    index: u32,
    generation: u32,
}

impl ImageId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Readiness of an image. Transitions: `Pending -> Ready | Failed`, once.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Ready,
    Failed,
}

/// One loadable picture.
#[derive(Debug)]
pub struct ImageRecord {
    pub path: String,
    pub state: ImageState,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    reply: Option<Receiver<LoadOutcome>>,
}

impl ImageRecord {
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ImageState::Ready && !self.texture.is_none()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<ImageRecord>,
}

/// Owned table of image records indexed by [`ImageId`].
#[derive(Debug, Default)]
pub struct ImageTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    stray: Vec<TextureId>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a `Pending` record that will be completed through `reply`.
    pub fn insert(&mut self, path: impl Into<String>, reply: Receiver<LoadOutcome>) -> ImageId {
        let record = ImageRecord {
            path: path.into(),
            state: ImageState::Pending,
            texture: TextureId::NONE,
            width: 0,
            height: 0,
            reply: Some(reply),
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.record = Some(record);
        self.live += 1;

        ImageId { index, generation: slot.generation }
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    fn get_mut(&mut self, id: ImageId) -> Option<&mut ImageRecord> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    #[inline]
    pub fn state(&self, id: ImageId) -> Option<ImageState> {
        self.get(id).map(|r| r.state)
    }

    /// Last known width; `0` while pending, after failure, or once removed.
    #[inline]
    pub fn width(&self, id: ImageId) -> u32 {
        self.get(id).map_or(0, |r| r.width)
    }

    /// Last known height; `0` while pending, after failure, or once removed.
    #[inline]
    pub fn height(&self, id: ImageId) -> u32 {
        self.get(id).map_or(0, |r| r.height)
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Applies a load outcome to the record behind `token`.
    ///
    /// Returns `false` when the record no longer exists or has already left
    /// `Pending`; both cases are ignored. The reply channel stays open, so a
    /// loader still answering a record settled here is absorbed by
    /// [`poll`](Self::poll).
    pub fn complete(&mut self, token: ImageId, outcome: LoadOutcome) -> bool {
        let Some(record) = self.get_mut(token) else {
            log::debug!("load completion for destroyed image {token:?} ignored");
            return false;
        };

        if record.state != ImageState::Pending {
            log::warn!(
                "image '{}' already {:?}; second completion ignored",
                record.path,
                record.state
            );
            return false;
        }

        if outcome.is_failure() {
            record.state = ImageState::Failed;
            log::warn!("image '{}' failed to load", record.path);
        } else {
            record.state = ImageState::Ready;
            record.texture = outcome.texture;
            record.width = outcome.width;
            record.height = outcome.height;
            log::debug!(
                "image '{}' ready: texture {} ({}x{})",
                record.path,
                outcome.texture.0,
                outcome.width,
                outcome.height
            );
        }
        true
    }

    /// Collects every reply that has arrived since the last poll.
    ///
    /// A reply channel closed without an answer counts as a failed load.
    /// Returns the number of records that changed state.
    pub fn poll(&mut self) -> usize {
        let mut arrived: Vec<(ImageId, LoadOutcome)> = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let generation = slot.generation;
            let Some(record) = slot.record.as_mut() else { continue };
            let Some(rx) = record.reply.as_ref() else { continue };

            let outcome = match rx.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Disconnected) if record.state != ImageState::Pending => {
                    record.reply = None;
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    log::warn!("loader dropped the request for '{}'", record.path);
                    LoadOutcome::failed()
                }
            };
            record.reply = None;

            if record.state != ImageState::Pending {
                // Settled through `complete` before the loader answered.
                log::debug!("late load reply for '{}' ignored", record.path);
                if !outcome.texture.is_none() && outcome.texture != record.texture {
                    self.stray.push(outcome.texture);
                }
                continue;
            }

            arrived.push((ImageId { index: index as u32, generation }, outcome));
        }

        arrived
            .into_iter()
            .filter(|(id, outcome)| self.complete(*id, *outcome))
            .count()
    }

    /// Textures delivered by late replies that no record uses. The caller
    /// hands them back to the loader.
    pub fn take_stray_textures(&mut self) -> Vec<TextureId> {
        std::mem::take(&mut self.stray)
    }

    /// Removes a record, freeing its slot for reuse.
    ///
    /// The caller owns releasing `record.texture` if it is bound.
    pub fn remove(&mut self, id: ImageId) -> Option<ImageRecord> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(record)
    }
}
