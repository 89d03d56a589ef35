use std::cell::RefCell;
use std::rc::Rc;

use super::{ImageId, LoadOutcome, LoadRequest, TextureId, TextureLoader};

#[derive(Debug, Default)]
struct ManualState {
    requests: Vec<LoadRequest>,
    released: Vec<TextureId>,
}

/// Loader whose requests are answered by hand.
///
/// Used by tests and by hosts that produce textures out-of-band. The engine
/// owns the `ManualLoader`; the caller keeps the [`ManualLoaderHandle`] to
/// inspect and answer requests.
#[derive(Debug)]
pub struct ManualLoader {
    state: Rc<RefCell<ManualState>>,
}

/// Caller-side view of a [`ManualLoader`].
#[derive(Debug, Clone)]
pub struct ManualLoaderHandle {
    state: Rc<RefCell<ManualState>>,
}

impl ManualLoader {
    pub fn new() -> (Self, ManualLoaderHandle) {
        let state = Rc::new(RefCell::new(ManualState::default()));
        (Self { state: state.clone() }, ManualLoaderHandle { state })
    }
}

impl TextureLoader for ManualLoader {
    fn request_load(&mut self, request: LoadRequest) {
        self.state.borrow_mut().requests.push(request);
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.state.borrow_mut().released.push(texture);
    }
}

impl ManualLoaderHandle {
    /// Paths of requests not answered yet, oldest first.
    pub fn pending_paths(&self) -> Vec<String> {
        self.state.borrow().requests.iter().map(|r| r.path.clone()).collect()
    }

    /// Tokens of requests not answered yet, oldest first.
    pub fn pending_tokens(&self) -> Vec<ImageId> {
        self.state.borrow().requests.iter().map(|r| r.token).collect()
    }

    /// Answers the oldest pending request for `path`.
    ///
    /// Returns `false` if there is no such request. When the image was
    /// destroyed in the meantime, a real texture in `outcome` is released,
    /// as a real loader would do.
    pub fn complete(&self, path: &str, outcome: LoadOutcome) -> bool {
        let request = {
            let mut state = self.state.borrow_mut();
            let Some(pos) = state.requests.iter().position(|r| r.path == path) else {
                return false;
            };
            state.requests.remove(pos)
        };
        self.answer(request, outcome);
        true
    }

    /// Textures released so far, in order.
    pub fn released(&self) -> Vec<TextureId> {
        self.state.borrow().released.clone()
    }

    fn answer(&self, request: LoadRequest, outcome: LoadOutcome) {
        if let Err(orphan) = request.reply.send(outcome) {
            if !orphan.texture.is_none() {
                self.state.borrow_mut().released.push(orphan.texture);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageState, ImageTable, load_channel};

    fn request(table: &mut ImageTable, loader: &mut ManualLoader, path: &str) -> ImageId {
        let (reply, rx) = load_channel();
        let token = table.insert(path, rx);
        loader.request_load(LoadRequest { token, path: path.to_string(), reply });
        token
    }

    #[test]
    fn complete_answers_matching_request() {
        let mut table = ImageTable::new();
        let (mut loader, handle) = ManualLoader::new();
        let id = request(&mut table, &mut loader, "hero.png");

        assert_eq!(handle.pending_paths(), vec!["hero.png".to_string()]);
        assert_eq!(handle.pending_tokens(), vec![id]);
        assert!(handle.complete("hero.png", LoadOutcome::loaded(TextureId(1), 8, 8)));
        assert!(handle.pending_paths().is_empty());

        table.poll();
        assert_eq!(table.state(id), Some(ImageState::Ready));
    }

    #[test]
    fn complete_unknown_path_returns_false() {
        let (_loader, handle) = ManualLoader::new();
        assert!(!handle.complete("nope.png", LoadOutcome::failed()));
    }

    #[test]
    fn orphaned_texture_is_released() {
        let mut table = ImageTable::new();
        let (mut loader, handle) = ManualLoader::new();
        let id = request(&mut table, &mut loader, "hero.png");
        table.remove(id);

        handle.complete("hero.png", LoadOutcome::loaded(TextureId(5), 8, 8));
        assert_eq!(handle.released(), vec![TextureId(5)]);
    }
}
