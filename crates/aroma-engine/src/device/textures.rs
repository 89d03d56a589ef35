use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::image::{LoadOutcome, LoadReply, LoadRequest, TextureId, TextureLoader};

/// A GPU texture ready to be bound in group 1.
#[derive(Debug, Clone)]
pub struct TextureEntry {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
struct Registry {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    entries: HashMap<TextureId, TextureEntry>,
    next_id: u32,
}

/// Id → texture map shared by the backend (bind) and the texture store
/// (create/release). Ids start at 1; `TextureId::NONE` is never handed out.
#[derive(Debug, Clone)]
pub struct TextureRegistry {
    inner: Rc<RefCell<Registry>>,
}

impl TextureRegistry {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("aroma texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("aroma texture sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            inner: Rc::new(RefCell::new(Registry {
                layout,
                sampler,
                entries: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Layout of the texture bind group (texture at 0, sampler at 1).
    pub fn layout(&self) -> wgpu::BindGroupLayout {
        self.inner.borrow().layout.clone()
    }

    /// Uploads tightly packed RGBA8 pixels and registers the texture.
    pub fn create_rgba8(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> TextureId {
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut reg = self.inner.borrow_mut();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &reg.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&reg.sampler) },
            ],
        });

        let id = TextureId(reg.next_id);
        reg.next_id = reg.next_id.wrapping_add(1).max(1);
        reg.entries.insert(id, TextureEntry { texture, bind_group, width, height });
        id
    }

    pub fn bind_group(&self, id: TextureId) -> Option<wgpu::BindGroup> {
        self.inner.borrow().entries.get(&id).map(|e| e.bind_group.clone())
    }

    /// Forgets the texture; the GPU memory goes once in-flight frames no
    /// longer reference it. Unknown ids are ignored.
    pub fn remove(&self, id: TextureId) -> bool {
        self.inner.borrow_mut().entries.remove(&id).is_some()
    }
}

struct DecodeJob {
    path: String,
    reply: LoadReply,
}

struct Decoded {
    path: String,
    reply: LoadReply,
    result: Result<::image::RgbaImage, String>,
}

/// File-backed [`TextureLoader`].
///
/// Decoding runs on one worker thread; GPU upload and the reply happen on
/// the main thread in [`pump`](TextureLoader::pump), so completions are only
/// ever observed at a tick boundary.
pub struct TextureStore {
    device: wgpu::Device,
    queue: wgpu::Queue,
    registry: TextureRegistry,
    max_dimension: u32,

    jobs: Sender<DecodeJob>,
    results: Receiver<Decoded>,
}

impl TextureStore {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, registry: TextureRegistry) -> Result<Self> {
        let (jobs, job_rx) = crossbeam_channel::unbounded::<DecodeJob>();
        let (result_tx, results) = crossbeam_channel::unbounded::<Decoded>();

        thread::Builder::new()
            .name("aroma-decode".into())
            .spawn(move || decode_worker(job_rx, result_tx))
            .context("failed to spawn image decode thread")?;

        let max_dimension = device.limits().max_texture_dimension_2d;

        Ok(Self { device, queue, registry, max_dimension, jobs, results })
    }

    fn finish(&mut self, done: Decoded) {
        let Decoded { path, reply, result } = done;

        let max = self.max_dimension;
        let checked = result.and_then(|rgba| {
            let (width, height) = rgba.dimensions();
            check_size(width, height, max).map(|()| rgba)
        });
        let rgba = match checked {
            Ok(rgba) => rgba,
            Err(err) => {
                log::warn!("failed to load image '{path}': {err}");
                let _ = reply.send(LoadOutcome::failed());
                return;
            }
        };

        let (width, height) = rgba.dimensions();
        let id = self.registry.create_rgba8(&self.device, &self.queue, &path, width, height, &rgba);
        log::debug!("loaded image '{path}' ({width}x{height}) as texture {}", id.0);

        if reply.send(LoadOutcome::loaded(id, width, height)).is_err() {
            // The image was destroyed while loading.
            log::debug!("image '{path}' was released before its load finished");
            self.registry.remove(id);
        }
    }
}

impl TextureLoader for TextureStore {
    fn request_load(&mut self, request: LoadRequest) {
        let LoadRequest { path, reply, .. } = request;
        if let Err(err) = self.jobs.send(DecodeJob { path, reply }) {
            let DecodeJob { path, reply } = err.into_inner();
            log::warn!("failed to load image '{path}': decode thread is gone");
            let _ = reply.send(LoadOutcome::failed());
        }
    }

    fn release_texture(&mut self, texture: TextureId) {
        if !texture.is_none() {
            self.registry.remove(texture);
        }
    }

    fn pump(&mut self) {
        loop {
            match self.results.try_recv() {
                Ok(done) => self.finish(done),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::error!("image decode thread exited");
                    break;
                }
            }
        }
    }
}

fn decode_worker(jobs: Receiver<DecodeJob>, results: Sender<Decoded>) {
    for DecodeJob { path, reply } in jobs.iter() {
        let result = ::image::open(&path)
            .map(|img| img.to_rgba8())
            .map_err(|e| e.to_string());
        if results.send(Decoded { path, reply, result }).is_err() {
            break;
        }
    }
    log::debug!("image decode thread stopped");
}

/// Textures must be non-empty and fit the device's 2D limit.
fn check_size(width: u32, height: u32, max: u32) -> Result<(), String> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(format!("unsupported size {width}x{height} (max {max})"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::image::load_channel;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("aroma-textures-{}-{name}", std::process::id()))
    }

    /// Runs one path through the decode worker and returns its result.
    fn decode(path: &str) -> Result<::image::RgbaImage, String> {
        let (jobs, job_rx) = crossbeam_channel::unbounded();
        let (result_tx, results) = crossbeam_channel::unbounded();
        let worker = thread::spawn(move || decode_worker(job_rx, result_tx));

        let (reply, _rx) = load_channel();
        jobs.send(DecodeJob { path: path.to_string(), reply }).unwrap();
        let done = results.recv_timeout(Duration::from_secs(10)).unwrap();
        drop(jobs);
        worker.join().unwrap();

        assert_eq!(done.path, path);
        done.result
    }

    // ── decoding ──────────────────────────────────────────────────────────

    #[test]
    fn missing_file_fails_to_decode() {
        let path = scratch("missing.png");
        assert!(decode(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn corrupt_file_fails_to_decode() {
        let path = scratch("corrupt.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let result = decode(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn png_decodes_to_rgba() {
        let path = scratch("pixel.png");
        ::image::RgbaImage::from_pixel(3, 2, ::image::Rgba([255, 0, 0, 128]))
            .save(&path)
            .unwrap();
        let result = decode(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        let rgba = result.unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert_eq!(rgba.get_pixel(2, 1).0, [255, 0, 0, 128]);
    }

    #[test]
    fn worker_stops_when_results_are_dropped() {
        let (jobs, job_rx) = crossbeam_channel::unbounded();
        let (result_tx, results) = crossbeam_channel::unbounded();
        drop(results);
        let worker = thread::spawn(move || decode_worker(job_rx, result_tx));

        let (reply, _rx) = load_channel();
        jobs.send(DecodeJob { path: "nope.png".into(), reply }).unwrap();
        worker.join().unwrap();
    }

    // ── size limits ───────────────────────────────────────────────────────

    #[test]
    fn empty_images_are_rejected() {
        assert!(check_size(0, 4, 8192).is_err());
        assert!(check_size(4, 0, 8192).is_err());
    }

    #[test]
    fn oversized_images_are_rejected() {
        let err = check_size(8193, 1, 8192).unwrap_err();
        assert_eq!(err, "unsupported size 8193x1 (max 8192)");
        assert!(check_size(1, 8193, 8192).is_err());
    }

    #[test]
    fn images_at_the_limit_are_accepted() {
        assert_eq!(check_size(8192, 8192, 8192), Ok(()));
        assert_eq!(check_size(1, 1, 8192), Ok(()));
    }
}
