use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Knobs for opening the GPU. The defaults suit a fixed-size 2D window.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when one exists.
    ///
    /// Off by default so script colors reach the framebuffer unconverted.
    pub prefer_srgb: bool,
    /// Wait for vertical blank before presenting.
    pub vsync: bool,
    pub power: wgpu::PowerPreference,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            vsync: true,
            power: wgpu::PowerPreference::default(),
        }
    }
}

impl GpuInit {
    fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

/// Device, queue and the window surface they draw into.
///
/// Holding the window through an `Arc` lets the surface be `'static`.
pub struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// Swapchain image plus the encoder recording into it.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What became of the surface after a failed acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceStatus {
    /// Reconfigured; the next frame should succeed.
    Recovered,
    /// Try again next frame.
    Skipped,
    /// Out of memory. Nothing more will be presented.
    Lost,
}

impl Gpu {
    pub async fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(
            size.width > 0 && size.height > 0,
            "cannot draw into a {}x{} window",
            size.width,
            size.height
        );

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = open_device(&adapter).await?;
        let surface_config = surface_config(&surface.get_capabilities(&adapter), size, &init)?;
        surface.configure(&device, &surface_config);
        log::debug!(
            "surface {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            surface_config.present_mode
        );

        Ok(Self { window, surface, surface_config, device, queue })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Swapchain size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.surface_config.width, self.surface_config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn begin_frame(&self) -> Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture.texture.create_view(&Default::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("aroma frame encoder"),
        });
        Ok(GpuFrame { surface_texture, view, encoder })
    }

    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, encoder, .. } = frame;
        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        surface_texture.present();
    }

    /// Reacts to a failed [`Gpu::begin_frame`].
    pub fn recover(&self, err: &SurfaceError) -> SurfaceStatus {
        surface_status(err, || self.surface.configure(&self.device, &self.surface_config))
    }
}

async fn open_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("aroma device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to open GPU device")
}

fn surface_config(
    caps: &wgpu::SurfaceCapabilities,
    size: PhysicalSize<u32>,
    init: &GpuInit,
) -> Result<wgpu::SurfaceConfiguration> {
    let format = pick_format(&caps.formats, init.prefer_srgb).context("surface reports no formats")?;
    let alpha_mode = if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        wgpu::CompositeAlphaMode::Opaque
    } else {
        caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
    };

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode: init.present_mode(),
        alpha_mode,
        view_formats: Vec::new(),
        desired_maximum_frame_latency: 2,
    })
}

/// First format whose sRGB-ness matches the preference, else the first one.
fn pick_format(formats: &[wgpu::TextureFormat], prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| formats.first())
        .copied()
}

fn surface_status(err: &SurfaceError, reconfigure: impl FnOnce()) -> SurfaceStatus {
    match err {
        SurfaceError::Lost | SurfaceError::Outdated => {
            reconfigure();
            SurfaceStatus::Recovered
        }
        SurfaceError::OutOfMemory => SurfaceStatus::Lost,
        SurfaceError::Timeout | SurfaceError::Other => SurfaceStatus::Skipped,
    }
}
