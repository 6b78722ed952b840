use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::frame::classify;
use super::surface::{apply_resize, choose_alpha_mode, choose_present_mode, choose_surface_format};
use super::{Frame, FrameError, SurfaceSettings};

/// Device, queue and configured surface of one window.
///
/// The window is shared through an `Arc` so the surface can be `'static`.
pub struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Drawable size in physical pixels; may be zero while minimized.
    size: PhysicalSize<u32>,
}

impl Gpu {
    pub async fn new(window: Arc<Window>, settings: SurfaceSettings) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        // A single quad needs nothing beyond the baseline.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("quadshade device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device")?;

        // Errors outside an error scope would otherwise panic.
        device.on_uncaptured_error(Arc::new(|err: wgpu::Error| {
            log::error!("wgpu: uncaptured device error: {err}");
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, settings.srgb)
            .context("surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: choose_present_mode(&caps, settings.vsync),
            alpha_mode: choose_alpha_mode(&caps),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!(
            "gpu ready: {} ({:?}), {:?} {:?} {}x{}",
            info.name,
            info.backend,
            format,
            config.present_mode,
            size.width,
            size.height
        );

        Ok(Gpu {
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Zero sizes are recorded; configuration waits for a usable size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if apply_resize(&mut self.config, &mut self.size, new_size) {
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquires the next surface texture. A lost or outdated surface is
    /// reconfigured before the error is returned.
    pub fn acquire_frame(&mut self) -> Result<Frame, FrameError> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                let err = classify(err);
                if matches!(err, FrameError::Reconfigured(_))
                    && self.size.width > 0
                    && self.size.height > 0
                {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(err);
            }
        };

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadshade frame"),
            });

        Ok(Frame {
            texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents it.
    pub fn present(&self, frame: Frame) {
        let Frame {
            texture,
            view,
            encoder,
        } = frame;
        self.queue.submit([encoder.finish()]);
        drop(view);
        self.window.pre_present_notify();
        texture.present();
    }
}
