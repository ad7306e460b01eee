//! Window, surface, and event loop for the live visualizer.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::audio::{AudioData, AudioError, AudioMetricsSource, TrackPlayer};
use crate::config::VisualizerConfig;
use crate::gpu::{DriverError, FrameDriver, GpuContext, GpuError, RenderError};

/// Fatal errors from the application shell.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Everything that exists once the window is up.
struct Session {
    window: Arc<Window>,
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    driver: FrameDriver<TrackPlayer>,
    finished_logged: bool,
}

impl Session {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &VisualizerConfig,
        audio: Arc<AudioData>,
    ) -> Result<Self, AppError> {
        let attributes = Window::default_attributes()
            .with_title(format!("Music Visualizer - {}", config.track.name()))
            .with_inner_size(LogicalSize::new(config.view_size, config.view_size))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);

        let (ctx, surface) = pollster::block_on(GpuContext::for_window(Arc::clone(&window)))?;
        let surface_config = Self::surface_config(&ctx, &surface, window.inner_size())?;
        surface.configure(&ctx.device, &surface_config);
        log::info!(
            "Surface {}x{} {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format
        );

        let player = TrackPlayer::new(audio)?;
        player.play();

        let driver = FrameDriver::new(
            &ctx,
            config,
            AudioMetricsSource::new(player),
            surface_config.format,
        )?;

        Ok(Self {
            window,
            ctx,
            surface,
            surface_config,
            driver,
            finished_logged: false,
        })
    }

    fn surface_config(
        ctx: &GpuContext,
        surface: &wgpu::Surface<'_>,
        size: PhysicalSize<u32>,
    ) -> Result<wgpu::SurfaceConfiguration, GpuError> {
        let mut surface_config = surface
            .get_default_config(&ctx.adapter, size.width.max(1), size.height.max(1))
            .ok_or(GpuError::SurfaceUnsupported)?;

        // The canvas holds display-ready values; an sRGB target would encode them twice.
        let caps = surface.get_capabilities(&ctx.adapter);
        if let Some(format) = caps.formats.iter().find(|f| !f.is_srgb()) {
            surface_config.format = *format;
        }
        surface_config.present_mode = wgpu::PresentMode::AutoVsync;
        Ok(surface_config)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.ctx.device, &self.surface_config);
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.ctx.device, &self.surface_config);
    }

    /// Render one frame. Returns false when the app should stop.
    fn redraw(&mut self) -> bool {
        match self.driver.render_to_surface(&self.surface) {
            Ok(_) => {}
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface lost, reconfiguring");
                self.reconfigure();
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of GPU memory");
                return false;
            }
            Err(RenderError::Gpu(message)) => log::error!("Frame rejected: {}", message),
            Err(e) => log::warn!("Skipped frame: {}", e),
        }

        if !self.finished_logged && self.driver.source().meter().is_finished() {
            log::info!("Playback finished");
            self.finished_logged = true;
        }
        true
    }
}

/// winit application driving one visualizer session.
pub struct VisualizerApp {
    config: VisualizerConfig,
    audio: Arc<AudioData>,
    session: Option<Session>,
    error: Option<AppError>,
}

impl VisualizerApp {
    pub fn new(config: VisualizerConfig, audio: AudioData) -> Self {
        Self {
            config,
            audio: Arc::new(audio),
            session: None,
            error: None,
        }
    }

    /// Run until the window is closed or a fatal error occurs.
    pub fn run(mut self) -> Result<(), AppError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ApplicationHandler for VisualizerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() || self.error.is_some() {
            return;
        }

        match Session::start(event_loop, &self.config, Arc::clone(&self.audio)) {
            Ok(session) => {
                session.window.request_redraw();
                self.session = Some(session);
            }
            Err(e) => {
                log::error!("Startup failed: {}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(session) = &mut self.session else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                session.resize(size);
            }
            WindowEvent::RedrawRequested => {
                if !session.redraw() {
                    event_loop.exit();
                    return;
                }
                session.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Open the window and play already-decoded `audio` until it is closed.
pub fn run(config: VisualizerConfig, audio: AudioData) -> Result<(), AppError> {
    VisualizerApp::new(config, audio).run()
}
