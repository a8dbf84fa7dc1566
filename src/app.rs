//! The render thread: GPU bootstrap, frame loop and teardown.

#[cfg(feature = "metal")]
use gfx_backend_metal as back;

#[cfg(feature = "vulkan")]
use gfx_backend_vulkan as back;

use crate::error::{display_error, Error};
use crate::projection::Projection;
use crate::renderer::Renderer;
use crate::settings::Settings;
use crate::shader;
use crate::timing::{FrameLimiter, FrameStats};

use gfx_hal::{prelude::*, window, Features};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use winit::window::Window;

const APP_NAME: &str = "intro-to-shaders";

/// Sent to the event loop once the render thread has released its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    RenderStopped,
}

/// Runs `notify` when dropped, including while unwinding from a panic.
///
/// The render thread holds one of these so the event loop always learns that
/// rendering has stopped and can join the thread.
pub struct StopGuard<F: FnOnce()> {
    notify: Option<F>,
}

impl<F: FnOnce()> StopGuard<F> {
    pub fn new(notify: F) -> Self {
        StopGuard {
            notify: Some(notify),
        }
    }
}

impl<F: FnOnce()> Drop for StopGuard<F> {
    fn drop(&mut self) {
        if let Some(notify) = self.notify.take() {
            notify();
        }
    }
}

/// State written by the event thread and polled by the render thread once per frame.
#[derive(Default)]
pub struct Signals {
    close_requested: AtomicBool,
    pending_resize: Mutex<Option<window::Extent2D>>,
}

impl Signals {
    pub fn request_close(&self) {
        self.close_requested.store(true, Ordering::Relaxed);
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Relaxed)
    }

    /// Records a new size; only the latest one before the next frame is applied.
    pub fn request_resize(&self, dims: window::Extent2D) {
        match self.pending_resize.lock() {
            Ok(mut pending) => *pending = Some(dims),
            Err(poisoned) => *poisoned.into_inner() = Some(dims),
        }
    }

    pub fn take_resize(&self) -> Option<window::Extent2D> {
        match self.pending_resize.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Runs on the render thread until a close is requested or bootstrap fails.
///
/// `window` is kept alive here because the surface is created from it.
pub fn run(settings: &Settings, window: Window, signals: &Signals) -> Result<(), Error> {
    let instance = back::Instance::create(APP_NAME, 1).map_err(display_error)?;
    let mut surface = unsafe { instance.create_surface(&window) }.map_err(display_error)?;

    let result = render_to_surface(&instance, &mut surface, &window, settings, signals);

    unsafe {
        instance.destroy_surface(surface);
    }
    result
}

fn render_to_surface(
    instance: &back::Instance,
    surface: &mut <back::Backend as gfx_hal::Backend>::Surface,
    window: &Window,
    settings: &Settings,
    signals: &Signals,
) -> Result<(), Error> {
    let mut adapters = instance.enumerate_adapters();
    if adapters.is_empty() {
        return Err(Error::Display("no graphics adapter found".into()));
    }
    let adapter = adapters.remove(0);
    info!("using adapter {}", adapter.info.name);

    let family = adapter
        .queue_families
        .iter()
        .find(|family| {
            surface.supports_queue_family(family) && family.queue_type().supports_graphics()
        })
        .ok_or_else(|| Error::Display("no queue family can present to the window".into()))?;
    let mut gpu = unsafe {
        adapter
            .physical_device
            .open(&[(family, &[1.0])], Features::empty())
    }
    .map_err(display_error)?;

    let mut queue_group = gpu
        .queue_groups
        .pop()
        .ok_or_else(|| Error::Display("device opened without a queue group".into()))?;
    let device = gpu.device;

    let shaders = shader::load_program(&settings.shaders)?;

    let size = window.inner_size();
    let dims = window::Extent2D {
        width: size.width,
        height: size.height,
    };

    let queue = queue_group
        .queues
        .first_mut()
        .ok_or_else(|| Error::Display("queue group has no queues".into()))?;
    let mut renderer = Renderer::new(
        surface,
        &adapter,
        &device,
        queue_group.family,
        dims,
        shaders.as_ref(),
        Projection::from_settings(&settings.projection),
    )?;

    let mut limiter = FrameLimiter::new(settings.display.target_frame_rate);
    let mut stats = FrameStats::new();
    debug!("frame period: {:?}", limiter.period());

    while !signals.close_requested() {
        if let Some(dims) = signals.take_resize() {
            debug!("resize to {}x{}", dims.width, dims.height);
            renderer.resize(dims);
        }
        renderer.render(queue);
        stats.update();
        limiter.sync();
    }

    info!(
        "closing after {} frames ({} fps)",
        stats.frames(),
        stats.fps()
    );
    Ok(())
}
