use gfx_hal::{adapter::Adapter, format as f, prelude::*, pso, window, Backend};
use log::debug;

const DEFAULT_FORMAT: f::Format = f::Format::Rgba8Srgb;

/// Prefers an sRGB format, then whatever the surface lists first.
fn pick_format(formats: &[f::Format]) -> f::Format {
    formats
        .iter()
        .find(|format| format.base_format().1 == f::ChannelType::Srgb)
        .or_else(|| formats.first())
        .copied()
        .unwrap_or(DEFAULT_FORMAT)
}

fn viewport_for(extent: window::Extent2D) -> pso::Viewport {
    pso::Viewport {
        rect: pso::Rect {
            x: 0,
            y: 0,
            w: extent.width as _,
            h: extent.height as _,
        },
        depth: 0.0..1.0,
    }
}

/// Runs `configure` for `requested` and, only if it succeeds, records the
/// extent the surface actually took (clamped to its capabilities).
fn commit_extent<E>(
    dims: &mut window::Extent2D,
    viewport: &mut pso::Viewport,
    requested: window::Extent2D,
    configure: impl FnOnce(window::Extent2D) -> Result<window::Extent2D, E>,
) -> Result<(), E> {
    let extent = configure(requested)?;
    *dims = extent;
    viewport.rect.w = extent.width as _;
    viewport.rect.h = extent.height as _;
    Ok(())
}

pub struct Swapchain<'a, B: Backend> {
    device: &'a B::Device,
    adapter: &'a Adapter<B>,
    pub viewport: pso::Viewport,
    pub dims: window::Extent2D,
    pub surface: &'a mut B::Surface,
    pub format: f::Format,
}

impl<'a, B: Backend> Swapchain<'a, B> {
    pub fn new(
        device: &'a B::Device,
        surface: &'a mut B::Surface,
        adapter: &'a Adapter<B>,
        dims: window::Extent2D,
    ) -> Result<Self, window::CreationError> {
        let formats = surface.supported_formats(&adapter.physical_device);
        let format = formats.map_or(DEFAULT_FORMAT, |formats| pick_format(&formats));

        let mut swapchain = Swapchain {
            device,
            surface,
            adapter,
            viewport: viewport_for(dims),
            format,
            dims,
        };

        swapchain.recreate()?;
        Ok(swapchain)
    }

    /// Reconfigures for `dims`. On failure the previous size stays in effect.
    pub fn resize(&mut self, dims: window::Extent2D) -> Result<(), window::CreationError> {
        self.configure(dims)
    }

    /// Reconfigures the surface for the current `dims`.
    pub fn recreate(&mut self) -> Result<(), window::CreationError> {
        self.configure(self.dims)
    }

    fn configure(&mut self, requested: window::Extent2D) -> Result<(), window::CreationError> {
        let caps = self.surface.capabilities(&self.adapter.physical_device);
        let format = self.format;
        let device = self.device;
        let surface = &mut *self.surface;

        commit_extent(&mut self.dims, &mut self.viewport, requested, |requested| {
            let mut swap_config = window::SwapchainConfig::from_caps(&caps, format, requested);
            swap_config.present_mode = window::PresentMode::FIFO;
            let extent = swap_config.extent;
            unsafe { surface.configure_swapchain(device, swap_config)? };
            debug!(
                "swapchain configured: {}x{} {:?}",
                extent.width, extent.height, format
            );
            Ok(extent)
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.dims.height == 0 {
            return 1.0;
        }
        self.dims.width as f32 / self.dims.height as f32
    }
}

impl<'a, B: Backend> Drop for Swapchain<'a, B> {
    fn drop(&mut self) {
        unsafe { self.surface.unconfigure_swapchain(self.device) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> window::Extent2D {
        window::Extent2D { width, height }
    }

    #[test]
    fn failed_configure_keeps_the_previous_size() {
        let mut dims = extent(1280, 720);
        let mut viewport = viewport_for(dims);
        let result: Result<(), &str> =
            commit_extent(&mut dims, &mut viewport, extent(800, 600), |_| Err("lost surface"));
        assert!(result.is_err());
        assert_eq!(dims, extent(1280, 720));
        assert_eq!((viewport.rect.w, viewport.rect.h), (1280, 720));
    }

    #[test]
    fn successful_configure_records_the_clamped_extent() {
        let mut dims = extent(1280, 720);
        let mut viewport = viewport_for(dims);
        let result: Result<(), ()> = commit_extent(&mut dims, &mut viewport, extent(9000, 600), |r| {
            Ok(extent(r.width.min(4096), r.height))
        });
        assert!(result.is_ok());
        assert_eq!(dims, extent(4096, 600));
        assert_eq!((viewport.rect.w, viewport.rect.h), (4096, 600));
    }

    #[test]
    fn prefers_srgb_then_first_listed_format() {
        assert_eq!(
            pick_format(&[f::Format::Bgra8Unorm, f::Format::Bgra8Srgb]),
            f::Format::Bgra8Srgb
        );
        assert_eq!(pick_format(&[f::Format::Bgra8Unorm]), f::Format::Bgra8Unorm);
        assert_eq!(pick_format(&[]), DEFAULT_FORMAT);
    }
}
