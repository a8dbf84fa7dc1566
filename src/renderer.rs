use gfx_hal::{
    adapter, buffer as b, command, format as f, image as i, pass, pool,
    prelude::*,
    pso,
    queue::{family::QueueFamilyId, Submission},
    window, Backend,
};
use log::{error, info, warn};

use std::borrow::Borrow;
use std::iter;
use std::mem::ManuallyDrop;

mod buffer;
mod memory;
mod pipeline;
mod swapchain;
pub mod vertex;

use crate::error::{device_error, display_error, Error};
use crate::projection::{Projection, PUSH_CONSTANT_WORDS};
use crate::shader::ShaderSet;
use buffer::Buffer;
use memory::Memory;
use pipeline::Pipeline;
use std::ptr;
use swapchain::Swapchain;
use vertex::{Color, Position, COLORS, POSITIONS, VERTEX_COUNT};

const FRAMES_IN_FLIGHT: usize = 2;
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub struct Renderer<'a, B: Backend> {
    frame: usize,
    device: &'a B::Device,
    projection: Projection,
    push_constants: [u32; PUSH_CONSTANT_WORDS],
    /// Set while the window has a zero-sized client area.
    suspended: bool,
    command_pools: Vec<B::CommandPool>,
    command_buffers: Vec<B::CommandBuffer>,
    submission_complete_semaphores: Vec<B::Semaphore>,
    submission_complete_fences: Vec<B::Fence>,
    positions: ManuallyDrop<Memory<'a, B, Position>>,
    colors: ManuallyDrop<Memory<'a, B, Color>>,
    swapchain: ManuallyDrop<Swapchain<'a, B>>,
    render_pass: ManuallyDrop<B::RenderPass>,
    pipeline: Option<Pipeline<'a, B>>,
}

impl<'a, B> Renderer<'a, B>
where
    B: Backend,
{
    /// Uploads the triangle, configures the surface and builds the pipeline.
    ///
    /// Without `shaders`, or when the pipeline fails to link, frames are
    /// cleared but nothing is drawn.
    pub fn new(
        surface: &'a mut B::Surface,
        adapter: &'a adapter::Adapter<B>,
        device: &'a B::Device,
        family: QueueFamilyId,
        init_dims: window::Extent2D,
        shaders: Option<&ShaderSet>,
        projection: Projection,
    ) -> Result<Self, Error> {
        let memory_types = adapter.physical_device.memory_properties().memory_types;
        let limits = adapter.physical_device.limits();

        let positions = Memory::new(Buffer::new(device, &POSITIONS, &limits)?, &memory_types)?;
        let colors = Memory::new(Buffer::new(device, &COLORS, &limits)?, &memory_types)?;
        let swapchain = Swapchain::new(device, surface, adapter, init_dims).map_err(display_error)?;
        let render_pass = Self::create_render_pass(device, swapchain.format)?;

        let pipeline = shaders.and_then(|shaders| match Pipeline::new(device, shaders, &render_pass) {
            Ok(pipeline) => Some(pipeline),
            Err(err) => {
                error!("{}", err);
                None
            }
        });

        let mut renderer = Renderer {
            frame: 0,
            device,
            projection,
            push_constants: projection.push_constants(swapchain.aspect_ratio()),
            suspended: false,
            command_pools: Vec::with_capacity(FRAMES_IN_FLIGHT),
            command_buffers: Vec::with_capacity(FRAMES_IN_FLIGHT),
            submission_complete_semaphores: Vec::with_capacity(FRAMES_IN_FLIGHT),
            submission_complete_fences: Vec::with_capacity(FRAMES_IN_FLIGHT),
            positions: ManuallyDrop::new(positions),
            colors: ManuallyDrop::new(colors),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass: ManuallyDrop::new(render_pass),
            pipeline,
        };
        // Anything created so far is released by Drop if this fails.
        renderer.create_frame_resources(family)?;

        info!(
            "renderer ready: {}x{} {:?}, {}",
            renderer.swapchain.dims.width,
            renderer.swapchain.dims.height,
            renderer.swapchain.format,
            if renderer.pipeline.is_some() {
                "drawing triangle"
            } else {
                "no shader program, clearing only"
            }
        );
        Ok(renderer)
    }

    /// Applies a new window size. A zero-sized area suspends drawing.
    pub fn resize(&mut self, dims: window::Extent2D) {
        if dims.width == 0 || dims.height == 0 {
            self.suspended = true;
            return;
        }
        self.suspended = false;
        if let Err(err) = self.swapchain.resize(dims) {
            warn!("could not resize swapchain to {}x{}: {:?}", dims.width, dims.height, err);
        }
        self.push_constants = self.projection.push_constants(self.swapchain.aspect_ratio());
    }

    pub fn render(&mut self, queue: &mut B::CommandQueue) {
        if self.suspended {
            return;
        }

        let surface_image = unsafe {
            match self.swapchain.surface.acquire_image(!0) {
                Ok((image, _)) => image,
                Err(err) => {
                    warn!("could not acquire swapchain image: {:?}", err);
                    self.recreate_swapchain();
                    return;
                }
            }
        };

        let frame_buffer = match unsafe {
            self.device.create_framebuffer(
                &self.render_pass,
                iter::once(surface_image.borrow()),
                i::Extent {
                    width: self.swapchain.dims.width,
                    height: self.swapchain.dims.height,
                    depth: 1,
                },
            )
        } {
            Ok(frame_buffer) => frame_buffer,
            Err(err) => {
                error!("could not create framebuffer: {:?}", err);
                return;
            }
        };

        let frame_idx = self.frame % FRAMES_IN_FLIGHT;

        unsafe {
            let fence = &self.submission_complete_fences[frame_idx];
            let waited = match self.device.wait_for_fence(fence, !0) {
                Ok(_) => self.device.reset_fence(fence).map_err(|err| format!("{:?}", err)),
                Err(err) => Err(format!("{:?}", err)),
            };
            if let Err(err) = waited {
                error!("could not wait for frame {}: {}", frame_idx, err);
                self.device.destroy_framebuffer(frame_buffer);
                return;
            }
            self.command_pools[frame_idx].reset(false);
        }

        let cmd_buffer = &mut self.command_buffers[frame_idx];
        unsafe {
            cmd_buffer.begin_primary(command::CommandBufferFlags::ONE_TIME_SUBMIT);
            cmd_buffer.set_viewports(0, &[self.swapchain.viewport.clone()]);
            cmd_buffer.set_scissors(0, &[self.swapchain.viewport.rect]);
            if let Some(pipeline) = &self.pipeline {
                cmd_buffer.bind_graphics_pipeline(&pipeline.pipeline);
                cmd_buffer.push_graphics_constants(
                    &pipeline.pipeline_layout,
                    pso::ShaderStageFlags::VERTEX,
                    0,
                    &self.push_constants,
                );
                cmd_buffer.bind_vertex_buffers(
                    0,
                    vec![
                        (&*self.positions.buffer.buf, b::SubRange::WHOLE),
                        (&*self.colors.buffer.buf, b::SubRange::WHOLE),
                    ],
                );
            }
            cmd_buffer.begin_render_pass(
                &self.render_pass,
                &frame_buffer,
                self.swapchain.viewport.rect,
                &[command::ClearValue {
                    color: command::ClearColor {
                        float32: CLEAR_COLOR,
                    },
                }],
                command::SubpassContents::Inline,
            );
            if self.pipeline.is_some() {
                cmd_buffer.draw(0..VERTEX_COUNT as u32, 0..1);
            }
            cmd_buffer.end_render_pass();
            cmd_buffer.finish();

            let submission = Submission {
                command_buffers: iter::once(&*cmd_buffer),
                wait_semaphores: None,
                signal_semaphores: iter::once(&self.submission_complete_semaphores[frame_idx]),
            };

            queue.submit(
                submission,
                Some(&self.submission_complete_fences[frame_idx]),
            );

            let result = queue.present_surface(
                &mut self.swapchain.surface,
                surface_image,
                Some(&self.submission_complete_semaphores[frame_idx]),
            );

            self.device.destroy_framebuffer(frame_buffer);

            if let Err(err) = result {
                warn!("could not present frame: {:?}", err);
                self.recreate_swapchain();
            }
        }

        self.frame += 1;
    }

    fn recreate_swapchain(&mut self) {
        if let Err(err) = self.swapchain.recreate() {
            warn!("could not recreate swapchain: {:?}", err);
        }
    }

    fn create_render_pass(device: &B::Device, format: f::Format) -> Result<B::RenderPass, Error> {
        let attachment = pass::Attachment {
            format: Some(format),
            samples: 1,
            ops: pass::AttachmentOps::new(
                pass::AttachmentLoadOp::Clear,
                pass::AttachmentStoreOp::Store,
            ),
            stencil_ops: pass::AttachmentOps::DONT_CARE,
            layouts: i::Layout::Undefined..i::Layout::Present,
        };

        let subpass = pass::SubpassDesc {
            colors: &[(0, i::Layout::ColorAttachmentOptimal)],
            depth_stencil: None,
            inputs: &[],
            resolves: &[],
            preserves: &[],
        };

        unsafe { device.create_render_pass(&[attachment], &[subpass], &[]) }.map_err(device_error)
    }

    /// One command pool, buffer, fence and semaphore per frame in flight.
    fn create_frame_resources(&mut self, family: QueueFamilyId) -> Result<(), Error> {
        for _ in 0..FRAMES_IN_FLIGHT {
            let mut command_pool = unsafe {
                self.device
                    .create_command_pool(family, pool::CommandPoolCreateFlags::empty())
            }
            .map_err(device_error)?;
            self.command_buffers
                .push(unsafe { command_pool.allocate_one(command::Level::Primary) });
            self.command_pools.push(command_pool);
            self.submission_complete_semaphores
                .push(self.device.create_semaphore().map_err(device_error)?);
            self.submission_complete_fences
                .push(self.device.create_fence(true).map_err(device_error)?);
        }
        Ok(())
    }
}

impl<'a, B: Backend> Drop for Renderer<'a, B> {
    fn drop(&mut self) {
        let device = self.device;
        if let Err(err) = device.wait_idle() {
            error!("device did not go idle before teardown: {:?}", err);
        }
        unsafe {
            for (mut pool, cmd_buffer) in self
                .command_pools
                .drain(..)
                .zip(self.command_buffers.drain(..))
            {
                pool.free(iter::once(cmd_buffer));
                device.destroy_command_pool(pool);
            }
            for s in self.submission_complete_semaphores.drain(..) {
                device.destroy_semaphore(s);
            }

            for f in self.submission_complete_fences.drain(..) {
                device.destroy_fence(f);
            }

            self.pipeline = None;
            device.destroy_render_pass(ManuallyDrop::into_inner(ptr::read(&self.render_pass)));
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.colors);
            ManuallyDrop::drop(&mut self.positions);
        }
    }
}
