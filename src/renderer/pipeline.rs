use crate::error::Error;
use crate::projection::PUSH_CONSTANT_WORDS;
use crate::shader::ShaderSet;
use gfx_hal::{format as f, pass::Subpass, prelude::*, pso, Backend};
use std::iter;
use std::mem::{self, ManuallyDrop};
use std::ptr;

use super::vertex::{Color, Position};

const ENTRY_NAME: &str = "main";
const PUSH_CONSTANT_BYTES: u32 = (PUSH_CONSTANT_WORDS * mem::size_of::<u32>()) as u32;

fn link_error<E: std::fmt::Debug>(err: E) -> Error {
    Error::ShaderLink(format!("{:?}", err))
}

pub struct Pipeline<'a, B: Backend> {
    device: &'a B::Device,
    pub pipeline: ManuallyDrop<B::GraphicsPipeline>,
    pub pipeline_layout: ManuallyDrop<B::PipelineLayout>,
}

impl<'a, B: Backend> Pipeline<'a, B> {
    pub fn new(
        device: &'a B::Device,
        shaders: &ShaderSet,
        render_pass: &B::RenderPass,
    ) -> Result<Self, Error> {
        let pipeline_layout = unsafe {
            device.create_pipeline_layout(
                iter::empty::<B::DescriptorSetLayout>(),
                &[(pso::ShaderStageFlags::VERTEX, 0..PUSH_CONSTANT_BYTES)],
            )
        }
        .map_err(link_error)?;

        match unsafe { Self::create_graphics_pipeline(device, shaders, render_pass, &pipeline_layout) } {
            Ok(pipeline) => Ok(Pipeline {
                device,
                pipeline: ManuallyDrop::new(pipeline),
                pipeline_layout: ManuallyDrop::new(pipeline_layout),
            }),
            Err(err) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout) };
                Err(err)
            }
        }
    }

    unsafe fn create_graphics_pipeline(
        device: &B::Device,
        shaders: &ShaderSet,
        render_pass: &B::RenderPass,
        pipeline_layout: &B::PipelineLayout,
    ) -> Result<B::GraphicsPipeline, Error> {
        let vs_module = device
            .create_shader_module(&shaders.vertex)
            .map_err(link_error)?;
        let fs_module = match device.create_shader_module(&shaders.fragment) {
            Ok(module) => module,
            Err(err) => {
                device.destroy_shader_module(vs_module);
                return Err(link_error(err));
            }
        };

        let pipeline = {
            let (vs_entry, fs_entry) = (
                pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &vs_module,
                    specialization: pso::Specialization::default(),
                },
                pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &fs_module,
                    specialization: pso::Specialization::default(),
                },
            );

            let shader_entries = pso::GraphicsShaderSet {
                vertex: vs_entry,
                hull: None,
                domain: None,
                geometry: None,
                fragment: Some(fs_entry),
            };

            let subpass = Subpass {
                index: 0,
                main_pass: render_pass,
            };

            let mut pipeline_desc = pso::GraphicsPipelineDesc::new(
                shader_entries,
                pso::Primitive::TriangleList,
                pso::Rasterizer::FILL,
                pipeline_layout,
                subpass,
            );
            pipeline_desc.blender.targets.push(pso::ColorBlendDesc {
                mask: pso::ColorMask::ALL,
                blend: Some(pso::BlendState::ALPHA),
            });

            // Positions and colors come from separate buffers.
            pipeline_desc.vertex_buffers.push(pso::VertexBufferDesc {
                binding: 0,
                stride: mem::size_of::<Position>() as u32,
                rate: pso::VertexInputRate::Vertex,
            });
            pipeline_desc.vertex_buffers.push(pso::VertexBufferDesc {
                binding: 1,
                stride: mem::size_of::<Color>() as u32,
                rate: pso::VertexInputRate::Vertex,
            });

            pipeline_desc.attributes.push(pso::AttributeDesc {
                location: 0,
                binding: 0,
                element: pso::Element {
                    format: f::Format::Rg32Sfloat,
                    offset: 0,
                },
            });
            pipeline_desc.attributes.push(pso::AttributeDesc {
                location: 1,
                binding: 1,
                element: pso::Element {
                    format: f::Format::Rgb32Sfloat,
                    offset: 0,
                },
            });

            device.create_graphics_pipeline(&pipeline_desc, None)
        };

        device.destroy_shader_module(vs_module);
        device.destroy_shader_module(fs_module);

        pipeline.map_err(link_error)
    }
}

impl<'a, B: Backend> Drop for Pipeline<'a, B> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_graphics_pipeline(ManuallyDrop::into_inner(ptr::read(&self.pipeline)));
            self.device
                .destroy_pipeline_layout(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline_layout,
                )));
        }
    }
}
