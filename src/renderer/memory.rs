use crate::error::{device_error, Error};
use gfx_hal::{adapter::MemoryType, memory as m, prelude::*, Backend, MemoryTypeId};
use std::iter;
use std::mem::ManuallyDrop;
use std::ptr;

use super::buffer::Buffer;

/// A buffer bound to its own CPU-visible allocation, filled once at creation.
pub struct Memory<'a, B: Backend, T> {
    pub buffer: ManuallyDrop<Buffer<'a, B, T>>,
    memory: ManuallyDrop<B::Memory>,
}

impl<'a, B: Backend, T> Memory<'a, B, T> {
    pub fn new(mut buffer: Buffer<'a, B, T>, memory_types: &[MemoryType]) -> Result<Self, Error> {
        let memory = Self::allocate_gpu_memory(&mut buffer, memory_types)?;
        Ok(Memory {
            buffer: ManuallyDrop::new(buffer),
            memory: ManuallyDrop::new(memory),
        })
    }

    fn allocate_gpu_memory(
        buffer: &mut Buffer<'a, B, T>,
        memory_types: &[MemoryType],
    ) -> Result<B::Memory, Error> {
        let device = buffer.device;
        unsafe {
            let buffer_req = device.get_buffer_requirements(&buffer.buf);
            let upload_type = upload_type(memory_types, &buffer_req).ok_or_else(|| {
                Error::Device("no CPU-visible memory type for vertex buffer".into())
            })?;
            let memory = device
                .allocate_memory(upload_type, buffer_req.size)
                .map_err(device_error)?;
            if let Err(err) = Self::upload(buffer, &memory) {
                device.free_memory(memory);
                return Err(err);
            }
            Ok(memory)
        }
    }

    unsafe fn upload(buffer: &mut Buffer<'a, B, T>, memory: &B::Memory) -> Result<(), Error> {
        let device = buffer.device;
        device
            .bind_buffer_memory(memory, 0, &mut buffer.buf)
            .map_err(device_error)?;
        let mapping = device
            .map_memory(memory, m::Segment::ALL)
            .map_err(device_error)?;
        ptr::copy_nonoverlapping(
            buffer.content.as_ptr() as *const u8,
            mapping,
            buffer.len as usize,
        );
        let flushed = device.flush_mapped_memory_ranges(iter::once((memory, m::Segment::ALL)));
        device.unmap_memory(memory);
        flushed.map_err(device_error)
    }
}

fn upload_type(properties: &[MemoryType], buffer_req: &m::Requirements) -> Option<MemoryTypeId> {
    properties
        .iter()
        .enumerate()
        .position(|(id, mem_type)| {
            buffer_req.type_mask & (1 << id) != 0
                && mem_type.properties.contains(m::Properties::CPU_VISIBLE)
        })
        .map(MemoryTypeId::from)
}

impl<'a, B: Backend, T> Drop for Memory<'a, B, T> {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.buffer);
            self.buffer
                .device
                .free_memory(ManuallyDrop::into_inner(ptr::read(&self.memory)))
        }
    }
}
