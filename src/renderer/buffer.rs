use crate::error::{device_error, Error};
use gfx_hal::{buffer, prelude::*, Backend, Limits};
use std::mem::{self, ManuallyDrop};
use std::ptr;

/// A vertex buffer sized for `content`, not yet bound to memory.
pub struct Buffer<'a, B: Backend, T> {
    pub device: &'a B::Device,
    pub buf: ManuallyDrop<B::Buffer>,
    pub content: &'a [T],
    pub len: u64,
}

impl<'a, B: Backend, T> Buffer<'a, B, T> {
    pub fn new(device: &'a B::Device, content: &'a [T], limits: &Limits) -> Result<Self, Error> {
        let buffer_len = content.len() as u64 * mem::size_of::<T>() as u64;
        if buffer_len == 0 {
            return Err(Error::Device("vertex buffer content is empty".into()));
        }
        let memory_size = aligned_size(buffer_len, limits.non_coherent_atom_size as u64);

        let buf = unsafe { device.create_buffer(memory_size, buffer::Usage::VERTEX) }
            .map_err(device_error)?;

        Ok(Buffer {
            device,
            buf: ManuallyDrop::new(buf),
            content,
            len: buffer_len,
        })
    }
}

impl<'a, B: Backend, T> Drop for Buffer<'a, B, T> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_buffer(ManuallyDrop::into_inner(ptr::read(&self.buf)))
        }
    }
}

/// Rounds `len` up to a multiple of `alignment` so mapped flushes cover whole atoms.
fn aligned_size(len: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return len;
    }
    ((len + alignment - 1) / alignment) * alignment
}
