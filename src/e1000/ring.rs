use std::ptr;
use std::ptr::NonNull;
use std::slice;

use thiserror::Error;

use crate::env::{EnvError, Environment, Page, PAGE_SIZE};
use crate::lifed::LifedSlice;

use super::driver_constants::RING_SIZE_MULTIPLE;

#[derive(Debug, Error)]
pub enum RingError {
    #[error("{ring} ring size {size} must be a multiple of 8 in {min}..={max}")]
    InvalidSize { ring: &'static str, size: usize, min: usize, max: usize },
    #[error("allocating {ring} ring memory: {source}")]
    Memory {
        ring: &'static str,
        #[source]
        source: EnvError,
    },
}

pub(super) fn check_size(ring: &'static str, size: usize, min: usize, max: usize) -> Result<(), RingError> {
    if size % RING_SIZE_MULTIPLE != 0 || size < min || size > max {
        return Err(RingError::InvalidSize { ring, size, min, max });
    }
    Ok(())
}

/// A page dedicated to one ring slot for the life of the ring.
pub(super) struct DmaBuffer {
    page: NonNull<Page>,
    phys_addr: u64,
}

// Each buffer is reachable only through the ring that owns its slot
unsafe impl Send for DmaBuffer {}

impl DmaBuffer {
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    pub fn as_slice(&self) -> &[u8] {
        // Safe because the page is never freed and only this slot's owner touches it
        unsafe { slice::from_raw_parts(self.page.as_ptr() as *const u8, PAGE_SIZE) }
    }

    /// Zero-fills the page, then copies `data` to its start.
    pub fn fill(&mut self, data: &[u8]) {
        let dst = self.page.as_ptr() as *mut u8;
        unsafe {
            ptr::write_bytes(dst, 0, PAGE_SIZE);
            ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
    }

    /// Copies the first `dst.len()` bytes the device wrote into the page.
    pub fn copy_to(&self, dst: &mut [u8]) {
        // the device no longer writes this page once the slot's DD bit is set
        dst.copy_from_slice(&self.as_slice()[..dst.len()]);
    }
}

pub(super) struct RingMemory<D: 'static> {
    pub descriptors: LifedSlice<'static, D>,
    pub descriptors_phys_addr: u64,
    pub buffers: Vec<DmaBuffer>,
}

/// One page for `size` descriptors, plus one buffer page per descriptor. The caller writes every
/// descriptor before handing the ring to the device.
pub(super) fn allocate<D: Copy>(env: &impl Environment, ring: &'static str, size: usize) -> Result<RingMemory<D>, RingError> {
    let memory = |source| RingError::Memory { ring, source };

    let page = env.allocate_page().map_err(memory)?;
    let descriptors_phys_addr = env.get_physical_address(page.0.as_ptr()).map_err(memory)?;
    // Safe because the page is aligned for D, descriptors are plain integers and size was checked to fit
    let descriptors = unsafe { slice::from_raw_parts_mut(page.0.as_mut_ptr() as *mut D, size) };

    let mut buffers = Vec::with_capacity(size);
    for _ in 0..size {
        let page = env.allocate_page().map_err(memory)?;
        let phys_addr = env.get_physical_address(page.0.as_ptr()).map_err(memory)?;
        buffers.push(DmaBuffer { page: NonNull::from(page), phys_addr });
    }

    Ok(RingMemory {
        descriptors: LifedSlice::new(descriptors),
        descriptors_phys_addr,
        buffers,
    })
}
