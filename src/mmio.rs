use std::ptr;
use std::ptr::NonNull;

/// A device register window addressed by byte offsets of 32-bit registers.
///
/// Accesses cannot fail; an offset that is not 4-byte aligned or lies outside the window is a
/// programming error and panics.
pub trait RegisterWindow {
    fn read(&self, offset: usize) -> u32;
    fn write(&self, offset: usize, value: u32);
}

impl<T: RegisterWindow + ?Sized> RegisterWindow for &T {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Registers mapped into our address space, accessed with volatile loads and stores.
pub struct MmioWindow {
    base: NonNull<u32>,
    len: usize,
}

// The window is device memory; every access is a single volatile 32-bit load or store.
unsafe impl Send for MmioWindow {}
unsafe impl Sync for MmioWindow {}

impl MmioWindow {
    pub fn new(registers: &'static mut [u32]) -> MmioWindow {
        let len = registers.len();
        MmioWindow {
            base: NonNull::from(registers).cast::<u32>(),
            len,
        }
    }

    pub fn size(&self) -> usize {
        self.len * 4
    }

    #[inline(always)]
    fn slot(&self, offset: usize) -> *mut u32 {
        if offset % 4 != 0 {
            panic!("Register offset {:#x} is not 4-byte aligned", offset);
        }
        let index = offset / 4;
        if index >= self.len {
            panic!("Register offset {:#x} is outside the {:#x}-byte window", offset, self.size());
        }
        // Safe because we just checked the index and the mapping lives for 'static
        unsafe { self.base.as_ptr().add(index) }
    }
}

impl RegisterWindow for MmioWindow {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        u32::from_le(unsafe { ptr::read_volatile(self.slot(offset)) })
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.slot(offset), u32::to_le(value)) }
    }
}
