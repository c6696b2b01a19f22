use std::marker::PhantomData;
use std::ptr;
use std::ptr::NonNull;

// Views over memory the device may read or write behind our back, so every access is volatile.
// All unsafe{} blocks in the impls are safe because the ptr must be valid over lifetime 'a

#[derive(Clone, Copy)]
pub struct LifedPtr<'a, T> {
    ptr: NonNull<T>,
    _lifetime: PhantomData<&'a mut T>,
}

impl<'a, T> LifedPtr<'a, T> {
    // Safe IFF the pointer is non-null and valid for the lifetime 'a
    #[inline(always)]
    fn new_unchecked(src: *mut T) -> LifedPtr<'a, T> {
        unsafe { LifedPtr { ptr: NonNull::new_unchecked(src), _lifetime: PhantomData } }
    }

    // otherwise `instance.read_volatile().field` loads the whole `instance`
    #[inline(always)]
    pub fn read_volatile_part<U: Copy>(&self, f: fn(&T) -> &U) -> U {
        unsafe { ptr::read_volatile(f(self.ptr.as_ref())) }
    }

    #[inline(always)]
    pub fn write_volatile_part<U: Copy>(&self, value: U, f: fn(&mut T) -> &mut U) {
        unsafe {
            ptr::write_volatile(f(&mut *self.ptr.as_ptr()), value);
        }
    }
}

impl<'a, T: Copy> LifedPtr<'a, T> {
    #[inline(always)]
    pub fn read_volatile(&self) -> T {
        unsafe { ptr::read_volatile(self.ptr.as_ptr()) }
    }

    #[inline(always)]
    pub fn write_volatile(&self, value: T) {
        unsafe {
            ptr::write_volatile(self.ptr.as_ptr(), value);
        }
    }
}

/// A fixed-length array in DMA memory, e.g. a descriptor ring.
pub struct LifedSlice<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _lifetime: PhantomData<&'a mut [T]>,
}

// The slice is only reachable through its single owner
unsafe impl<T: Send> Send for LifedSlice<'_, T> {}

impl<'a, T> LifedSlice<'a, T> {
    pub fn new(src: &'a mut [T]) -> LifedSlice<'a, T> {
        let len = src.len();
        LifedSlice {
            ptr: NonNull::from(src).cast::<T>(),
            len,
            _lifetime: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn index(&self, index: usize) -> LifedPtr<'a, T> {
        if index < self.len {
            // Safe because we just checked the index (no >=0, it's unsigned) and the value must be valid for the lifetime 'a
            unsafe { LifedPtr::new_unchecked(self.ptr.as_ptr().add(index)) }
        } else {
            panic!("Out of bounds")
        }
    }
}
