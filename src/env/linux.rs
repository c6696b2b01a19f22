use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek};
use std::mem::size_of;
use std::ptr;
use std::ptr::NonNull;

use tracing::debug;

use super::environment::{EnvError, Environment, Page, PAGE_SIZE};
use super::pci;
use crate::mmio::MmioWindow;
use crate::pci::PciAddress;

const HUGEPAGE_LOG: usize = 21; // 2 MB hugepages, enough for both rings and their buffers
const HUGEPAGE_SIZE: usize = 1 << HUGEPAGE_LOG;

/// Runs the driver as a privileged Linux process: DMA memory comes from a hugepage, which the
/// kernel never moves or swaps out, so physical addresses stay valid.
pub struct LinuxEnvironment {
    hugepage: NonNull<u8>,
    used_bytes: Cell<usize>,
}

impl LinuxEnvironment {
    pub fn new() -> Result<LinuxEnvironment, EnvError> {
        let page = unsafe {
            libc::mmap(
                ptr::null_mut(),
                HUGEPAGE_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_HUGETLB | (HUGEPAGE_LOG << libc::MAP_HUGE_SHIFT) as i32 | libc::MAP_ANONYMOUS | libc::MAP_SHARED | libc::MAP_POPULATE | libc::MAP_LOCKED,
                -1,
                0,
            )
        };
        if page == libc::MAP_FAILED {
            return Err(EnvError::Io(io::Error::last_os_error()));
        }
        debug!(size = HUGEPAGE_SIZE, "hugepage mapped for DMA memory");

        Ok(LinuxEnvironment {
            hugepage: NonNull::new(page as *mut u8).ok_or(EnvError::OutOfMemory)?,
            used_bytes: Cell::new(0),
        })
    }
}

impl Environment for LinuxEnvironment {
    type Registers = MmioWindow;

    fn allocate_page(&self) -> Result<&'static mut Page, EnvError> {
        let used_bytes = self.used_bytes.get();
        if used_bytes + PAGE_SIZE > HUGEPAGE_SIZE {
            return Err(EnvError::OutOfMemory);
        }
        self.used_bytes.set(used_bytes + PAGE_SIZE);

        // Safe because the hugepage is page-aligned, zeroed by MAP_ANONYMOUS, never unmapped,
        // and every page is handed out exactly once
        unsafe { Ok(&mut *(self.hugepage.as_ptr().add(used_bytes) as *mut Page)) }
    }

    fn get_physical_address(&self, value: *const u8) -> Result<u64, EnvError> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) } as usize;
        let addr = value as usize;
        let page = addr / page_size;
        let map_offset = page * size_of::<u64>();

        let mut pagemap = OpenOptions::new().read(true).open("/proc/self/pagemap")?;
        pagemap.seek(io::SeekFrom::Start(map_offset as u64))?;

        let mut buffer = [0; size_of::<u64>()];
        pagemap.read_exact(&mut buffer)?;

        let metadata = u64::from_ne_bytes(buffer);
        if (metadata & 0x8000_0000_0000_0000) == 0 {
            return Err(EnvError::Unmapped(addr));
        }

        // a zero PFN means we lack CAP_SYS_ADMIN, which is as good as unmapped
        let pfn = metadata & 0x7F_FFFF_FFFF_FFFF;
        if pfn == 0 {
            return Err(EnvError::Unmapped(addr));
        }

        let addr_offset = addr % page_size;
        Ok(pfn * page_size as u64 + addr_offset as u64)
    }

    fn map_registers(&self, addr: u64, size: usize) -> Result<MmioWindow, EnvError> {
        let file = OpenOptions::new().read(true).write(true).open("/dev/mem")?;
        let map = unsafe { memmap::MmapOptions::new().offset(addr).len(size).map_mut(&file)? };
        // The register window stays mapped for the life of the driver
        let map: &'static mut memmap::MmapMut = Box::leak(Box::new(map));
        let (prefix, registers, suffix) = unsafe { map[..].align_to_mut::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            panic!("Something went wrong with the /dev/mem mapping");
        }
        debug!(phys = format_args!("{addr:#x}"), size, "register window mapped");
        Ok(MmioWindow::new(registers))
    }

    fn pci_read(&self, addr: PciAddress, register: u8) -> u32 {
        pci::read_config(addr, register)
    }

    fn pci_write(&self, addr: PciAddress, register: u8, value: u32) {
        pci::write_config(addr, register, value);
    }
}
