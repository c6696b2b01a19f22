use std::io;

use thiserror::Error;

use crate::mmio::RegisterWindow;
use crate::pci::PciAddress;

pub const PAGE_SIZE: usize = 4096;

/// One page of DMA-capable memory.
#[repr(C, align(4096))]
pub struct Page(pub [u8; PAGE_SIZE]);

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("virtual address {0:#x} is not mapped")]
    Unmapped(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The driver's view of memory management and PCI.
pub trait Environment {
    type Registers: RegisterWindow;

    // Pages are zeroed and live until the process exits; nothing hands them back
    fn allocate_page(&self) -> Result<&'static mut Page, EnvError>;
    fn get_physical_address(&self, value: *const u8) -> Result<u64, EnvError>; // u64 because descriptors hold 64-bit addresses
    fn map_registers(&self, addr: u64, size: usize) -> Result<Self::Registers, EnvError>;

    fn pci_read(&self, addr: PciAddress, register: u8) -> u32;
    fn pci_write(&self, addr: PciAddress, register: u8, value: u32);
}
