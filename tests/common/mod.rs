//! A simulated 82540EM for driving the driver without hardware.
//!
//! Memory handed out by [`FakeEnvironment`] gets made-up physical addresses, and the device side
//! of every test only reaches ring memory through those, the way DMA would.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Mutex};

use tinye1000::e1000::{RxDescriptor, RxStatus, TxDescriptor, TxStatus};
use tinye1000::{Config, Device, EnvError, Environment, Page, PciAddress, RegisterWindow, PAGE_SIZE};

pub const STATUS: usize = 0x00008;
pub const EERD: usize = 0x00014;
pub const IMC: usize = 0x000D8;
pub const RCTL: usize = 0x00100;
pub const TCTL: usize = 0x00400;
pub const TIPG: usize = 0x00410;
pub const RDBAL: usize = 0x02800;
pub const RDBAH: usize = 0x02804;
pub const RDLEN: usize = 0x02808;
pub const RDH: usize = 0x02810;
pub const RDT: usize = 0x02818;
pub const TDBAL: usize = 0x03800;
pub const TDBAH: usize = 0x03804;
pub const TDLEN: usize = 0x03808;
pub const TDH: usize = 0x03810;
pub const TDT: usize = 0x03818;
pub const MTA: usize = 0x05200;
pub const RAL0: usize = 0x05400;
pub const RAH0: usize = 0x05404;

pub const RCTL_EN: u32 = 1 << 1;
pub const RCTL_BAM: u32 = 1 << 15;
pub const RCTL_SECRC: u32 = 1 << 26;
pub const TCTL_EN: u32 = 1 << 1;
pub const TCTL_PSP: u32 = 1 << 3;
pub const RAH_AV: u32 = 1 << 31;

pub const QEMU_STATUS: u32 = 0x8008_0783;
pub const QEMU_MAC_WORDS: [u16; 3] = [0x5452, 0x1200, 0x5634];
pub const BAR0: u32 = 0xFEBC_0000;
pub const BAR0_SIZE: u32 = 0x2_0000;

const PCI_ID: u8 = 0x00;
const PCI_COMMAND: u8 = 0x04;
const PCI_BAR0_LOW: u8 = 0x10;
const PCI_BAR0_HIGH: u8 = 0x14;
const E1000_PCI_ID: u32 = (0x100E << 16) | 0x8086;

// Far away from any heap address, so a virtual address used as physical would be caught
const PHYS_BASE: u64 = 0x7_0000_0000;

pub fn pci_address() -> PciAddress {
    PciAddress { bus: 0, device: 3, function: 0 }
}

struct RegisterState {
    values: HashMap<usize, u32>,
    eeprom: [u16; 64],
    eeprom_responds: bool,
}

/// Register file of the simulated NIC. Clones share the same registers.
#[derive(Clone)]
pub struct FakeRegisters {
    state: Arc<Mutex<RegisterState>>,
}

impl FakeRegisters {
    fn new() -> FakeRegisters {
        let mut eeprom = [0u16; 64];
        eeprom[..3].copy_from_slice(&QEMU_MAC_WORDS);
        let mut values = HashMap::new();
        values.insert(STATUS, QEMU_STATUS);
        FakeRegisters {
            state: Arc::new(Mutex::new(RegisterState { values, eeprom, eeprom_responds: true })),
        }
    }

    pub fn get(&self, offset: usize) -> u32 {
        self.read(offset)
    }

    /// Writes a register the way the device would, bypassing the EEPROM logic.
    pub fn set(&self, offset: usize, value: u32) {
        self.state.lock().unwrap().values.insert(offset, value);
    }

    pub fn set_eeprom_words(&self, words: &[u16]) {
        self.state.lock().unwrap().eeprom[..words.len()].copy_from_slice(words);
    }

    pub fn stall_eeprom(&self) {
        self.state.lock().unwrap().eeprom_responds = false;
    }
}

impl RegisterWindow for FakeRegisters {
    fn read(&self, offset: usize) -> u32 {
        assert_eq!(offset % 4, 0, "misaligned register read");
        *self.state.lock().unwrap().values.get(&offset).unwrap_or(&0)
    }

    fn write(&self, offset: usize, value: u32) {
        assert_eq!(offset % 4, 0, "misaligned register write");
        let mut state = self.state.lock().unwrap();
        if offset == EERD && value & 1 != 0 && state.eeprom_responds {
            let word = state.eeprom[((value >> 8) & 0xFF) as usize];
            state.values.insert(EERD, (value & 0xFF00) | (1 << 4) | ((word as u32) << 16));
        } else {
            state.values.insert(offset, value);
        }
    }
}

struct MemoryState {
    phys_to_virt: HashMap<u64, usize>,
    virt_to_phys: HashMap<usize, u64>,
    pages_left: Option<usize>,
    fill: u8,
    translates: bool,
}

pub struct FakeEnvironment {
    pub registers: FakeRegisters,
    memory: Mutex<MemoryState>,
    pci: Mutex<HashMap<u8, u32>>,
    mapped: Mutex<Option<(u64, usize)>>,
}

impl FakeEnvironment {
    pub fn new() -> FakeEnvironment {
        let mut pci = HashMap::new();
        pci.insert(PCI_ID, E1000_PCI_ID);
        pci.insert(PCI_COMMAND, 0);
        pci.insert(PCI_BAR0_LOW, BAR0);
        FakeEnvironment {
            registers: FakeRegisters::new(),
            memory: Mutex::new(MemoryState {
                phys_to_virt: HashMap::new(),
                virt_to_phys: HashMap::new(),
                pages_left: None,
                fill: 0,
                translates: true,
            }),
            pci: Mutex::new(pci),
            mapped: Mutex::new(None),
        }
    }

    /// Makes allocation fail after `pages` more pages.
    pub fn limit_pages(&self, pages: usize) {
        self.memory.lock().unwrap().pages_left = Some(pages);
    }

    /// Hands out pages full of `byte` instead of zeroes.
    pub fn fill_pages_with(&self, byte: u8) {
        self.memory.lock().unwrap().fill = byte;
    }

    /// Makes every virtual-to-physical lookup fail as if the page were unmapped.
    pub fn fail_translation(&self) {
        self.memory.lock().unwrap().translates = false;
    }

    pub fn set_pci(&self, register: u8, value: u32) {
        self.pci.lock().unwrap().insert(register, value);
    }

    pub fn pci(&self, register: u8) -> u32 {
        *self.pci.lock().unwrap().get(&register).unwrap_or(&0)
    }

    pub fn pci_command(&self) -> u32 {
        self.pci(PCI_COMMAND)
    }

    pub fn pci_bar0(&self) -> u32 {
        self.pci(PCI_BAR0_LOW)
    }

    pub fn make_bar0_64bit(&self, high: u32) {
        self.set_pci(PCI_BAR0_LOW, BAR0 | 0b100);
        self.set_pci(PCI_BAR0_HIGH, high);
    }

    pub fn set_pci_id(&self, id: u32) {
        self.set_pci(PCI_ID, id);
    }

    pub fn mapped_window(&self) -> Option<(u64, usize)> {
        *self.mapped.lock().unwrap()
    }

    fn virt(&self, phys: u64) -> *mut u8 {
        let page = phys & !(PAGE_SIZE as u64 - 1);
        let memory = self.memory.lock().unwrap();
        let virt = memory.phys_to_virt.get(&page).unwrap_or_else(|| panic!("device touched unmapped physical address {phys:#x}"));
        (virt + (phys - page) as usize) as *mut u8
    }

    // --- what the device sees ---

    pub fn read_phys(&self, phys: u64, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        unsafe { ptr::copy_nonoverlapping(self.virt(phys), out.as_mut_ptr(), len) };
        out
    }

    pub fn write_phys(&self, phys: u64, bytes: &[u8]) {
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.virt(phys), bytes.len()) };
    }

    fn ring_base(&self, low: usize, high: usize) -> u64 {
        ((self.registers.get(high) as u64) << 32) | self.registers.get(low) as u64
    }

    pub fn rx_descriptor_phys(&self, slot: usize) -> u64 {
        self.ring_base(RDBAL, RDBAH) + 16 * slot as u64
    }

    pub fn tx_descriptor_phys(&self, slot: usize) -> u64 {
        self.ring_base(TDBAL, TDBAH) + 16 * slot as u64
    }

    pub fn rx_descriptor(&self, slot: usize) -> RxDescriptor {
        unsafe { ptr::read_volatile(self.virt(self.rx_descriptor_phys(slot)) as *const RxDescriptor) }
    }

    pub fn write_rx_descriptor(&self, slot: usize, descriptor: RxDescriptor) {
        unsafe { ptr::write_volatile(self.virt(self.rx_descriptor_phys(slot)) as *mut RxDescriptor, descriptor) }
    }

    pub fn tx_descriptor(&self, slot: usize) -> TxDescriptor {
        unsafe { ptr::read_volatile(self.virt(self.tx_descriptor_phys(slot)) as *const TxDescriptor) }
    }

    pub fn write_tx_descriptor(&self, slot: usize, descriptor: TxDescriptor) {
        unsafe { ptr::write_volatile(self.virt(self.tx_descriptor_phys(slot)) as *mut TxDescriptor, descriptor) }
    }

    /// Stores `frame` into a receive slot's buffer and hands the slot to software.
    pub fn complete_rx(&self, slot: usize, frame: &[u8]) {
        let mut descriptor = self.rx_descriptor(slot);
        self.write_phys(descriptor.addr, frame);
        descriptor.length = frame.len() as u16;
        descriptor.status = (RxStatus::DD | RxStatus::EOP).bits();
        self.write_rx_descriptor(slot, descriptor);
    }

    /// Marks a transmit slot as sent.
    pub fn complete_tx(&self, slot: usize) {
        let mut descriptor = self.tx_descriptor(slot);
        descriptor.status |= TxStatus::DD.bits();
        self.write_tx_descriptor(slot, descriptor);
    }

    /// The frame a transmit slot describes, fetched through its physical address.
    pub fn tx_frame(&self, slot: usize) -> Vec<u8> {
        let descriptor = self.tx_descriptor(slot);
        self.read_phys(descriptor.addr, descriptor.length as usize)
    }
}

impl Environment for FakeEnvironment {
    type Registers = FakeRegisters;

    fn allocate_page(&self) -> Result<&'static mut Page, EnvError> {
        let mut memory = self.memory.lock().unwrap();
        if let Some(left) = memory.pages_left.as_mut() {
            if *left == 0 {
                return Err(EnvError::OutOfMemory);
            }
            *left -= 1;
        }
        let page: &'static mut Page = Box::leak(Box::new(Page([memory.fill; PAGE_SIZE])));
        let virt = page as *mut Page as usize;
        let phys = PHYS_BASE + (memory.virt_to_phys.len() * PAGE_SIZE) as u64;
        memory.phys_to_virt.insert(phys, virt);
        memory.virt_to_phys.insert(virt, phys);
        Ok(page)
    }

    fn get_physical_address(&self, value: *const u8) -> Result<u64, EnvError> {
        let addr = value as usize;
        let page = addr & !(PAGE_SIZE - 1);
        let memory = self.memory.lock().unwrap();
        match memory.virt_to_phys.get(&page) {
            Some(phys) if memory.translates => Ok(phys + (addr - page) as u64),
            _ => Err(EnvError::Unmapped(addr)),
        }
    }

    fn map_registers(&self, addr: u64, size: usize) -> Result<FakeRegisters, EnvError> {
        *self.mapped.lock().unwrap() = Some((addr, size));
        Ok(self.registers.clone())
    }

    fn pci_read(&self, addr: PciAddress, register: u8) -> u32 {
        assert_eq!(addr, pci_address(), "config read for a device that isn't there");
        self.pci(register)
    }

    fn pci_write(&self, addr: PciAddress, register: u8, value: u32) {
        assert_eq!(addr, pci_address(), "config write for a device that isn't there");
        // BAR sizing: all ones reads back the size mask
        let value = if register == PCI_BAR0_LOW && value == u32::MAX { !(BAR0_SIZE - 1) } else { value };
        self.set_pci(register, value);
    }
}

pub fn bring_up(env: &FakeEnvironment) -> Device<FakeRegisters> {
    bring_up_with(env, &Config::default())
}

pub fn bring_up_with(env: &FakeEnvironment, config: &Config) -> Device<FakeRegisters> {
    match Device::init(env, pci_address(), config) {
        Ok(device) => device,
        Err(err) => panic!("bring-up failed: {err}"),
    }
}

/// A frame whose bytes all differ from those of frames with another `seed`.
pub fn frame(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|n| seed.wrapping_mul(31).wrapping_add(n as u8)).collect()
}
