#![allow(non_snake_case)]

use crate::env::Environment;
use crate::pci::PciAddress;

pub fn read_field(env: &impl Environment, addr: PciAddress, reg: u8, field: u32) -> u32 {
    let value = env.pci_read(addr, reg);
    let shift = field.trailing_zeros();
    (value & field) >> shift
}

pub fn set_field(env: &impl Environment, addr: PciAddress, reg: u8, field: u32) {
    let old_value = env.pci_read(addr, reg);
    let new_value = old_value | field;
    env.pci_write(addr, reg, new_value);
}

pub const ID: u8 = 0x00;
pub mod ID_ {
    pub const VENDOR: u32 = 0x0000_FFFF;
    pub const DEVICE: u32 = 0xFFFF_0000;
}

pub const COMMAND: u8 = 0x04;
pub mod COMMAND_ {
    pub const MEMORY_ACCESS_ENABLE: u32 = 1 << 1;
    pub const BUS_MASTER_ENABLE: u32 = 1 << 2;
}

pub const BAR0_LOW: u8 = 0x10;
pub const BAR0_HIGH: u8 = 0x14;
pub mod BAR_ {
    pub const IO_SPACE: u32 = 1 << 0;
    pub const TYPE: u32 = 0b0110;
    pub const TYPE_64BIT: u32 = 0b10;
    pub const ADDRESS: u32 = !0b1111;
}
