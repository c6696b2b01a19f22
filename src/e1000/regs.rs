#![allow(non_snake_case)]

use crate::mmio::RegisterWindow;

// Control registers are always updated read-modify-write, bits we don't name may mean something to the hardware

pub fn read(regs: &impl RegisterWindow, reg: usize) -> u32 {
    regs.read(reg)
}

pub fn read_field(regs: &impl RegisterWindow, reg: usize, field: u32) -> u32 {
    let value = read(regs, reg);
    let shift = field.trailing_zeros();
    (value & field) >> shift
}

pub fn write(regs: &impl RegisterWindow, reg: usize, value: u32) {
    regs.write(reg, value);
}

pub fn write_field(regs: &impl RegisterWindow, reg: usize, field: u32, field_value: u32) {
    let old_value = read(regs, reg);
    let shift = field.trailing_zeros();
    let new_value = (old_value & !field) | ((field_value << shift) & field);
    write(regs, reg, new_value);
}

pub fn clear(regs: &impl RegisterWindow, reg: usize) {
    write(regs, reg, 0);
}

pub fn clear_field(regs: &impl RegisterWindow, reg: usize, field: u32) {
    let old_value = read(regs, reg);
    write(regs, reg, old_value & !field);
}

pub fn set_field(regs: &impl RegisterWindow, reg: usize, field: u32) {
    let old_value = read(regs, reg);
    let new_value = old_value | field;
    write(regs, reg, new_value);
}

pub fn is_field_cleared(regs: &impl RegisterWindow, reg: usize, field: u32) -> bool {
    read_field(regs, reg, field) == 0
}

// Byte offsets into the 82540EM register window

// --- General ---

pub const STATUS: usize = 0x00008;

pub const EERD: usize = 0x00014;
pub mod EERD_ {
    pub const START: u32 = 1 << 0;
    pub const DONE: u32 = 1 << 4;
    pub const ADDR: u32 = 0xFF << 8;
    pub const DATA: u32 = 0xFFFF << 16;
}

pub const IMC: usize = 0x000D8;

// --- RX ---

pub const RCTL: usize = 0x00100;
pub mod RCTL_ {
    pub const EN: u32 = 1 << 1;
    pub const BAM: u32 = 1 << 15;
    pub const BSIZE: u32 = 0b11 << 16;
    pub const SECRC: u32 = 1 << 26;
}

pub const RDBAL: usize = 0x02800;
pub const RDBAH: usize = 0x02804;
pub const RDLEN: usize = 0x02808;
pub const RDH: usize = 0x02810;
pub const RDT: usize = 0x02818;

pub fn MTA(n: usize) -> usize {
    0x05200 + 4 * n
}

pub const RAL0: usize = 0x05400;
pub const RAH0: usize = 0x05404;
pub mod RAH_ {
    pub const AV: u32 = 1 << 31;
}

// --- TX ---

pub const TCTL: usize = 0x00400;
pub mod TCTL_ {
    pub const EN: u32 = 1 << 1;
    pub const PSP: u32 = 1 << 3;
    pub const CT: u32 = 0xFF << 4;
    pub const COLD: u32 = 0x3FF << 12;
}

pub const TIPG: usize = 0x00410;
pub mod TIPG_ {
    pub const IPGT: u32 = 0x3FF;
    pub const IPGR1: u32 = 0x3FF << 10;
    pub const IPGR2: u32 = 0x3FF << 20;
}

pub const TDBAL: usize = 0x03800;
pub const TDBAH: usize = 0x03804;
pub const TDLEN: usize = 0x03808;
pub const TDH: usize = 0x03810;
pub const TDT: usize = 0x03818;
