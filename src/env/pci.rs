//! PCI configuration space through the legacy 0xCF8/0xCFC mechanism.

use x86_64::instructions::port::Port;

use crate::pci::PciAddress;

const CONFIG_ADDRESS: u16 = 0xCF8;
const CONFIG_DATA: u16 = 0xCFC;
// Writing to the POST port is a cheap I/O delay
const POST_PORT: u16 = 0x80;

const ENABLE: u32 = 1 << 31;

/// The CONFIG_ADDRESS value selecting `register` of `address`; registers are dword-aligned.
pub fn config_address(address: PciAddress, register: u8) -> u32 {
    ENABLE | (address.bus as u32) << 16 | (address.device as u32) << 11 | (address.function as u32) << 8 | (register as u32 & 0xFC)
}

fn request_ports(first: u16, count: u64) {
    if unsafe { libc::ioperm(first.into(), count, 1) } < 0 {
        panic!("Could not ioperm port {:#x}, are you root?", first);
    }
}

fn select(address: PciAddress, register: u8) {
    request_ports(CONFIG_ADDRESS, 8);
    request_ports(POST_PORT, 1);
    unsafe {
        Port::new(CONFIG_ADDRESS).write(config_address(address, register));
        Port::<u8>::new(POST_PORT).write(0);
    }
}

pub fn read_config(address: PciAddress, register: u8) -> u32 {
    select(address, register);
    unsafe { Port::<u32>::new(CONFIG_DATA).read() }
}

pub fn write_config(address: PciAddress, register: u8, value: u32) {
    select(address, register);
    unsafe {
        Port::new(CONFIG_DATA).write(value);
        Port::<u8>::new(POST_PORT).write(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_address_packs_the_slot_and_aligns_the_register() {
        let address = PciAddress { bus: 0x01, device: 0x1F, function: 7 };
        assert_eq!(config_address(address, 0x10), 0x8001_FF10);
        assert_eq!(config_address(address, 0x13), 0x8001_FF10);
        assert_eq!(config_address(PciAddress { bus: 0, device: 3, function: 0 }, 0x04), 0x8000_1804);
    }
}
