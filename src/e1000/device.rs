use std::fmt;
use std::hint;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::env::{EnvError, Environment};
use crate::mmio::RegisterWindow;
use crate::pci::PciAddress;

use super::device_limits::{MAC_ADDRESS_WORDS, REGISTER_WINDOW_SIZE};
use super::driver_constants::EEPROM_SPIN_LIMIT;
use super::pci_regs;
use super::receive::ReceiveRing;
use super::regs;
use super::ring::RingError;
use super::transmit::TransmitRing;

const INTEL_VENDOR_ID: u32 = 0x8086;
// 82540EM, the e1000 QEMU emulates
const E1000_DEVICE_ID: u32 = 0x100E;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("PCI device {vendor:04x}:{device:04x} is not an 82540EM")]
    UnexpectedDevice { vendor: u32, device: u32 },
    #[error("BAR0 {0:#010x} is not a usable memory BAR")]
    BadBar(u32),
    #[error("mapping the register window: {0}")]
    Env(#[from] EnvError),
    #[error("MMIO check failed: STATUS is {found:#010x}, expected {expected:#010x}")]
    UnexpectedStatus { expected: u32, found: u32 },
    #[error("EEPROM read of word {word} timed out")]
    EepromTimeout { word: u8 },
    #[error(transparent)]
    Ring(#[from] RingError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// The EEPROM stores the address as three little-endian words.
    pub fn from_eeprom_words(words: [u16; MAC_ADDRESS_WORDS]) -> MacAddress {
        let [a, b] = words[0].to_le_bytes();
        let [c, d] = words[1].to_le_bytes();
        let [e, f] = words[2].to_le_bytes();
        MacAddress([a, b, c, d, e, f])
    }

    /// RAL/RAH contents for this address, without the address-valid bit.
    pub fn filter_registers(&self) -> (u32, u32) {
        let [a, b, c, d, e, f] = self.0;
        (u32::from_le_bytes([a, b, c, d]), u32::from_le_bytes([e, f, 0, 0]))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// An attached 82540EM with both rings committed to the hardware.
pub struct Device<R> {
    regs: R,
    mac: MacAddress,
    transmit: TransmitRing,
    receive: ReceiveRing,
}

impl<R: RegisterWindow> Device<R> {
    pub fn init<E>(env: &E, pci_address: PciAddress, config: &Config) -> Result<Device<R>, InitError>
    where
        E: Environment<Registers = R>,
    {
        let vendor = pci_regs::read_field(env, pci_address, pci_regs::ID, pci_regs::ID_::VENDOR);
        let device = pci_regs::read_field(env, pci_address, pci_regs::ID, pci_regs::ID_::DEVICE);
        if vendor != INTEL_VENDOR_ID || device != E1000_DEVICE_ID {
            return Err(InitError::UnexpectedDevice { vendor, device });
        }

        pci_regs::set_field(env, pci_address, pci_regs::COMMAND, pci_regs::COMMAND_::MEMORY_ACCESS_ENABLE);
        pci_regs::set_field(env, pci_address, pci_regs::COMMAND, pci_regs::COMMAND_::BUS_MASTER_ENABLE);

        let (bar_phys_addr, bar_size) = negotiate_bar0(env, pci_address)?;
        let regs = env.map_registers(bar_phys_addr, bar_size)?;
        info!(pci = %pci_address, phys = format_args!("{bar_phys_addr:#x}"), size = bar_size, "e1000 registers mapped");

        if let Some(expected) = config.expected_status {
            let found = regs::read(&regs, regs::STATUS);
            if found != expected {
                return Err(InitError::UnexpectedStatus { expected, found });
            }
            debug!(status = format_args!("{found:#010x}"), "MMIO is ok");
        }

        let mac = read_mac_address(&regs)?;
        info!(%mac, "MAC address read from EEPROM");

        let transmit = TransmitRing::initialize(env, &regs, config.tx_ring_size)?;
        let receive = ReceiveRing::initialize(env, &regs, config.rx_ring_size, mac)?;
        info!(tx = transmit.size(), rx = receive.size(), "e1000 rings up");

        Ok(Device { regs, mac, transmit, receive })
    }

    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    pub fn transmit_ring(&self) -> &TransmitRing {
        &self.transmit
    }

    pub fn receive_ring(&self) -> &ReceiveRing {
        &self.receive
    }

    /// Hands each ring to its own single user; the borrow checker keeps them apart.
    pub fn split(&mut self) -> (Transmitter<'_, R>, Receiver<'_, R>) {
        (
            Transmitter { regs: &self.regs, ring: &mut self.transmit },
            Receiver { regs: &self.regs, ring: &mut self.receive },
        )
    }
}

/// Returns BAR0's physical address and size.
fn negotiate_bar0(env: &impl Environment, pci_address: PciAddress) -> Result<(u64, usize), InitError> {
    let bar0_low = env.pci_read(pci_address, pci_regs::BAR0_LOW);
    if bar0_low & pci_regs::BAR_::IO_SPACE != 0 {
        return Err(InitError::BadBar(bar0_low));
    }

    env.pci_write(pci_address, pci_regs::BAR0_LOW, u32::MAX);
    let size_mask = env.pci_read(pci_address, pci_regs::BAR0_LOW) & pci_regs::BAR_::ADDRESS;
    env.pci_write(pci_address, pci_regs::BAR0_LOW, bar0_low);

    let size = (!size_mask).wrapping_add(1) as usize;
    if size_mask == 0 || size < REGISTER_WINDOW_SIZE {
        return Err(InitError::BadBar(bar0_low));
    }

    let is_64bit = (bar0_low & pci_regs::BAR_::TYPE) >> pci_regs::BAR_::TYPE.trailing_zeros() == pci_regs::BAR_::TYPE_64BIT;
    let bar0_high = if is_64bit { env.pci_read(pci_address, pci_regs::BAR0_HIGH) } else { 0 };
    let phys_addr = ((bar0_high as u64) << 32) | (bar0_low & pci_regs::BAR_::ADDRESS) as u64;
    if phys_addr == 0 {
        return Err(InitError::BadBar(bar0_low));
    }

    Ok((phys_addr, size))
}

fn read_mac_address(regs: &impl RegisterWindow) -> Result<MacAddress, InitError> {
    let mut words = [0u16; MAC_ADDRESS_WORDS];
    for (n, word) in words.iter_mut().enumerate() {
        *word = eeprom_read(regs, n as u8)?;
    }
    Ok(MacAddress::from_eeprom_words(words))
}

fn eeprom_read(regs: &impl RegisterWindow, word: u8) -> Result<u16, InitError> {
    let address = (word as u32) << regs::EERD_::ADDR.trailing_zeros();
    regs::write(regs, regs::EERD, address | regs::EERD_::START);
    for _ in 0..EEPROM_SPIN_LIMIT {
        if !regs::is_field_cleared(regs, regs::EERD, regs::EERD_::DONE) {
            return Ok(regs::read_field(regs, regs::EERD, regs::EERD_::DATA) as u16);
        }
        hint::spin_loop();
    }
    Err(InitError::EepromTimeout { word })
}

/// The egress side of the device: sole user of the transmit ring.
pub struct Transmitter<'d, R> {
    regs: &'d R,
    ring: &'d mut TransmitRing,
}

impl<R: RegisterWindow> Transmitter<'_, R> {
    /// Fire-and-forget; a full ring drops the packet. See [`TransmitRing::submit`].
    pub fn transmit(&mut self, packet: &[u8]) {
        self.ring.submit(self.regs, packet);
    }
}

/// The ingress side of the device: sole user of the receive ring.
pub struct Receiver<'d, R> {
    regs: &'d R,
    ring: &'d mut ReceiveRing,
}

impl<R: RegisterWindow> Receiver<'_, R> {
    /// Non-blocking; `None` means nothing is pending. See [`ReceiveRing::try_receive`].
    pub fn receive(&mut self, buffer: &mut [u8]) -> Option<usize> {
        self.ring.try_receive(self.regs, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_bytes_come_low_byte_first_from_each_word() {
        let mac = MacAddress::from_eeprom_words([0xAABB, 0xCCDD, 0xEEFF]);
        assert_eq!(mac.0, [0xBB, 0xAA, 0xDD, 0xCC, 0xFF, 0xEE]);
        assert_eq!(mac.filter_registers(), (0xCCDD_AABB, 0x0000_EEFF));
    }

    #[test]
    fn qemu_default_mac_matches_its_filter_registers() {
        let mac = MacAddress::from_eeprom_words([0x5452, 0x1200, 0x5634]);
        assert_eq!(mac.to_string(), "52:54:00:12:34:56");
        assert_eq!(mac.filter_registers(), (0x1200_5452, 0x0000_5634));
    }
}
