use std::sync::atomic::{fence, Ordering};

use tracing::{debug, trace};

use crate::env::Environment;
use crate::lifed::LifedSlice;
use crate::mmio::RegisterWindow;

use super::descriptor::{RingIndex, RxDescriptor, RxStatus};
use super::device::MacAddress;
use super::device_limits::{DESCRIPTOR_SIZE, MULTICAST_TABLE_ARRAY_SIZE};
use super::driver_constants::{MAX_RX_RING_SIZE, MIN_RX_RING_SIZE};
use super::regs;
use super::ring::{self, DmaBuffer, RingError};

/// The receive descriptor ring and its per-slot buffers.
///
/// The slot under the tail register is the parking slot: it is always software-owned (DD and EOP
/// set) and never holds an unread packet, so the tail never points at a slot the device could be
/// filling. The next completed packet, if any, sits right after it.
pub struct ReceiveRing {
    descriptors: LifedSlice<'static, RxDescriptor>,
    buffers: Vec<DmaBuffer>,
}

impl ReceiveRing {
    pub fn initialize(env: &impl Environment, regs: &impl RegisterWindow, size: usize, mac: MacAddress) -> Result<ReceiveRing, RingError> {
        ring::check_size("receive", size, MIN_RX_RING_SIZE, MAX_RX_RING_SIZE)?;
        let memory = ring::allocate::<RxDescriptor>(env, "receive", size)?;

        // Written whole: only the parking slot may carry DD and EOP, whatever the page held before
        let parking = RingIndex::last(size);
        for n in 0..size {
            let status = if n == parking.slot() { (RxStatus::DD | RxStatus::EOP).bits() } else { 0 };
            memory.descriptors.index(n).write_volatile(RxDescriptor {
                addr: u64::to_le(memory.buffers[n].phys_addr()),
                status,
                ..RxDescriptor::default()
            });
        }

        let (low, high) = mac.filter_registers();
        regs::write(regs, regs::RAL0, low);
        regs::write(regs, regs::RAH0, high | regs::RAH_::AV);

        for n in 0..MULTICAST_TABLE_ARRAY_SIZE {
            regs::clear(regs, regs::MTA(n));
        }

        // polling only
        regs::write(regs, regs::IMC, u32::MAX);

        let ring_phys_addr = memory.descriptors_phys_addr;
        regs::write(regs, regs::RDBAH, (ring_phys_addr >> 32) as u32);
        regs::write(regs, regs::RDBAL, ring_phys_addr as u32);
        regs::write(regs, regs::RDLEN, (size * DESCRIPTOR_SIZE) as u32);
        regs::clear(regs, regs::RDH);
        regs::write(regs, regs::RDT, parking.value());

        // 2048-byte buffers, which hold any frame up to MAX_PACKET_SIZE
        regs::clear_field(regs, regs::RCTL, regs::RCTL_::BSIZE);
        regs::set_field(regs, regs::RCTL, regs::RCTL_::BAM);
        regs::set_field(regs, regs::RCTL, regs::RCTL_::SECRC);
        regs::set_field(regs, regs::RCTL, regs::RCTL_::EN);

        debug!(size, phys = format_args!("{ring_phys_addr:#x}"), %mac, "receive ring programmed");

        Ok(ReceiveRing {
            descriptors: memory.descriptors,
            buffers: memory.buffers,
        })
    }

    /// Copies the next completed packet into `buffer` and returns its length, or returns `None`
    /// straight away if the device has not completed one. Never waits.
    ///
    /// Panics if `buffer` is too small for the packet.
    pub fn try_receive(&mut self, regs: &impl RegisterWindow, buffer: &mut [u8]) -> Option<usize> {
        let tail = RingIndex::new(regs::read(regs, regs::RDT), self.size());
        let next = tail.next();

        let descriptor = self.descriptors.index(next.slot());
        if !descriptor.read_volatile().is_software_owned() {
            trace!(slot = next.value(), "no packet");
            return None;
        }
        // don't read the buffer before we've seen DD
        fence(Ordering::Acquire);

        let length = u16::from_le(descriptor.read_volatile_part(|d| &d.length)) as usize;
        if length > buffer.len() {
            panic!("Receive buffer of {} bytes cannot hold a packet of {} bytes", buffer.len(), length);
        }
        self.buffers[next.slot()].copy_to(&mut buffer[..length]);

        let errors = descriptor.read_volatile_part(|d| &d.errors);
        if errors != 0 {
            debug!(slot = next.value(), errors, "packet received with errors");
        }

        // The old parking slot goes back to the device, `next` becomes the new one
        let old = self.descriptors.index(tail.slot());
        let status = old.read_volatile_part(|d| &d.status);
        old.write_volatile_part(status & !(RxStatus::DD | RxStatus::EOP).bits(), |d| &mut d.status);

        fence(Ordering::SeqCst);
        regs::write(regs, regs::RDT, next.value());
        debug!(slot = next.value(), length, "packet received");

        Some(length)
    }

    pub fn size(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptor(&self, slot: usize) -> RxDescriptor {
        self.descriptors.index(slot).read_volatile()
    }

    pub fn buffer(&self, slot: usize) -> &[u8] {
        self.buffers[slot].as_slice()
    }
}
