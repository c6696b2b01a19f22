use std::sync::atomic::{fence, Ordering};

use tracing::{debug, warn};

use crate::env::Environment;
use crate::lifed::LifedSlice;
use crate::mmio::RegisterWindow;

use super::descriptor::{RingIndex, TxCommand, TxDescriptor, TxStatus};
use super::device_limits::DESCRIPTOR_SIZE;
use super::driver_constants::{MAX_PACKET_SIZE, MAX_TX_RING_SIZE, RING_SIZE_MULTIPLE};
use super::regs;
use super::ring::{self, DmaBuffer, RingError};

/// The transmit descriptor ring and its per-slot buffers.
///
/// A slot belongs to software exactly when its descriptor has DD set. Submitting hands the tail
/// slot to the device and moves the tail on; the device sets DD again once the frame is out.
pub struct TransmitRing {
    descriptors: LifedSlice<'static, TxDescriptor>,
    buffers: Vec<DmaBuffer>,
    dropped: u64,
}

impl TransmitRing {
    pub fn initialize(env: &impl Environment, regs: &impl RegisterWindow, size: usize) -> Result<TransmitRing, RingError> {
        ring::check_size("transmit", size, RING_SIZE_MULTIPLE, MAX_TX_RING_SIZE)?;
        let memory = ring::allocate::<TxDescriptor>(env, "transmit", size)?;

        // Every slot starts out software-owned, and RS makes the device report completion through DD.
        // Descriptors are written whole, whatever the page held before.
        for n in 0..size {
            memory.descriptors.index(n).write_volatile(TxDescriptor {
                cmd: TxCommand::RS.bits(),
                status: TxStatus::DD.bits(),
                ..TxDescriptor::default()
            });
        }

        let ring_phys_addr = memory.descriptors_phys_addr;
        regs::write(regs, regs::TDBAH, (ring_phys_addr >> 32) as u32);
        regs::write(regs, regs::TDBAL, ring_phys_addr as u32);
        regs::write(regs, regs::TDLEN, (size * DESCRIPTOR_SIZE) as u32);
        regs::clear(regs, regs::TDH);
        regs::clear(regs, regs::TDT);

        regs::set_field(regs, regs::TCTL, regs::TCTL_::EN);
        regs::set_field(regs, regs::TCTL, regs::TCTL_::PSP);
        regs::write_field(regs, regs::TCTL, regs::TCTL_::CT, 0x10);
        // full duplex
        regs::write_field(regs, regs::TCTL, regs::TCTL_::COLD, 0x40);

        regs::clear(regs, regs::TIPG);
        regs::write_field(regs, regs::TIPG, regs::TIPG_::IPGT, 10);
        regs::write_field(regs, regs::TIPG, regs::TIPG_::IPGR1, 4);
        regs::write_field(regs, regs::TIPG, regs::TIPG_::IPGR2, 6);

        debug!(size, phys = format_args!("{ring_phys_addr:#x}"), "transmit ring programmed");

        Ok(TransmitRing {
            descriptors: memory.descriptors,
            buffers: memory.buffers,
            dropped: 0,
        })
    }

    /// Queues one frame for transmission. Never blocks: if the tail slot is still owned by the
    /// device the ring is full and the frame is dropped.
    ///
    /// Panics if `packet` is empty or longer than [`MAX_PACKET_SIZE`].
    pub fn submit(&mut self, regs: &impl RegisterWindow, packet: &[u8]) {
        if packet.len() > MAX_PACKET_SIZE {
            panic!("Packet of {} bytes is bigger than the maximum of {}", packet.len(), MAX_PACKET_SIZE);
        }
        if packet.is_empty() {
            panic!("Empty packet passed for transmission");
        }

        let tail = RingIndex::new(regs::read(regs, regs::TDT), self.size());
        let descriptor = self.descriptors.index(tail.slot());
        if !descriptor.read_volatile().is_software_owned() {
            self.dropped += 1;
            warn!(slot = tail.value(), dropped = self.dropped, "transmit ring is full, packet dropped");
            return;
        }

        let cmd = descriptor.read_volatile_part(|d| &d.cmd);
        descriptor.write_volatile_part(cmd | TxCommand::EOP.bits(), |d| &mut d.cmd);
        let status = descriptor.read_volatile_part(|d| &d.status);
        descriptor.write_volatile_part(status & !TxStatus::DD.bits(), |d| &mut d.status);

        let buffer = &mut self.buffers[tail.slot()];
        buffer.fill(packet);
        descriptor.write_volatile_part(u64::to_le(buffer.phys_addr()), |d| &mut d.addr);
        descriptor.write_volatile_part(u16::to_le(packet.len() as u16), |d| &mut d.length);

        // the descriptor and buffer must be visible before the device sees the new tail
        fence(Ordering::SeqCst);
        regs::write(regs, regs::TDT, tail.next().value());
        debug!(slot = tail.value(), length = packet.len(), "packet queued for transmission");
    }

    pub fn size(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of packets dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn descriptor(&self, slot: usize) -> TxDescriptor {
        self.descriptors.index(slot).read_volatile()
    }

    pub fn buffer(&self, slot: usize) -> &[u8] {
        self.buffers[slot].as_slice()
    }
}
