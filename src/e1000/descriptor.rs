//! Legacy 16-byte descriptors shared with the device, and the cursor type used to walk rings.

use std::mem::size_of;

use bitflags::bitflags;

use super::device_limits::DESCRIPTOR_SIZE;

// Transmit descriptor
// 63            48 47   40 39   32 31   24 23   16 15             0
// +---------------------------------------------------------------+
// |                         Buffer address                        |
// +---------------+-------+-------+-------+-------+---------------+
// |    Special    |  CSS  | Status|  Cmd  |  CSO  |    Length     |
// +---------------+-------+-------+-------+-------+---------------+
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxDescriptor {
    /// Physical address of the slot's buffer. Only the device dereferences it.
    pub addr: u64,
    pub length: u16,
    pub cso: u8,
    pub cmd: u8,
    pub status: u8,
    pub css: u8,
    pub special: u16,
}

// Receive descriptor
// 63            48 47   40 39   32 31           16 15             0
// +---------------------------------------------------------------+
// |                         Buffer address                        |
// +---------------+-------+-------+---------------+---------------+
// |    Special    | Errors| Status|  Pkt Checksum |    Length     |
// +---------------+-------+-------+---------------+---------------+
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RxDescriptor {
    /// Physical address of the slot's buffer. Only the device dereferences it.
    pub addr: u64,
    /// Written by the device.
    pub length: u16,
    pub checksum: u16,
    pub status: u8,
    pub errors: u8,
    pub special: u16,
}

const _: () = assert!(size_of::<TxDescriptor>() == DESCRIPTOR_SIZE);
const _: () = assert!(size_of::<RxDescriptor>() == DESCRIPTOR_SIZE);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCommand: u8 {
        /// End of packet, frames never span slots here.
        const EOP = 0x01;
        /// Report status, makes the device write DD back.
        const RS = 0x08;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxStatus: u8 {
        /// Descriptor done; set means the slot belongs to software.
        const DD = 0x01;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxStatus: u8 {
        const DD = 0x01;
        const EOP = 0x02;
    }
}

impl TxDescriptor {
    pub fn is_software_owned(&self) -> bool {
        TxStatus::from_bits_retain(self.status).contains(TxStatus::DD)
    }
}

impl RxDescriptor {
    /// A slot holds a completed packet (or is the parking slot) exactly when DD and EOP are both set.
    pub fn is_software_owned(&self) -> bool {
        RxStatus::from_bits_retain(self.status).contains(RxStatus::DD | RxStatus::EOP)
    }
}

/// A position in a ring of `size` slots; every step wraps modulo the ring size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingIndex {
    value: u32,
    size: u32,
}

impl RingIndex {
    /// Wraps a cursor read back from a head/tail register. A value past the end of the ring
    /// means the device and the driver disagree about the ring, which is not recoverable.
    pub fn new(value: u32, size: usize) -> RingIndex {
        let size = size as u32;
        if value >= size {
            panic!("Ring cursor {} is outside a ring of {} slots", value, size);
        }
        RingIndex { value, size }
    }

    pub fn last(size: usize) -> RingIndex {
        RingIndex::new(size as u32 - 1, size)
    }

    #[inline(always)]
    pub fn next(self) -> RingIndex {
        RingIndex {
            value: (self.value + 1) % self.size,
            size: self.size,
        }
    }

    #[inline(always)]
    pub fn value(self) -> u32 {
        self.value
    }

    #[inline(always)]
    pub fn slot(self) -> usize {
        self.value as usize
    }
}
