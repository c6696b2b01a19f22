use crate::env::PAGE_SIZE;

use super::device_limits;

/// Largest Ethernet frame we move, header included and CRC excluded.
pub const MAX_PACKET_SIZE: usize = 1518;

pub const DEFAULT_TX_RING_SIZE: usize = 16;
pub const MAX_TX_RING_SIZE: usize = 64;

pub const DEFAULT_RX_RING_SIZE: usize = 128;
pub const MIN_RX_RING_SIZE: usize = 128;
// the descriptor array must fit in the single page allocated for it
pub const MAX_RX_RING_SIZE: usize = PAGE_SIZE / device_limits::DESCRIPTOR_SIZE;

pub const RING_SIZE_MULTIPLE: usize = 8;

/// STATUS as reported by QEMU's 82540EM once the link is up.
pub const EXPECTED_STATUS: u32 = 0x8008_0783;

pub const EEPROM_SPIN_LIMIT: u32 = 1_000_000;
