use crate::e1000::driver_constants::{DEFAULT_RX_RING_SIZE, DEFAULT_TX_RING_SIZE, EXPECTED_STATUS};

pub const DEFAULT_MESSAGE_PAGES: usize = 10;

/// Settings fixed at attach time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub tx_ring_size: usize,
    pub rx_ring_size: usize,
    /// Pages the ingress loop rotates through when handing packets to the network stack.
    pub message_pages: usize,
    /// STATUS value the device must report before we trust the register window; `None` skips the check.
    pub expected_status: Option<u32>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            tx_ring_size: DEFAULT_TX_RING_SIZE,
            rx_ring_size: DEFAULT_RX_RING_SIZE,
            message_pages: DEFAULT_MESSAGE_PAGES,
            expected_status: Some(EXPECTED_STATUS),
        }
    }
}
