pub(super) mod device_limits;
pub(super) mod pci_regs;
pub(super) mod regs;

pub mod descriptor;
pub mod device;
pub mod driver_constants;
mod ring;
pub mod receive;
pub mod transmit;

pub use descriptor::{RingIndex, RxDescriptor, RxStatus, TxCommand, TxDescriptor, TxStatus};
pub use device::{Device, InitError, MacAddress, Receiver, Transmitter};
pub use driver_constants::MAX_PACKET_SIZE;
pub use receive::ReceiveRing;
pub use ring::RingError;
pub use transmit::TransmitRing;
