//! A polling driver for the Intel 82540EM (e1000) and the loops that move its frames to and from
//! a network stack running elsewhere.

// Enable non-default lints
#![warn(future_incompatible)]
#![warn(nonstandard_style)]
#![warn(rust_2018_idioms)]
#![warn(unused)]

pub mod config;
pub mod e1000;
pub mod env;
pub mod lifed;
pub mod mmio;
pub mod pci;
pub mod pipeline;

pub use config::Config;
pub use e1000::{Device, MacAddress, MAX_PACKET_SIZE};
pub use env::{EnvError, Environment, LinuxEnvironment, Page, PAGE_SIZE};
pub use mmio::{MmioWindow, RegisterWindow};
pub use pci::PciAddress;
