mod environment;
mod linux;
mod pci;

pub use environment::{EnvError, Environment, Page, PAGE_SIZE};
pub use linux::LinuxEnvironment;
