pub const MULTICAST_TABLE_ARRAY_SIZE: usize = 128;

pub const MAC_ADDRESS_WORDS: usize = 3;

pub const DESCRIPTOR_SIZE: usize = 16;

// BAR0 of the 82540EM
pub const REGISTER_WINDOW_SIZE: usize = 128 * 1024;
