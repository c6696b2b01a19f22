use std::mem::size_of;
use std::sync::Arc;

use crate::env::PAGE_SIZE;

pub const PACKET_DATA_SIZE: usize = PAGE_SIZE - size_of::<u32>();

/// The page exchanged with the network stack: a length followed by the raw frame.
#[repr(C, align(4096))]
pub struct PacketPage {
    len: u32,
    data: [u8; PACKET_DATA_SIZE],
}

const _: () = assert!(size_of::<PacketPage>() == PAGE_SIZE);

impl PacketPage {
    pub fn new() -> PacketPage {
        PacketPage { len: 0, data: [0; PACKET_DATA_SIZE] }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_len(&mut self, len: usize) {
        if len > PACKET_DATA_SIZE {
            panic!("Length {} does not fit in a packet page", len);
        }
        self.len = len as u32;
    }

    /// The whole data area, for filling in place.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The frame, as far as the length field describes one. A length past the page is clamped to
    /// the page so the consumer can still judge it.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len().min(PACKET_DATA_SIZE)]
    }

    pub fn write_packet(&mut self, packet: &[u8]) {
        self.set_len(packet.len());
        self.data[..packet.len()].copy_from_slice(packet);
    }
}

impl Default for PacketPage {
    fn default() -> PacketPage {
        PacketPage::new()
    }
}

/// Request tags understood by the network stack's packet mailboxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Request {
    /// Deliver an inbound packet to the network stack.
    Input = 10,
    /// Transmit an outbound packet.
    Output = 11,
}

impl TryFrom<u32> for Request {
    type Error = u32;

    fn try_from(tag: u32) -> Result<Request, u32> {
        match tag {
            10 => Ok(Request::Input),
            11 => Ok(Request::Output),
            other => Err(other),
        }
    }
}

impl From<Request> for u32 {
    fn from(request: Request) -> u32 {
        request as u32
    }
}

/// One mailbox message. The tag stays raw so a receiver can reject tags it does not know.
pub struct Message {
    pub tag: u32,
    /// Shared with the receiver, which only reads it.
    pub page: Arc<PacketPage>,
}

impl Message {
    pub fn new(request: Request, page: Arc<PacketPage>) -> Message {
        Message { tag: request.into(), page }
    }

    pub fn request(&self) -> Result<Request, u32> {
        Request::try_from(self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_and_unknown_tags_are_kept() {
        assert_eq!(Request::try_from(10), Ok(Request::Input));
        assert_eq!(Request::try_from(11), Ok(Request::Output));
        assert_eq!(Request::try_from(7), Err(7));
        assert_eq!(u32::from(Request::Output), 11);
    }

    #[test]
    fn payload_follows_the_length_field() {
        let mut page = Box::new(PacketPage::new());
        assert!(page.is_empty());
        assert!(page.payload().is_empty());
        page.write_packet(&[1, 2, 3]);
        assert!(!page.is_empty());
        assert_eq!(page.len(), 3);
        assert_eq!(page.payload(), &[1, 2, 3]);
    }

    #[test]
    fn oversized_length_is_clamped_to_the_page() {
        let mut page = Box::new(PacketPage::new());
        page.len = u32::MAX;
        assert_eq!(page.payload().len(), PACKET_DATA_SIZE);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn length_past_the_page_is_rejected() {
        Box::new(PacketPage::new()).set_len(PACKET_DATA_SIZE + 1);
    }
}
