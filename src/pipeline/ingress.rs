use std::convert::Infallible;
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace};

use crate::e1000::Receiver;
use crate::mmio::RegisterWindow;

use super::mailbox::MessageSink;
use super::message::{Message, PacketPage, Request};
use super::PipelineError;

/// Drains the receive ring into the network stack's mailbox.
///
/// Pages are used in rotation. A page the network stack is still reading stays shared, and we
/// never write into a shared page: until the reader lets go, the ring is left alone.
pub struct Ingress<'d, R, S> {
    receiver: Receiver<'d, R>,
    sink: S,
    pages: Vec<Arc<PacketPage>>,
    current: usize,
}

impl<'d, R: RegisterWindow, S: MessageSink> Ingress<'d, R, S> {
    pub fn new(receiver: Receiver<'d, R>, sink: S, page_count: usize) -> Ingress<'d, R, S> {
        if page_count == 0 {
            panic!("Ingress needs at least one message page");
        }
        Ingress {
            receiver,
            sink,
            pages: (0..page_count).map(|_| Arc::new(PacketPage::new())).collect(),
            current: 0,
        }
    }

    /// Forwards at most one packet and returns its length; `None` if there was nothing to do.
    pub fn poll_once(&mut self) -> Result<Option<usize>, PipelineError> {
        let Some(page) = Arc::get_mut(&mut self.pages[self.current]) else {
            trace!(page = self.current, "message page still being read");
            return Ok(None);
        };

        let Some(length) = self.receiver.receive(page.data_mut()) else {
            return Ok(None);
        };
        page.set_len(length);

        self.sink.send(Message::new(Request::Input, Arc::clone(&self.pages[self.current])))?;
        debug!(page = self.current, length, "packet handed to the network stack");
        self.current = (self.current + 1) % self.pages.len();
        Ok(Some(length))
    }

    /// Polls forever; only a mailbox failure ends the loop.
    pub fn run(&mut self) -> Result<Infallible, PipelineError> {
        loop {
            if self.poll_once()?.is_none() {
                thread::yield_now();
            }
        }
    }
}
