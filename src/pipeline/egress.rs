use std::convert::Infallible;

use tracing::debug;

use crate::e1000::Transmitter;
use crate::mmio::RegisterWindow;

use super::mailbox::MessageSource;
use super::message::Request;
use super::PipelineError;

/// Feeds outbound packets from the network stack into the transmit ring.
pub struct Egress<'d, R, S> {
    transmitter: Transmitter<'d, R>,
    source: S,
}

impl<'d, R: RegisterWindow, S: MessageSource> Egress<'d, R, S> {
    pub fn new(transmitter: Transmitter<'d, R>, source: S) -> Egress<'d, R, S> {
        Egress { transmitter, source }
    }

    /// Waits for one message and transmits its packet, returning the packet length.
    ///
    /// Anything but [`Request::Output`] is a protocol violation.
    pub fn serve_one(&mut self) -> Result<usize, PipelineError> {
        let message = self.source.recv()?;
        match message.request() {
            Ok(Request::Output) => {
                let packet = message.page.payload();
                self.transmitter.transmit(packet);
                debug!(length = packet.len(), "outbound packet submitted");
                Ok(packet.len())
            }
            _ => Err(PipelineError::UnexpectedRequest(message.tag)),
        }
    }

    /// Serves messages forever; a protocol violation or a closed mailbox ends the loop.
    pub fn run(&mut self) -> Result<Infallible, PipelineError> {
        loop {
            self.serve_one()?;
        }
    }
}
