//! Moves frames between the device rings and the network-stack process.
//!
//! Two loops run independently, each the only user of one ring: [`Ingress`] drains the receive
//! ring into [`Request::Input`] messages, [`Egress`] turns [`Request::Output`] messages into
//! transmissions. They talk to the network stack only through page-sized [`Message`]s.

use thiserror::Error;

mod egress;
mod ingress;
mod mailbox;
mod message;

pub use egress::Egress;
pub use ingress::Ingress;
pub use mailbox::{mailbox, MailboxError, MailboxReceiver, MailboxSender, MessageSink, MessageSource};
pub use message::{Message, PacketPage, Request, PACKET_DATA_SIZE};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Mailbox(#[from] MailboxError),
    #[error("unexpected request {0} on this mailbox")]
    UnexpectedRequest(u32),
}
