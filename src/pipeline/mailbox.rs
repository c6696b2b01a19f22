use std::sync::mpsc;

use thiserror::Error;

use super::message::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailboxError {
    #[error("the other end of the mailbox has gone away")]
    Disconnected,
}

/// Sends one page-sized message to another process.
pub trait MessageSink {
    fn send(&self, message: Message) -> Result<(), MailboxError>;
}

/// Receives the next message, waiting as long as it takes.
pub trait MessageSource {
    fn recv(&self) -> Result<Message, MailboxError>;
}

#[derive(Clone)]
pub struct MailboxSender(mpsc::Sender<Message>);

pub struct MailboxReceiver(mpsc::Receiver<Message>);

/// A one-way mailbox between two loops of this process.
pub fn mailbox() -> (MailboxSender, MailboxReceiver) {
    let (sender, receiver) = mpsc::channel();
    (MailboxSender(sender), MailboxReceiver(receiver))
}

impl MessageSink for MailboxSender {
    fn send(&self, message: Message) -> Result<(), MailboxError> {
        self.0.send(message).map_err(|_| MailboxError::Disconnected)
    }
}

impl MessageSource for MailboxReceiver {
    fn recv(&self) -> Result<Message, MailboxError> {
        self.0.recv().map_err(|_| MailboxError::Disconnected)
    }
}

impl MailboxReceiver {
    /// Returns a message if one is already waiting.
    pub fn try_recv(&self) -> Option<Message> {
        self.0.try_recv().ok()
    }
}
