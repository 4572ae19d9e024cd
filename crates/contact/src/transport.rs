use strum::{AsRefStr, Display};

use crate::{Credentials, OutboundMessage};

/// Step of the delivery at which a submission failed.
#[derive(Display, AsRefStr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStage {
    Compose,
    Connect,
    Authenticate,
    Send,
}

/// Failure talking to the outbound mail server.
///
/// Carries operator diagnostics and must not be shown to visitors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to compose message: {0}")]
    Compose(String),

    #[error("failed to connect to mail server: {0}")]
    Connect(String),

    #[error("mail server rejected credentials: {0}")]
    Authenticate(String),

    #[error("failed to send message: {0}")]
    Send(String),
}

impl DeliveryError {
    pub fn stage(&self) -> DeliveryStage {
        match self {
            DeliveryError::Compose(_) => DeliveryStage::Compose,
            DeliveryError::Connect(_) => DeliveryStage::Connect,
            DeliveryError::Authenticate(_) => DeliveryStage::Authenticate,
            DeliveryError::Send(_) => DeliveryStage::Send,
        }
    }
}

impl From<askama::Error> for DeliveryError {
    fn from(value: askama::Error) -> Self {
        Self::Compose(value.to_string())
    }
}

/// Opens connections to the outbound mail server.
pub trait MailTransport: Send + Sync {
    /// Checks that `message` can be encoded for the wire.
    ///
    /// Runs before any connection is opened, so a message that could never be
    /// sent fails at [`DeliveryStage::Compose`] without touching the server.
    fn verify(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;

    fn open(&self) -> Result<Box<dyn MailSession>, DeliveryError>;
}

/// One open connection to the mail server.
///
/// Calls block on network I/O.
pub trait MailSession: Send {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<(), DeliveryError>;

    fn send(&mut self, message: &OutboundMessage) -> Result<(), DeliveryError>;

    /// Ends the session. Must tolerate being called more than once.
    fn close(&mut self);
}

/// Owns an open session and closes it when dropped, including during unwinding.
pub(crate) struct SessionGuard {
    session: Box<dyn MailSession>,
    closed: bool,
}

impl SessionGuard {
    pub(crate) fn new(session: Box<dyn MailSession>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub(crate) fn authenticate(&mut self, credentials: &Credentials) -> Result<(), DeliveryError> {
        self.session.authenticate(credentials)
    }

    pub(crate) fn send(&mut self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        self.session.send(message)
    }

    pub(crate) fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.session.close();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
