//! In-memory transport for exercising the workflow without a mail server.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    Credentials, DeliveryError, DeliveryStage, MailSession, MailTransport, OutboundMessage,
};

#[derive(Default, Debug)]
pub struct Recorded {
    pub opened: usize,
    pub closed: usize,
    pub authenticated: Vec<Credentials>,
    pub sent: Vec<OutboundMessage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    Fail(DeliveryStage),
    Panic(DeliveryStage),
}

/// Records every session it hands out; can be told to fail at one stage.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    fault: Option<Fault>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: DeliveryStage) -> Self {
        Self {
            fault: Some(Fault::Fail(stage)),
            ..Self::default()
        }
    }

    pub fn panicking_at(stage: DeliveryStage) -> Self {
        Self {
            fault: Some(Fault::Panic(stage)),
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        lock(&self.recorded)
    }

    pub fn opened(&self) -> usize {
        self.recorded().opened
    }

    pub fn closed(&self) -> usize {
        self.recorded().closed
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.recorded().sent.clone()
    }

    /// Fails the step with the message a real server might give.
    fn check(fault: Option<Fault>, stage: DeliveryStage) -> Result<(), DeliveryError> {
        match fault {
            Some(Fault::Panic(at)) if at == stage => panic!("transport fault during {stage}"),
            Some(Fault::Fail(at)) if at == stage => Err(match stage {
                DeliveryStage::Compose => {
                    DeliveryError::Compose("Invalid email user".to_owned())
                }
                DeliveryStage::Connect => {
                    DeliveryError::Connect("Connection refused (os error 111)".to_owned())
                }
                DeliveryStage::Authenticate => DeliveryError::Authenticate(
                    "535 5.7.8 Authentication credentials invalid".to_owned(),
                ),
                DeliveryStage::Send => {
                    DeliveryError::Send("554 5.7.1 Message rejected".to_owned())
                }
            }),
            _ => Ok(()),
        }
    }
}

fn lock(recorded: &Mutex<Recorded>) -> MutexGuard<'_, Recorded> {
    recorded.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MailTransport for RecordingTransport {
    fn verify(&self, _message: &OutboundMessage) -> Result<(), DeliveryError> {
        Self::check(self.fault, DeliveryStage::Compose)
    }

    fn open(&self) -> Result<Box<dyn MailSession>, DeliveryError> {
        Self::check(self.fault, DeliveryStage::Connect)?;
        lock(&self.recorded).opened += 1;

        Ok(Box::new(RecordingSession {
            recorded: self.recorded.clone(),
            fault: self.fault,
            closed: false,
        }))
    }
}

struct RecordingSession {
    recorded: Arc<Mutex<Recorded>>,
    fault: Option<Fault>,
    closed: bool,
}

impl MailSession for RecordingSession {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<(), DeliveryError> {
        RecordingTransport::check(self.fault, DeliveryStage::Authenticate)?;
        lock(&self.recorded).authenticated.push(credentials.clone());

        Ok(())
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        RecordingTransport::check(self.fault, DeliveryStage::Send)?;
        lock(&self.recorded).sent.push(message.clone());

        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.recorded).closed += 1;
        }
    }
}
