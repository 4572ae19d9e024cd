use std::sync::Arc;

use tracing::{error, info};

use crate::transport::SessionGuard;
use crate::{
    ContactSubmission, DeliveryError, DeliveryStage, FieldErrors, MailTransport, OutboundMessage,
    SiteMail, validate_submission,
};

/// Only text shown to a visitor when delivery fails.
pub const DELIVERY_FAILED_MESSAGE: &str =
    "There was an error processing your request. Please try again later.";

/// Outcome of one contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    Confirmed {
        input: ContactSubmission,
    },
    ValidationFailed {
        errors: FieldErrors,
        input: ContactSubmission,
    },
    DeliveryFailed {
        stage: DeliveryStage,
        input: ContactSubmission,
    },
}

impl SubmitResult {
    pub fn input(&self) -> &ContactSubmission {
        match self {
            SubmitResult::Confirmed { input }
            | SubmitResult::ValidationFailed { input, .. }
            | SubmitResult::DeliveryFailed { input, .. } => input,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmitResult::Confirmed { .. })
    }
}

/// Validates a submission and forwards it to the site owner.
#[derive(Clone)]
pub struct ContactWorkflow {
    transport: Arc<dyn MailTransport>,
    site: SiteMail,
}

impl ContactWorkflow {
    pub fn new(transport: Arc<dyn MailTransport>, site: SiteMail) -> Self {
        Self { transport, site }
    }

    pub fn site(&self) -> &SiteMail {
        &self.site
    }

    /// Runs validate, compose, connect, authenticate and send.
    ///
    /// Blocks on the mail server; call from a blocking-capable thread.
    pub fn submit(&self, input: ContactSubmission) -> SubmitResult {
        if let Err(errors) = validate_submission(&input) {
            info!(fields = ?errors.fields(), "Contact form rejected by validation");

            return SubmitResult::ValidationFailed { errors, input };
        }

        match self.deliver(&input) {
            Ok(()) => {
                info!(subject = %input.subject.trim(), "Contact message delivered");

                SubmitResult::Confirmed { input }
            }
            Err(err) => {
                let stage = err.stage();
                error!(error = %err, %stage, "Failed to deliver contact message");

                SubmitResult::DeliveryFailed { stage, input }
            }
        }
    }

    fn deliver(&self, input: &ContactSubmission) -> Result<(), DeliveryError> {
        let message = OutboundMessage::compose(input, &self.site)?;
        self.transport.verify(&message)?;

        let mut session = SessionGuard::new(self.transport.open()?);
        session.authenticate(&self.site.credentials)?;
        session.send(&message)?;
        session.close();

        Ok(())
    }
}
