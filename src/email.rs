//! Outbound SMTP transport using lettre

use std::time::Duration;

use lettre::Message;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox as LettreMailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials as SmtpCredentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use postbox_contact::{
    Credentials, DeliveryError, MailSession, MailTransport, Mailbox, OutboundMessage, Priority,
};
use tracing::{debug, warn};

use crate::config::{Config, TlsMode};

/// `Priority:` header (RFC 2156)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PriorityHeader(Priority);

impl Header for PriorityHeader {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().parse()?))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.to_string())
    }
}

/// `X-Priority:` header, read by clients that ignore `Priority:`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct XPriorityHeader(Priority);

impl Header for XPriorityHeader {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let priority = match s.trim().chars().next() {
            Some('1') | Some('2') => Priority::Urgent,
            Some('4') | Some('5') => Priority::NonUrgent,
            _ => Priority::Normal,
        };

        Ok(Self(priority))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.x_priority().to_string())
    }
}

fn mailbox(mailbox: &Mailbox) -> Result<LettreMailbox, DeliveryError> {
    let address = mailbox.address.parse().map_err(|e| {
        DeliveryError::Compose(format!("invalid address {:?}: {e}", mailbox.address))
    })?;
    let name = (!mailbox.name.is_empty()).then(|| mailbox.name.clone());

    Ok(LettreMailbox::new(name, address))
}

/// Converts an outbound message into a multipart (text + HTML) email
pub fn build_message(message: &OutboundMessage) -> Result<Message, DeliveryError> {
    Message::builder()
        .from(mailbox(&message.from)?)
        .to(mailbox(&message.to)?)
        .reply_to(mailbox(&message.reply_to)?)
        .subject(message.subject.as_str())
        .header(PriorityHeader(message.priority))
        .header(XPriorityHeader(message.priority))
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html_body.clone()),
                ),
        )
        .map_err(|e| DeliveryError::Compose(format!("failed to build email: {e}")))
}

/// Opens one SMTP connection per submission
#[derive(Clone, Debug)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    tls: TlsMode,
    timeout: Duration,
    hello_name: ClientId,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.credentials.email.client.clone(),
            port: config.smtp.port,
            tls: config.smtp.tls,
            timeout: config.smtp.timeout(),
            hello_name: ClientId::Domain(config.smtp.hello_name.clone()),
        }
    }

    fn tls_parameters(&self) -> Result<TlsParameters, DeliveryError> {
        TlsParameters::new(self.host.clone())
            .map_err(|e| DeliveryError::Connect(format!("invalid TLS parameters: {e}")))
    }

    fn connect(&self, tls: Option<&TlsParameters>) -> Result<SmtpConnection, DeliveryError> {
        SmtpConnection::connect(
            (self.host.as_str(), self.port),
            Some(self.timeout),
            &self.hello_name,
            tls,
            None,
        )
        .map_err(|e| DeliveryError::Connect(e.to_string()))
    }
}

impl MailTransport for SmtpMailer {
    fn verify(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        build_message(message).map(|_| ())
    }

    fn open(&self) -> Result<Box<dyn MailSession>, DeliveryError> {
        let connection = match self.tls {
            TlsMode::Wrapper => self.connect(Some(&self.tls_parameters()?))?,
            TlsMode::None => self.connect(None)?,
            TlsMode::Starttls => {
                let parameters = self.tls_parameters()?;
                let mut connection = self.connect(None)?;

                if !connection.can_starttls() {
                    connection.abort();
                    return Err(DeliveryError::Connect(format!(
                        "{} does not offer STARTTLS",
                        self.host
                    )));
                }

                if let Err(err) = connection.starttls(&parameters, &self.hello_name) {
                    connection.abort();
                    return Err(DeliveryError::Connect(err.to_string()));
                }

                connection
            }
        };

        debug!(host = %self.host, port = self.port, tls = ?self.tls, "SMTP session opened");

        Ok(Box::new(SmtpSession {
            connection,
            closed: false,
        }))
    }
}

struct SmtpSession {
    connection: SmtpConnection,
    closed: bool,
}

impl MailSession for SmtpSession {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<(), DeliveryError> {
        // Local catch-all servers (MailDev, Mailpit) accept mail without AUTH
        if !credentials.is_configured() {
            debug!("SMTP credentials not configured, skipping AUTH");
            return Ok(());
        }

        let credentials =
            SmtpCredentials::new(credentials.username.clone(), credentials.password.clone());

        self.connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .map_err(|e| DeliveryError::Authenticate(e.to_string()))?;

        Ok(())
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let email = build_message(message)?;

        self.connection
            .send(email.envelope(), &email.formatted())
            .map_err(|e| DeliveryError::Send(e.to_string()))?;

        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(err) = self.connection.quit() {
            warn!(error = %err, "SMTP QUIT failed, dropping connection");
            self.connection.abort();
        }
    }
}
