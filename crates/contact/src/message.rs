use std::fmt;

use askama::Template;
use strum::{AsRefStr, Display, EnumString};

use crate::ContactSubmission;

/// A display name and address pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mailbox {
    pub name: String,
    pub address: String,
}

impl Mailbox {
    /// Control characters in `name` become spaces so it fits in one header line.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: single_line(&name.into()),
            address: address.into(),
        }
    }
}

fn single_line(value: &str) -> String {
    value.replace(char::is_control, " ")
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return f.write_str(&self.address);
        }

        write!(f, "{} <{}>", self.name, self.address)
    }
}

#[derive(Display, AsRefStr, EnumString, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum Priority {
    NonUrgent,
    #[default]
    Normal,
    Urgent,
}

impl Priority {
    /// Numeric `X-Priority` value understood by most mail clients.
    pub fn x_priority(&self) -> u8 {
        match self {
            Priority::NonUrgent => 5,
            Priority::Normal => 3,
            Priority::Urgent => 1,
        }
    }
}

/// Login used to authenticate against the outbound mail server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both a username and a password are present.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Site-owned mail settings. Nothing here ever comes from a visitor.
#[derive(Clone, Debug)]
pub struct SiteMail {
    pub sender: Mailbox,
    pub recipient: Mailbox,
    pub credentials: Credentials,
}

/// Email forwarded to the site owner for one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: Mailbox,
    pub to: Mailbox,
    pub reply_to: Mailbox,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub priority: Priority,
}

#[derive(Template)]
#[template(path = "emails/contact.html")]
struct ContactHtmlTemplate<'a> {
    submission: &'a ContactSubmission,
}

#[derive(Template)]
#[template(path = "emails/contact.txt")]
struct ContactTextTemplate<'a> {
    submission: &'a ContactSubmission,
}

impl OutboundMessage {
    /// Builds the owner notification for a validated submission.
    ///
    /// Sender and recipient always come from `site`; the visitor only
    /// supplies the reply-to address and the content.
    pub fn compose(
        submission: &ContactSubmission,
        site: &SiteMail,
    ) -> Result<Self, askama::Error> {
        let html_body = ContactHtmlTemplate { submission }.render()?;
        let text_body = ContactTextTemplate { submission }.render()?;

        Ok(Self {
            from: site.sender.clone(),
            to: site.recipient.clone(),
            reply_to: Mailbox::new(submission.name.trim(), submission.email.trim()),
            subject: single_line(submission.subject.trim()),
            html_body,
            text_body,
            priority: Priority::Urgent,
        })
    }
}
