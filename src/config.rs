use std::{env, time::Duration};

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use postbox_contact::{Credentials, Mailbox, SiteMail};
use serde::Deserialize;
use validator::ValidateEmail;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    pub email: EmailCredentials,
}

/// Mailbox and login for the outbound mail account.
#[derive(Deserialize, Clone)]
pub struct EmailCredentials {
    /// Site mailbox: used as the sender and as the SMTP username.
    pub user: String,
    /// Owner mailbox that receives contact messages.
    pub recipient: String,
    /// SMTP host.
    pub client: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for EmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailCredentials")
            .field("user", &self.user)
            .field("recipient", &self.recipient)
            .field("client", &self.client)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS (port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (port 465).
    Wrapper,
    /// No encryption, for local catch-all servers like MailDev.
    None,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_hello_name")]
    pub hello_name: String,
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            port: default_smtp_port(),
            tls: TlsMode::default(),
            timeout_secs: default_smtp_timeout_secs(),
            hello_name: default_hello_name(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

fn default_hello_name() -> String {
    "localhost".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_recipient_name")]
    pub recipient_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            sender_name: default_sender_name(),
            recipient_name: default_recipient_name(),
        }
    }
}

fn default_site_name() -> String {
    "postbox".to_string()
}

fn default_sender_name() -> String {
    "Website contact form".to_string()
}

fn default_recipient_name() -> String {
    "Site owner".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (POSTBOX__CREDENTIALS__EMAIL__PASSWORD, etc.)
    /// 2. Config file specified by path
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?;

        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        // Optional: a deployment may configure everything through the environment
        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("POSTBOX")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(password) = env::var("SMTP_PASSWORD") {
            builder = builder.set_override("credentials.email.password", password)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let email = &self.credentials.email;

        if !email.user.validate_email() {
            return Err(format!("credentials.email.user is not an email address: {}", email.user));
        }
        if !email.recipient.validate_email() {
            return Err(format!(
                "credentials.email.recipient is not an email address: {}",
                email.recipient
            ));
        }
        if email.client.trim().is_empty() {
            return Err("credentials.email.client (SMTP host) must be set".to_string());
        }
        if self.smtp.port == 0 {
            return Err("SMTP port must be greater than 0".to_string());
        }
        if self.smtp.timeout_secs == 0 {
            return Err("SMTP timeout must be at least 1 second".to_string());
        }
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Sender, recipient and login for the contact workflow
    pub fn site_mail(&self) -> SiteMail {
        let email = &self.credentials.email;

        SiteMail {
            sender: Mailbox::new(&self.site.sender_name, &email.user),
            recipient: Mailbox::new(&self.site.recipient_name, &email.recipient),
            credentials: Credentials::new(&email.user, &email.password),
        }
    }
}
