//! Test helpers: configuration, app construction and a scripted SMTP server

#![allow(dead_code)]

use std::{
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use axum::Router;
use postbox::config::{
    Config, CredentialsConfig, EmailCredentials, LoggingConfig, ServerConfig, SiteConfig,
    SmtpConfig, TlsMode,
};
use postbox_contact::testing::RecordingTransport;

/// Create a test configuration
///
/// Points at an SMTP host that is never contacted unless a test swaps in
/// [`FakeSmtpServer`].
pub fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
        },
        credentials: CredentialsConfig {
            email: EmailCredentials {
                user: "website@example.com".to_string(),
                recipient: "owner@example.com".to_string(),
                client: "127.0.0.1".to_string(),
                password: "test-password".to_string(),
            },
        },
        smtp: SmtpConfig {
            port: 2525,
            tls: TlsMode::None,
            timeout_secs: 5,
            hello_name: "localhost".to_string(),
        },
        site: SiteConfig {
            name: "Test site".to_string(),
            sender_name: "Website contact form".to_string(),
            recipient_name: "Site owner".to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Router wired to an in-memory transport
pub fn create_test_app(transport: &RecordingTransport) -> Router {
    postbox::create_app(create_test_config(), Arc::new(transport.clone()))
}

/// Form-encoded body for a POST /contact request
pub fn form_body(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).unwrap()
}

pub fn alice_form() -> String {
    form_body(&[
        ("name", "Alice"),
        ("email", "alice@example.com"),
        ("subject", "Hi"),
        ("message", "Hello"),
    ])
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AuthReply {
    Accept,
    Reject,
}

/// Everything a client sent during one SMTP conversation
#[derive(Default, Debug)]
pub struct Transcript {
    pub commands: Vec<String>,
    pub data: Vec<String>,
}

impl Transcript {
    pub fn has_command(&self, prefix: &str) -> bool {
        self.commands.iter().any(|c| c.starts_with(prefix))
    }

    /// Value of a top-level header; the body is not searched
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}: ");
        self.data
            .iter()
            .take_while(|line| !line.is_empty())
            .find_map(|line| line.strip_prefix(&prefix))
    }
}

/// Single-connection SMTP server speaking just enough ESMTP for lettre
pub struct FakeSmtpServer {
    pub port: u16,
    handle: JoinHandle<Transcript>,
}

impl FakeSmtpServer {
    pub fn start(auth: AuthReply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut transcript = Transcript::default();

            writer.write_all(b"220 fake.smtp ESMTP ready\r\n").unwrap();

            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let command = line.trim_end().to_string();
                let upper = command.to_ascii_uppercase();
                transcript.commands.push(command);

                let reply: &[u8] = if upper.starts_with("EHLO") {
                    b"250-fake.smtp\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n"
                } else if upper.starts_with("AUTH") {
                    match auth {
                        AuthReply::Accept => b"235 2.7.0 Authentication successful\r\n",
                        AuthReply::Reject => b"535 5.7.8 Authentication credentials invalid\r\n",
                    }
                } else if upper.starts_with("MAIL FROM") || upper.starts_with("RCPT TO") {
                    b"250 2.1.0 OK\r\n"
                } else if upper == "DATA" {
                    writer
                        .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                        .unwrap();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == ".\r\n" {
                            break;
                        }
                        transcript.data.push(line.trim_end().to_string());
                    }
                    b"250 2.0.0 Queued\r\n"
                } else if upper == "QUIT" {
                    writer.write_all(b"221 2.0.0 Bye\r\n").unwrap();
                    break;
                } else {
                    b"502 5.5.2 Command not recognized\r\n"
                };

                writer.write_all(reply).unwrap();
            }

            transcript
        });

        Self { port, handle }
    }

    /// Config that sends through this server
    pub fn config(&self) -> Config {
        let mut config = create_test_config();
        config.smtp.port = self.port;
        config
    }

    /// Waits for the client to hang up and returns what it sent
    pub fn finish(self) -> Transcript {
        self.handle.join().unwrap()
    }
}
