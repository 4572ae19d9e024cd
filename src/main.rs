use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use postbox::{Config, email::SmtpMailer};
use postbox_contact::MailTransport;

/// postbox - contact form to email relay
#[derive(Parser)]
#[command(name = "postbox")]
#[command(about = "Forwards website contact form submissions by email", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Connect and authenticate to the SMTP server without sending mail
    CheckSmtp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    postbox::observability::init_observability(
        "postbox",
        env!("CARGO_PKG_VERSION"),
        &config.logging,
    )?;

    match cli.command {
        Commands::Serve { host, port } => serve_command(config, host, port).await,
        Commands::CheckSmtp => check_smtp_command(config).await,
    }
}

#[tracing::instrument(skip(config))]
async fn serve_command(
    config: Config,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<()> {
    tracing::info!("Starting postbox server...");

    let host = host_override.unwrap_or_else(|| config.server.host.clone());
    let port = port_override.unwrap_or(config.server.port);

    let site = config.site_mail();
    tracing::info!(
        from = %site.sender,
        to = %site.recipient,
        smtp_host = %config.credentials.email.client,
        smtp_port = config.smtp.port,
        "Contact messages will be relayed"
    );

    let transport = Arc::new(SmtpMailer::new(&config));
    let app = postbox::create_app(config, transport);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[tracing::instrument(skip(config))]
async fn check_smtp_command(config: Config) -> Result<()> {
    let mailer = SmtpMailer::new(&config);
    let credentials = config.site_mail().credentials;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut session = mailer.open()?;
        let authenticated = session.authenticate(&credentials);
        session.close();
        authenticated?;

        Ok(())
    })
    .await??;

    tracing::info!(
        smtp_host = %config.credentials.email.client,
        smtp_port = config.smtp.port,
        "SMTP server accepted connection and credentials"
    );

    Ok(())
}
