pub mod config;
pub mod email;
pub mod observability;
pub mod routes;
pub mod template;

use std::sync::Arc;

pub use config::Config;
use postbox_contact::{ContactWorkflow, MailTransport};
pub use routes::AppState;

/// Create app router
///
/// Takes the transport as a parameter so integration tests can swap the
/// SMTP mailer for an in-memory one.
pub fn create_app(config: Config, transport: Arc<dyn MailTransport>) -> axum::Router {
    let workflow = ContactWorkflow::new(transport, config.site_mail());

    routes::router(AppState { config, workflow })
}
