use axum::{Router, http::StatusCode, response::Response, routing::get};
use postbox_contact::ContactWorkflow;
use tower_http::trace::TraceLayer;

use crate::template::{NotFoundTemplate, Template};

mod contact;
mod health;

pub use contact::{ContactTemplate, EmailConfirmationTemplate};

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub workflow: ContactWorkflow,
}

pub async fn fallback(template: Template) -> Response {
    template.render_with_status(
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            site_name: template.site_name(),
        },
    )
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/contact", get(contact::page).post(contact::action))
        .fallback(fallback)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
