use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Response,
};
use postbox_contact::{ContactSubmission, DELIVERY_FAILED_MESSAGE, FieldErrors, SubmitResult};

use crate::{routes::AppState, template::Template};

#[derive(askama::Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate<'a> {
    pub site_name: &'a str,
    pub input: &'a ContactSubmission,
    pub errors: &'a FieldErrors,
    pub error_message: Option<&'a str>,
}

#[derive(askama::Template)]
#[template(path = "email-confirmation.html")]
pub struct EmailConfirmationTemplate<'a> {
    pub site_name: &'a str,
    pub input: &'a ContactSubmission,
}

pub async fn page(template: Template) -> Response {
    template.render(ContactTemplate {
        site_name: template.site_name(),
        input: &ContactSubmission::default(),
        errors: &FieldErrors::default(),
        error_message: None,
    })
}

fn delivery_failed(template: &Template, input: &ContactSubmission) -> Response {
    template.render_with_status(
        StatusCode::SERVICE_UNAVAILABLE,
        ContactTemplate {
            site_name: template.site_name(),
            input,
            errors: &FieldErrors::default(),
            error_message: Some(DELIVERY_FAILED_MESSAGE),
        },
    )
}

pub async fn action(
    template: Template,
    State(app_state): State<AppState>,
    Form(input): Form<ContactSubmission>,
) -> Response {
    let workflow = app_state.workflow.clone();
    let submitted = input.clone();

    // SMTP I/O blocks, keep it off the async workers
    let result = match tokio::task::spawn_blocking(move || workflow.submit(input)).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "Contact workflow aborted");

            return delivery_failed(&template, &submitted);
        }
    };

    match result {
        SubmitResult::Confirmed { input } => template.render(EmailConfirmationTemplate {
            site_name: template.site_name(),
            input: &input,
        }),
        SubmitResult::ValidationFailed { errors, input } => template.render_with_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            ContactTemplate {
                site_name: template.site_name(),
                input: &input,
                errors: &errors,
                error_message: None,
            },
        ),
        SubmitResult::DeliveryFailed { input, .. } => delivery_failed(&template, &input),
    }
}
