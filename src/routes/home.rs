use actix_web::HttpResponse;
use actix_web_flash_messages::IncomingFlashMessages;
use chrono::Utc;

use crate::routes::layout::render_page;
use crate::session::TypedSession;
use crate::utils::e500;

pub async fn home(
    session: TypedSession,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let body = match session.get_user().map_err(e500)? {
        Some(user) if !user.is_expired(Utc::now()) => format!(
            r#"<h2>Welcome back, {}!</h2>
    <p><a href="/dashboard">Go to your dashboard</a></p>"#,
            user.role
        ),
        _ => r#"<h2>Welcome to the Health Records System!</h2>
    <p><a href="/login">Log in</a> or <a href="/register">sign up</a> to manage your appointments.</p>"#
            .to_string(),
    };
    Ok(render_page("Health Records Management System", &flash_messages, &body))
}
