use actix_web::{web, HttpResponse};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use sqlx::SqlitePool;

use crate::models::account::Role;
use crate::routes::doctors::list_doctors;
use crate::routes::layout::{escape, render_page};
use crate::session::{SessionUser, TypedSession};
use crate::utils::{e500, see_other};

const LOGOUT_FORM: &str = r#"<form name="logoutForm" action="/dashboard/logout" method="post">
        <input type="submit" value="Logout">
    </form>"#;

#[tracing::instrument(name = "Render dashboard", skip(user, pool, flash_messages), fields(role = %user.role))]
pub async fn dashboard(
    user: web::ReqData<SessionUser>,
    pool: web::Data<SqlitePool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let name = escape(&user.display_name);
    let (title, body) = match user.role {
        Role::Patient => (
            "Patient Dashboard",
            format!(
                r#"<p>Welcome, {name}!</p>
    <ul>
        <li><a href="/patients/appointments/new">Create an appointment</a></li>
        <li><a href="/patients/appointments">View your appointments</a></li>
    </ul>"#
            ),
        ),
        Role::Doctor => (
            "Doctor Dashboard",
            format!(
                r#"<p>Welcome, Dr. {name}!</p>
    <ul>
        <li><a href="/doctors/appointments">View your schedule</a></li>
    </ul>"#
            ),
        ),
        Role::Admin => {
            let doctors = list_doctors(&pool).await.map_err(e500)?;
            let rows: String = doctors
                .iter()
                .map(|d| {
                    format!(
                        "<li>{} ({})</li>\n",
                        escape(&d.full_name),
                        escape(&d.specialty)
                    )
                })
                .collect();
            (
                "Admin Dashboard",
                format!(
                    r#"<p>Welcome, Admin {name}!</p>
    <h2>Registered doctors ({count})</h2>
    <ul>
        {rows}
    </ul>"#,
                    count = doctors.len()
                ),
            )
        }
    };
    Ok(render_page(
        title,
        &flash_messages,
        &format!("{body}\n    {LOGOUT_FORM}"),
    ))
}

pub async fn log_out(session: TypedSession) -> HttpResponse {
    session.log_out();
    FlashMessage::info("You have been logged out.").send();
    see_other("/login")
}
