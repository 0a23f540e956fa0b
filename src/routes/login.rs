use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use secrecy::{ExposeSecret, Secret};
use sqlx::SqlitePool;

use crate::auth::{load_identity, validate_credentials, AuthError, Credentials};
use crate::routes::layout::render_page;
use crate::session::{SessionTtl, SessionUser, TypedSession};
use crate::utils::{error_chain_fmt, see_other};

pub async fn login_form(flash_messages: IncomingFlashMessages) -> HttpResponse {
    render_page(
        "Electronic Health System (EHS) - Login",
        &flash_messages,
        r#"<form action="/login" method="post">
        <label>Username or email
            <input type="text" placeholder="Enter your username or email" name="username">
        </label>
        <label>Password
            <input type="password" placeholder="Enter password" name="password">
        </label>
        <button type="submit">Login</button>
    </form>
    <p>No account yet? <a href="/register">Sign up</a>.</p>"#,
    )
}

#[derive(serde::Deserialize)]
pub struct FormData {
    username: String,
    password: Secret<String>,
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("Please enter both username and password.")]
    MissingCredentials,
    #[error("Invalid username or password.")]
    AuthError(#[source] anyhow::Error),
    #[error("Something went wrong.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[tracing::instrument(
    skip(form, pool, session, ttl),
    fields(username = tracing::field::Empty, account_id = tracing::field::Empty)
)]
pub async fn login(
    form: web::Form<FormData>,
    pool: web::Data<SqlitePool>,
    session: TypedSession,
    ttl: web::Data<SessionTtl>,
) -> Result<HttpResponse, InternalError<LoginError>> {
    let FormData { username, password } = form.0;
    let username = username.trim().to_string();
    if username.is_empty() || password.expose_secret().is_empty() {
        return Err(login_redirect(LoginError::MissingCredentials));
    }
    tracing::Span::current().record("username", tracing::field::display(&username));

    let credentials = Credentials { username, password };
    match validate_credentials(credentials, &pool).await {
        Ok(account_id) => {
            tracing::Span::current().record("account_id", tracing::field::display(&account_id));
            let identity = load_identity(account_id, &pool)
                .await
                .map_err(|e| login_redirect(LoginError::UnexpectedError(e)))?;

            session.renew();
            session
                .insert_user(&SessionUser::new(&identity, ttl.0))
                .map_err(|e| login_redirect(LoginError::UnexpectedError(e.into())))?;
            FlashMessage::success(format!("Logged in as {}", identity.role())).send();
            Ok(see_other("/dashboard"))
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => LoginError::AuthError(e.into()),
                AuthError::UnexpectedError(_) => LoginError::UnexpectedError(e.into()),
            };
            Err(login_redirect(e))
        }
    }
}

// Redirect to the login page with an error message.
fn login_redirect(e: LoginError) -> InternalError<LoginError> {
    FlashMessage::error(e.to_string()).send();
    InternalError::from_response(e, see_other("/login"))
}
