use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use sqlx::SqlitePool;

use crate::auth::{basic_auth, load_identity, validate_credentials, AuthError};
use crate::models::account::{Identity, Role};
use crate::routes::appointments::{
    get_doctor_appointments_query, get_patient_appointments_query, insert_appointment,
    AppointmentForm, BookingError,
};
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    BookingError(BookingError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::UnexpectedError(e) => ApiError::UnexpectedError(e),
            other => ApiError::BookingError(other),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::AuthError(_) => {
                let mut response = HttpResponse::new(StatusCode::UNAUTHORIZED);
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="Restricted""#),
                );
                response
            }
            ApiError::Forbidden(_) => HttpResponse::build(StatusCode::FORBIDDEN).json(
                serde_json::json!({ "status": "error", "message": self.to_string() }),
            ),
            ApiError::BookingError(_) => HttpResponse::build(StatusCode::BAD_REQUEST).json(
                serde_json::json!({ "status": "error", "message": self.to_string() }),
            ),
            ApiError::UnexpectedError(_) => HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Resolve the Basic credentials of `request` into an identity.
async fn authenticate(request: &HttpRequest, pool: &SqlitePool) -> Result<Identity, ApiError> {
    let credentials =
        basic_auth(request.headers()).map_err(|e| ApiError::AuthError(e.into()))?;
    tracing::Span::current().record("username", tracing::field::display(&credentials.username));

    let account_id = validate_credentials(credentials, pool)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(_) => ApiError::AuthError(e.into()),
            AuthError::UnexpectedError(_) => ApiError::UnexpectedError(e.into()),
        })?;
    tracing::Span::current().record("account_id", tracing::field::display(&account_id));

    Ok(load_identity(account_id, pool).await?)
}

#[tracing::instrument(
    name = "Booking a new appointment through the API",
    skip(appointment_data, pool, request),
    fields(
        doctor_id = %appointment_data.doctor_id,
        username = tracing::field::Empty,
        account_id = tracing::field::Empty
    )
)]
pub async fn post_appointment(
    appointment_data: web::Json<AppointmentForm>,
    pool: web::Data<SqlitePool>,
    request: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let identity = authenticate(&request, &pool).await?;
    let patient_id = match (identity.role(), identity.profile_id()) {
        (Role::Patient, Some(profile_id)) => profile_id,
        _ => return Err(ApiError::Forbidden("Only patients can book appointments.")),
    };

    let appointment = appointment_data
        .0
        .parse(patient_id)
        .map_err(BookingError::from)?;
    let appointment = insert_appointment(appointment, &pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": appointment
    })))
}

#[tracing::instrument(
    name = "Listing appointments through the API",
    skip(pool, request),
    fields(username = tracing::field::Empty, account_id = tracing::field::Empty)
)]
pub async fn get_appointments(
    pool: web::Data<SqlitePool>,
    request: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let identity = authenticate(&request, &pool).await?;
    let json_response = match (identity.role(), identity.profile_id()) {
        (Role::Patient, Some(patient_id)) => {
            let appointments = get_patient_appointments_query(patient_id, &pool)
                .await
                .map_err(anyhow::Error::from)?;
            serde_json::json!({
                "status": "success",
                "length": appointments.len(),
                "data": appointments
            })
        }
        (Role::Doctor, Some(doctor_id)) => {
            let appointments = get_doctor_appointments_query(doctor_id, &pool)
                .await
                .map_err(anyhow::Error::from)?;
            serde_json::json!({
                "status": "success",
                "length": appointments.len(),
                "data": appointments
            })
        }
        _ => {
            return Err(ApiError::Forbidden(
                "Only patients and doctors have appointments.",
            ))
        }
    };
    Ok(HttpResponse::Ok().json(json_response))
}
