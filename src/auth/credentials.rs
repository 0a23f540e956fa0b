use actix_web::http::header::HeaderMap;
use anyhow::Context;
use base64::Engine;
use secrecy::Secret;
use sqlx::{query, query_as, Row, SqlitePool};
use uuid::Uuid;

use crate::auth::password::verify_password_hash;
use crate::models::account::{Account, Identity, Role};
use crate::models::profile::{DoctorProfile, PatientProfile, Profile};
use crate::telemetry::spawn_blocking_with_tracing;

pub struct Credentials {
    /// Username, or the email recorded on a patient or doctor profile.
    pub username: String,
    pub password: Secret<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

pub fn basic_auth(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let auth_header = headers
        .get("Authorization")
        .context("Missing Authorization header")?
        .to_str()
        .context("Failed to parse Authorization header")?;
    let base64 = auth_header
        .strip_prefix("Basic ")
        .context("Invalid Authorization header")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(base64)
        .context("Failed to decode base64")?;
    let decoded_credentials = String::from_utf8(decoded).context("Invalid UTF-8")?;

    // Split it into 2 sections separated by :
    let mut creds = decoded_credentials.splitn(2, ':');
    let username = creds
        .next()
        .ok_or_else(|| anyhow::anyhow!("Missing username in Basic Auth"))?
        .to_string();
    let password = creds
        .next()
        .ok_or_else(|| anyhow::anyhow!("Missing password in Basic Auth"))?
        .to_string();
    Ok(Credentials {
        username,
        password: Secret::new(password),
    })
}

/// Check `credentials` and return the id of the matching account.
///
/// Unknown identifiers and wrong passwords both end in
/// [`AuthError::InvalidCredentials`] after the same amount of hashing work.
#[tracing::instrument(name = "Validate credentials", skip(credentials, pool))]
pub async fn validate_credentials(
    credentials: Credentials,
    pool: &SqlitePool,
) -> Result<Uuid, AuthError> {
    let mut account_id = None;
    let mut expected_password_hash = Secret::new(
        "$argon2id$v=19$m=15000,t=2,p=1$\
        gZiV/M1gPc22ElAH/Jh1Hw$\
        CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno"
            .to_string(),
    );

    if let Some((stored_account_id, stored_password_hash)) =
        get_stored_credentials(&credentials.username, pool).await?
    {
        account_id = Some(stored_account_id);
        expected_password_hash = stored_password_hash;
    }

    spawn_blocking_with_tracing(move || {
        verify_password_hash(expected_password_hash, credentials.password)
    })
    .await
    .context("Failed to spawn a blocking task")??;

    account_id
        .ok_or_else(|| anyhow::anyhow!("Unknown username or email"))
        .map_err(AuthError::InvalidCredentials)
}

#[tracing::instrument(name = "Get stored credentials", skip(identifier, pool))]
async fn get_stored_credentials(
    identifier: &str,
    pool: &SqlitePool,
) -> Result<Option<(Uuid, Secret<String>)>, anyhow::Error> {
    let by_username = query(r#"SELECT id, password_hash FROM accounts WHERE username = ?"#)
        .bind(identifier)
        .fetch_optional(pool)
        .await
        .context("Failed to query account by username")?;

    let row = match by_username {
        Some(row) => Some(row),
        None => query(
            r#"
            SELECT a.id AS id, a.password_hash AS password_hash
            FROM accounts a
            LEFT JOIN patient_profiles p ON p.account_id = a.id
            LEFT JOIN doctor_profiles d ON d.account_id = a.id
            WHERE p.email = ? OR d.email = ?
            "#,
        )
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(pool)
        .await
        .context("Failed to query account by email")?,
    };

    row.map(|row| -> Result<_, anyhow::Error> {
        let id: Uuid = row.try_get("id")?;
        let password_hash: String = row.try_get("password_hash")?;
        Ok((id, Secret::new(password_hash)))
    })
    .transpose()
}

/// Fetch an account and merge in the profile its role points at.
#[tracing::instrument(name = "Load identity", skip(pool))]
pub async fn load_identity(account_id: Uuid, pool: &SqlitePool) -> Result<Identity, anyhow::Error> {
    let account = query_as::<_, Account>(
        r#"SELECT id, username, role, created_at FROM accounts WHERE id = ?"#,
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .context("Failed to fetch account")?;

    let profile = match account.role {
        Role::Patient => query_as::<_, PatientProfile>(
            r#"
            SELECT id, account_id, full_name, date_of_birth, contact_number, email, address
            FROM patient_profiles WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch patient profile")?
        .map(Profile::Patient),
        Role::Doctor => query_as::<_, DoctorProfile>(
            r#"
            SELECT id, account_id, full_name, specialty, contact_number, email, consultation_fee
            FROM doctor_profiles WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch doctor profile")?
        .map(Profile::Doctor),
        Role::Admin => None,
    };

    Ok(Identity { account, profile })
}
