use anyhow::Context;
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use sqlx::{query, query_scalar, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::auth::compute_password_hash;
use crate::models::account::{NewAccount, Role};
use crate::models::profile::{NewDoctor, NewPatient};
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum RegistrationError {
    #[error("The username {0} is already taken.")]
    UsernameTaken(String),
    #[error("The email {0} is already registered.")]
    EmailTaken(String),
    #[error("Failed to create the account.")]
    AccountInsert(#[source] sqlx::Error),
    #[error("The account could not be completed and was not saved.")]
    ProfileInsert(#[source] sqlx::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Create a patient account and its profile as one unit.
///
/// Either both rows are committed or neither is.
#[tracing::instrument(
    name = "Registering a new patient",
    skip(patient, pool),
    fields(username = %patient.account.username)
)]
pub async fn register_patient(patient: NewPatient, pool: &SqlitePool) -> Result<Uuid, RegistrationError> {
    let NewPatient {
        account,
        full_name,
        date_of_birth,
        contact_number,
        email,
        address,
    } = patient;
    let password_hash = hash(account.password).await?;

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a connection from the pool")?;
    // The account insert comes first so the transaction holds the write lock before any read.
    let account_id = insert_account(&mut transaction, &account.username, &password_hash, Role::Patient).await?;
    ensure_email_available(&mut transaction, &email).await?;

    let inserted = query(
        r#"
        INSERT INTO patient_profiles (id, account_id, full_name, date_of_birth, contact_number, email, address)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(full_name)
    .bind(date_of_birth)
    .bind(contact_number)
    .bind(&email)
    .bind(address)
    .execute(&mut *transaction)
    .await;
    if let Err(e) = inserted {
        return Err(roll_back_profile(transaction, e, &email).await);
    }

    transaction
        .commit()
        .await
        .context("Failed to commit the patient registration")?;
    Ok(account_id)
}

/// Create a doctor account and its profile as one unit.
#[tracing::instrument(
    name = "Registering a new doctor",
    skip(doctor, pool),
    fields(username = %doctor.account.username)
)]
pub async fn register_doctor(doctor: NewDoctor, pool: &SqlitePool) -> Result<Uuid, RegistrationError> {
    let NewDoctor {
        account,
        full_name,
        specialty,
        contact_number,
        email,
        consultation_fee,
    } = doctor;
    let password_hash = hash(account.password).await?;

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a connection from the pool")?;
    // The account insert comes first so the transaction holds the write lock before any read.
    let account_id = insert_account(&mut transaction, &account.username, &password_hash, Role::Doctor).await?;
    ensure_email_available(&mut transaction, &email).await?;

    let inserted = query(
        r#"
        INSERT INTO doctor_profiles (id, account_id, full_name, specialty, contact_number, email, consultation_fee)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(full_name)
    .bind(specialty)
    .bind(contact_number)
    .bind(&email)
    .bind(consultation_fee)
    .execute(&mut *transaction)
    .await;
    if let Err(e) = inserted {
        return Err(roll_back_profile(transaction, e, &email).await);
    }

    transaction
        .commit()
        .await
        .context("Failed to commit the doctor registration")?;
    Ok(account_id)
}

/// Insert the configured admin account unless the username already exists.
#[tracing::instrument(name = "Ensure admin account", skip(admin, pool), fields(username = %admin.username))]
pub async fn ensure_admin_account(admin: NewAccount, pool: &SqlitePool) -> Result<(), anyhow::Error> {
    let existing = query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM accounts WHERE username = ?"#)
        .bind(&admin.username)
        .fetch_one(pool)
        .await
        .context("Failed to look up the admin account")?;
    if existing > 0 {
        tracing::info!("Admin account already present");
        return Ok(());
    }

    let password_hash = hash(admin.password).await?;
    query(
        r#"
        INSERT INTO accounts (id, username, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&admin.username)
    .bind(password_hash.expose_secret())
    .bind(Role::Admin.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert the admin account")?;
    tracing::info!("Admin account created");
    Ok(())
}

async fn hash(password: Secret<String>) -> Result<Secret<String>, anyhow::Error> {
    spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn a blocking task")?
}

#[tracing::instrument(name = "Check email availability", skip(transaction, email))]
async fn ensure_email_available(
    transaction: &mut Transaction<'_, Sqlite>,
    email: &str,
) -> Result<(), RegistrationError> {
    let email_taken = query_scalar::<_, i64>(
        r#"
        SELECT (SELECT COUNT(*) FROM patient_profiles WHERE email = ?)
             + (SELECT COUNT(*) FROM doctor_profiles WHERE email = ?)
        "#,
    )
    .bind(email)
    .bind(email)
    .fetch_one(&mut **transaction)
    .await
    .context("Failed to check email availability")?;
    if email_taken > 0 {
        return Err(RegistrationError::EmailTaken(email.to_string()));
    }
    Ok(())
}

async fn insert_account(
    transaction: &mut Transaction<'_, Sqlite>,
    username: &str,
    password_hash: &Secret<String>,
    role: Role,
) -> Result<Uuid, RegistrationError> {
    let account_id = Uuid::new_v4();
    query(
        r#"
        INSERT INTO accounts (id, username, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(account_id)
    .bind(username)
    .bind(password_hash.expose_secret())
    .bind(role.to_string())
    .bind(Utc::now())
    .execute(&mut **transaction)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert account: {:?}", e);
        if is_unique_violation(&e) {
            RegistrationError::UsernameTaken(username.to_string())
        } else {
            RegistrationError::AccountInsert(e)
        }
    })?;
    Ok(account_id)
}

// The account row is already in the transaction, so it goes away with the rollback.
async fn roll_back_profile(
    transaction: Transaction<'_, Sqlite>,
    e: sqlx::Error,
    email: &str,
) -> RegistrationError {
    tracing::error!("Failed to insert profile: {:?}", e);
    if let Err(rollback_error) = transaction.rollback().await {
        tracing::error!("Failed to roll back registration: {:?}", rollback_error);
    }
    if is_unique_violation(&e) {
        RegistrationError::EmailTaken(email.to_string())
    } else {
        RegistrationError::ProfileInsert(e)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_error| db_error.is_unique_violation())
        .unwrap_or(false)
}
