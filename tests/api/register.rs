use chrono::NaiveDate;
use ehr_portal::auth::register_patient;
use ehr_portal::models::account::NewAccount;
use ehr_portal::models::profile::NewPatient;
use rstest::rstest;
use secrecy::Secret;
use sqlx::Row;
use uuid::Uuid;

use crate::utils::{assert_is_redirect_to, spawn_app};

fn patient_body(username: &str) -> serde_json::Map<String, serde_json::Value> {
    let body = serde_json::json!({
        "username": username,
        "password": "a-strong-password",
        "confirm_password": "a-strong-password",
        "full_name": "Ursula Le Guin",
        "date_of_birth": "1929-10-21",
        "contact_number": "555-0123",
        "email": format!("{}@example.com", username),
        "address": "Portland, Oregon"
    });
    body.as_object().unwrap().clone()
}

fn doctor_body(username: &str) -> serde_json::Map<String, serde_json::Value> {
    let body = serde_json::json!({
        "username": username,
        "password": "a-strong-password",
        "confirm_password": "a-strong-password",
        "full_name": "Elizabeth Blackwell",
        "specialty": "Obstetrics",
        "contact_number": "555-0124",
        "email": format!("{}@example.com", username),
        "consultation_fee": "120.50"
    });
    body.as_object().unwrap().clone()
}

#[tokio::test]
async fn registering_a_patient_creates_one_account_and_one_linked_profile() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let username = Uuid::new_v4().to_string();

    let response = app.post_form("/register/patient", &patient_body(&username)).await;
    assert_is_redirect_to(&response, "/login");

    let html_page = app.get_html("/login").await;
    assert!(html_page.contains("Patient registered successfully! Please log in."));

    assert_eq!(app.count("accounts").await, accounts_before + 1);
    let saved = sqlx::query(
        r#"
        SELECT a.role, a.password_hash, p.full_name, p.date_of_birth
        FROM accounts a JOIN patient_profiles p ON p.account_id = a.id
        WHERE a.username = ?
        "#,
    )
    .bind(&username)
    .fetch_all(&app.db_pool)
    .await
    .expect("Failed to fetch saved patient.");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].get::<String, _>("role"), "Patient");
    assert_eq!(saved[0].get::<String, _>("full_name"), "Ursula Le Guin");
    assert_eq!(saved[0].get::<String, _>("date_of_birth"), "1929-10-21");
    // Never stored in plaintext
    assert!(saved[0]
        .get::<String, _>("password_hash")
        .starts_with("$argon2id$"));
    assert_eq!(app.count("appointments").await, 0);
}

#[tokio::test]
async fn registering_a_doctor_stores_specialty_and_fee() {
    let app = spawn_app().await;
    let username = Uuid::new_v4().to_string();

    let response = app.post_form("/register/doctor", &doctor_body(&username)).await;
    assert_is_redirect_to(&response, "/login");

    let saved = sqlx::query(
        r#"
        SELECT a.role, d.specialty, d.consultation_fee
        FROM accounts a JOIN doctor_profiles d ON d.account_id = a.id
        WHERE a.username = ?
        "#,
    )
    .bind(&username)
    .fetch_one(&app.db_pool)
    .await
    .expect("Failed to fetch saved doctor.");
    assert_eq!(saved.get::<String, _>("role"), "Doctor");
    assert_eq!(saved.get::<String, _>("specialty"), "Obstetrics");
    assert_eq!(saved.get::<f64, _>("consultation_fee"), 120.5);
}

#[tokio::test]
async fn mismatched_passwords_create_no_rows() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let profiles_before = app.count("patient_profiles").await;
    let mut body = patient_body(&Uuid::new_v4().to_string());
    body.insert("confirm_password".into(), "something-else".into());

    let response = app.post_form("/register/patient", &body).await;
    assert_is_redirect_to(&response, "/register/patient");

    let html_page = app.get_html("/register/patient").await;
    assert!(html_page.contains("Passwords do not match."));
    assert_eq!(app.count("accounts").await, accounts_before);
    assert_eq!(app.count("patient_profiles").await, profiles_before);
}

#[rstest]
#[case("username")]
#[case("password")]
#[case("full_name")]
#[case("date_of_birth")]
#[case("contact_number")]
#[case("email")]
#[case("address")]
#[tokio::test]
async fn patient_registration_with_an_empty_field_is_rejected(#[case] field: &str) {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let mut body = patient_body(&Uuid::new_v4().to_string());
    body.insert(field.into(), "  ".into());

    let response = app.post_form("/register/patient", &body).await;
    assert_is_redirect_to(&response, "/register/patient");

    let html_page = app.get_html("/register/patient").await;
    assert!(html_page.contains("Please fill out all required fields"));
    assert_eq!(app.count("accounts").await, accounts_before);
}

#[rstest]
#[case("-10", "Consultation fee must be a non-negative amount.")]
#[case("", "Please fill out all required fields")]
#[tokio::test]
async fn doctor_registration_with_an_invalid_fee_is_rejected(
    #[case] fee: &str,
    #[case] expected_message: &str,
) {
    let app = spawn_app().await;
    let doctors_before = app.count("doctor_profiles").await;
    let mut body = doctor_body(&Uuid::new_v4().to_string());
    body.insert("consultation_fee".into(), fee.into());

    let response = app.post_form("/register/doctor", &body).await;
    assert_is_redirect_to(&response, "/register/doctor");

    let html_page = app.get_html("/register/doctor").await;
    assert!(html_page.contains(expected_message));
    assert_eq!(app.count("doctor_profiles").await, doctors_before);
}

#[tokio::test]
async fn a_taken_username_is_rejected_before_insert() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let body = patient_body(&app.test_doctor.username);

    let response = app.post_form("/register/patient", &body).await;
    assert_is_redirect_to(&response, "/register/patient");

    let html_page = app.get_html("/register/patient").await;
    assert!(html_page.contains("is already taken."));
    assert_eq!(app.count("accounts").await, accounts_before);
}

#[tokio::test]
async fn a_registered_email_is_rejected_across_roles() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let mut body = doctor_body(&Uuid::new_v4().to_string());
    body.insert("email".into(), app.test_patient.email.clone().into());

    let response = app.post_form("/register/doctor", &body).await;
    assert_is_redirect_to(&response, "/register/doctor");

    let html_page = app.get_html("/register/doctor").await;
    assert!(html_page.contains("is already registered."));
    assert_eq!(app.count("accounts").await, accounts_before);
    assert_eq!(app.count("doctor_profiles").await, 1);
}

#[tokio::test]
async fn a_newly_registered_patient_can_log_in() {
    let app = spawn_app().await;
    let username = Uuid::new_v4().to_string();
    app.post_form("/register/patient", &patient_body(&username)).await;

    let response = app
        .post_login(&serde_json::json!({
            "username": &username,
            "password": "a-strong-password"
        }))
        .await;
    assert_is_redirect_to(&response, "/dashboard");

    let html_page = app.get_html("/dashboard").await;
    assert!(html_page.contains("Welcome, Ursula Le Guin!"));
}

#[tokio::test]
async fn a_failed_profile_insert_rolls_back_the_account() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;
    let username = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        CREATE TRIGGER reject_patient_profiles BEFORE INSERT ON patient_profiles
        BEGIN
            SELECT RAISE(ABORT, 'patient profiles are read-only');
        END
        "#,
    )
    .execute(&app.db_pool)
    .await
    .expect("Failed to create trigger.");

    let response = app.post_form("/register/patient", &patient_body(&username)).await;
    assert_is_redirect_to(&response, "/register/patient");

    let html_page = app.get_html("/register/patient").await;
    assert!(html_page.contains("The account could not be completed and was not saved."));
    assert!(!html_page.contains("Failed to create the account."));
    assert_eq!(app.count("accounts").await, accounts_before);
    let orphaned = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE username = ?")
        .bind(&username)
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count accounts.");
    assert_eq!(orphaned, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_all_succeed() {
    let app = spawn_app().await;
    let accounts_before = app.count("accounts").await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let pool = app.db_pool.clone();
            let username = Uuid::new_v4().to_string();
            let patient = NewPatient {
                account: NewAccount {
                    username: username.clone(),
                    password: Secret::new("a-strong-password".to_string()),
                },
                full_name: format!("Patient {}", i),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                contact_number: "555-0100".to_string(),
                email: format!("{}@example.com", username),
                address: "1 Main Street".to_string(),
            };
            tokio::spawn(async move { register_patient(patient, &pool).await })
        })
        .collect();
    for handle in handles {
        handle
            .await
            .expect("Registration task panicked.")
            .expect("Concurrent registration failed.");
    }

    assert_eq!(app.count("accounts").await, accounts_before + 16);
    assert_eq!(app.count("patient_profiles").await, 17);
}
