use rstest::rstest;
use uuid::Uuid;

use crate::utils::spawn_app;

#[rstest]
#[case("/api/appointments")]
#[tokio::test]
async fn requests_missing_authorization_are_rejected(#[case] path: &str) {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}{}", &app.address, path))
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="Restricted""#,
        response.headers()["WWW-Authenticate"]
    );
}

#[tokio::test]
async fn non_existing_user_is_rejected() {
    let app = spawn_app().await;

    let username = Uuid::new_v4().to_string();
    let password = Uuid::new_v4().to_string();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/appointments", &app.address))
        .basic_auth(username, Some(password))
        .json(&serde_json::json!({
            "doctor_id": app.test_doctor.profile_id,
            "date": "2025-01-20",
            "time": "10:00"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    //Assert
    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="Restricted""#,
        response.headers()["WWW-Authenticate"]
    );
    assert_eq!(app.count("appointments").await, 0);
}

#[tokio::test]
async fn invalid_password_is_rejected() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/appointments", &app.address))
        .basic_auth(&app.test_patient.username, Some(Uuid::new_v4().to_string()))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="Restricted""#,
        response.headers()["WWW-Authenticate"]
    );
}

#[tokio::test]
async fn valid_credentials_return_an_empty_list_for_a_new_patient() {
    let app = spawn_app().await;

    let response = app.get_api_appointments(&app.test_patient).await;

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["status"], "success");
    assert_eq!(body["length"], 0);
}

#[tokio::test]
async fn validated_credentials_resolve_to_the_merged_identity() {
    let app = spawn_app().await;

    let account_id = ehr_portal::auth::validate_credentials(
        ehr_portal::auth::Credentials {
            username: app.test_patient.username.clone(),
            password: secrecy::Secret::new(app.test_patient.password.clone()),
        },
        &app.db_pool,
    )
    .await
    .expect("Failed to validate credentials.");
    let identity = ehr_portal::auth::load_identity(account_id, &app.db_pool)
        .await
        .expect("Failed to load identity.");

    assert_eq!(identity.account.id, app.test_patient.account_id);
    assert_eq!(identity.display_name(), "Jane Doe");
    assert_eq!(identity.profile_id(), Some(app.test_patient.profile_id));
    match identity.profile {
        Some(ehr_portal::models::profile::Profile::Patient(patient)) => {
            assert_eq!(patient.email, app.test_patient.email);
            assert_eq!(patient.address, "12 Harbour Road");
        }
        other => panic!("Expected a patient profile, got {:?}", other),
    }
}
