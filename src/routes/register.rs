use actix_web::{web, HttpResponse};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use secrecy::Secret;
use sqlx::SqlitePool;

use crate::auth::{register_doctor, register_patient, RegistrationError};
use crate::models::account::NewAccount;
use crate::models::profile::{NewDoctor, NewPatient};
use crate::models::validation::{
    parse_date, parse_fee, passwords_match, required, required_secret, ValidationError,
};
use crate::routes::layout::render_page;
use crate::utils::{e500, see_other};

const ACCOUNT_FIELDS: &str = r#"<label>Username <input type="text" name="username"></label>
        <label>Password <input type="password" name="password"></label>
        <label>Confirm Password <input type="password" name="confirm_password"></label>"#;

pub async fn register_index(flash_messages: IncomingFlashMessages) -> HttpResponse {
    render_page(
        "Electronic Health System (EHS) - Register",
        &flash_messages,
        r#"<p>Register as:</p>
    <ul>
        <li><a href="/register/patient">Patient</a></li>
        <li><a href="/register/doctor">Doctor</a></li>
    </ul>"#,
    )
}

pub async fn patient_form(flash_messages: IncomingFlashMessages) -> HttpResponse {
    render_page(
        "Patient Sign-Up",
        &flash_messages,
        &format!(
            r#"<form action="/register/patient" method="post">
        {ACCOUNT_FIELDS}
        <label>Full Name <input type="text" name="full_name"></label>
        <label>Date of Birth <input type="date" name="date_of_birth"></label>
        <label>Contact Number <input type="text" name="contact_number"></label>
        <label>Email <input type="email" name="email"></label>
        <label>Address <textarea name="address"></textarea></label>
        <button type="submit">Register</button>
    </form>"#
        ),
    )
}

pub async fn doctor_form(flash_messages: IncomingFlashMessages) -> HttpResponse {
    render_page(
        "Doctor Sign-Up",
        &flash_messages,
        &format!(
            r#"<form action="/register/doctor" method="post">
        {ACCOUNT_FIELDS}
        <label>Full Name <input type="text" name="full_name"></label>
        <label>Specialty <input type="text" name="specialty"></label>
        <label>Contact Number <input type="text" name="contact_number"></label>
        <label>Email <input type="email" name="email"></label>
        <label>Consultation Fee <input type="number" name="consultation_fee" min="0" step="0.01"></label>
        <button type="submit">Register</button>
    </form>"#
        ),
    )
}

#[derive(serde::Deserialize)]
pub struct PatientRegistrationForm {
    username: String,
    password: Secret<String>,
    confirm_password: Secret<String>,
    full_name: String,
    date_of_birth: String,
    contact_number: String,
    email: String,
    address: String,
}

impl TryFrom<PatientRegistrationForm> for NewPatient {
    type Error = ValidationError;

    fn try_from(value: PatientRegistrationForm) -> Result<Self, Self::Error> {
        let username = required("username", value.username)?;
        required_secret("password", &value.password)?;
        required_secret("password confirmation", &value.confirm_password)?;
        let full_name = required("full name", value.full_name)?;
        let date_of_birth = required("date of birth", value.date_of_birth)?;
        let contact_number = required("contact number", value.contact_number)?;
        let email = required("email", value.email)?;
        let address = required("address", value.address)?;
        passwords_match(&value.password, &value.confirm_password)?;

        Ok(NewPatient {
            account: NewAccount {
                username,
                password: value.password,
            },
            full_name,
            date_of_birth: parse_date(&date_of_birth)?,
            contact_number,
            email,
            address,
        })
    }
}

#[derive(serde::Deserialize)]
pub struct DoctorRegistrationForm {
    username: String,
    password: Secret<String>,
    confirm_password: Secret<String>,
    full_name: String,
    specialty: String,
    contact_number: String,
    email: String,
    consultation_fee: String,
}

impl TryFrom<DoctorRegistrationForm> for NewDoctor {
    type Error = ValidationError;

    fn try_from(value: DoctorRegistrationForm) -> Result<Self, Self::Error> {
        let username = required("username", value.username)?;
        required_secret("password", &value.password)?;
        required_secret("password confirmation", &value.confirm_password)?;
        let full_name = required("full name", value.full_name)?;
        let specialty = required("specialty", value.specialty)?;
        let contact_number = required("contact number", value.contact_number)?;
        let email = required("email", value.email)?;
        let consultation_fee = required("consultation fee", value.consultation_fee)?;
        passwords_match(&value.password, &value.confirm_password)?;

        Ok(NewDoctor {
            account: NewAccount {
                username,
                password: value.password,
            },
            full_name,
            specialty,
            contact_number,
            email,
            consultation_fee: parse_fee(&consultation_fee)?,
        })
    }
}

#[tracing::instrument(name = "Patient sign-up", skip(form, pool))]
pub async fn sign_up_patient(
    form: web::Form<PatientRegistrationForm>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, actix_web::Error> {
    let patient = match NewPatient::try_from(form.0) {
        Ok(patient) => patient,
        Err(e) => {
            FlashMessage::error(e.to_string()).send();
            return Ok(see_other("/register/patient"));
        }
    };
    let outcome = register_patient(patient, &pool).await;
    registration_response(outcome, "Patient", "/register/patient")
}

#[tracing::instrument(name = "Doctor sign-up", skip(form, pool))]
pub async fn sign_up_doctor(
    form: web::Form<DoctorRegistrationForm>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, actix_web::Error> {
    let doctor = match NewDoctor::try_from(form.0) {
        Ok(doctor) => doctor,
        Err(e) => {
            FlashMessage::error(e.to_string()).send();
            return Ok(see_other("/register/doctor"));
        }
    };
    let outcome = register_doctor(doctor, &pool).await;
    registration_response(outcome, "Doctor", "/register/doctor")
}

fn registration_response(
    outcome: Result<uuid::Uuid, RegistrationError>,
    role: &str,
    form_location: &str,
) -> Result<HttpResponse, actix_web::Error> {
    match outcome {
        Ok(_) => {
            FlashMessage::success(format!("{} registered successfully! Please log in.", role)).send();
            Ok(see_other("/login"))
        }
        Err(e @ (RegistrationError::UsernameTaken(_) | RegistrationError::EmailTaken(_))) => {
            FlashMessage::error(e.to_string()).send();
            Ok(see_other(form_location))
        }
        Err(e @ (RegistrationError::AccountInsert(_) | RegistrationError::ProfileInsert(_))) => {
            tracing::error!("{:?}", e);
            FlashMessage::error(format!("Failed to register {}. {}", role, e)).send();
            Ok(see_other(form_location))
        }
        Err(e @ RegistrationError::UnexpectedError(_)) => Err(e500(e)),
    }
}
