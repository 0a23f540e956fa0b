use actix_web::{web, HttpResponse};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, SqlitePool};
use uuid::Uuid;

use crate::models::account::Role;
use crate::models::appointments::{
    Appointment, DoctorAppointment, NewAppointment, PatientAppointment,
};
use crate::models::validation::{
    parse_date, parse_doctor_id, parse_time, required, ValidationError,
};
use crate::routes::doctors::list_doctors;
use crate::routes::layout::{escape, render_page};
use crate::session::SessionUser;
use crate::utils::{e403, e500, error_chain_fmt, see_other};

#[derive(thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    ValidationError(#[from] ValidationError),
    #[error("The selected doctor does not exist.")]
    UnknownDoctor(Uuid),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentForm {
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

impl AppointmentForm {
    pub fn parse(self, patient_id: Uuid) -> Result<NewAppointment, ValidationError> {
        let doctor_id = required("doctor", self.doctor_id)?;
        let date = required("date", self.date)?;
        let time = required("time", self.time)?;
        Ok(NewAppointment {
            patient_id,
            doctor_id: parse_doctor_id(&doctor_id)?,
            date: parse_date(&date)?,
            time: parse_time(&time)?,
        })
    }
}

/// The patient profile id of a logged-in patient, 403 for every other role.
pub fn require_patient(user: &SessionUser) -> Result<Uuid, actix_web::Error> {
    match (user.role, user.profile_id) {
        (Role::Patient, Some(profile_id)) => Ok(profile_id),
        _ => Err(e403("You must log in as a patient to manage appointments.")),
    }
}

fn require_doctor(user: &SessionUser) -> Result<Uuid, actix_web::Error> {
    match (user.role, user.profile_id) {
        (Role::Doctor, Some(profile_id)) => Ok(profile_id),
        _ => Err(e403("Only doctors can view their schedule.")),
    }
}

pub async fn booking_form(
    user: web::ReqData<SessionUser>,
    pool: web::Data<SqlitePool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    require_patient(&user)?;
    let doctors = list_doctors(&pool).await.map_err(e500)?;

    let body = if doctors.is_empty() {
        "<p>No doctors available.</p>".to_string()
    } else {
        let options: String = doctors
            .iter()
            .map(|doctor| {
                format!(
                    r#"<option value="{}">{} ({})</option>"#,
                    doctor.id,
                    escape(&doctor.full_name),
                    escape(&doctor.specialty)
                )
            })
            .collect();
        format!(
            r#"<form action="/patients/appointments" method="post">
        <label>Select a Doctor <select name="doctor_id">{options}</select></label>
        <label>Select Appointment Date <input type="date" name="date"></label>
        <label>Select Appointment Time <input type="time" name="time"></label>
        <button type="submit">Create Appointment</button>
    </form>"#
        )
    };
    Ok(render_page("Create an Appointment", &flash_messages, &body))
}

#[tracing::instrument(
    name = "Booking a new appointment",
    skip(form, user, pool),
    fields(account_id = %user.account_id, doctor_id = %form.doctor_id)
)]
pub async fn book_appointment(
    form: web::Form<AppointmentForm>,
    user: web::ReqData<SessionUser>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, actix_web::Error> {
    let patient_id = require_patient(&user)?;

    let outcome = match form.0.parse(patient_id) {
        Ok(appointment) => insert_appointment(appointment, &pool).await,
        Err(e) => Err(e.into()),
    };
    match outcome {
        Ok(_) => {
            FlashMessage::success("Appointment created successfully!").send();
            Ok(see_other("/patients/appointments"))
        }
        Err(BookingError::UnexpectedError(e)) => Err(e500(e)),
        Err(e) => {
            FlashMessage::error(e.to_string()).send();
            Ok(see_other("/patients/appointments/new"))
        }
    }
}

/// Insert `appointment` if its doctor exists.
///
/// The existence check and the insert are one statement, so the write lock is
/// taken before anything is read. The foreign keys back the check up.
#[tracing::instrument(
    name = "Saving new appointment details in the database",
    skip(appointment, pool)
)]
pub async fn insert_appointment(
    appointment: NewAppointment,
    pool: &SqlitePool,
) -> Result<Appointment, BookingError> {
    let appointment = Appointment::from(appointment);
    let inserted = query(
        r#"
        INSERT INTO appointments (id, patient_id, doctor_id, date, time, created_at)
        SELECT ?, ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM doctor_profiles WHERE id = ?)
        "#,
    )
    .bind(appointment.id)
    .bind(appointment.patient_id)
    .bind(appointment.doctor_id)
    .bind(appointment.date)
    .bind(appointment.time)
    .bind(appointment.created_at)
    .bind(appointment.doctor_id)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {}", e);
        e
    })
    .context("Failed to insert the appointment")?;

    if inserted.rows_affected() == 0 {
        return Err(BookingError::UnknownDoctor(appointment.doctor_id));
    }
    Ok(appointment)
}

#[tracing::instrument(name = "Fetching patient appointments", skip(pool))]
pub async fn get_patient_appointments_query(
    patient_id: Uuid,
    pool: &SqlitePool,
) -> Result<Vec<PatientAppointment>, sqlx::Error> {
    query_as::<_, PatientAppointment>(
        r#"
        SELECT a.id AS id, a.date AS date, a.time AS time, d.id AS doctor_id,
               d.full_name AS doctor_name, d.specialty AS specialty
        FROM appointments a
        JOIN doctor_profiles d ON a.doctor_id = d.id
        WHERE a.patient_id = ?
        ORDER BY a.date DESC, a.time DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {}", e);
        e
    })
}

#[tracing::instrument(name = "Fetching doctor appointments", skip(pool))]
pub async fn get_doctor_appointments_query(
    doctor_id: Uuid,
    pool: &SqlitePool,
) -> Result<Vec<DoctorAppointment>, sqlx::Error> {
    query_as::<_, DoctorAppointment>(
        r#"
        SELECT a.id AS id, a.date AS date, a.time AS time, p.id AS patient_id, p.full_name AS patient_name,
               p.contact_number AS patient_contact_number
        FROM appointments a
        JOIN patient_profiles p ON a.patient_id = p.id
        WHERE a.doctor_id = ?
        ORDER BY a.date DESC, a.time DESC
        "#,
    )
    .bind(doctor_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {}", e);
        e
    })
}

#[tracing::instrument(name = "Patient views their appointments", skip(user, pool, flash_messages))]
pub async fn patient_appointments(
    user: web::ReqData<SessionUser>,
    pool: web::Data<SqlitePool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let patient_id = require_patient(&user)?;
    let appointments = get_patient_appointments_query(patient_id, &pool)
        .await
        .map_err(e500)?;

    let body = if appointments.is_empty() {
        r#"<p>You have no appointments yet.</p>
    <p><a href="/patients/appointments/new">Create an appointment</a></p>"#
            .to_string()
    } else {
        let rows: String = appointments
            .iter()
            .map(|a| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    a.id,
                    a.date,
                    a.time.format("%H:%M"),
                    escape(&a.doctor_name),
                    escape(&a.specialty)
                )
            })
            .collect();
        format!(
            r#"<h2>Appointments (latest at the top)</h2>
    <table>
        <tr><th>Appointment ID</th><th>Date</th><th>Time</th><th>Doctor</th><th>Specialization</th></tr>
        {rows}
    </table>
    <p><a href="/patients/appointments/new">Create an appointment</a></p>"#
        )
    };
    Ok(render_page("Your Appointments", &flash_messages, &body))
}

#[tracing::instrument(name = "Doctor views their appointments", skip(user, pool, flash_messages))]
pub async fn doctor_appointments(
    user: web::ReqData<SessionUser>,
    pool: web::Data<SqlitePool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let doctor_id = require_doctor(&user)?;
    let appointments = get_doctor_appointments_query(doctor_id, &pool)
        .await
        .map_err(e500)?;

    let body = if appointments.is_empty() {
        "<p>No appointments have been booked with you yet.</p>".to_string()
    } else {
        let rows: String = appointments
            .iter()
            .map(|a| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    a.date,
                    a.time.format("%H:%M"),
                    escape(&a.patient_name),
                    escape(&a.patient_contact_number)
                )
            })
            .collect();
        format!(
            r#"<table>
        <tr><th>Date</th><th>Time</th><th>Patient</th><th>Contact Number</th></tr>
        {rows}
    </table>"#
        )
    };
    Ok(render_page("Your Schedule", &flash_messages, &body))
}
