use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl From<NewAppointment> for Appointment {
    fn from(value: NewAppointment) -> Self {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: value.patient_id,
            doctor_id: value.doctor_id,
            date: value.date,
            time: value.time,
            created_at: Utc::now(),
        }
    }
}

/// An appointment as seen by the patient who booked it.
#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, Clone)]
pub struct PatientAppointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
}

/// An appointment as seen by the doctor it was booked with.
#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, Clone)]
pub struct DoctorAppointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_contact_number: String,
}
