use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::account::NewAccount;

#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, Clone)]
pub struct PatientProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub contact_number: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Clone)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub contact_number: String,
    pub email: String,
    pub consultation_fee: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Profile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
}

impl Profile {
    pub fn id(&self) -> Uuid {
        match self {
            Profile::Patient(patient) => patient.id,
            Profile::Doctor(doctor) => doctor.id,
        }
    }
}

/// Entry of the doctor directory shown when booking.
#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq, Eq, Clone)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
}

#[derive(Debug)]
pub struct NewPatient {
    pub account: NewAccount,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub contact_number: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug)]
pub struct NewDoctor {
    pub account: NewAccount,
    pub full_name: String,
    pub specialty: String,
    pub contact_number: String,
    pub email: String,
    pub consultation_fee: f64,
}
