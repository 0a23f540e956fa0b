use chrono::{DateTime, Utc};
use enum_display::EnumDisplay;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::profile::Profile;

/// Which profile table, if any, holds an account's details.
#[derive(Debug, EnumDisplay, Serialize, Deserialize, PartialEq, Eq, Copy, Clone)]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "Patient" => Ok(Role::Patient),
            "Doctor" => Ok(Role::Doctor),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("{} is not a valid role", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl<'c> FromRow<'c, SqliteRow> for Account {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Account {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            role: Role::try_from(role).map_err(|e| sqlx::Error::Decode(e.into()))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub password: Secret<String>,
}

/// An authenticated account merged with its role-specific profile.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Identity {
    #[serde(flatten)]
    pub account: Account,
    pub profile: Option<Profile>,
}

impl Identity {
    pub fn role(&self) -> Role {
        self.account.role
    }

    /// Full name from the profile, falling back to the username for admins.
    pub fn display_name(&self) -> &str {
        match &self.profile {
            Some(Profile::Patient(patient)) => &patient.full_name,
            Some(Profile::Doctor(doctor)) => &doctor.full_name,
            None => &self.account.username,
        }
    }

    pub fn profile_id(&self) -> Option<Uuid> {
        self.profile.as_ref().map(Profile::id)
    }
}
