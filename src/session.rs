use actix_session::{Session, SessionExt, SessionGetError, SessionInsertError};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::models::account::{Identity, Role};

/// Login state of one browser, stored in the session cookie.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub account_id: Uuid,
    pub role: Role,
    /// Patient or doctor profile id, `None` for admins.
    pub profile_id: Option<Uuid>,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionUser {
    pub fn new(identity: &Identity, ttl: Duration) -> Self {
        Self {
            account_id: identity.account.id,
            role: identity.role(),
            profile_id: identity.profile_id(),
            display_name: identity.display_name().to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// How long a login lasts, shared with handlers through `app_data`.
#[derive(Clone, Copy, Debug)]
pub struct SessionTtl(pub Duration);

pub struct TypedSession(Session);

impl TypedSession {
    const USER_KEY: &'static str = "user";

    pub fn renew(&self) {
        self.0.renew();
    }

    pub fn insert_user(&self, user: &SessionUser) -> Result<(), SessionInsertError> {
        self.0.insert(Self::USER_KEY, user)
    }

    pub fn get_user(&self) -> Result<Option<SessionUser>, SessionGetError> {
        self.0.get(Self::USER_KEY)
    }

    pub fn log_out(self) {
        self.0.purge()
    }
}

impl FromRequest for TypedSession {
    // Same error as `Session`'s own extractor.
    type Error = <Session as FromRequest>::Error;
    type Future = Ready<Result<TypedSession, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(TypedSession(req.get_session())))
    }
}
