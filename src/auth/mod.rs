mod credentials;
mod middleware;
mod password;
mod registration;

pub use credentials::{basic_auth, load_identity, validate_credentials, AuthError, Credentials};
pub use middleware::reject_anonymous_users;
pub use password::compute_password_hash;
pub use registration::{
    ensure_admin_account, register_doctor, register_patient, RegistrationError,
};
