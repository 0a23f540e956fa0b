mod api;
mod appointments;
mod dashboard;
mod doctors;
mod health_check;
mod home;
mod layout;
mod login;
mod register;

pub use api::*;
pub use appointments::*;
pub use dashboard::*;
pub use doctors::*;
pub use health_check::*;
pub use home::*;
pub use login::*;
pub use register::*;
