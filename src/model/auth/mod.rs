mod rights;
mod token;

pub use rights::{AttendanceDesk, Coordinator, Rights, Role};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
