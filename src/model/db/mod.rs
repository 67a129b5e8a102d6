//! Document shapes stored in MongoDB. These mirror the domain types, but
//! use snake_case field names and native BSON ids and datetimes.

pub mod attendance;
pub mod ballot;
pub mod question;
pub mod session;
pub mod voter;
pub mod weight;

pub use attendance::DbAttendance;
pub use ballot::DbBallot;
pub use question::DbQuestion;
pub use session::DbSession;
pub use voter::DbVoter;
pub use weight::DbWeight;
