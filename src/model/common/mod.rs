pub mod attendance;
pub mod ballot;
pub mod roll;
pub mod session;
pub mod tally;
pub mod voter;
pub mod weights;
