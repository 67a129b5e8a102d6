use serde::{Deserialize, Serialize};

/// One row of the weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbWeight {
    pub apartment: String,
    pub weight: f64,
}
