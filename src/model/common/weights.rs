use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ballot::DEFAULT_WEIGHT;

/// A single row of a weight import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub apartment: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Entry {0} has an empty apartment")]
    EmptyApartment(usize),
    #[error("Apartment {apartment} has invalid weight {weight}; weights must be positive")]
    InvalidWeight { apartment: String, weight: f64 },
}

/// Apartment → vote weight. Apartments missing from the table weigh
/// [`DEFAULT_WEIGHT`]. Imports replace the whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<String, f64>);

impl WeightTable {
    /// Is `weight` acceptable as an apartment weight?
    pub fn is_valid_weight(weight: f64) -> bool {
        weight.is_finite() && weight > 0.0
    }

    /// Build a table from import rows, validating every row. Later rows for
    /// the same apartment override earlier ones.
    pub fn from_entries(
        entries: impl IntoIterator<Item = WeightEntry>,
    ) -> Result<Self, WeightError> {
        let mut table = BTreeMap::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let apartment = entry.apartment.trim();
            if apartment.is_empty() {
                return Err(WeightError::EmptyApartment(index + 1));
            }
            if !Self::is_valid_weight(entry.weight) {
                return Err(WeightError::InvalidWeight {
                    apartment: apartment.to_string(),
                    weight: entry.weight,
                });
            }
            table.insert(apartment.to_string(), entry.weight);
        }
        Ok(Self(table))
    }

    /// The weight configured for `apartment`, if any.
    pub fn get(&self, apartment: &str) -> Option<f64> {
        self.0.get(apartment.trim()).copied()
    }

    /// The weight a ballot for `apartment` carries.
    pub fn weight_for(&self, apartment: &str) -> f64 {
        self.get(apartment).unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(apartment, weight)| (apartment.as_str(), *weight))
    }

    pub fn entries(&self) -> Vec<WeightEntry> {
        self.iter()
            .map(|(apartment, weight)| WeightEntry {
                apartment: apartment.to_string(),
                weight,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(apartment: &str, weight: f64) -> WeightEntry {
        WeightEntry {
            apartment: apartment.to_string(),
            weight,
        }
    }

    #[test]
    fn imported_weights_round_trip() {
        let entries = vec![entry("A101", 1.5), entry("A102", 2.0), entry("B201", 0.75)];
        let table = WeightTable::from_entries(entries.clone()).unwrap();
        for imported in &entries {
            assert_eq!(table.weight_for(&imported.apartment), imported.weight);
        }
        assert_eq!(table.weight_for("C999"), DEFAULT_WEIGHT);
        assert_eq!(table.get("C999"), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn later_rows_override() {
        let table =
            WeightTable::from_entries(vec![entry("A101", 1.5), entry(" A101 ", 3.0)]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.weight_for("A101"), 3.0);
    }

    #[test]
    fn invalid_rows_are_rejected() {
        assert_eq!(
            WeightTable::from_entries(vec![entry("A101", 1.0), entry(" ", 1.0)]),
            Err(WeightError::EmptyApartment(2))
        );
        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                WeightTable::from_entries(vec![entry("A101", weight)]),
                Err(WeightError::InvalidWeight { .. })
            ));
        }
    }
}
