//! Voter roll import in the `cedula,apartamento,peso` CSV format.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use super::{voter::Voter, weights::WeightEntry};

/// Text that marks the first line as a header.
const HEADER_MARKERS: [&str; 2] = ["cedula", "cédula"];

/// One accepted line of a roll.
#[derive(Debug, Clone, PartialEq)]
pub struct RollEntry {
    pub voter: Voter,
    pub weight: f64,
}

/// A parsed roll: the accepted entries plus the 1-based numbers of the lines
/// that were skipped because they were incomplete or carried a bad weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roll {
    pub entries: Vec<RollEntry>,
    pub skipped: Vec<usize>,
}

impl Roll {
    /// Parse a roll. This never fails as a whole; malformed lines are
    /// reported in [`Roll::skipped`].
    pub fn parse(text: &str) -> Self {
        let mut roll = Self::default();
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        for (idx, record) in reader.into_records().enumerate() {
            let line = match &record {
                Ok(record) => record.position().map(|p| p.line() as usize),
                Err(err) => err.position().map(|p| p.line() as usize),
            }
            .unwrap_or(idx + 1);
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    debug!("Skipping unreadable roll line {line}: {err}");
                    roll.skipped.push(line);
                    continue;
                }
            };

            if record.iter().all(str::is_empty) {
                continue;
            }
            if idx == 0
                && record
                    .get(0)
                    .map(str::to_lowercase)
                    .map_or(false, |cell| HEADER_MARKERS.iter().any(|m| cell.contains(m)))
            {
                continue;
            }

            match Self::parse_record(&record) {
                Some(entry) => roll.entries.push(entry),
                None => {
                    debug!("Skipping invalid roll line {line}: {record:?}");
                    roll.skipped.push(line);
                }
            }
        }
        roll
    }

    fn parse_record(record: &csv::StringRecord) -> Option<RollEntry> {
        let national_id = record.get(0).filter(|s| !s.is_empty())?;
        let apartment = record.get(1).filter(|s| !s.is_empty())?;
        let weight = record.get(2)?.parse::<f64>().ok()?;
        if !(weight.is_finite() && weight > 0.0) {
            return None;
        }
        let voter = Voter::new(national_id, apartment, None).ok()?;
        Some(RollEntry { voter, weight })
    }

    /// Apartment weights for the accepted lines; later lines win.
    pub fn weights(&self) -> Vec<WeightEntry> {
        self.entries
            .iter()
            .map(|entry| WeightEntry {
                apartment: entry.voter.apartment.clone(),
                weight: entry.weight,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a roll import, as reported to the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Voters registered or updated.
    pub voters: usize,
    /// Distinct apartments in the new weight table.
    pub apartments: usize,
    /// Line numbers that were not imported.
    pub skipped: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_optional() {
        let with_header = "Cedula,Apartamento,Peso\n123456789,A101,1.5\n987654321,A102,2\n";
        let without_header = "123456789,A101,1.5\n987654321,A102,2\n";

        let a = Roll::parse(with_header);
        let b = Roll::parse(without_header);
        assert_eq!(a.entries, b.entries);
        assert_eq!(a.entries.len(), 2);
        assert!(a.skipped.is_empty());
        assert_eq!(a.entries[0].voter, Voter::example());
        assert_eq!(a.entries[0].weight, 1.5);
    }

    #[test]
    fn fields_are_trimmed_and_blank_lines_ignored() {
        let roll = Roll::parse("\n 123456789 ,  A101 , 1.5 \n\n   \n");
        assert_eq!(roll.entries.len(), 1);
        assert_eq!(roll.entries[0].voter.national_id, "123456789");
        assert_eq!(roll.entries[0].voter.apartment, "A101");
        assert!(roll.skipped.is_empty());
    }

    #[test]
    fn invalid_lines_are_reported() {
        let text = "cedula,apartamento,peso\n\
                    123456789,A101,1.5\n\
                    555,,1\n\
                    666,B1\n\
                    777,B2,abc\n\
                    888,B3,0\n\
                    999,B4,-2\n\
                    987654321,A102,2.0\n";
        let roll = Roll::parse(text);
        assert_eq!(roll.entries.len(), 2);
        assert_eq!(roll.skipped, vec![3, 4, 5, 6, 7]);

        let weights = roll.weights();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[1].apartment, "A102");
        assert_eq!(weights[1].weight, 2.0);
    }

    #[test]
    fn header_only_in_first_line() {
        let roll = Roll::parse("123456789,A101,1.5\ncedula,A102,1\n");
        assert_eq!(roll.entries.len(), 2);
        assert_eq!(roll.entries[1].voter.national_id, "cedula");
    }

    #[test]
    fn empty_input() {
        let roll = Roll::parse("");
        assert!(roll.is_empty());
        assert!(roll.skipped.is_empty());
    }
}
