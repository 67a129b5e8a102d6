use crate::error::{Error, Result};
use crate::model::{
    api::voter::NewVoter,
    common::{
        roll::{ImportSummary, Roll},
        voter::Voter,
        weights::{WeightEntry, WeightTable},
    },
};

use super::{Assembly, AssemblyEvent};

impl Assembly {
    /// Add a voter to the roll, or replace the entry with the same national ID.
    pub async fn register_voter(&self, new_voter: NewVoter) -> Result<Voter> {
        let voter = Voter::try_from(new_voter)?;
        self.read("upsert voter", || self.store.upsert_voter(&voter))
            .await?;
        info!(
            "Registered voter {} for apartment {}",
            voter.national_id, voter.apartment
        );
        self.publish(AssemblyEvent::RollChanged);
        Ok(voter)
    }

    pub async fn lookup_voter(&self, national_id: &str) -> Result<Voter> {
        let national_id = national_id.trim();
        self.read("find voter", || self.store.find_voter(national_id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Voter {national_id}")))
    }

    pub async fn list_voters(&self) -> Result<Vec<Voter>> {
        self.read("list voters", || self.store.list_voters()).await
    }

    /// Replace the whole weight table with `entries`.
    pub async fn import_weights(&self, entries: Vec<WeightEntry>) -> Result<WeightTable> {
        let table =
            WeightTable::from_entries(entries).map_err(|e| Error::bad_request(e.to_string()))?;
        self.read("replace weights", || self.store.replace_weights(&table))
            .await?;
        info!("Imported weights for {} apartments", table.len());
        self.publish(AssemblyEvent::RollChanged);
        Ok(table)
    }

    pub async fn weights(&self) -> Result<WeightTable> {
        self.read("load weights", || self.store.load_weights()).await
    }

    /// Import a `cedula,apartamento,peso` roll: register every valid line's
    /// voter and replace the weight table with the lines' apartment weights.
    pub async fn import_roll(&self, csv: &str) -> Result<ImportSummary> {
        let roll = Roll::parse(csv);
        if roll.is_empty() {
            return Err(Error::bad_request(format!(
                "No valid `cedula,apartamento,peso` lines found ({} skipped)",
                roll.skipped.len()
            )));
        }

        let table = WeightTable::from_entries(roll.weights())
            .map_err(|e| Error::bad_request(e.to_string()))?;
        for entry in &roll.entries {
            self.read("upsert voter", || self.store.upsert_voter(&entry.voter))
                .await?;
        }
        self.read("replace weights", || self.store.replace_weights(&table))
            .await?;

        if !roll.skipped.is_empty() {
            warn!("Roll import skipped lines {:?}", roll.skipped);
        }
        info!(
            "Imported roll: {} voters, {} apartments",
            roll.entries.len(),
            table.len()
        );
        self.publish(AssemblyEvent::RollChanged);
        Ok(ImportSummary {
            voters: roll.entries.len(),
            apartments: table.len(),
            skipped: roll.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::model::common::ballot::DEFAULT_WEIGHT;

    use super::*;

    #[rocket::async_test]
    async fn register_is_idempotent() {
        let assembly = Assembly::example();
        let first = assembly.register_voter(NewVoter::example()).await.unwrap();
        let second = assembly.register_voter(NewVoter::example()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(assembly.list_voters().await.unwrap(), vec![first]);
        assert_eq!(
            assembly.lookup_voter(" 123456789 ").await.unwrap(),
            Voter::example()
        );
    }

    #[rocket::async_test]
    async fn unknown_voter_is_not_found() {
        let assembly = Assembly::example();
        assert!(matches!(
            assembly.lookup_voter("000").await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn weight_import_replaces_the_table() {
        let assembly = Assembly::example();
        let entries = vec![
            WeightEntry {
                apartment: "A101".to_string(),
                weight: 1.5,
            },
            WeightEntry {
                apartment: "A102".to_string(),
                weight: 2.0,
            },
        ];
        assembly.import_weights(entries).await.unwrap();
        let table = assembly
            .import_weights(vec![WeightEntry {
                apartment: "B201".to_string(),
                weight: 0.5,
            }])
            .await
            .unwrap();

        assert_eq!(assembly.weights().await.unwrap(), table);
        assert_eq!(table.weight_for("B201"), 0.5);
        assert_eq!(table.weight_for("A101"), DEFAULT_WEIGHT);

        let bad = vec![WeightEntry {
            apartment: "A101".to_string(),
            weight: -1.0,
        }];
        assert!(matches!(
            assembly.import_weights(bad).await,
            Err(Error::BadRequest(_))
        ));
        assert_eq!(assembly.weights().await.unwrap(), table);
    }

    #[rocket::async_test]
    async fn roll_import() {
        let assembly = Assembly::example();
        let csv = "cedula,apartamento,peso\n123456789,A101,1.5\nbroken line\n987654321,A102,2\n";
        let summary = assembly.import_roll(csv).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                voters: 2,
                apartments: 2,
                skipped: vec![3],
            }
        );
        assert_eq!(
            assembly.lookup_voter("987654321").await.unwrap(),
            Voter::example2()
        );
        assert_eq!(assembly.weights().await.unwrap().weight_for("A101"), 1.5);

        assert!(matches!(
            assembly.import_roll("cedula,apartamento,peso\n").await,
            Err(Error::BadRequest(_))
        ));
    }
}
