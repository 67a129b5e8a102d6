#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::model::store::Store;

pub mod api;
pub mod assembly;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use assembly::Assembly;
pub use config::Config;

/// Build the server from `Rocket.toml` and the `ROCKET_*` environment.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build(), StoreFairing::new())
}

/// Build the server from an explicit configuration, running on `store`
/// regardless of the configured one.
pub fn rocket_for_store(figment: Figment, store: Arc<dyn Store>) -> Rocket<Build> {
    assemble(rocket::custom(figment), StoreFairing::with_store(store))
}

fn assemble(rocket: Rocket<Build>, store: StoreFairing) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(ConfigFairing)
        .attach(store)
        .attach(LoggerFairing)
}

/// A server over a fresh in-memory store, with the example admin account.
#[cfg(test)]
pub(crate) fn rocket_for_tests() -> Rocket<Build> {
    rocket_for_store(
        config::examples::test_figment(),
        Arc::new(model::store::MemoryStore::new()),
    )
}
