use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::assembly::{Assembly, RetryPolicy};
use crate::model::{
    api::admin::AdminCredentials,
    auth::Rights,
    store::{MemoryStore, MongoStore, Store},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_username: String,
    /// The attendance desk login is optional.
    desk_username: Option<String>,
    // secrets
    jwt_secret: String,
    admin_password_hash: String,
    desk_password_hash: Option<String>,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Check a login attempt against the configured staff accounts and
    /// return the rights it earns, if any.
    pub fn authenticate(&self, credentials: &AdminCredentials) -> Option<Rights> {
        if credentials.username == self.admin_username {
            return verify_password(&self.admin_password_hash, &credentials.password)
                .then_some(Rights::Coordinator);
        }
        match (&self.desk_username, &self.desk_password_hash) {
            (Some(username), Some(hash)) if *username == credentials.username => {
                verify_password(hash, &credentials.password).then_some(Rights::AttendanceDesk)
            }
            _ => None,
        }
    }
}

fn verify_password(hash: &str, password: &str) -> bool {
    match argon2::verify_encoded(hash, password.as_bytes()) {
        Ok(matches) => matches,
        Err(e) => {
            error!("Configured password hash is malformed: {e}");
            false
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with [`StoreFairing`] and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which [`Store`] implementation to run on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongodb,
    Memory,
}

/// Configuration for storage and the assembly service.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    store: StoreKind,
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(flatten)]
    retry: RetryPolicy,
    #[serde(default = "default_recent_ballots_limit")]
    recent_ballots_limit: usize,
    // secrets
    db_uri: Option<String>,
}

fn default_db_name() -> String {
    "condo_vote".to_string()
}

fn default_recent_ballots_limit() -> usize {
    50
}

/// A fairing that loads the storage config, connects to the configured
/// store, performs any setup necessary, and places the [`Assembly`] into
/// managed state.
///
/// A preset store skips the `store`/`db_uri` settings entirely.
#[derive(Default)]
pub struct StoreFairing {
    preset: Option<Arc<dyn Store>>,
}

impl StoreFairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given store instead of the configured one.
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            preset: Some(store),
        }
    }
}

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Assembly store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Arc<dyn Store> = match (&self.preset, config.store) {
            (Some(store), _) => store.clone(),
            (None, StoreKind::Memory) => {
                warn!("Using the in-memory store; nothing will survive a restart");
                Arc::new(MemoryStore::new())
            }
            (None, StoreKind::Mongodb) => match connect(&config).await {
                Some(store) => Arc::new(store),
                None => return Err(rocket),
            },
        };

        let assembly = Assembly::new(store, config.retry, config.recent_ballots_limit);
        rocket = rocket.manage(assembly);
        Ok(rocket)
    }
}

/// Connect to MongoDB and prepare the collections, logging any failure.
async fn connect(config: &StoreConfig) -> Option<MongoStore> {
    let Some(db_uri) = config.db_uri.as_deref() else {
        error!("`db_uri` must be set when `store = \"mongodb\"`");
        return None;
    };
    info!("Loaded database config, connecting...");
    let client = match MongoClient::with_uri_str(db_uri).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {e}");
            return None;
        }
    };
    let db = client.database(&config.db_name);

    // Ensures the required indexes exist.
    match MongoStore::new(client, &db).await {
        Ok(store) => {
            info!("...database connection online!");
            Some(store)
        }
        Err(e) => {
            error!("Failed to prepare database: {e}");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_credentials_are_checked() {
        let config = Config::example();
        assert_eq!(
            config.authenticate(&AdminCredentials::example()),
            Some(Rights::Coordinator)
        );
        assert_eq!(
            config.authenticate(&AdminCredentials::desk_example()),
            Some(Rights::AttendanceDesk)
        );
        assert_eq!(config.authenticate(&AdminCredentials::empty()), None);

        let mut wrong_password = AdminCredentials::example();
        wrong_password.password.push('!');
        assert_eq!(config.authenticate(&wrong_password), None);

        // The desk password does not open the coordinator account.
        let mut swapped = AdminCredentials::example();
        swapped.password = AdminCredentials::desk_example().password;
        assert_eq!(config.authenticate(&swapped), None);
    }

    #[test]
    fn desk_login_is_optional() {
        let config: Config = rocket::Config::figment()
            .merge(("auth_ttl", 60))
            .merge(("admin_username", "coordinator"))
            .merge(("jwt_secret", "secret"))
            .merge(("admin_password_hash", examples::example_password_hash()))
            .extract()
            .unwrap();
        assert_eq!(config.authenticate(&AdminCredentials::desk_example()), None);
        assert_eq!(
            config.authenticate(&AdminCredentials::example()),
            Some(Rights::Coordinator)
        );
    }

    #[test]
    fn store_config_defaults() {
        let config: StoreConfig = examples::test_figment().extract().unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.db_name, "condo_vote");
        assert_eq!(config.recent_ballots_limit, 5);
        assert_eq!(config.retry, RetryPolicy::new(1000, 3, 100));
    }
}
