//! Application settings, read from `settings.toml` and `PACKATTACK__*`
//! environment variables (e.g. `PACKATTACK__SERVER__PORT=8080`).
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 3000
//! database = { sqlite = "packattack.db" }
//! rng_seed = 42
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    /// Fixed seed for the draw RNG; random when absent.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("PACKATTACK")
                        .prefix_separator("__")
                        .separator("__"),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("app.level", "info")?
            .set_default("server.port", 3000)?
            .set_default("server.database", "memory")?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Settings::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap()
    }

    #[test]
    fn defaults_apply_to_an_empty_file() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        let server = settings.server.unwrap();
        assert_eq!(server.port, 3000);
        assert_eq!(server.database, Database::Memory);
        assert_eq!(server.bind, None);
        assert_eq!(server.rng_seed, None);
    }

    #[test]
    fn sqlite_database_and_seed_are_read() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            bind = "0.0.0.0"
            port = 8080
            database = { sqlite = "cards.db" }
            rng_seed = 7
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        let server = settings.server.unwrap();
        assert_eq!(server.bind.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, 8080);
        assert_eq!(server.database, Database::Sqlite("cards.db".to_string()));
        assert_eq!(server.rng_seed, Some(7));
    }
}
