use crate::error::ConfigError;
use crate::pager::DEFAULT_PAGE_SIZE;

pub const DEFAULT_DATABASE: &str = "preprod";
pub const DEFAULT_COLLECTION: &str = "employees";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Mongo { uri: String },
    /// Records live in process memory and vanish on restart.
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub database: String,
    pub collection: String,
    pub page_size: usize,
}

impl AppConfig {
    /// Build the configuration from a secret lookup such as
    /// `|key| secrets.get(key)`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("mongodb") => Backend::Mongo {
                uri: lookup("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
            },
            Some("memory") => Backend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    reason: format!("expected `mongodb` or `memory`, got `{other}`"),
                });
            }
        };

        let page_size = match lookup("PAGE_SIZE") {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "PAGE_SIZE",
                        reason: format!("expected a positive integer, got `{raw}`"),
                    });
                }
            },
        };

        Ok(Self {
            backend,
            database: lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.into()),
            collection: lookup("EMPLOYEES_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            page_size,
        })
    }
}
