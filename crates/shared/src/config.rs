//! Database configuration, validated from the process environment

use url::Url;

use crate::error::{ConfigError, Result};

/// Environment variable holding the connection string
pub const MONGODB_URI: &str = "MONGODB_URI";

/// Optional override for the database name
pub const DATABASE_NAME: &str = "DATABASE_NAME";

/// Database used when neither the URI nor the environment names one
pub const DEFAULT_DATABASE_NAME: &str = "reservations";

/// Which kind of store a connection string points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseScheme {
    /// `mongodb://`
    Mongodb,
    /// `mongodb+srv://`
    MongodbSrv,
    /// `memory://` - process-local store, used for development and tests
    Memory,
}

impl DatabaseScheme {
    /// Whether connection strings of this scheme must name a host
    pub fn requires_host(&self) -> bool {
        !matches!(self, Self::Memory)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongodb => "mongodb",
            Self::MongodbSrv => "mongodb+srv",
            Self::Memory => "memory",
        }
    }
}

impl core::fmt::Display for DatabaseScheme {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DatabaseScheme {
    type Err = ConfigError;

    fn from_str(scheme: &str) -> Result<Self> {
        match scheme {
            "mongodb" => Ok(Self::Mongodb),
            "mongodb+srv" => Ok(Self::MongodbSrv),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid(
                MONGODB_URI,
                format!("has unsupported scheme '{}' (expected mongodb, mongodb+srv or memory)", other),
            )),
        }
    }
}

/// Validated database connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    uri: String,
    scheme: DatabaseScheme,
    name: String,
}

impl DatabaseConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// `MONGODB_URI` is required. The database name comes from
    /// `DATABASE_NAME`, then from the URI path, then falls back to
    /// [`DEFAULT_DATABASE_NAME`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup(MONGODB_URI)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::missing(MONGODB_URI))?;

        let parsed = Url::parse(&uri).map_err(|err| {
            ConfigError::invalid(MONGODB_URI, format!("must be a URI of the form <scheme>://... ({})", err))
        })?;

        let scheme: DatabaseScheme = parsed.scheme().parse()?;

        let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
        if scheme.requires_host() && !has_host {
            return Err(ConfigError::invalid(MONGODB_URI, "must include a host"));
        }

        let name = match lookup(DATABASE_NAME).map(|value| value.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            Some(_) => return Err(ConfigError::invalid(DATABASE_NAME, "must not be empty")),
            None => database_from_url(&parsed).unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
        };

        Ok(Self { uri, scheme, name })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn scheme(&self) -> DatabaseScheme {
        self.scheme
    }

    pub fn database_name(&self) -> &str {
        &self.name
    }
}

/// `scheme://host:port/name?options` -> `name`
fn database_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
