/// Configuration for the Postgres record store.
#[derive(Debug, Clone)]
pub struct PostgresStoreConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Table name prefix (e.g. "reliquary_").
    pub prefix: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
}

impl PostgresStoreConfig {
    /// Create a new configuration with the given URL and defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: "reliquary_".to_owned(),
            max_connections: 5,
        }
    }

    /// Set the table prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}
