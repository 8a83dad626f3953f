use thiserror::Error;

/// Sentinel used in diagnostics when a reference carries no URI at all.
pub const NULL_URI: &str = "null";

/// Errors that can occur while registering or dispatching resolvers.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// No candidate and no registered resolver reported capability.
    #[error("no resolver found for uri '{uri}' (base uri: '{base_uri}')")]
    NotFound { uri: String, base_uri: String },

    /// A strategy instance could not be constructed.
    #[error("could not instantiate resolver '{strategy}': {message}")]
    Instantiation { strategy: String, message: String },

    /// A strategy accepted the reference but failed to produce its content.
    #[error("resolver '{strategy}' failed for uri '{uri}': {message}")]
    Resolution {
        strategy: String,
        uri: String,
        message: String,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias for results using `ResolverError`.
pub type Result<T> = std::result::Result<T, ResolverError>;
