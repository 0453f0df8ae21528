use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Infeasible selection: no pool can supply {category} '{item}' ({reason})")]
    InfeasibleSelection {
        item: String,
        category: String,
        reason: String,
    },

    #[error("{kind} '{name}' not found in the content repository")]
    ContentNotFound { kind: String, name: String },

    #[error("Locked filter violated on key '{key}'")]
    LockedFilterViolation { key: String },

    #[error("Locked filters cannot be satisfied: {0}")]
    LockedFiltersUnsatisfiable(String),

    #[error("Content error: {0}")]
    Content(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

impl ForgeError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ForgeError::ContentNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Errors that only spoil the individual being built, not the whole run
    pub fn is_individual_fault(&self) -> bool {
        matches!(
            self,
            ForgeError::InfeasibleSelection { .. }
                | ForgeError::ContentNotFound { .. }
                | ForgeError::LockedFilterViolation { .. }
        )
    }

    /// Short label used when tallying discarded individuals
    pub fn cause_label(&self) -> &'static str {
        match self {
            ForgeError::InfeasibleSelection { .. } => "infeasible_selection",
            ForgeError::ContentNotFound { .. } => "content_not_found",
            ForgeError::LockedFilterViolation { .. } => "locked_filter_violation",
            ForgeError::LockedFiltersUnsatisfiable(_) => "locked_filters_unsatisfiable",
            ForgeError::Content(_) => "content",
            ForgeError::Configuration(_) => "configuration",
            ForgeError::Search(_) => "search",
            ForgeError::Io(_) => "io",
            ForgeError::Serde(_) => "serde",
            ForgeError::TomlDe(_) | ForgeError::TomlSer(_) => "toml",
            ForgeError::ConfigSource(_) => "config_source",
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
