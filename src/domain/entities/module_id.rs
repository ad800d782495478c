use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::fmt;

use crate::application::errors::CogError;

/// Namespace every loadable cog lives under
pub const COG_NAMESPACE: &str = "cogs";

static MODULE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)+$").expect("module id pattern is valid")
});

/// Namespaced identifier of a loadable cog, e.g. `cogs.owner`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Parse a fully qualified identifier.
    pub fn parse(raw: &str) -> Result<Self, CogError> {
        let id = raw.trim().to_lowercase();
        if MODULE_ID_RE.is_match(&id) {
            Ok(Self(id))
        } else {
            Err(CogError::InvalidIdentifier(raw.trim().to_string()))
        }
    }

    /// Parse operator input, adding the `cogs.` namespace when it is missing.
    pub fn normalize(input: &str) -> Result<Self, CogError> {
        let trimmed = input.trim();
        let prefix = format!("{}.", COG_NAMESPACE);
        if trimmed.to_lowercase().starts_with(&prefix) {
            Self::parse(trimmed)
        } else {
            Self::parse(&format!("{}{}", prefix, trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, e.g. `general` for `cogs.general`
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
