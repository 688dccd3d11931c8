use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// An artist credit. Immutable; the only invariant is a non-empty name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("artist name must not be empty"));
        }
        Ok(Self { name })
    }
}

impl std::fmt::Display for Artist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(Artist::new("").is_err());
        assert!(Artist::new("   ").is_err());
    }

    #[test]
    fn accepts_name() {
        let a = Artist::new("Radiohead").unwrap();
        assert_eq!(a.name, "Radiohead");
    }
}
