use std::fmt;

use subtle::ConstantTimeEq;

/// Password used when no administrator secret is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Shared-secret check guarding lifecycle actions.
#[derive(Clone)]
pub struct AdminAuth {
    secret: String,
}

impl AdminAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compares `provided` against the configured secret without an early
    /// exit on the first differing byte.
    pub fn is_admin(&self, provided: &str) -> bool {
        bool::from(provided.as_bytes().ct_eq(self.secret.as_bytes()))
    }

    /// True when no secret was configured and the fallback is in force.
    pub fn is_default(&self) -> bool {
        self.secret == DEFAULT_ADMIN_PASSWORD
    }
}

impl Default for AdminAuth {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_PASSWORD)
    }
}

impl fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAuth")
            .field("secret", &"<redacted>")
            .finish()
    }
}
