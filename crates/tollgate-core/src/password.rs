// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Password hashing with Argon2id.
//!
//! Hashes are stored in PHC string format, so verification reads the cost
//! parameters from the stored hash rather than from the current settings.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::OnceCell;

use crate::error::{StoreError, StoreResult};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingCost {
    /// Smallest parameters argon2 accepts. Only for tests and local tooling.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// One-way password hasher with constant-time verification.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    cost: HashingCost,
    dummy_hash: OnceCell<String>,
}

impl CredentialHasher {
    /// Creates a hasher with the given cost.
    pub fn new(cost: HashingCost) -> StoreResult<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| StoreError::hashing(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
            dummy_hash: OnceCell::new(),
        })
    }

    /// Creates a hasher with the cheapest valid parameters.
    pub fn low_cost() -> StoreResult<Self> {
        Self::new(HashingCost::minimal())
    }

    /// Returns the configured cost.
    pub fn cost(&self) -> HashingCost {
        self.cost
    }

    /// Hashes a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> StoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::hashing(e.to_string()))
    }

    /// Checks a password against a stored PHC hash.
    ///
    /// An unparseable hash never verifies.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
                false
            }
        }
    }

    /// Spends the same work as [`verify`](Self::verify) for an unknown user.
    ///
    /// Always returns `false`.
    pub fn verify_absent(&self, password: &str) -> bool {
        match self.dummy_hash.get_or_try_init(|| self.hash("tollgate-dummy-password")) {
            Ok(dummy) => {
                let _ = self.verify(password, dummy);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to prepare dummy password hash"),
        }
        false
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = CredentialHasher::low_cost().unwrap();
        let hash = hasher.hash("pw1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("pw1", &hash));
        assert!(!hasher.verify("pw2", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = CredentialHasher::low_cost().unwrap();
        assert_ne!(hasher.hash("pw1").unwrap(), hasher.hash("pw1").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        let hasher = CredentialHasher::low_cost().unwrap();
        assert!(!hasher.verify("pw1", "not-a-phc-string"));
        assert!(!hasher.verify("", ""));
    }

    #[test]
    fn test_verify_absent_is_false() {
        let hasher = CredentialHasher::low_cost().unwrap();
        assert!(!hasher.verify_absent("tollgate-dummy-password"));
        assert!(!hasher.verify_absent("anything"));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let cost = HashingCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            CredentialHasher::new(cost),
            Err(StoreError::Hashing { .. })
        ));
    }

    #[test]
    fn test_default_cost_matches_argon2_defaults() {
        let cost = HashingCost::default();
        assert_eq!(cost.memory_kib, Params::DEFAULT_M_COST);
        assert_eq!(cost.iterations, Params::DEFAULT_T_COST);
    }
}
