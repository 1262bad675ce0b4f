// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `prune` command.

use tracing::info;

use tollgate_config::{TollgateConfig, load_config};
use tollgate_core::TokenRegistry;

use crate::cli::Cli;
use crate::error::{BinError, BinResult};
use crate::runtime::open_store;

/// Executes the `prune` command against the configured database.
pub async fn prune(cli: &Cli) -> BinResult<()> {
    let config = load_config(&cli.config)?;
    let removed = prune_with(config).await?;

    if cli.quiet {
        println!("{removed}");
    } else {
        println!("Removed {removed} invalidated token row(s)");
    }
    Ok(())
}

/// Opens the store and deletes every revoked or expired token row.
pub async fn prune_with(config: TollgateConfig) -> BinResult<usize> {
    let removed = tokio::task::spawn_blocking(move || -> BinResult<usize> {
        let store = open_store(&config)?;
        Ok(store.purge_invalidated()?)
    })
    .await
    .map_err(|e| BinError::runtime(format!("prune task failed: {e}")))??;

    info!(removed, "Pruned token registry");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_config::SecretValue;
    use tollgate_core::{CredentialStore, NewUser, TokenKind};

    #[tokio::test]
    async fn test_prune_removes_only_invalidated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TollgateConfig::default();
        config.database.path = dir.path().join("tollgate.db");
        config.security.jwt.secret = Some(SecretValue::new(
            "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=",
        ));

        {
            let store = open_store(&config).unwrap();
            let user = store
                .create_user(NewUser {
                    name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                    password_hash: "hash".to_string(),
                })
                .unwrap();
            store.record("old-access", TokenKind::Access, user.id).unwrap();
            store.record("old-refresh", TokenKind::Refresh, user.id).unwrap();
            store.invalidate_all_for_owner(user.id).unwrap();
            store.record("live-access", TokenKind::Access, user.id).unwrap();
        }

        let removed = prune_with(config.clone()).await.unwrap();
        assert_eq!(removed, 2);

        let store = open_store(&config).unwrap();
        assert!(store.find_by_value("live-access").unwrap().is_some());
        assert!(store.find_by_value("old-access").unwrap().is_none());
    }
}
