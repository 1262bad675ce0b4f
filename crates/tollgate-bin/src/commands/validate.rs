// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::path::Path;

use serde_json::json;
use tollgate_config::TollgateConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = tollgate_config::load_config(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => print_text(config_path, &config, &warnings, args.show_config)?,
        OutputFormat::Json => {
            let output = json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": summary(&config),
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Yaml => {
            println!("valid: true");
            println!("config_path: {}", config_path.display());
            println!("listen: {}", config.server.socket_addr());
            println!("public_prefix: {}", config.server.public_prefix);
            println!("database: {}", config.database.path.display());
            if !warnings.is_empty() {
                println!("warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

/// Schema warnings plus checks that need the filesystem.
pub fn collect_warnings(config: &TollgateConfig) -> Vec<String> {
    let mut warnings = config.warnings();

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            warnings.push(format!(
                "Database directory does not exist and will be created: {}",
                parent.display()
            ));
        }
    }

    warnings
}

fn summary(config: &TollgateConfig) -> serde_json::Value {
    json!({
        "listen": config.server.socket_addr().to_string(),
        "public_prefix": config.server.public_prefix,
        "database": config.database.path.display().to_string(),
        "algorithm": config.security.jwt.algorithm,
        "access_ttl_secs": config.security.jwt.access_ttl_secs,
        "refresh_ttl_secs": config.security.jwt.refresh_ttl_secs,
    })
}

fn print_text(
    path: &Path,
    config: &TollgateConfig,
    warnings: &[String],
    show_config: bool,
) -> BinResult<()> {
    println!("✓ Configuration is valid: {}", path.display());
    println!();
    println!("Summary:");
    println!("  Listen:        {}", config.server.socket_addr());
    println!("  Public prefix: {}", config.server.public_prefix);
    println!("  Database:      {}", config.database.path.display());
    println!("  Algorithm:     {:?}", config.security.jwt.algorithm);
    if let Some(ttl) = config.security.jwt.access_ttl_secs {
        println!("  Access TTL:    {ttl}s");
    }
    if let Some(ttl) = config.security.jwt.refresh_ttl_secs {
        println!("  Refresh TTL:   {ttl}s");
    }

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  ⚠ {}", warning);
        }
    }

    if show_config {
        println!();
        println!("Parsed configuration:");
        println!("{}", serde_json::to_string_pretty(config)?);
    }

    Ok(())
}
