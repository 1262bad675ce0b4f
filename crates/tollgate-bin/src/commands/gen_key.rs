// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `gen-key` command.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{RngCore, rngs::OsRng};

use crate::cli::{Cli, GenKeyArgs};
use crate::error::{BinError, BinResult};

/// Shortest key accepted; HS256 wants at least its digest size.
const MIN_KEY_BYTES: usize = 32;

/// Largest key accepted.
const MAX_KEY_BYTES: usize = 1024;

/// Executes the `gen-key` command.
pub fn gen_key(cli: &Cli, args: GenKeyArgs) -> BinResult<()> {
    let secret = generate_secret(args.bytes)?;

    if cli.quiet {
        println!("{secret}");
    } else {
        println!("Generated {}-byte signing secret:", args.bytes);
        println!();
        println!("  {secret}");
        println!();
        println!("Add it to your configuration:");
        println!();
        println!("  security:");
        println!("    jwt:");
        println!("      secret: \"{secret}\"");
        println!();
        println!("or export TOLLGATE_JWT_SECRET. Keep it out of version control.");
    }

    Ok(())
}

/// Returns `bytes` random bytes from the OS generator, base64 encoded.
pub fn generate_secret(bytes: usize) -> BinResult<String> {
    if !(MIN_KEY_BYTES..=MAX_KEY_BYTES).contains(&bytes) {
        return Err(BinError::config(format!(
            "Key size must be between {MIN_KEY_BYTES} and {MAX_KEY_BYTES} bytes, got {bytes}"
        )));
    }

    let mut key = vec![0u8; bytes];
    OsRng.fill_bytes(&mut key);
    Ok(STANDARD.encode(&key))
}
