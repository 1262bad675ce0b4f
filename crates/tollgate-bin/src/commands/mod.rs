// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Start the HTTP server
//! - `validate`: Validate configuration file
//! - `version`: Show version information
//! - `gen-key`: Generate a signing secret
//! - `prune`: Delete invalidated token rows

mod gen_key;
mod prune;
mod run;
mod validate;
mod version;

pub use gen_key::{gen_key, generate_secret};
pub use prune::prune;
pub use run::run;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run => run::run(&cli).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::GenKey(args) => gen_key::gen_key(&cli, args),
        Commands::Prune => prune::prune(&cli).await,
    }
}
