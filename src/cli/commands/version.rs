//! Version command for displaying build information

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::cli::CommandContext;
use crate::engine::Engine;

#[derive(Args, Clone)]
pub struct VersionArgs {}

pub struct VersionCommand {
    _args: VersionArgs,
}

impl VersionCommand {
    pub fn new(args: VersionArgs) -> Self {
        Self { _args: args }
    }

    pub async fn execute(&self, _engine: &Engine, ctx: &CommandContext) -> Result<()> {
        const VERSION: &str = env!("CARGO_PKG_VERSION");
        const PKG_NAME: &str = env!("CARGO_PKG_NAME");
        const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

        if ctx.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "name": PKG_NAME,
                    "version": VERSION,
                    "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
                }))?
            );
            return Ok(());
        }

        println!(
            "{} v{}",
            PKG_NAME.bright_blue().bold(),
            VERSION.bright_green()
        );
        if !PKG_DESCRIPTION.is_empty() {
            println!("{PKG_DESCRIPTION}");
        }
        println!();
        println!("{}", "Build Information:".bright_yellow());
        println!(
            "  Profile: {}",
            if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            }
        );
        Ok(())
    }
}
