//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pagebuilder static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to root (default: pagebuilder.toml)
    #[arg(short = 'C', long, default_value = "pagebuilder.toml")]
    pub config: PathBuf,

    /// Pages directory path (relative to project root)
    #[arg(long)]
    pub pages: Option<PathBuf>,

    /// Templates directory path (relative to project root)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Assets directory path (relative to project root)
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source file extension, including the dot (default: .html)
    #[arg(short, long)]
    pub ext: Option<String>,

    /// Log every request and asset copy
    #[arg(short, long)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Deletes the output directory if there is one and rebuilds the site
    Build {
        /// Exit with an error if any page fails to render
        #[arg(long)]
        strict: bool,
    },

    /// Build, then serve the output directory and rebuild incrementally on change
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["pagebuilder", "--output", "public", "build", "--strict"]);
        assert!(cli.is_build());
        assert_eq!(cli.output, Some(PathBuf::from("public")));
        assert!(matches!(cli.command, Commands::Build { strict: true }));
    }

    #[test]
    fn test_parse_serve_watch_flag() {
        let cli = Cli::parse_from(["pagebuilder", "serve", "-p", "8080", "--watch", "false"]);
        assert!(cli.is_serve());
        match cli.command {
            Commands::Serve { port, watch, .. } => {
                assert_eq!(port, Some(8080));
                assert_eq!(watch, Some(false));
            }
            Commands::Build { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_default_config_name() {
        let cli = Cli::parse_from(["pagebuilder", "build"]);
        assert_eq!(cli.config, PathBuf::from("pagebuilder.toml"));
        assert!(cli.root.is_none());
    }
}
