//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Fetch markup documents and their resources under an origin policy.
#[derive(Parser, Debug)]
#[command(name = "markup-agent")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON config file (fields of AgentConfig)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Whole-request timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Public suffix list to use instead of the bundled one
    #[arg(long, global = true)]
    pub suffix_list: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Agent subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Retrieve a document and print its metadata
    Fetch {
        /// Document URL
        url: Url,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the registrable domain of each host
    Domain {
        /// Host names
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Download a resource, optionally on behalf of a document
    Get {
        /// Resource URL
        url: Url,

        /// Document that wants the resource; enables the origin check
        #[arg(long)]
        document: Option<Url>,
    },

    /// Download the first URL of a font-face `src` value
    Font {
        /// The `src` descriptor, e.g. "url(a.woff2) format('woff2'), url(a.ttf)"
        src: String,

        /// Base URL for relative sources
        #[arg(long)]
        base: Option<Url>,
    },
}
