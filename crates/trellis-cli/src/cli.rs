use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "trellis", version, about = "Evaluate trellis policies from the command line")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a policy document and check it against the configured limits.
    Validate { policy: PathBuf },

    /// Check permissions on a resource (`type:/path`, or `/path` for the
    /// default resource type).
    Check {
        policy: PathBuf,
        resource: String,
        #[arg(short, long = "permission", required = true)]
        permissions: Vec<String>,
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,
        /// Require the permissions on the whole subtree.
        #[arg(long, conflicts_with = "any_subtree")]
        subtree: bool,
        /// Accept the permissions anywhere in the subtree.
        #[arg(long)]
        any_subtree: bool,
    },

    /// Show which nodes decided a permission.
    Explain {
        policy: PathBuf,
        resource: String,
        #[arg(short, long)]
        permission: String,
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,
    },

    /// List subjects that can see part of (or, with `--unrestricted`, all of)
    /// a resource.
    Subjects {
        policy: PathBuf,
        resource: String,
        #[arg(short, long)]
        permission: String,
        #[arg(long)]
        unrestricted: bool,
    },

    /// Filter a JSON document down to what the subjects may see.
    View {
        policy: PathBuf,
        resource: String,
        document: PathBuf,
        #[arg(short, long = "permission", default_value = "READ")]
        permissions: Vec<String>,
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,
    },
}
