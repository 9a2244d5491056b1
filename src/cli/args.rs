//! CLI argument definitions using clap
//!
//! Commands:
//! - mdr-lifecycle init
//! - mdr-lifecycle library list | add | set-editable
//! - mdr-lifecycle item create | edit | approve | new-version | inactivate |
//!   reactivate | delete | show | versions | history | actions | list
//! - mdr-lifecycle audit
//!
//! Every command takes `--config <path>` (default `./mdr.json`).

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// mdr-lifecycle - versioned metadata items with an auditable history
#[derive(Parser, Debug)]
#[command(name = "mdr-lifecycle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./mdr.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory and provision configured libraries
    Init,

    /// Library administration
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Item lifecycle operations
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Print the audit trail, newest first
    Audit {
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Page size, 0 for everything
        #[arg(long, default_value_t = 50)]
        size: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibraryAction {
    /// List provisioned libraries
    List,

    /// Provision a new library
    Add {
        name: String,

        /// Provision the library as non-editable
        #[arg(long)]
        locked: bool,
    },

    /// Lock or unlock a library
    SetEditable {
        name: String,

        #[arg(action = ArgAction::Set)]
        editable: bool,
    },
}

/// Author and optional description shared by the simple transitions.
#[derive(Args, Debug)]
pub struct TransitionArgs {
    pub uid: String,

    #[arg(long)]
    pub author: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ItemAction {
    /// Create an item in Draft 0.1
    Create {
        #[arg(long)]
        library: String,

        #[arg(long)]
        author: String,

        /// Payload JSON; read from stdin when omitted
        #[arg(long)]
        payload: Option<String>,
    },

    /// Replace the payload of a draft
    Edit {
        uid: String,

        #[arg(long)]
        author: String,

        #[arg(long)]
        description: String,

        /// Payload JSON; read from stdin when omitted
        #[arg(long)]
        payload: Option<String>,
    },

    /// Approve a draft
    Approve(TransitionArgs),

    /// Open a new draft from a final version
    NewVersion(TransitionArgs),

    /// Retire a final version
    Inactivate(TransitionArgs),

    /// Bring a retired item back to final
    Reactivate(TransitionArgs),

    /// Erase a never-approved draft or soft-delete a retired item
    Delete {
        uid: String,

        #[arg(long)]
        author: String,
    },

    /// Show one version of an item (latest by default)
    Show {
        uid: String,

        /// Exact version, e.g. "1.0"
        #[arg(long)]
        version: Option<String>,

        /// Draft, Final or Retired
        #[arg(long)]
        status: Option<String>,

        /// RFC 3339 timestamp
        #[arg(long)]
        at: Option<String>,
    },

    /// Version metadata of every record, oldest first
    Versions { uid: String },

    /// Full history records, oldest first
    History { uid: String },

    /// Actions currently allowed
    Actions { uid: String },

    /// List current items
    List {
        #[arg(long)]
        library: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
