use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vtok",
    about = "vtok software token administration",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file supplying default paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or modify a token's object store
    Objects(ObjectsArgs),
    /// Manage per-user isolate credentials
    Isolate(IsolateArgs),
    /// Print the effective configuration
    Config,
}

/// Which token store to operate on.
#[derive(Args)]
pub struct StoreArgs {
    /// Path of the object log; overrides --token
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Token name under the configured store root
    #[arg(long, default_value = "default")]
    pub token: String,
}

#[derive(Args)]
pub struct ObjectsArgs {
    #[command(subcommand)]
    pub action: ObjectsAction,
}

#[derive(Subcommand)]
pub enum ObjectsAction {
    /// List stored objects
    List(StoreArgs),
    /// Add a token-resident data object
    AddData(AddDataArgs),
    /// Rewrite the object log without dead records
    Compact(StoreArgs),
}

#[derive(Args)]
pub struct AddDataArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    #[arg(long)]
    pub label: String,
    /// Object value as hex
    #[arg(long, default_value = "")]
    pub value: String,
    #[arg(long)]
    pub application: Option<String>,
    /// Mark the object private
    #[arg(long)]
    pub private: bool,
}

#[derive(Args)]
pub struct IsolateArgs {
    #[command(subcommand)]
    pub action: IsolateAction,
}

/// Whose credential, and where credentials live.
#[derive(Args)]
pub struct UserArgs {
    /// User name; defaults to the current user
    #[arg(long)]
    pub user: Option<String>,
    /// Credential directory; overrides the configured one
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum IsolateAction {
    /// Report whether a credential is saved
    Show(UserArgs),
    /// Save a credential given as hex
    Save {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long)]
        credential: String,
    },
    /// Generate and save a fresh credential
    Generate {
        #[command(flatten)]
        user: UserArgs,
        /// Replace an existing credential
        #[arg(long)]
        force: bool,
    },
}
