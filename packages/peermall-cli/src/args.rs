use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "peermall")]
#[command(about = "Inspect and maintain a PeerMall content store", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "PEERMALL_DB")]
    pub db: Option<PathBuf>,

    /// Per-operation timeout in milliseconds
    #[arg(long, global = true, env = "PEERMALL_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show build, schema and store information
    Info,

    /// Peer spaces
    #[command(subcommand)]
    Space(SpaceCommand),

    /// Content items
    #[command(subcommand)]
    Content(ContentCommand),

    /// Forum maintenance
    #[command(subcommand)]
    Forum(ForumCommand),
}

#[derive(Subcommand, Debug)]
pub enum SpaceCommand {
    /// Create a peer space
    Create {
        /// Unique address
        address: String,
        /// Display title
        title: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Owner's peer id
        #[arg(long)]
        owner_peer_id: Option<String>,
        /// Owner's display name
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show one peer space
    Show { address: String },

    /// List peer spaces
    #[command(alias = "ls")]
    List {
        /// Only spaces owned by this peer id
        #[arg(long)]
        owner_peer_id: Option<String>,
    },

    /// Follow (or with --undo, unfollow) a peer space
    Follow {
        address: String,
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ContentCommand {
    /// Add a content item to a peer space
    Add(AddContent),

    /// List a peer space's content, newest first
    #[command(alias = "ls")]
    List {
        /// Peer space address
        peer_space: String,
        /// Only this content type
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,
    },

    /// Find content carrying a tag
    Tag { tag: String },

    /// Like a content item
    Like { id: String },
}

#[derive(Args, Debug)]
pub struct AddContent {
    /// Peer space address
    pub peer_space: String,
    /// Headline
    pub title: String,
    /// Content type (product, event, post, ...)
    #[arg(short = 't', long = "type", default_value = "post")]
    pub content_type: String,
    /// Body text
    #[arg(short, long)]
    pub description: Option<String>,
    /// Tag, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Price, for products and services
    #[arg(long)]
    pub price: Option<f64>,
    /// Link, for external content and resources
    #[arg(long)]
    pub url: Option<String>,
    /// Extra kind fields as a JSON object, e.g. '{"startsAt":"2024-06-01T18:00:00Z"}'
    #[arg(long)]
    pub fields: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ForumCommand {
    /// Recompute post and comment counters from the stored records
    Reconcile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_options() {
        let cli = Cli::try_parse_from(["peermall", "--db", "/tmp/x.db", "--timeout-ms", "250", "info"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.timeout_ms, 250);
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_parse_content_add() {
        let cli = Cli::try_parse_from([
            "peermall", "content", "add", "peer-1", "Widget", "--type", "product", "--price", "9.5",
            "--tag", "tools", "--tag", "metal",
        ])
        .unwrap();
        let Commands::Content(ContentCommand::Add(add)) = cli.command else {
            panic!("expected content add");
        };
        assert_eq!(add.peer_space, "peer-1");
        assert_eq!(add.content_type, "product");
        assert_eq!(add.price, Some(9.5));
        assert_eq!(add.tags, vec!["tools", "metal"]);
    }

    #[test]
    fn test_parse_space_follow_undo() {
        let cli = Cli::try_parse_from(["peermall", "space", "follow", "peer-1", "--undo"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Space(SpaceCommand::Follow { undo: true, .. })
        ));
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["peermall"]).is_err());
        assert!(Cli::try_parse_from(["peermall", "forum"]).is_err());
    }
}
