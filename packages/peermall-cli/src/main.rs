//! `peermall`: inspect and maintain a PeerMall content store from the shell.
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr and are
//! filtered by `RUST_LOG` (default `peermall=info`).

mod args;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use peermall_core::content::ContentKind;
use peermall_core::peer_space::NewPeerSpace;
use peermall_core::storage::BlockedCallback;
use peermall_core::{ContentType, DatabaseConfig, NewContent, PeerMall};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use args::{AddContent, Cli, Commands, ContentCommand, ForumCommand, SpaceCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("peermall=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = database_config(&cli)?;
    let mall = PeerMall::open(config)
        .await
        .wrap_err("failed to open the store")?;

    match cli.command {
        Commands::Info => info(&mall),
        Commands::Space(cmd) => space(&mall, cmd).await,
        Commands::Content(cmd) => content(&mall, cmd).await,
        Commands::Forum(ForumCommand::Reconcile) => {
            print(&mall.forums().reconcile_counters().await?)
        }
    }
}

fn database_config(cli: &Cli) -> Result<DatabaseConfig> {
    let path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    let mut config = DatabaseConfig::at(path);
    config.operation_timeout = Duration::from_millis(cli.timeout_ms);
    let on_blocked: BlockedCallback = Arc::new(|found: u32, target: u32| {
        eprintln!(
            "The store is at version {found} and needs upgrading to {target}, \
             but another program holds it open. Close it and run the command again."
        );
    });
    config.on_blocked = Some(on_blocked);
    Ok(config)
}

fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| eyre!("no data directory on this platform; pass --db"))?
        .join("peermall");
    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("cannot create {}", dir.display()))?;
    Ok(dir.join(format!("{}.sqlite", peermall_core::DATABASE_NAME)))
}

fn info(mall: &PeerMall) -> Result<()> {
    let db = mall.database();
    let mut stores = serde_json::Map::new();
    for name in db.store_names() {
        stores.insert(name.clone(), json!(db.index_names(&name)?));
    }
    print(&json!({
        "build": peermall_core::build_info(),
        "database": {
            "name": peermall_core::DATABASE_NAME,
            "path": db.path().map(|p| p.display().to_string()),
            "version": db.version(),
            "stores": stores,
        },
    }))
}

async fn space(mall: &PeerMall, cmd: SpaceCommand) -> Result<()> {
    let spaces = mall.peer_spaces();
    match cmd {
        SpaceCommand::Create {
            address,
            title,
            description,
            owner_peer_id,
            owner,
        } => {
            let mut new = NewPeerSpace::new(address, title)
                .owned_by(owner_peer_id.unwrap_or_default(), owner.unwrap_or_default());
            new.description = description.unwrap_or_default();
            print(&spaces.create_peer_space(new).await?)
        }
        SpaceCommand::Show { address } => {
            let space = spaces
                .get_peer_space(&address)
                .await?
                .ok_or_else(|| eyre!("peer space '{address}' not found"))?;
            print(&space)
        }
        SpaceCommand::List { owner_peer_id } => match owner_peer_id {
            Some(owner) => print(&spaces.get_peer_spaces_by_owner(&owner).await?),
            None => print(&spaces.get_all_peer_spaces().await?),
        },
        SpaceCommand::Follow { address, undo } => {
            let followers = if undo {
                spaces.unfollow(&address).await?
            } else {
                spaces.follow(&address).await?
            };
            let followers = followers.ok_or_else(|| eyre!("peer space '{address}' not found"))?;
            print(&json!({ "address": address, "followers": followers }))
        }
    }
}

async fn content(mall: &PeerMall, cmd: ContentCommand) -> Result<()> {
    let contents = mall.contents();
    match cmd {
        ContentCommand::Add(add) => {
            let kind = build_kind(&add)?;
            let new = NewContent::new(add.peer_space, kind, add.title)
                .with_description(add.description.unwrap_or_default())
                .with_tags(add.tags);
            print(&contents.create_content(new).await?)
        }
        ContentCommand::List {
            peer_space,
            content_type,
        } => match content_type {
            Some(t) => {
                let t: ContentType = t.parse()?;
                print(&contents.get_contents_by_type(&peer_space, t).await?)
            }
            None => print(&contents.get_peer_space_contents(&peer_space).await?),
        },
        ContentCommand::Tag { tag } => print(&contents.search_contents_by_tag(&tag).await?),
        ContentCommand::Like { id } => {
            let likes = contents
                .increment_content_likes(&id)
                .await?
                .ok_or_else(|| eyre!("content '{id}' not found"))?;
            print(&json!({ "id": id, "likes": likes }))
        }
    }
}

/// Assemble the kind from `--type`, the shorthand flags and `--fields`.
fn build_kind(add: &AddContent) -> Result<ContentKind> {
    let content_type: ContentType = add.content_type.parse()?;

    let mut fields = match &add.fields {
        Some(raw) => match serde_json::from_str::<Value>(raw).wrap_err("--fields is not JSON")? {
            Value::Object(map) => map,
            _ => return Err(eyre!("--fields must be a JSON object")),
        },
        None => serde_json::Map::new(),
    };
    fields.insert("type".into(), json!(content_type.as_str()));
    if let Some(price) = add.price {
        fields.insert("price".into(), json!(price));
    }
    if let Some(url) = &add.url {
        fields.insert("url".into(), json!(url));
    }

    serde_json::from_value(Value::Object(fields))
        .wrap_err_with(|| format!("missing or invalid fields for {content_type} content"))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
