use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webdav_music_core::filename::parse_file_name;
use webdav_music_core::{
    AssetLookup, ClientFactory, ConnectionConfig, HttpClientFactory, MusicItem, PluginManifest,
    SearchType, StaticConfig, TopListItem, UserVariables, WebDavMusicPlugin,
};

/// Browse a WebDAV music library from the terminal.
#[derive(Parser, Debug)]
#[command(name = "webdav-music", version, about)]
struct Args {
    /// WebDAV server url
    #[arg(long, env = "WEBDAV_URL")]
    url: Option<String>,

    #[arg(long, env = "WEBDAV_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "WEBDAV_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Music folders, comma separated (default: /)
    #[arg(long, env = "WEBDAV_SEARCH_PATH")]
    search_path: Option<String>,

    /// Confirm covers and lyrics with the server instead of the listing
    #[arg(long)]
    live_assets: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plugin manifest
    Manifest,
    /// Search file names (an empty query lists everything)
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// List the configured search paths
    Lists,
    /// List the audio files of one path
    Detail { path: String },
    /// List every entry of one path with size and modification time
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print the playback URL of a file
    Play { id: String },
    /// Print the artwork URL of a file
    Info { id: String },
    /// Print the lyrics of a file
    Lyric { id: String },
}

fn item_for(id: &str) -> MusicItem {
    let basename = id.rsplit('/').next().unwrap_or(id);
    let track = parse_file_name(basename);
    MusicItem {
        id: id.to_string(),
        title: track.title,
        artist: track.artist,
        album: track.album,
        cover: None,
        lyric: None,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let variables = UserVariables {
        url: args.url,
        username: args.username,
        password: args.password,
        search_path: args.search_path,
    };
    let config = StaticConfig(variables.clone());
    let lookup = if args.live_assets {
        AssetLookup::Live
    } else {
        AssetLookup::Listing
    };
    let plugin = WebDavMusicPlugin::new(Arc::new(config)).with_asset_lookup(lookup);

    match args.command {
        Command::Manifest => print_json(&PluginManifest::webdav()),
        Command::Search { query } => {
            let result = plugin
                .search(&query, 1, SearchType::Music)
                .await
                .context("Search failed")?;
            print_json(&result)
        }
        Command::Lists => print_json(&plugin.get_top_lists().await.context("Listing failed")?),
        Command::Detail { path } => {
            let item = TopListItem {
                id: path.clone(),
                title: path,
            };
            print_json(&plugin.get_top_list_detail(&item).await.context("Listing failed")?)
        }
        Command::Ls { path } => {
            let connection = ConnectionConfig::from_variables(&variables)?;
            let client =
                HttpClientFactory.create_client(&connection.url, &connection.credentials())?;
            let entries = client
                .get_directory_contents(&path)
                .await
                .with_context(|| format!("Could not list {path}"))?;
            for entry in entries {
                println!("{entry}");
            }
            Ok(())
        }
        Command::Play { id } => {
            let source = plugin
                .get_media_source(&item_for(&id))
                .await
                .context("Could not resolve playback url")?;
            println!("{}", source.url);
            Ok(())
        }
        Command::Info { id } => print_json(&plugin.get_music_info(&item_for(&id)).await?),
        Command::Lyric { id } => {
            let lyric = plugin.get_lyric(&item_for(&id)).await?;
            match lyric.raw_lrc {
                Some(text) => println!("{text}"),
                None => eprintln!("No lyrics found for {id}"),
            }
            Ok(())
        }
    }
}
