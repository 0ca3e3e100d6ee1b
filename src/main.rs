// Entrypoint for the Alfred workflow script.
// - Keeps `main` small: read config, build the client, run one subcommand.
// - Stdout carries exactly one JSON document; logs go to stderr.

use anki_alfred::api::AnkiClient;
use anki_alfred::cache::TagCache;
use anki_alfred::commands::{self, CommandError};
use anki_alfred::config::Config;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "anki-alfred", about = "Interact with Anki via AnkiConnect.", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search notes and list them
    #[command(name = "findNotes")]
    FindNotes { query: String },

    /// List tags, optionally filtered by a substring
    #[command(name = "getTags")]
    GetTags {
        #[arg(long)]
        query: Option<String>,
    },

    /// Fetch tags from Anki and rewrite the cache
    #[command(name = "refreshAnkiCache")]
    RefreshAnkiCache,

    /// Show notes for the given card ids
    #[command(name = "cardsInfo")]
    CardsInfo {
        #[arg(required = true)]
        cards: Vec<u64>,
    },

    /// Open the Anki browser on a query
    #[command(name = "guiBrowse")]
    GuiBrowse { query: String },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    log::debug!("{:?}", config);

    let client = AnkiClient::from_config(&config)?;
    let cache = TagCache::from_config(&config);

    let outcome = match &cli.command {
        Command::FindNotes { query } => commands::find_notes(&client, &config, query),
        Command::GetTags { query } => commands::get_tags(&client, &cache, query.as_deref()),
        Command::RefreshAnkiCache => commands::refresh_cache(&client, &cache),
        Command::CardsInfo { cards } => commands::cards_info(&client, &config, cards),
        Command::GuiBrowse { query } => commands::gui_browse(&client, query),
    };

    let payload = match outcome {
        Ok(payload) => payload,
        Err(CommandError::Fatal(err)) => return Err(err),
        Err(err) => {
            log::info!("{}", err);
            err.feedback(&config)
        }
    };

    if let Some(doc) = payload {
        println!("{}", doc.to_json()?);
    }
    Ok(())
}
