// Command layer: one function per subcommand. Each returns the document to
// print (or `None` to print nothing) and classifies failures so `main` can
// decide which ones become a friendly launcher row.

use thiserror::Error;

use crate::alfred::{self, Item, ScriptFilter};
use crate::api::{AnkiClient, ApiError, TagSource};
use crate::cache::{filter_tags, CacheError, TagCache};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum CommandError {
    /// The query matched nothing.
    #[error("no results")]
    NotFound,
    #[error(transparent)]
    Unreachable(ApiError),
    /// Protocol violations and local I/O failures. Not recovered.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unreachable { .. } => CommandError::Unreachable(err),
            other => CommandError::Fatal(other.into()),
        }
    }
}

impl From<CacheError> for CommandError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Remote(api) => api.into(),
            other => CommandError::Fatal(other.into()),
        }
    }
}

impl CommandError {
    /// The launcher row shown for recoverable failures. `None` for `Fatal`.
    pub fn feedback(&self, config: &Config) -> Option<ScriptFilter> {
        match self {
            CommandError::NotFound => Some(alfred::message(
                "Not Found",
                "Please try another query",
                &config.error_icon,
            )),
            CommandError::Unreachable(_) => Some(alfred::message(
                "Is Anki Running?",
                "Remember to install AnkiConnect as well",
                &config.error_icon,
            )),
            CommandError::Fatal(_) => None,
        }
    }
}

pub type CommandResult = Result<Option<ScriptFilter>, CommandError>;

/// `findNotes <query>`
pub fn find_notes(client: &AnkiClient, config: &Config, query: &str) -> CommandResult {
    let notes = client.search_notes(query)?;
    if notes.is_empty() {
        return Err(CommandError::NotFound);
    }
    Ok(Some(alfred::note_items(&notes, config)))
}

/// `getTags [--query Q]`
pub fn get_tags<S: TagSource + ?Sized>(
    source: &S,
    cache: &TagCache,
    query: Option<&str>,
) -> CommandResult {
    let tags = cache.get_tags(source, false)?;
    let tags = filter_tags(&tags, query);
    log::info!("Filtered tags are: {:?}", tags);
    if tags.is_empty() {
        return Err(CommandError::NotFound);
    }
    Ok(Some(alfred::tag_items(&tags)))
}

/// `refreshAnkiCache`
pub fn refresh_cache<S: TagSource + ?Sized>(source: &S, cache: &TagCache) -> CommandResult {
    let tags = cache.get_tags(source, true)?;
    Ok(Some(ScriptFilter {
        items: vec![Item {
            subtitle: Some(format!("{} tags cached", tags.len())),
            ..Item::new("Tag cache refreshed")
        }],
    }))
}

/// `cardsInfo <id>...`. An empty answer is reported as not found.
pub fn cards_info(client: &AnkiClient, config: &Config, cards: &[u64]) -> CommandResult {
    let infos = client.cards_info(cards)?;
    if infos.is_empty() {
        return Err(CommandError::NotFound);
    }
    Ok(Some(alfred::note_items(&infos, config)))
}

/// `guiBrowse <query>`. Anki opens its browser; nothing is printed.
pub fn gui_browse(client: &AnkiClient, query: &str) -> CommandResult {
    let shown = client.gui_browse(query)?;
    log::debug!("Anki browser shows {} cards", shown.len());
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, serve};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticTags(Vec<&'static str>);

    impl TagSource for StaticTags {
        fn fetch_tags(&self) -> Result<Vec<String>, ApiError> {
            Ok(self.0.iter().map(|t| t.to_string()).collect())
        }
    }

    struct BrokenTags;

    impl TagSource for BrokenTags {
        fn fetch_tags(&self) -> Result<Vec<String>, ApiError> {
            Err(ApiError::Protocol("response has an unexpected number of fields".into()))
        }
    }

    fn cache_in(dir: &TempDir) -> TagCache {
        TagCache::new(dir.path().join("tags.json"), Duration::from_secs(3600))
    }

    fn unreachable_client() -> AnkiClient {
        AnkiClient::new(closed_port_url()).unwrap()
    }

    #[test]
    fn get_tags_filters_and_builds_rows() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let source = StaticTags(vec!["math", "science", "mathematics"]);

        let doc = get_tags(&source, &cache, Some("math")).unwrap().unwrap();

        let titles: Vec<&str> = doc.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["math", "mathematics"]);
    }

    #[test]
    fn get_tags_without_match_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let source = StaticTags(vec!["math"]);

        let err = get_tags(&source, &cache, Some("history")).unwrap_err();

        assert!(matches!(err, CommandError::NotFound));
        let feedback = err.feedback(&Config::default()).unwrap();
        assert_eq!(feedback.items[0].title, "Not Found");
    }

    #[test]
    fn get_tags_uses_fresh_cache_without_contacting_anki() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::write(cache.path(), br#"["offline","tags"]"#).unwrap();

        let doc = get_tags(&unreachable_client(), &cache, None).unwrap().unwrap();

        assert_eq!(doc.items.len(), 2);
    }

    #[test]
    fn refresh_reports_count() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let source = StaticTags(vec!["a", "b", "c"]);

        let doc = refresh_cache(&source, &cache).unwrap().unwrap();

        assert_eq!(doc.items[0].subtitle.as_deref(), Some("3 tags cached"));
    }

    #[test]
    fn unreachable_anki_gets_friendly_feedback() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let err = refresh_cache(&unreachable_client(), &cache).unwrap_err();

        assert!(matches!(err, CommandError::Unreachable(_)));
        let feedback = err.feedback(&Config::default()).unwrap();
        assert_eq!(feedback.items[0].title, "Is Anki Running?");
    }

    #[test]
    fn find_notes_against_stopped_anki_is_unreachable() {
        let err = find_notes(&unreachable_client(), &Config::default(), "deck:Default").unwrap_err();
        assert!(matches!(err, CommandError::Unreachable(_)));
    }

    #[test]
    fn empty_cards_info_is_not_found() {
        let (url, server) = serve(vec![r#"{"error": null, "result": []}"#.to_string()]);
        let client = AnkiClient::new(url).unwrap();

        let err = cards_info(&client, &Config::default(), &[1, 2]).unwrap_err();

        assert!(matches!(err, CommandError::NotFound));
        server.join().unwrap();
    }

    #[test]
    fn protocol_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let err = get_tags(&BrokenTags, &cache, None).unwrap_err();

        assert!(matches!(err, CommandError::Fatal(_)));
        assert!(err.feedback(&Config::default()).is_none());
    }
}
