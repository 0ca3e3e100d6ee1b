// Configuration module: every tunable of the tool is read once from the
// environment at startup and then handed around as an immutable `Config`.
// Nothing below `main` looks at environment variables on its own.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANKI_CONNECT_URL: &str = "http://localhost:8765";
pub const DEFAULT_FRONT_FIELDS: &str = "Front,entry";
pub const DEFAULT_BACK_FIELDS: &str = "Back,Tags,definition";
pub const DEFAULT_CACHE_FILE: &str = "anki_tags_cache.json";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_ERROR_ICON: &str = "./error.png";

/// Resolved settings for one invocation of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the AnkiConnect endpoint.
    pub anki_connect_url: String,
    /// Field names tried, in order, to build a launcher item title.
    pub front_fields: Vec<String>,
    /// Field names tried, in order, to build a launcher item subtitle.
    pub back_fields: Vec<String>,
    pub cache_path: PathBuf,
    pub cache_expiry: Duration,
    pub error_icon: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_lookup(|_| None)
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Missing keys
    /// fall back to the documented defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let cache_expiry = match lookup("ANKI_TAGS_CACHE_TTL") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    log::warn!(
                        "ANKI_TAGS_CACHE_TTL={:?} is not a number of seconds, using {}",
                        raw,
                        DEFAULT_CACHE_TTL_SECS
                    );
                    Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        };

        Config {
            anki_connect_url: get("ANKI_CONNECT_URL", DEFAULT_ANKI_CONNECT_URL),
            front_fields: split_fields(&get("FRONT_FIELDS", DEFAULT_FRONT_FIELDS)),
            back_fields: split_fields(&get("BACK_FIELDS", DEFAULT_BACK_FIELDS)),
            cache_path: expand_home(&get("ANKI_TAGS_CACHE", DEFAULT_CACHE_FILE)),
            cache_expiry,
            error_icon: get("ALFRED_ERROR_ICON", DEFAULT_ERROR_ICON),
        }
    }
}

/// Split a comma separated list of field names, trimming each entry.
fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Expand a leading `~/` to the user's home directory. Paths without it
/// (including the relative default) are used as given.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::default();
        assert_eq!(config.anki_connect_url, "http://localhost:8765");
        assert_eq!(config.front_fields, vec!["Front", "entry"]);
        assert_eq!(config.back_fields, vec!["Back", "Tags", "definition"]);
        assert_eq!(config.cache_path, PathBuf::from("anki_tags_cache.json"));
        assert_eq!(config.cache_expiry, Duration::from_secs(86_400));
        assert_eq!(config.error_icon, "./error.png");
    }

    #[test]
    fn field_lists_are_trimmed_and_empties_dropped() {
        let config = config_with(&[("FRONT_FIELDS", " Question , ,Word"), ("BACK_FIELDS", "Answer,")]);
        assert_eq!(config.front_fields, vec!["Question", "Word"]);
        assert_eq!(config.back_fields, vec!["Answer"]);
    }

    #[test]
    fn overrides_url_and_ttl() {
        let config = config_with(&[
            ("ANKI_CONNECT_URL", "http://127.0.0.1:9999"),
            ("ANKI_TAGS_CACHE_TTL", "60"),
        ]);
        assert_eq!(config.anki_connect_url, "http://127.0.0.1:9999");
        assert_eq!(config.cache_expiry, Duration::from_secs(60));
    }

    #[test]
    fn bad_ttl_falls_back_to_default() {
        let config = config_with(&[("ANKI_TAGS_CACHE_TTL", "a day")]);
        assert_eq!(config.cache_expiry, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
    }

    #[test]
    fn cache_path_expands_home() {
        let config = config_with(&[("ANKI_TAGS_CACHE", "~/tags.json")]);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.cache_path, home.join("tags.json"));
        }
    }
}
