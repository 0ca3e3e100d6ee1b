// API client module: a small blocking HTTP client that talks to the
// AnkiConnect add-on running inside Anki. Every call is a single POST of
// `{action, params, version}` and every reply must be `{error, result}`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;

/// AnkiConnect protocol version this client speaks.
pub const API_VERSION: u32 = 6;

/// Failures talking to AnkiConnect.
///
/// `Unreachable` is the only variant a user can do something about (start
/// Anki, install the add-on). The other two mean the add-on answered with
/// something this client does not understand.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach AnkiConnect at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed AnkiConnect response: {0}")]
    Protocol(String),
    #[error("AnkiConnect returned an error: {0}")]
    Remote(String),
}

/// Anything that can produce the current list of tags. The tag cache only
/// depends on this, which keeps it testable without a running Anki.
pub trait TagSource {
    fn fetch_tags(&self) -> Result<Vec<String>, ApiError>;
}

/// One field of a note as returned by `notesInfo` / `cardsInfo`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

impl AsRef<str> for FieldValue {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// The parts of a note (or card) this tool reads. `notesInfo` names the id
/// `noteId` while `cardsInfo` calls it `note`; both land in `note_id`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NoteInfo {
    #[serde(rename = "noteId", alias = "note")]
    pub note_id: u64,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

/// Blocking AnkiConnect client holding a reqwest client and the endpoint.
#[derive(Clone)]
pub struct AnkiClient {
    client: Client,
    base_url: String,
}

/// Build the request document for `action`.
pub fn request_envelope(action: &str, params: Value) -> Value {
    json!({
        "action": action,
        "params": params,
        "version": API_VERSION,
    })
}

/// Validate a raw AnkiConnect reply and pull out its `result`.
///
/// The reply must be an object with exactly the keys `error` and `result`,
/// and `error` must be null.
pub fn check_response(response: Value) -> Result<Value, ApiError> {
    let mut map = match response {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Protocol(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };
    if map.len() != 2 {
        return Err(ApiError::Protocol(
            "response has an unexpected number of fields".into(),
        ));
    }
    let error = map
        .remove("error")
        .ok_or_else(|| ApiError::Protocol("response is missing required error field".into()))?;
    let result = map
        .remove("result")
        .ok_or_else(|| ApiError::Protocol("response is missing required result field".into()))?;
    match error {
        Value::Null => Ok(result),
        Value::String(message) => Err(ApiError::Remote(message)),
        other => Err(ApiError::Remote(other.to_string())),
    }
}

impl AnkiClient {
    /// Create a client for the AnkiConnect endpoint at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(AnkiClient {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a client for the endpoint named in the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        AnkiClient::new(config.anki_connect_url.clone())
    }

    /// Send one action and decode its `result` into `T`.
    pub fn invoke<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, ApiError> {
        log::debug!("AnkiConnect {} {}", action, params);
        let unreachable = |source: reqwest::Error| ApiError::Unreachable {
            url: self.base_url.clone(),
            source,
        };

        let res = self
            .client
            .post(&self.base_url)
            .json(&request_envelope(action, params))
            .send()
            .map_err(unreachable)?
            .error_for_status()
            .map_err(unreachable)?;

        let body: Value = res
            .json()
            .map_err(|e| ApiError::Protocol(format!("response body is not JSON: {}", e)))?;
        let result = check_response(body)?;
        serde_json::from_value(result)
            .map_err(|e| ApiError::Protocol(format!("unexpected {} result: {}", action, e)))
    }

    /// Note ids matching an Anki search query.
    pub fn find_notes(&self, query: &str) -> Result<Vec<u64>, ApiError> {
        self.invoke("findNotes", json!({ "query": query }))
    }

    pub fn notes_info(&self, notes: &[u64]) -> Result<Vec<NoteInfo>, ApiError> {
        self.invoke("notesInfo", json!({ "notes": notes }))
    }

    /// Card ids matching an Anki search query.
    pub fn find_cards(&self, query: &str) -> Result<Vec<u64>, ApiError> {
        self.invoke("findCards", json!({ "query": query }))
    }

    pub fn cards_info(&self, cards: &[u64]) -> Result<Vec<NoteInfo>, ApiError> {
        self.invoke("cardsInfo", json!({ "cards": cards }))
    }

    /// Open the Anki card browser on `query`; returns the ids it shows.
    pub fn gui_browse(&self, query: &str) -> Result<Vec<u64>, ApiError> {
        self.invoke("guiBrowse", json!({ "query": query }))
    }

    pub fn get_tags(&self) -> Result<Vec<String>, ApiError> {
        self.invoke("getTags", json!({}))
    }

    /// `findNotes` followed by `notesInfo` on the ids it returned.
    pub fn search_notes(&self, query: &str) -> Result<Vec<NoteInfo>, ApiError> {
        let notes = self.find_notes(query)?;
        self.notes_info(&notes)
    }

    /// `findCards` followed by `cardsInfo` on the ids it returned.
    pub fn search_cards(&self, query: &str) -> Result<Vec<NoteInfo>, ApiError> {
        let cards = self.find_cards(query)?;
        self.cards_info(&cards)
    }
}

impl TagSource for AnkiClient {
    fn fetch_tags(&self) -> Result<Vec<String>, ApiError> {
        self.get_tags()
    }
}
