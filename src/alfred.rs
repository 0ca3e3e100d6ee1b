// Launcher output: the Alfred script filter document and the builders that
// turn tags and notes into result rows.

use serde::Serialize;
use uuid::Uuid;

use crate::api::NoteInfo;
use crate::config::Config;
use crate::strip::select_display_field;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub path: String,
}

/// One row in Alfred's result list. Built per response, never stored.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub uid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Passed on to the next workflow step when the row is actioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Item {
            uid: Uuid::new_v4().to_string(),
            title: title.into(),
            subtitle: None,
            arg: None,
            icon: None,
        }
    }
}

/// The document printed to stdout: `{"items": [...]}`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptFilter {
    pub items: Vec<Item>,
}

impl ScriptFilter {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One row per tag; actioning it searches for `tag:<tag>`.
pub fn tag_items(tags: &[String]) -> ScriptFilter {
    let items = tags
        .iter()
        .map(|tag| Item {
            arg: Some(format!("tag:{}", tag)),
            ..Item::new(tag.clone())
        })
        .collect();
    ScriptFilter { items }
}

/// One row per note, titled by its question field and subtitled by its
/// answer field. Notes with no usable question field are left out.
pub fn note_items(notes: &[NoteInfo], config: &Config) -> ScriptFilter {
    let mut items = Vec::with_capacity(notes.len());
    for note in notes {
        let title = match select_display_field(&note.fields, &config.front_fields) {
            Some(title) if !title.is_empty() => title,
            _ => {
                log::debug!("Skipping note {} without a question field", note.note_id);
                continue;
            }
        };
        items.push(Item {
            subtitle: select_display_field(&note.fields, &config.back_fields),
            arg: Some(format!("nid:{}", note.note_id)),
            ..Item::new(title)
        });
    }
    ScriptFilter { items }
}

/// A single informational row, used for errors and confirmations.
pub fn message(title: &str, subtitle: &str, icon: &str) -> ScriptFilter {
    ScriptFilter {
        items: vec![Item {
            subtitle: Some(subtitle.to_string()),
            icon: Some(Icon {
                path: icon.to_string(),
            }),
            ..Item::new(title)
        }],
    }
}
