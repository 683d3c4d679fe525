//! `yt-dlp -J` output.

use crate::plugins::registry::ItemDraft;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Keys copied into [`ItemDraft::meta`] when present; they feed the output path.
const META_KEYS: [&str; 3] = ["chapter", "chapter_number", "playlist_index"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InfoJson {
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub entries: Option<Vec<Option<InfoJson>>>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl InfoJson {
    pub fn parse(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist")
    }

    /// A playlist yields one draft per non-null entry (possibly none);
    /// anything else is a single item.
    pub fn into_drafts(mut self) -> Vec<ItemDraft> {
        let entries = match self.entries.take() {
            Some(entries) if self.is_playlist() => entries,
            _ => return vec![self.into_draft(None)],
        };

        let mut context = HashMap::new();
        if let Some(t) = self.title.as_ref().filter(|t| !t.is_empty()) {
            context.insert("playlist_title".to_string(), t.clone());
        }
        context.insert("playlist_count".to_string(), entries.len().to_string());

        entries
            .into_iter()
            .flatten()
            .map(|e| e.into_draft(Some(&context)))
            .collect()
    }

    fn into_draft(self, playlist: Option<&HashMap<String, String>>) -> ItemDraft {
        let mut meta: HashMap<String, String> = playlist.cloned().unwrap_or_default();
        for key in META_KEYS {
            if let Some(v) = self.extra.get(key).and_then(scalar_to_string) {
                meta.insert(key.to_string(), v);
            }
        }
        ItemDraft {
            source_url: non_empty(self.webpage_url).or_else(|| non_empty(self.url)),
            id: self.id,
            title: self.title,
            meta,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
