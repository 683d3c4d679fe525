use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::plugins::registry::ItemDraft;

pub type SessionId = Uuid;

/// Which kind of site the operator says the URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteHint {
    #[default]
    Auto,
    LinkedInLearning,
    Udemy,
    YouTubeVimeo,
    SoundCloudBandcamp,
}

impl SiteHint {
    pub const ALL: [SiteHint; 5] = [
        SiteHint::Auto,
        SiteHint::LinkedInLearning,
        SiteHint::Udemy,
        SiteHint::YouTubeVimeo,
        SiteHint::SoundCloudBandcamp,
    ];

    /// Short key used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            SiteHint::Auto => "auto",
            SiteHint::LinkedInLearning => "linkedin",
            SiteHint::Udemy => "udemy",
            SiteHint::YouTubeVimeo => "youtube",
            SiteHint::SoundCloudBandcamp => "soundcloud",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.key().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for SiteHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SiteHint::Auto => "Auto-detect (Any site)",
            SiteHint::LinkedInLearning => "LinkedIn Learning",
            SiteHint::Udemy => "Udemy",
            SiteHint::YouTubeVimeo => "YouTube / Vimeo",
            SiteHint::SoundCloudBandcamp => "SoundCloud / Bandcamp",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Analyzing,
    Downloading,
    Cancelling,
    Done,
    Failed,
}

/// Owned by the orchestrator for the duration of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub completed: usize,
    pub total: usize,
    pub cancel_requested: bool,
}

/// One downloadable unit of a resolved course or playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// 1-based position in the resolved list.
    pub index: usize,
    pub title: String,
    pub source_url: String,
    pub meta: HashMap<String, String>,
}

/// Ordered items, fixed at resolution time.
#[derive(Debug, Clone, Default)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    /// Assigns indexes in draft order and fills missing titles and URLs.
    pub fn from_drafts(drafts: Vec<ItemDraft>, session_url: &str) -> Self {
        let items = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                let index = i + 1;
                let title = d
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| d.id.clone().filter(|id| !id.is_empty()))
                    .unwrap_or_else(|| format!("item {index}"));
                let source_url = d
                    .source_url
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| session_url.to_string());
                Item { index, title, source_url, meta: d.meta }
            })
            .collect();
        Self { items }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl IntoIterator for ItemList {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
