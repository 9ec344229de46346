//! Cosmetic personalization stored in browser storage.
//!
//! Nothing in the rendering modules reads this; the page uses it for the
//! greeting line and the chat consent banner.

use std::cell::RefCell;
use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::FxResult;

pub const PREFERENCES_KEY: &str = "user_preferences";
pub const CONSENT_KEY: &str = "chatbot_consent";

const RECENT_LIMIT: usize = 10;

/// String key/value storage with `localStorage` semantics.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> FxResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> FxResult<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for &S {
    fn get_item(&self, key: &str) -> FxResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> FxResult<()> {
        (**self).set_item(key, value)
    }
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get_item(&self, key: &str) -> FxResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> FxResult<()> {
        (**self).set_item(key, value)
    }
}

/// Process-local storage, used when the browser refuses `localStorage` and
/// in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> FxResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> FxResult<()> {
        self.items.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub interests: Vec<String>,
    pub visit_count: u32,
    pub last_visit: String,
    pub preferred_content: Vec<String>,
}

/// Partial update for [`PreferenceStore::set`]. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesPatch {
    pub interests: Option<Vec<String>>,
    pub visit_count: Option<u32>,
    pub last_visit: Option<String>,
    pub preferred_content: Option<Vec<String>>,
}

pub struct PreferenceStore<S> {
    storage: S,
    current: UserPreferences,
}

impl<S: KeyValueStorage> PreferenceStore<S> {
    /// Reads the stored record once. A missing or unreadable record yields
    /// defaults.
    pub fn load(storage: S) -> Self {
        let current = match storage.get_item(PREFERENCES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("ignoring malformed preferences: {err}");
                UserPreferences::default()
            }),
            Ok(None) => UserPreferences::default(),
            Err(err) => {
                warn!("preferences unavailable: {err}");
                UserPreferences::default()
            }
        };
        Self { storage, current }
    }

    pub fn get(&self) -> &UserPreferences {
        &self.current
    }

    /// Merges `patch` and rewrites the whole record.
    pub fn set(&mut self, patch: PreferencesPatch) -> FxResult<&UserPreferences> {
        if let Some(interests) = patch.interests {
            self.current.interests = interests;
        }
        if let Some(visit_count) = patch.visit_count {
            self.current.visit_count = visit_count;
        }
        if let Some(last_visit) = patch.last_visit {
            self.current.last_visit = last_visit;
        }
        if let Some(preferred_content) = patch.preferred_content {
            self.current.preferred_content = preferred_content;
        }
        let raw = serde_json::to_string(&self.current)?;
        self.storage.set_item(PREFERENCES_KEY, &raw)?;
        Ok(&self.current)
    }

    pub fn record_visit(&mut self, now_iso: &str) -> FxResult<&UserPreferences> {
        self.set(PreferencesPatch {
            visit_count: Some(self.current.visit_count.saturating_add(1)),
            last_visit: Some(now_iso.to_owned()),
            ..PreferencesPatch::default()
        })
    }

    pub fn add_interests<I, T>(&mut self, tags: I) -> FxResult<&UserPreferences>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut interests = self.current.interests.clone();
        for tag in tags {
            let tag = tag.into();
            if !interests.contains(&tag) {
                interests.push(tag);
            }
        }
        self.set(PreferencesPatch { interests: Some(interests), ..PreferencesPatch::default() })
    }

    pub fn view_content(&mut self, content_id: &str) -> FxResult<&UserPreferences> {
        let mut recent = Vec::with_capacity(RECENT_LIMIT);
        recent.push(content_id.to_owned());
        recent.extend(self.current.preferred_content.iter().take(RECENT_LIMIT - 1).cloned());
        self.set(PreferencesPatch { preferred_content: Some(recent), ..PreferencesPatch::default() })
    }
}

pub struct ChatConsent<S> {
    storage: S,
}

impl<S: KeyValueStorage> ChatConsent<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn granted(&self) -> bool {
        matches!(self.storage.get_item(CONSENT_KEY), Ok(Some(v)) if v == "true")
    }

    pub fn grant(&self) -> FxResult<()> {
        self.storage.set_item(CONSENT_KEY, "true")
    }
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

pub fn welcome_message(visit_count: u32) -> &'static str {
    match visit_count {
        1 => "Welcome to AI Transform!",
        0..=4 => "Welcome back!",
        _ => "Great to see you again!",
    }
}
