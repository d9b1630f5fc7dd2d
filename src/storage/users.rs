//! User registry: profiles, ban set and premium set, persisted as one document.

use crate::core::types::{Language, UserId};
use crate::storage::document::{JsonDocument, Outcome, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error("user {0} is not registered")]
    NotRegistered(UserId),

    #[error(transparent)]
    Persistence(#[from] StorageError),
}

/// Optional descriptive fields captured at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMeta {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub language: Option<Language>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Registration order, used to break ties between equal activity timestamps.
    #[serde(default)]
    pub seq: u64,
}

impl UserProfile {
    /// `@username` when known, otherwise the first name, otherwise the raw id.
    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            return format!("@{}", username);
        }
        if let Some(first) = &self.first_name {
            return first.clone();
        }
        self.id.to_string()
    }
}

/// On-disk layout of the user registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub users: BTreeMap<UserId, UserProfile>,
    #[serde(default)]
    pub banned: BTreeSet<UserId>,
    #[serde(default)]
    pub premium: BTreeSet<UserId>,
    #[serde(default)]
    pub next_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserCounts {
    pub total: usize,
    pub premium: usize,
    pub banned: usize,
}

pub struct UserStore {
    doc: JsonDocument<UserDocument>,
}

impl UserStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let doc = JsonDocument::open(path)?;
        let store = Self { doc };
        log::info!("User store loaded: {} users", store.counts().total);
        Ok(store)
    }

    /// Creates a profile with no language on first contact. Idempotent: an existing
    /// profile is returned unchanged.
    pub fn register(&self, id: &UserId, meta: UserMeta) -> Result<UserProfile, StorageError> {
        let now = Utc::now();
        self.doc.mutate(|doc| {
            if let Some(existing) = doc.users.get(id) {
                return Outcome::Unchanged(existing.clone());
            }
            let profile = UserProfile {
                id: id.clone(),
                language: None,
                username: meta.username,
                first_name: meta.first_name,
                last_name: meta.last_name,
                joined_at: now,
                last_activity: now,
                seq: doc.next_seq,
            };
            doc.next_seq += 1;
            doc.users.insert(id.clone(), profile.clone());
            log::info!("New user registered: {}", id);
            Outcome::Changed(profile)
        })
    }

    /// Refreshes the activity timestamp. Unknown ids are ignored.
    pub fn touch_activity(&self, id: &UserId) -> Result<(), StorageError> {
        self.touch_activity_at(id, Utc::now())
    }

    pub fn touch_activity_at(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.doc.mutate(|doc| match doc.users.get_mut(id) {
            Some(profile) => {
                profile.last_activity = at;
                Outcome::Changed(())
            }
            None => Outcome::Unchanged(()),
        })
    }

    pub fn set_language(&self, id: &UserId, language: Language) -> Result<(), UserStoreError> {
        let found = self.doc.mutate(|doc| match doc.users.get_mut(id) {
            Some(profile) if profile.language == Some(language) => Outcome::Unchanged(true),
            Some(profile) => {
                profile.language = Some(language);
                Outcome::Changed(true)
            }
            None => Outcome::Unchanged(false),
        })?;

        if found {
            Ok(())
        } else {
            Err(UserStoreError::NotRegistered(id.clone()))
        }
    }

    pub fn profile(&self, id: &UserId) -> Option<UserProfile> {
        self.doc.read(|doc| doc.users.get(id).cloned())
    }

    pub fn is_registered(&self, id: &UserId) -> bool {
        self.doc.read(|doc| doc.users.contains_key(id))
    }

    /// Chosen language, `None` when unknown or not chosen yet.
    pub fn language(&self, id: &UserId) -> Option<Language> {
        self.doc.read(|doc| doc.users.get(id).and_then(|p| p.language))
    }

    pub fn is_banned(&self, id: &UserId) -> bool {
        self.doc.read(|doc| doc.banned.contains(id))
    }

    /// Returns `true` when the id was registered and not banned before.
    /// Never creates a profile.
    pub fn ban(&self, id: &UserId) -> Result<bool, StorageError> {
        let added = self.doc.mutate(|doc| {
            if doc.users.contains_key(id) && doc.banned.insert(id.clone()) {
                Outcome::Changed(true)
            } else {
                Outcome::Unchanged(false)
            }
        })?;
        if added {
            log::info!("User {} banned", id);
        }
        Ok(added)
    }

    /// Returns `true` when the id was banned before.
    pub fn unban(&self, id: &UserId) -> Result<bool, StorageError> {
        let removed = self.doc.mutate(|doc| {
            if doc.banned.remove(id) {
                Outcome::Changed(true)
            } else {
                Outcome::Unchanged(false)
            }
        })?;
        if removed {
            log::info!("User {} unbanned", id);
        }
        Ok(removed)
    }

    pub fn is_premium(&self, id: &UserId) -> bool {
        self.doc.read(|doc| doc.premium.contains(id))
    }

    /// Flips premium status. Returns `false` only for an unregistered id, which is left untouched.
    pub fn toggle_premium(&self, id: &UserId) -> Result<bool, StorageError> {
        let flipped = self.doc.mutate(|doc| {
            if !doc.users.contains_key(id) {
                return Outcome::Unchanged(None);
            }
            let now_premium = !doc.premium.remove(id);
            if now_premium {
                doc.premium.insert(id.clone());
            }
            Outcome::Changed(Some(now_premium))
        })?;
        match flipped {
            Some(now_premium) => {
                log::info!("User {} premium: {}", id, now_premium);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Up to `limit` profiles, most recently active first; ties keep registration order.
    pub fn list_recently_active(&self, limit: usize) -> Vec<UserProfile> {
        self.doc.read(|doc| {
            let mut profiles: Vec<&UserProfile> = doc.users.values().collect();
            profiles.sort_by(|a, b| b.last_activity.cmp(&a.last_activity).then(a.seq.cmp(&b.seq)));
            profiles.into_iter().take(limit).cloned().collect()
        })
    }

    /// Every registered id, used as the broadcast audience.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.doc.read(|doc| doc.users.keys().cloned().collect())
    }

    pub fn banned_ids(&self, limit: usize) -> Vec<UserId> {
        self.doc.read(|doc| doc.banned.iter().take(limit).cloned().collect())
    }

    pub fn counts(&self) -> UserCounts {
        self.doc.read(|doc| UserCounts {
            total: doc.users.len(),
            premium: doc.premium.len(),
            banned: doc.banned.len(),
        })
    }

    pub fn snapshot(&self) -> UserDocument {
        self.doc.snapshot()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.doc.flush()
    }
}
