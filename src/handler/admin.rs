//! Operator panel: callbacks and prompt replies

use super::keyboards::{self, AdminAction};
use super::types::{FileKind, Keyboard, OutboundAction, PromptKind};
use super::RequestHandler;
use crate::core::types::{Platform, UserId};
use chrono::Local;
use std::fmt::Write;

const RECENT_USERS_LIMIT: usize = 10;
const UNBAN_PICKER_LIMIT: usize = 10;
const PERSISTENCE_FAILED: &str = "⚠️ The change could not be saved, see the logs.";

impl RequestHandler {
    pub(super) fn handle_admin_callback(&self, data: &str) -> Vec<OutboundAction> {
        let Some(action) = AdminAction::parse(data) else {
            log::debug!("Ignoring unknown panel callback {:?}", data);
            return Vec::new();
        };

        match action {
            AdminAction::Stats => vec![OutboundAction::text(self.stats_text())],
            AdminAction::Users => vec![OutboundAction::text(self.recent_users_text())],
            AdminAction::Ban => vec![prompt(PromptKind::Ban)],
            AdminAction::Premium => vec![prompt(PromptKind::Premium)],
            AdminAction::Broadcast => vec![prompt(PromptKind::Broadcast)],
            AdminAction::Unban => {
                let banned = self.users.banned_ids(UNBAN_PICKER_LIMIT);
                if banned.is_empty() {
                    vec![OutboundAction::text("No banned users")]
                } else {
                    vec![OutboundAction::text_with(
                        "Select a user to unban:",
                        keyboards::unban_picker(&banned),
                    )]
                }
            }
            AdminAction::UnbanUser(id) => match self.users.unban(&id) {
                Ok(true) => vec![OutboundAction::text(format!("User {} unbanned", id))],
                Ok(false) => vec![OutboundAction::text(format!("User {} is not banned", id))],
                Err(e) => {
                    log::error!("Failed to unban {}: {}", id, e);
                    vec![OutboundAction::text(PERSISTENCE_FAILED)]
                }
            },
            AdminAction::Backup => self.backup_now(),
        }
    }

    /// Interprets the operator's reply to a prompt. Blank replies are ignored.
    pub(super) fn handle_admin_reply(&self, prompt: PromptKind, text: &str) -> Vec<OutboundAction> {
        let text = text.trim();
        if text.is_empty() {
            log::debug!("Ignoring empty reply to {:?} prompt", prompt);
            return Vec::new();
        }

        match prompt {
            PromptKind::Broadcast => vec![
                OutboundAction::text("📢 Starting broadcast..."),
                OutboundAction::Broadcast { body: text.to_string() },
            ],
            PromptKind::Ban => {
                let id = UserId::new(text);
                match self.users.ban(&id) {
                    Ok(true) => vec![OutboundAction::text(format!("User {} banned", id))],
                    Ok(false) => vec![OutboundAction::text(format!(
                        "User {} not found or already banned",
                        id
                    ))],
                    Err(e) => {
                        log::error!("Failed to ban {}: {}", id, e);
                        vec![OutboundAction::text(PERSISTENCE_FAILED)]
                    }
                }
            }
            PromptKind::Premium => {
                let id = UserId::new(text);
                match self.users.toggle_premium(&id) {
                    Ok(false) => vec![OutboundAction::text(format!("User {} not found", id))],
                    Ok(true) if self.users.is_premium(&id) => {
                        vec![OutboundAction::text(format!("Premium enabled for user {}", id))]
                    }
                    Ok(true) => vec![OutboundAction::text(format!("Premium disabled for user {}", id))],
                    Err(e) => {
                        log::error!("Failed to toggle premium for {}: {}", id, e);
                        vec![OutboundAction::text(PERSISTENCE_FAILED)]
                    }
                }
            }
        }
    }

    fn stats_text(&self) -> String {
        let snapshot = self.stats.global_snapshot(&self.users);
        let per = |p: Platform| snapshot.per_platform.get(&p).copied().unwrap_or(0);

        format!(
            "📊 Statistics:\n\n\
             Total downloads: {}\n\
             TikTok downloads: {}\n\
             Instagram downloads: {}\n\
             Total users: {}\n\
             Premium: {}\n\
             Banned: {}",
            snapshot.total_downloads,
            per(Platform::TikTok),
            per(Platform::Instagram),
            snapshot.total_users,
            snapshot.premium_users,
            snapshot.banned_users
        )
    }

    fn recent_users_text(&self) -> String {
        let profiles = self.users.list_recently_active(RECENT_USERS_LIMIT);
        if profiles.is_empty() {
            return "👥 No users yet".to_string();
        }

        let mut out = String::from("👥 Recently active users:\n\n");
        for profile in profiles {
            let downloads = self.stats.stats_for(&profile.id).downloads;
            let star = if self.users.is_premium(&profile.id) { "⭐️ " } else { "" };
            let _ = write!(
                out,
                "{}ID: {}\nName: {}\nUsername: {}\nActivity: {}\nDownloads: {}\n\n",
                star,
                profile.id,
                profile.first_name.as_deref().unwrap_or("Unknown"),
                profile
                    .username
                    .as_deref()
                    .map(|u| format!("@{}", u))
                    .unwrap_or_else(|| "none".to_string()),
                profile.last_activity.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                downloads
            );
        }
        out
    }

    fn backup_now(&self) -> Vec<OutboundAction> {
        let now = Local::now();
        match self.exporter.export(now) {
            Ok(path) => vec![OutboundAction::SendFile {
                path,
                caption: Some(format!("Backup {}", now.format("%Y%m%d"))),
                kind: FileKind::Document,
            }],
            Err(e) => {
                log::error!("Manual backup failed: {}", e);
                vec![OutboundAction::text(format!("❌ Backup failed: {}", e))]
            }
        }
    }
}

fn prompt(kind: PromptKind) -> OutboundAction {
    OutboundAction::text_with(kind.prompt_text(), Keyboard::ForceReply)
}
