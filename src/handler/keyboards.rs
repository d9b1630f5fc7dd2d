//! Keyboard layouts

use super::types::{InlineButton, Keyboard};
use crate::core::types::{Language, UserId};
use crate::i18n;

/// Operator panel callback commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Stats,
    Users,
    Ban,
    Unban,
    UnbanUser(UserId),
    Premium,
    Broadcast,
    Backup,
}

impl AdminAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "stats" => Some(AdminAction::Stats),
            "users" => Some(AdminAction::Users),
            "ban" => Some(AdminAction::Ban),
            "unban" => Some(AdminAction::Unban),
            "add_premium" => Some(AdminAction::Premium),
            "broadcast" => Some(AdminAction::Broadcast),
            "backup" => Some(AdminAction::Backup),
            other => other
                .strip_prefix("unban_")
                .filter(|id| !id.is_empty())
                .map(|id| AdminAction::UnbanUser(UserId::new(id))),
        }
    }

    pub fn callback_data(&self) -> String {
        match self {
            AdminAction::Stats => "stats".to_string(),
            AdminAction::Users => "users".to_string(),
            AdminAction::Ban => "ban".to_string(),
            AdminAction::Unban => "unban".to_string(),
            AdminAction::UnbanUser(id) => format!("unban_{}", id),
            AdminAction::Premium => "add_premium".to_string(),
            AdminAction::Broadcast => "broadcast".to_string(),
            AdminAction::Backup => "backup".to_string(),
        }
    }
}

fn admin_button(label: &str, action: AdminAction) -> InlineButton {
    InlineButton::callback(label, action.callback_data())
}

pub fn language_picker() -> Keyboard {
    Keyboard::Reply(
        Language::ALL
            .into_iter()
            .map(|lang| vec![lang.picker_label().to_string()])
            .collect(),
    )
}

/// Help and language buttons, plus the Premium button for free users.
pub fn main_menu(lang: Language, is_premium: bool) -> Keyboard {
    let mut rows = vec![vec![i18n::t(lang, "menu-help"), i18n::t(lang, "menu-change-language")]];
    if !is_premium {
        rows.push(vec![i18n::t(lang, "menu-premium")]);
    }
    Keyboard::Reply(rows)
}

pub fn contact_operator(lang: Language, url: String) -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::url(i18n::t(lang, "contact-admin"), url)]])
}

pub fn admin_panel() -> Keyboard {
    Keyboard::Inline(vec![
        vec![admin_button("📊 Stats", AdminAction::Stats)],
        vec![admin_button("👥 Users", AdminAction::Users)],
        vec![
            admin_button("🚫 Ban", AdminAction::Ban),
            admin_button("✅ Unban", AdminAction::Unban),
        ],
        vec![
            admin_button("⭐️ Premium", AdminAction::Premium),
            admin_button("📢 Broadcast", AdminAction::Broadcast),
        ],
        vec![admin_button("🗄️ Backup", AdminAction::Backup)],
    ])
}

pub fn unban_picker(ids: &[UserId]) -> Keyboard {
    Keyboard::Inline(
        ids.iter()
            .map(|id| vec![admin_button(id.as_str(), AdminAction::UnbanUser(id.clone()))])
            .collect(),
    )
}
