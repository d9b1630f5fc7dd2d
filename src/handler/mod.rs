//! Per-event request handling: gating, download dispatch and delivery.
//!
//! One gating order for every event:
//! operator paths → activity touch → ban check → `/start` → language selection →
//! language check → menu commands → download dispatch → unsupported-link reply.

mod admin;
pub mod keyboards;
mod quota;
pub mod types;

use crate::core::config;
use crate::core::rate_limiter::DownloadQuota;
use crate::core::types::{ChatTarget, Language, Tier, UserId};
use crate::download::{is_supported_url, DownloadFailure, DownloadOrchestrator};
use crate::i18n::{self, t, t_args};
use crate::storage::{AttemptOutcome, SnapshotExporter, UsageStats, UserStore};
use quota::InFlightDownloads;
use std::sync::Arc;
use std::time::Duration;

pub use types::{
    ButtonTarget, DeliveryError, FileKind, IncomingEvent, InlineButton, Keyboard, OutboundAction, Outbox, Payload,
    PromptKind, SenderMeta,
};

/// Handler behaviour knobs, built once in `main`.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Operator identity. `None` disables every operator path.
    pub operator: Option<UserId>,
    pub operator_username: String,
    pub quota: DownloadQuota,
    pub download_timeout: Duration,
    pub premium_price: u32,
    pub broadcast_delay: Duration,
}

impl HandlerSettings {
    pub fn from_config() -> Self {
        Self {
            operator: config::admin::ADMIN_ID.as_deref().map(UserId::new),
            operator_username: config::admin::ADMIN_USERNAME.clone(),
            quota: DownloadQuota::new(*config::limits::FREE_USER_DOWNLOAD_LIMIT),
            download_timeout: config::download::timeout(),
            premium_price: *config::limits::PREMIUM_PRICE,
            broadcast_delay: config::network::broadcast_delay(),
        }
    }
}

/// Counts reported back to the operator after a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct RequestHandler {
    users: Arc<UserStore>,
    stats: Arc<UsageStats>,
    orchestrator: Arc<DownloadOrchestrator>,
    outbox: Arc<dyn Outbox>,
    exporter: SnapshotExporter,
    settings: HandlerSettings,
    in_flight: InFlightDownloads,
}

impl RequestHandler {
    pub fn new(
        users: Arc<UserStore>,
        stats: Arc<UsageStats>,
        orchestrator: Arc<DownloadOrchestrator>,
        outbox: Arc<dyn Outbox>,
        exporter: SnapshotExporter,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            users,
            stats,
            orchestrator,
            outbox,
            exporter,
            settings,
            in_flight: InFlightDownloads::default(),
        }
    }

    fn is_operator(&self, id: &UserId) -> bool {
        self.settings.operator.as_ref() == Some(id)
    }

    /// Decides the replies to one event. Download notices are sent through the outbox
    /// immediately; everything else is returned for the caller to deliver.
    pub async fn handle_incoming(&self, event: &IncomingEvent) -> Vec<OutboundAction> {
        let sender = &event.sender;
        let id = &sender.id;

        let text = match &event.payload {
            Payload::Callback(data) => {
                if !self.is_operator(id) {
                    log::warn!("Rejected panel callback {:?} from non-operator {}", data, id);
                    return vec![OutboundAction::text("⛔ Access denied")];
                }
                return self.handle_admin_callback(data);
            }
            Payload::Text(text) => text.as_str(),
        };

        if self.is_operator(id) {
            if let Some(prompt) = event.reply_to {
                return self.handle_admin_reply(prompt, text);
            }
            if command_name(text) == Some("admin") {
                return vec![OutboundAction::text_with("🛠 Admin panel:", keyboards::admin_panel())];
            }
        }

        if let Err(e) = self.users.touch_activity(id) {
            log::error!("Failed to record activity for {}: {}", id, e);
        }

        let language = self.users.language(id);
        let reply_lang = language.unwrap_or(Language::DEFAULT);

        if self.users.is_banned(id) {
            return vec![OutboundAction::text(t(reply_lang, "banned"))];
        }

        if command_name(text) == Some("start") {
            return self.handle_start(sender);
        }

        if let Some(chosen) = Language::from_picker_label(text) {
            return self.handle_language_choice(sender, chosen);
        }

        let Some(lang) = language else {
            return vec![OutboundAction::text_with(
                t(Language::DEFAULT, "choose-language"),
                keyboards::language_picker(),
            )];
        };
        let is_premium = self.users.is_premium(id);

        if i18n::matches_label(text, "menu-help") {
            return vec![OutboundAction::text(t(lang, "help"))];
        }
        if i18n::matches_label(text, "menu-change-language") {
            return vec![OutboundAction::text_with(
                t(lang, "change-language"),
                keyboards::language_picker(),
            )];
        }
        if i18n::matches_label(text, "menu-premium") {
            let url = format!(
                "https://t.me/{}?start=admin_{}",
                self.settings.operator_username.trim_start_matches('@'),
                id
            );
            let body = t_args(
                lang,
                "premium-info",
                &[("price", self.settings.premium_price.to_string())],
            );
            return vec![OutboundAction::text_with(body, keyboards::contact_operator(lang, url))];
        }

        if let Some(link) = extract_link(text) {
            return self.handle_download(id, lang, is_premium, link).await;
        }

        vec![OutboundAction::text_with(
            t(lang, "unsupported-link"),
            keyboards::main_menu(lang, is_premium),
        )]
    }

    fn handle_start(&self, sender: &SenderMeta) -> Vec<OutboundAction> {
        let id = &sender.id;
        if !self.users.is_registered(id) {
            if let Err(e) = self.users.register(id, sender.meta()) {
                log::error!("Failed to register {}: {}", id, e);
            }
        }

        match self.users.language(id) {
            Some(lang) => vec![OutboundAction::text_with(
                t(lang, "send-link"),
                keyboards::main_menu(lang, self.users.is_premium(id)),
            )],
            None => vec![OutboundAction::text_with(
                t(Language::DEFAULT, "choose-language"),
                keyboards::language_picker(),
            )],
        }
    }

    fn handle_language_choice(&self, sender: &SenderMeta, chosen: Language) -> Vec<OutboundAction> {
        let id = &sender.id;
        if let Err(e) = self.users.register(id, sender.meta()) {
            log::error!("Failed to register {}: {}", id, e);
        }
        if let Err(e) = self.users.set_language(id, chosen) {
            log::error!("Failed to save language for {}: {}", id, e);
        }
        log::info!("User {} selected language {}", id, chosen.code());

        vec![OutboundAction::text_with(
            t(chosen, "saved-language"),
            keyboards::main_menu(chosen, self.users.is_premium(id)),
        )]
    }

    async fn handle_download(&self, id: &UserId, lang: Language, is_premium: bool, url: &str) -> Vec<OutboundAction> {
        let tier = Tier::from_premium(is_premium);
        // Held until the attempt is recorded, so parallel requests cannot overrun the cap
        let slot = match self.in_flight.reserve(&self.stats, &self.settings.quota, id, tier) {
            Ok(slot) => slot,
            Err(used) => {
                log::info!(
                    "User {} hit the free download limit ({} of {})",
                    id,
                    used,
                    self.settings.quota.free_limit()
                );
                return vec![OutboundAction::text(t_args(
                    lang,
                    "rate-limit",
                    &[("limit", self.settings.quota.free_limit().to_string())],
                ))];
            }
        };

        let chat = ChatTarget::from(id);
        if let Err(e) = self.outbox.send_text(&chat, &t(lang, "downloading"), None).await {
            log::warn!("Failed to send download notice to {}: {}", id, e);
        }

        let timeout = self.settings.download_timeout;
        let result = match tokio::time::timeout(timeout, self.orchestrator.download(url, id, tier)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Download for {} exceeded {}s and was abandoned; the extractor may still be writing its file",
                    id,
                    timeout.as_secs()
                );
                Err(DownloadFailure::Timeout(timeout))
            }
        };

        match result {
            Ok(file) => {
                if let Err(e) = slot.settle(AttemptOutcome::Success { platform: file.platform }) {
                    log::error!("Failed to record download for {}: {}", id, e);
                }
                let caption = t_args(
                    lang,
                    "video-caption",
                    &[("platform", file.platform.display_name().to_string())],
                );
                vec![OutboundAction::SendFile {
                    path: file.path,
                    caption: Some(caption),
                    kind: FileKind::Video,
                }]
            }
            Err(failure) => {
                log::warn!("Download failed for {} ({}): {}", id, url, failure);
                if let Err(e) = slot.settle(AttemptOutcome::Failure) {
                    log::error!("Failed to record failed download for {}: {}", id, e);
                }
                vec![OutboundAction::text(t(lang, "download-error"))]
            }
        }
    }

    /// Handles one event and delivers its actions to the sender's chat.
    pub async fn process(&self, event: IncomingEvent) {
        let chat = ChatTarget::from(&event.sender.id);
        let actions = self.handle_incoming(&event).await;
        self.deliver(&chat, actions).await;
    }

    /// Sends actions in order. Files are removed after their delivery attempt.
    pub async fn deliver(&self, chat: &ChatTarget, actions: Vec<OutboundAction>) {
        for action in actions {
            match action {
                OutboundAction::SendText { body, keyboard } => {
                    if let Err(e) = self.outbox.send_text(chat, &body, keyboard.as_ref()).await {
                        log::error!("Failed to send message to {}: {}", chat, e);
                    }
                }
                OutboundAction::SendFile { path, caption, kind } => {
                    if let Err(e) = self.outbox.send_file(chat, &path, caption.as_deref(), kind).await {
                        log::error!("Failed to send {} to {}: {}", path.display(), chat, e);
                    }
                    self.orchestrator.cleanup(&path).await;
                }
                OutboundAction::Broadcast { body } => {
                    let report = self.broadcast(&body).await;
                    let summary = format!(
                        "📢 Broadcast finished. Sent: {}, failed: {}",
                        report.sent, report.failed
                    );
                    if let Err(e) = self.outbox.send_text(chat, &summary, None).await {
                        log::error!("Failed to send broadcast report to {}: {}", chat, e);
                    }
                }
            }
        }
    }

    /// Sends `body` to every registered user with flood-limit pacing.
    pub async fn broadcast(&self, body: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for user in self.users.user_ids() {
            match self.outbox.send_text(&ChatTarget::from(&user), body, None).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to send broadcast to {}: {}", user, e);
                }
            }
            tokio::time::sleep(self.settings.broadcast_delay).await;
        }
        log::info!("Broadcast finished: {} sent, {} failed", report.sent, report.failed);
        report
    }
}

/// `/start`, `/start payload` and `/start@BotName` all yield `Some("start")`.
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    Some(command.split('@').next().unwrap_or(command))
}

/// First whitespace-separated token that points at a supported platform.
fn extract_link(text: &str) -> Option<&str> {
    text.split_whitespace().find(|token| is_supported_url(token))
}
