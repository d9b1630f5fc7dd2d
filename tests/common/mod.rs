//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reelsaver::core::{ChatTarget, DownloadQuota, Language, UserId};
use reelsaver::download::{
    BackendError, DownloadOrchestrator, DownloadPolicy, ExtractionBackend, OptionsProfile, SizeCeilings,
};
use reelsaver::handler::{
    DeliveryError, FileKind, HandlerSettings, IncomingEvent, Keyboard, OutboundAction, Outbox, RequestHandler,
    SenderMeta,
};
use reelsaver::storage::{SnapshotExporter, UsageStats, UserMeta, UserStore};
use tempfile::TempDir;

pub const OPERATOR: &str = "1000";
pub const OPERATOR_USERNAME: &str = "reel_admin";

/// What the stub does on one `extract` call.
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// Write these bytes to the output path
    Write(Vec<u8>),
    /// Sleep, then write a small file
    Slow(Duration),
    Fail(BackendError),
}

/// Extraction backend that replays scripted responses and counts calls.
/// Once the script runs out every call writes a small file.
pub struct StubBackend {
    responses: Mutex<VecDeque<StubResponse>>,
    calls: AtomicUsize,
    profiles: Mutex<Vec<OptionsProfile>>,
}

impl StubBackend {
    pub fn new(responses: Vec<StubResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            profiles: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn profiles(&self) -> Vec<OptionsProfile> {
        self.profiles.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn extract(&self, _url: &str, profile: &OptionsProfile, output: &Path) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles.lock().unwrap().push(profile.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            None => {
                std::fs::write(output, b"fake video").unwrap();
                Ok(())
            }
            Some(StubResponse::Write(bytes)) => {
                std::fs::write(output, bytes).unwrap();
                Ok(())
            }
            Some(StubResponse::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                std::fs::write(output, b"late video").unwrap();
                Ok(())
            }
            Some(StubResponse::Fail(e)) => Err(e),
        }
    }
}

/// One delivered message as seen by the recording outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat: String,
        body: String,
        keyboard: Option<Keyboard>,
    },
    File {
        chat: String,
        path: PathBuf,
        caption: Option<String>,
        kind: FileKind,
        /// Whether the file existed at delivery time
        existed: bool,
    },
}

/// Outbox that records everything and can be told to reject some chats.
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<Sent>>,
    failing_chats: Mutex<Vec<String>>,
    panicking_chats: Mutex<Vec<String>>,
    file_attempts: AtomicUsize,
}

impl RecordingOutbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, chat: &str) {
        self.failing_chats.lock().unwrap().push(chat.to_string());
    }

    /// Makes every delivery to `chat` panic instead of failing.
    pub fn panic_for(&self, chat: &str) {
        self.panicking_chats.lock().unwrap().push(chat.to_string());
    }

    /// File sends started, including those that failed or panicked.
    pub fn file_attempts(&self) -> usize {
        self.file_attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat: c, body, .. } if c == chat => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::File { .. }))
            .collect()
    }

    fn check(&self, chat: &ChatTarget) -> Result<(), DeliveryError> {
        let panics = self.panicking_chats.lock().unwrap().iter().any(|c| c == chat.as_str());
        if panics {
            panic!("delivery to {} blew up", chat);
        }
        if self.failing_chats.lock().unwrap().iter().any(|c| c == chat.as_str()) {
            return Err(DeliveryError::InvalidChat(chat.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send_text(&self, chat: &ChatTarget, body: &str, keyboard: Option<&Keyboard>) -> Result<(), DeliveryError> {
        self.check(chat)?;
        self.sent.lock().unwrap().push(Sent::Text {
            chat: chat.to_string(),
            body: body.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_file(
        &self,
        chat: &ChatTarget,
        path: &Path,
        caption: Option<&str>,
        kind: FileKind,
    ) -> Result<(), DeliveryError> {
        self.file_attempts.fetch_add(1, Ordering::SeqCst);
        self.check(chat)?;
        self.sent.lock().unwrap().push(Sent::File {
            chat: chat.to_string(),
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
            kind,
            existed: path.exists(),
        });
        Ok(())
    }
}

pub fn test_settings() -> HandlerSettings {
    HandlerSettings {
        operator: Some(UserId::new(OPERATOR)),
        operator_username: OPERATOR_USERNAME.to_string(),
        quota: DownloadQuota::new(5),
        download_timeout: Duration::from_secs(5),
        premium_price: 5,
        broadcast_delay: Duration::ZERO,
    }
}

pub fn test_policy(dir: &Path) -> DownloadPolicy {
    DownloadPolicy {
        download_dir: dir.join("downloads"),
        ceilings: SizeCeilings {
            free_mb: 15,
            premium_mb: 100,
        },
    }
}

/// A request handler wired to stub collaborators in a temp directory.
pub struct Fixture {
    pub dir: TempDir,
    pub users: Arc<UserStore>,
    pub stats: Arc<UsageStats>,
    pub backend: Arc<StubBackend>,
    pub outbox: Arc<RecordingOutbox>,
    pub orchestrator: Arc<DownloadOrchestrator>,
    pub exporter: SnapshotExporter,
    pub handler: RequestHandler,
}

impl Fixture {
    pub fn new(backend: Arc<StubBackend>) -> Self {
        Self::with_settings(backend, test_settings())
    }

    pub fn with_settings(backend: Arc<StubBackend>, settings: HandlerSettings) -> Self {
        let dir = TempDir::new().unwrap();
        let users = Arc::new(UserStore::open(dir.path().join("user_data.json")).unwrap());
        let stats = Arc::new(UsageStats::open(dir.path().join("stats.json")).unwrap());
        let outbox = RecordingOutbox::new();
        let orchestrator = Arc::new(DownloadOrchestrator::new(
            backend.clone() as Arc<dyn ExtractionBackend>,
            test_policy(dir.path()),
        ));
        let exporter = SnapshotExporter::new(Arc::clone(&users), Arc::clone(&stats), dir.path().join("exports"));
        let handler = RequestHandler::new(
            Arc::clone(&users),
            Arc::clone(&stats),
            Arc::clone(&orchestrator),
            outbox.clone() as Arc<dyn Outbox>,
            exporter.clone(),
            settings,
        );

        Self {
            dir,
            users,
            stats,
            backend,
            outbox,
            orchestrator,
            exporter,
            handler,
        }
    }

    /// Registers `id` with a chosen language, bypassing the handler.
    pub fn onboard(&self, id: &str, lang: Language) -> UserId {
        let id = UserId::new(id);
        self.users.register(&id, UserMeta::default()).unwrap();
        self.users.set_language(&id, lang).unwrap();
        id
    }

    pub async fn send(&self, id: &str, text: &str) -> Vec<OutboundAction> {
        self.handler
            .handle_incoming(&IncomingEvent::text(SenderMeta::new(id), text))
            .await
    }

    pub async fn press(&self, id: &str, data: &str) -> Vec<OutboundAction> {
        self.handler
            .handle_incoming(&IncomingEvent::callback(SenderMeta::new(id), data))
            .await
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }
}

/// Bodies of the text actions, in order.
pub fn bodies(actions: &[OutboundAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            OutboundAction::SendText { body, .. } => Some(body.clone()),
            _ => None,
        })
        .collect()
}

pub fn single_body(actions: &[OutboundAction]) -> String {
    assert_eq!(actions.len(), 1, "expected exactly one action, got {:?}", actions);
    bodies(actions).remove(0)
}

pub fn keyboard_of(action: &OutboundAction) -> Option<&Keyboard> {
    match action {
        OutboundAction::SendText { keyboard, .. } => keyboard.as_ref(),
        _ => None,
    }
}

pub const TIKTOK_URL: &str = "https://www.tiktok.com/@someone/video/7300000000000000000";
pub const INSTAGRAM_URL: &str = "https://www.instagram.com/reel/Cabc123/";
