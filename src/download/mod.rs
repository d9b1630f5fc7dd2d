//! Download orchestration: platform detection, option profiles and the extraction backend

pub mod backend;
pub mod orchestrator;
pub mod platform;
pub mod profile;
pub mod ytdlp;

// Re-exports for convenience
pub use backend::{BackendError, ExtractionBackend};
pub use orchestrator::{DownloadFailure, DownloadOrchestrator, DownloadPolicy, DownloadResult, DownloadedFile};
pub use platform::{is_supported_url, resolve_platform};
pub use profile::{OptionsProfile, SizeCeilings};
pub use ytdlp::YtDlpBackend;
