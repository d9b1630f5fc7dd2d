//! Integration tests for the stale-file sweep and weekly export
//!
//! Run with: cargo test --test housekeeping_test

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, TimeZone, Weekday};
use common::{RecordingOutbox, Sent};
use reelsaver::core::{ChatTarget, UserId};
use reelsaver::handler::{FileKind, Outbox};
use reelsaver::housekeeping::{Housekeeper, HousekeeperSettings, SweepReport};
use reelsaver::storage::{SnapshotExporter, UsageStats, UserMeta, UserStore};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Setup {
    dir: TempDir,
    outbox: Arc<RecordingOutbox>,
    housekeeper: Arc<Housekeeper>,
}

fn settings(dir: &Path) -> HousekeeperSettings {
    HousekeeperSettings {
        download_dir: dir.join("downloads"),
        retention: Duration::from_secs(3600),
        interval: Duration::from_secs(3600),
        failure_backoff: Duration::from_secs(60),
        export_weekday: Weekday::Mon,
        export_hour: 0,
    }
}

fn setup(recipients: &[&str]) -> Setup {
    setup_at(recipients, Local::now)
}

fn setup_at(recipients: &[&str], clock: fn() -> DateTime<Local>) -> Setup {
    let dir = TempDir::new().unwrap();
    let users = Arc::new(UserStore::open(dir.path().join("user_data.json")).unwrap());
    users.register(&UserId::new("7"), UserMeta::default()).unwrap();
    let stats = Arc::new(UsageStats::open(dir.path().join("stats.json")).unwrap());
    let exporter = SnapshotExporter::new(users, stats, dir.path().join("exports"));
    let outbox = RecordingOutbox::new();
    let housekeeper = Arc::new(Housekeeper::new(
        settings(dir.path()),
        exporter,
        outbox.clone() as Arc<dyn Outbox>,
        recipients.iter().map(|chat| ChatTarget::new(*chat)),
    )
    .with_clock(clock));
    Setup {
        dir,
        outbox,
        housekeeper,
    }
}

fn write_aged(path: &Path, age: Duration) {
    let file = File::create(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn monday_half_past_midnight() -> DateTime<Local> {
    // 2024-01-01 was a Monday
    Local.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).earliest().unwrap()
}

mod sweep {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_only_files_older_than_retention() {
        let s = setup(&[]);
        let downloads = s.dir.path().join("downloads");
        std::fs::create_dir_all(downloads.join("nested")).unwrap();
        write_aged(&downloads.join("old.mp4"), Duration::from_secs(2 * 3600));
        write_aged(&downloads.join("fresh.mp4"), Duration::from_secs(60));

        let report = s.housekeeper.sweep_stale_files(SystemTime::now()).unwrap();

        assert_eq!(report, SweepReport { removed: 1, failed: 0 });
        assert!(!downloads.join("old.mp4").exists());
        assert!(downloads.join("fresh.mp4").exists());
        assert!(downloads.join("nested").is_dir());
    }

    #[test]
    fn missing_download_dir_is_not_an_error() {
        let s = setup(&[]);

        let report = s.housekeeper.sweep_stale_files(SystemTime::now()).unwrap();

        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn future_mtime_counts_as_fresh() {
        let s = setup(&[]);
        let downloads = s.dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        write_aged(&downloads.join("clip.mp4"), Duration::from_secs(10));

        let an_hour_ago = SystemTime::now() - Duration::from_secs(3600);
        let report = s.housekeeper.sweep_stale_files(an_hour_ago).unwrap();

        assert_eq!(report.removed, 0);
        assert!(downloads.join("clip.mp4").exists());
    }
}

mod weekly_export {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn outside_window_does_nothing() {
        let s = setup(&["1000"]);
        let tuesday = Local.with_ymd_and_hms(2024, 1, 2, 0, 30, 0).earliest().unwrap();
        let monday_noon = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).earliest().unwrap();

        assert_eq!(s.housekeeper.maybe_export(tuesday).await.unwrap(), None);
        assert_eq!(s.housekeeper.maybe_export(monday_noon).await.unwrap(), None);
        assert!(s.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn delivers_to_every_recipient_then_removes_file() {
        let s = setup(&["1000", "-100500"]);

        let path = s
            .housekeeper
            .maybe_export(monday_half_past_midnight())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "backup_20240101.json");
        let files = s.outbox.files();
        assert_eq!(files.len(), 2);
        for sent in &files {
            let Sent::File { kind, caption, existed, .. } = sent else {
                unreachable!()
            };
            assert_eq!(*kind, FileKind::Document);
            assert_eq!(caption.as_deref(), Some("Weekly backup 20240101"));
            assert!(*existed);
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn runs_at_most_once_per_day() {
        let s = setup(&["1000"]);
        let first = monday_half_past_midnight();
        let later = first + chrono::Duration::minutes(20);

        assert!(s.housekeeper.maybe_export(first).await.unwrap().is_some());
        assert_eq!(s.housekeeper.maybe_export(later).await.unwrap(), None);
        assert_eq!(s.outbox.files().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_the_file() {
        let s = setup(&["1000"]);
        s.outbox.fail_for("1000");

        let path = s
            .housekeeper
            .maybe_export(monday_half_past_midnight())
            .await
            .unwrap()
            .unwrap();

        assert!(path.exists());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"user_data\""));
    }

    #[tokio::test]
    async fn duplicate_recipients_get_one_copy() {
        let s = setup(&["1000", "1000"]);

        s.housekeeper.maybe_export(monday_half_past_midnight()).await.unwrap();

        assert_eq!(s.outbox.files().len(), 1);
    }

    #[tokio::test]
    async fn no_recipients_keeps_the_file() {
        let s = setup(&[]);

        let path = s
            .housekeeper
            .maybe_export(monday_half_past_midnight())
            .await
            .unwrap()
            .unwrap();

        assert!(path.exists());
    }
}

mod run_loop {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn stop(cancel: CancellationToken, task: tokio::task::JoinHandle<()>) {
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("housekeeper did not stop")
            .unwrap();
    }

    /// Plants a stale download and checks it survives until the back-off elapsed.
    async fn assert_retried_after_backoff(s: &Setup) {
        let downloads = s.dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        write_aged(&downloads.join("old.mp4"), Duration::from_secs(2 * 3600));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(downloads.join("old.mp4").exists(), "ticked again before the back-off");

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(!downloads.join("old.mp4").exists(), "no second tick after the back-off");
    }

    #[tokio::test]
    async fn stops_on_cancellation() {
        let s = setup(&[]);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&s.housekeeper).run(cancel.clone()));

        stop(cancel, task).await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_is_retried_after_backoff() {
        let s = setup_at(&["1000"], monday_half_past_midnight);
        s.outbox.panic_for("1000");
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&s.housekeeper).run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(s.outbox.file_attempts(), 1);
        assert!(!task.is_finished());

        assert_retried_after_backoff(&s).await;
        // Same day, so the export is not attempted again
        assert_eq!(s.outbox.file_attempts(), 1);
        stop(cancel, task).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_is_retried_after_backoff() {
        let s = setup_at(&["1000"], monday_half_past_midnight);
        // The export directory cannot be created over a regular file
        std::fs::write(s.dir.path().join("exports"), b"in the way").unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&s.housekeeper).run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!task.is_finished());

        assert_retried_after_backoff(&s).await;
        assert_eq!(s.outbox.file_attempts(), 0);
        stop(cancel, task).await;
    }
}
