use chrono::{DateTime, Utc};

use tidings_core::task::PeriodicJob;
use tidings_notify::domain::repository::SyncStateRepository;
use tidings_notify::error::NotifyServiceError;
use tidings_notify::usecase::directory_sync::{
    DirectorySyncJob, LAST_USER_SYNC_KEY, SyncDirectoryUseCase, SyncMode,
};

use crate::helpers::{InMemoryStore, MockProfileSource, at, test_user};

fn sync(
    source: &MockProfileSource,
    store: &InMemoryStore,
) -> SyncDirectoryUseCase<MockProfileSource, InMemoryStore, InMemoryStore> {
    SyncDirectoryUseCase {
        source: source.clone(),
        directory: store.clone(),
        state: store.clone(),
    }
}

#[tokio::test]
async fn should_import_everything_on_first_incremental_sync() {
    let source = MockProfileSource::new(vec![test_user("ana", at(1)), test_user("ben", at(2))]);
    let store = InMemoryStore::new();
    let before = Utc::now();

    let report = sync(&source, &store).execute(SyncMode::Incremental).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.written, 2);
    assert_eq!(source.calls(), vec![None]);
    let recorded = store.sync_value(LAST_USER_SYNC_KEY).expect("last sync recorded");
    let recorded: DateTime<Utc> = recorded.parse().unwrap();
    assert!(recorded >= before);
}

#[tokio::test]
async fn should_resume_from_recorded_sync_time() {
    let source = MockProfileSource::new(vec![test_user("ana", at(1)), test_user("ben", at(5))]);
    let store = InMemoryStore::new();
    store
        .set(LAST_USER_SYNC_KEY, &at(3).to_rfc3339())
        .await
        .unwrap();

    let report = sync(&source, &store).execute(SyncMode::Incremental).await.unwrap();

    assert_eq!(source.calls(), vec![Some(at(3))]);
    assert_eq!(report.fetched, 1);
    assert_eq!(store.users()[0].username, "ben");
}

#[tokio::test]
async fn should_fall_back_to_full_sync_on_unreadable_state() {
    let source = MockProfileSource::new(vec![test_user("ana", at(1))]);
    let store = InMemoryStore::new();
    store.set(LAST_USER_SYNC_KEY, "yesterday-ish").await.unwrap();

    sync(&source, &store).execute(SyncMode::Incremental).await.unwrap();

    assert_eq!(source.calls(), vec![None]);
}

#[tokio::test]
async fn should_keep_newer_local_rows() {
    let mut local = test_user("ana-local", at(6));
    let store = InMemoryStore::with_users(vec![local.clone()]);
    local.username = "ana-remote".to_owned();
    local.updated_at = at(1);
    let source = MockProfileSource::new(vec![local]);

    let report = sync(&source, &store).execute(SyncMode::Full).await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.written, 0);
    assert_eq!(store.users()[0].username, "ana-local");
}

#[tokio::test]
async fn should_not_advance_sync_time_when_fetch_fails() {
    let source = MockProfileSource::failing();
    let store = InMemoryStore::new();

    let result = sync(&source, &store).execute(SyncMode::Incremental).await;

    assert!(matches!(result, Err(NotifyServiceError::Transport(_))));
    assert!(store.sync_value(LAST_USER_SYNC_KEY).is_none());
}

#[tokio::test]
async fn should_sync_from_explicit_point_in_time() {
    let source = MockProfileSource::new(vec![test_user("ana", at(1)), test_user("ben", at(5))]);
    let store = InMemoryStore::new();

    let report = sync(&source, &store).execute(SyncMode::Since(at(4))).await.unwrap();

    assert_eq!(source.calls(), vec![Some(at(4))]);
    assert_eq!(report.written, 1);
}

#[tokio::test]
async fn should_name_jobs_by_mode() {
    let source = MockProfileSource::new(vec![]);
    let store = InMemoryStore::new();
    let incremental = DirectorySyncJob {
        usecase: sync(&source, &store),
        mode: SyncMode::Incremental,
    };
    let full = DirectorySyncJob {
        usecase: sync(&source, &store),
        mode: SyncMode::Full,
    };

    incremental.run().await.unwrap();

    assert_eq!(incremental.name(), "directory-sync");
    assert_eq!(full.name(), "directory-full-sync");
    assert!(store.sync_value(LAST_USER_SYNC_KEY).is_some());
}
