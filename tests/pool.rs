//! End-to-end pool behavior against scripted collaborators: outcome
//! serialization, artifact-change propagation, upload-failure tolerance, and
//! fatal version skew.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use playgen::config::{
    AppConfig, EngineConfig, PathsConfig, PoolSettings, ServerConfig, SyncSettings,
};
use playgen::engine::{Engine, EngineOptions, GameSession};
use playgen::error::{PlaygenError, Result};
use playgen::pool::PoolCoordinator;
use playgen::sync::{ArtifactRef, ArtifactSynchronizer, RetryPolicy};
use playgen::transport::{ArtifactTransport, LatestArtifact, Uploader};

fn hash_of(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Server fake: serves whichever artifact the test currently publishes.
#[derive(Clone)]
struct FakeServer {
    current: Arc<Mutex<String>>,
    min_client_version: Arc<Mutex<u32>>,
    payloads: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fetches: Arc<AtomicU64>,
}

impl FakeServer {
    fn new(initial_payload: &[u8]) -> Self {
        let id = hash_of(initial_payload);
        let mut payloads = HashMap::new();
        payloads.insert(id.clone(), initial_payload.to_vec());
        Self {
            current: Arc::new(Mutex::new(id)),
            min_client_version: Arc::new(Mutex::new(1)),
            payloads: Arc::new(Mutex::new(payloads)),
            fetches: Arc::new(AtomicU64::new(0)),
        }
    }

    fn publish(&self, payload: &[u8]) -> String {
        let id = hash_of(payload);
        self.payloads
            .lock()
            .unwrap()
            .insert(id.clone(), payload.to_vec());
        *self.current.lock().unwrap() = id.clone();
        id
    }
}

#[async_trait]
impl ArtifactTransport for FakeServer {
    async fn query_latest(&self) -> Result<LatestArtifact> {
        Ok(LatestArtifact {
            identifier: self.current.lock().unwrap().clone(),
            min_client_version: *self.min_client_version.lock().unwrap(),
        })
    }

    async fn fetch(&self, identifier: &str, dest: &Path) -> Result<PathBuf> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .payloads
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| PlaygenError::Transport(format!("unknown artifact {identifier}")))?;
        let path = dest.join(identifier);
        std::fs::write(&path, payload)?;
        Ok(path)
    }
}

/// Upload fake: records every submission, optionally failing all of them.
#[derive(Clone)]
struct RecordingUploader {
    submissions: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingUploader {
    fn new(fail: bool) -> Self {
        Self {
            submissions: Arc::new(Mutex::new(Vec::new())),
            fail,
        }
    }

    fn count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, result_id: &str, artifact_id: &str, _client_version: u32) -> Result<()> {
        self.submissions
            .lock()
            .unwrap()
            .push((result_id.to_string(), artifact_id.to_string()));
        if self.fail {
            return Err(PlaygenError::Transport("submit endpoint down".into()));
        }
        Ok(())
    }
}

struct FakeSession {
    moves_left: u64,
    concluded: bool,
    result_id: String,
    shutdowns: Arc<AtomicU64>,
}

#[async_trait]
impl GameSession for FakeSession {
    async fn request_move(&mut self) -> Result<()> {
        tokio::task::yield_now().await;
        if self.moves_left > 0 {
            self.moves_left -= 1;
            if self.moves_left == 0 {
                self.concluded = true;
            }
        }
        Ok(())
    }

    fn game_concluded(&self) -> bool {
        self.concluded
    }

    async fn is_scoreable(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn persist_result(&mut self) -> Result<String> {
        Ok(self.result_id.clone())
    }

    async fn dump_training_data(&mut self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Engine fake: short fixed-length games, records which artifact each game
/// started against.
#[derive(Clone)]
struct FakeEngine {
    moves_per_game: u64,
    starts: Arc<Mutex<Vec<String>>>,
    sessions: Arc<AtomicU64>,
    shutdowns: Arc<AtomicU64>,
}

impl FakeEngine {
    fn new(moves_per_game: u64) -> Self {
        Self {
            moves_per_game,
            starts: Arc::new(Mutex::new(Vec::new())),
            sessions: Arc::new(AtomicU64::new(0)),
            shutdowns: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn start(
        &self,
        artifact: &ArtifactRef,
        _options: &EngineOptions,
    ) -> Result<Box<dyn GameSession>> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst);
        self.starts
            .lock()
            .unwrap()
            .push(artifact.identifier.clone());
        Ok(Box::new(FakeSession {
            moves_left: self.moves_per_game,
            concluded: false,
            result_id: format!("res-{n}"),
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }
}

fn test_config(data_dir: &Path, workers: usize) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            base_url: "http://unused.test".into(),
            client_version: 1,
        },
        pool: PoolSettings {
            gpus: Vec::new(),
            games_per_device: workers,
        },
        engine: EngineConfig::default(),
        paths: PathsConfig {
            data_dir: data_dir.to_path_buf(),
            keep_dir: None,
            debug_dir: None,
        },
        sync: SyncSettings::default(),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        max_retries: 3,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn outcomes_are_processed_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeServer::new(b"alpha");
    let uploader = RecordingUploader::new(false);
    let engine = FakeEngine::new(3);

    let cfg = test_config(dir.path(), 4);
    let synchronizer =
        ArtifactSynchronizer::new(server.clone(), 1, dir.path().to_path_buf(), fast_retry());
    let coordinator = PoolCoordinator::new(
        &cfg,
        synchronizer,
        Arc::new(engine.clone()),
        Arc::new(uploader.clone()),
    );
    let games_played = coordinator.games_played_counter();
    let moves_made = coordinator.moves_made_counter();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = tokio::spawn(coordinator.run(shutdown_rx));

    let observed = Arc::clone(&games_played);
    wait_until(move || observed.load(Ordering::SeqCst) >= 10).await;
    shutdown_tx.send(true).unwrap();
    pool.await.unwrap().unwrap();

    // Every processed outcome was counted once and uploaded once; nothing
    // was lost or double-counted across 4 concurrent workers.
    let games = games_played.load(Ordering::SeqCst);
    assert!(games >= 10);
    assert_eq!(uploader.count() as u64, games);
    assert!(moves_made.load(Ordering::Relaxed) >= 3 * games);
    // All result ids are distinct.
    let mut ids: Vec<String> = uploader
        .submissions
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len() as u64, games);
}

#[tokio::test(flavor = "multi_thread")]
async fn artifact_change_is_broadcast_to_all_workers() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeServer::new(b"alpha");
    let id_a = hash_of(b"alpha");
    let uploader = RecordingUploader::new(false);
    let engine = FakeEngine::new(4);

    let cfg = test_config(dir.path(), 2);
    let synchronizer =
        ArtifactSynchronizer::new(server.clone(), 1, dir.path().to_path_buf(), fast_retry());
    let coordinator = PoolCoordinator::new(
        &cfg,
        synchronizer,
        Arc::new(engine.clone()),
        Arc::new(uploader.clone()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = tokio::spawn(coordinator.run(shutdown_rx));

    // Let both workers play a few games against "alpha" first.
    let u = uploader.clone();
    wait_until(move || u.count() >= 3).await;
    let id_b = server.publish(b"beta");

    // Both workers must pick up the new artifact within a game boundary.
    let starts = Arc::clone(&engine.starts);
    let expect_b = id_b.clone();
    wait_until(move || {
        starts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == expect_b)
            .count()
            >= 2
    })
    .await;

    // And uploads flip to the new attribution for good.
    let u = uploader.clone();
    let expect_b = id_b.clone();
    wait_until(move || u.submissions.lock().unwrap().iter().any(|(_, a)| *a == expect_b)).await;

    shutdown_tx.send(true).unwrap();
    pool.await.unwrap().unwrap();

    let submissions = uploader.submissions.lock().unwrap();
    let first_b = submissions.iter().position(|(_, a)| *a == id_b).unwrap();
    assert!(
        submissions[first_b..].iter().all(|(_, a)| *a == id_b),
        "no game may be attributed to {id_a} after the switch"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_failures_do_not_stall_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeServer::new(b"alpha");
    let uploader = RecordingUploader::new(true);
    let engine = FakeEngine::new(2);

    let cfg = test_config(dir.path(), 2);
    let synchronizer =
        ArtifactSynchronizer::new(server.clone(), 1, dir.path().to_path_buf(), fast_retry());
    let coordinator = PoolCoordinator::new(
        &cfg,
        synchronizer,
        Arc::new(engine.clone()),
        Arc::new(uploader.clone()),
    );
    let games_played = coordinator.games_played_counter();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = tokio::spawn(coordinator.run(shutdown_rx));

    // Workers keep completing games and the artifact keeps being re-resolved
    // even though every upload fails.
    let observed = Arc::clone(&games_played);
    wait_until(move || observed.load(Ordering::SeqCst) >= 5).await;
    assert!(uploader.count() >= 5);

    // A new artifact still propagates after upload failures.
    let id_b = server.publish(b"beta");
    let starts = Arc::clone(&engine.starts);
    wait_until(move || starts.lock().unwrap().iter().any(|s| *s == id_b)).await;

    shutdown_tx.send(true).unwrap();
    pool.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_drains_every_worker() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeServer::new(b"alpha");
    let uploader = RecordingUploader::new(false);
    let engine = FakeEngine::new(3);

    let cfg = test_config(dir.path(), 3);
    let synchronizer =
        ArtifactSynchronizer::new(server.clone(), 1, dir.path().to_path_buf(), fast_retry());
    let coordinator = PoolCoordinator::new(
        &cfg,
        synchronizer,
        Arc::new(engine.clone()),
        Arc::new(uploader.clone()),
    );
    let games_played = coordinator.games_played_counter();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = tokio::spawn(coordinator.run(shutdown_rx));

    let observed = Arc::clone(&games_played);
    wait_until(move || observed.load(Ordering::SeqCst) >= 3).await;
    shutdown_tx.send(true).unwrap();
    pool.await.unwrap().unwrap();

    // Every engine instance that was started was also shut down.
    assert_eq!(
        engine.sessions.load(Ordering::SeqCst),
        engine.shutdowns.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn server_version_skew_is_fatal_before_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeServer::new(b"alpha");
    *server.min_client_version.lock().unwrap() = 99;
    let uploader = RecordingUploader::new(false);
    let engine = FakeEngine::new(2);

    let cfg = test_config(dir.path(), 2);
    let synchronizer =
        ArtifactSynchronizer::new(server.clone(), 1, dir.path().to_path_buf(), fast_retry());
    let coordinator = PoolCoordinator::new(
        &cfg,
        synchronizer,
        Arc::new(engine.clone()),
        Arc::new(uploader),
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = coordinator.run(shutdown_rx).await.unwrap_err();
    assert!(matches!(
        err,
        PlaygenError::IncompatibleServer {
            required: 99,
            ours: 1
        }
    ));
    assert!(err.is_fatal());
    assert_eq!(server.fetches.load(Ordering::SeqCst), 0);
    assert!(engine.starts.lock().unwrap().is_empty());
}
