use packsync_manifest::{Assembler, Manifest, Scanner};
use packsync_storage::{BackendHandle, StorageBackend};
use packsync_storage::backend::{MockBackend, Operation};
use packsync_sync::error::{ErrorKind, Operation as FailedOperation};
use packsync_sync::{Outcome, Publisher};
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const BASE_URL: &str = "https://example.com/api/";

struct Repository {
    dir: TempDir,
}

impl Repository {
    fn new() -> Self {
        let repository = Self { dir: tempfile::tempdir().unwrap() };
        let config = serde_json::json!({
            "config_name": "tfc",
            "minecraft_version": "1.18.2",
            "forge_version": "1.18.2-40.2.9",
            "minecraft_profile": "1.18.2-forge-40.2.9",
            "minecraft_server_ip": "77.239.232.50",
            "minecraft_server_port": "25570",
        });
        repository.write("modpacks/tfc/config.json", &serde_json::to_string(&config).unwrap());
        repository
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn remove(&self, relative: &str) {
        fs::remove_file(self.root().join(relative)).unwrap();
    }

    fn assemble(&self) -> Manifest {
        Assembler::new(Scanner::new(self.root(), BASE_URL)).assemble("modpacks").unwrap()
    }

    fn manifest_path(&self) -> PathBuf {
        self.root().join("map.json")
    }

    fn publisher(&self, backend: &Arc<MockBackend>) -> Publisher {
        let handle: BackendHandle = backend.clone();
        Publisher::new(handle, self.root(), "map.json", "map.json")
    }
}

fn keys(keys: &[&str]) -> Vec<PathBuf> {
    keys.iter().map(PathBuf::from).collect()
}

async fn read(backend: &MockBackend, key: &str) -> Vec<u8> {
    backend.read(Path::new(key)).await.unwrap()
}

/// Diff against whatever storage currently publishes, as `packsync sync` does.
async fn sync(publisher: &Publisher, new: &Manifest) -> packsync_sync::error::Result<Outcome> {
    let old = publisher.published().await?;
    publisher.publish(new, &old).await
}

/// A healthy backend holding the same objects as `backend`.
async fn copy_of(backend: &MockBackend) -> Arc<MockBackend> {
    let mut files = Vec::new();
    for key in backend.keys().await {
        let data = backend.read(&key).await.unwrap();
        files.push((key, data));
    }
    Arc::new(MockBackend::with_files(files))
}

#[tokio::test]
async fn test_first_publish_uploads_everything() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/mods/tfc.jar", "tfc");
    repository.write("modpacks/tfc/client_additional_data/shaders/pack.zip", "shader");
    let backend = Arc::new(MockBackend::default());

    let new = repository.assemble();
    let outcome = sync(&repository.publisher(&backend), &new).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 2 });
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(
        backend.uploads().await,
        keys(&["modpacks/tfc/client_additional_data/shaders/pack.zip", "modpacks/tfc/main_data/mods/tfc.jar"])
    );
    assert_eq!(read(&backend, "map.json").await, new.to_json().unwrap());
    assert_eq!(Manifest::load(repository.manifest_path()).unwrap(), Some(new));
    // Manifest is published last.
    let operations = backend.operations().await;
    assert_eq!(operations.last(), Some(&Operation::Write(PathBuf::from("map.json"))));
}

#[tokio::test]
async fn test_sync_after_build_still_uploads() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    repository.write("modpacks/tfc/main_data/b.jar", "b");
    let backend = Arc::new(MockBackend::default());
    let publisher = repository.publisher(&backend);

    // `build` has already brought the local manifest up to date.
    let new = repository.assemble();
    new.save(repository.manifest_path()).unwrap();
    let outcome = sync(&publisher, &new).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 2 });
    assert_eq!(
        backend.keys().await,
        keys(&["map.json", "modpacks/tfc/main_data/a.jar", "modpacks/tfc/main_data/b.jar"])
    );
    assert_eq!(publisher.published().await.unwrap(), new);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    let backend = Arc::new(MockBackend::default());
    let publisher = repository.publisher(&backend);

    sync(&publisher, &repository.assemble()).await.unwrap();
    let before = backend.operations().await;
    let written = fs::read(repository.manifest_path()).unwrap();

    let outcome = sync(&publisher, &repository.assemble()).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(backend.operations().await, before);
    assert_eq!(fs::read(repository.manifest_path()).unwrap(), written);
}

#[tokio::test]
async fn test_removed_file_is_deleted() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/old.txt", "old");
    repository.write("modpacks/tfc/main_data/kept.txt", "kept");
    let backend = Arc::new(MockBackend::default());
    let publisher = repository.publisher(&backend);
    sync(&publisher, &repository.assemble()).await.unwrap();

    repository.remove("modpacks/tfc/main_data/old.txt");
    let outcome = sync(&publisher, &repository.assemble()).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 1, uploaded: 0 });
    assert_eq!(backend.deletes().await, keys(&["modpacks/tfc/main_data/old.txt"]));
    assert_eq!(backend.keys().await, keys(&["map.json", "modpacks/tfc/main_data/kept.txt"]));
}

#[tokio::test]
async fn test_changed_file_is_reuploaded_only() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.txt", "first");
    repository.write("modpacks/tfc/main_data/b.txt", "unchanged");
    let backend = Arc::new(MockBackend::default());
    let publisher = repository.publisher(&backend);
    sync(&publisher, &repository.assemble()).await.unwrap();
    let uploads_before = backend.uploads().await.len();

    repository.write("modpacks/tfc/main_data/a.txt", "second");
    let outcome = sync(&publisher, &repository.assemble()).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 1 });
    assert!(backend.deletes().await.is_empty());
    let uploads = backend.uploads().await;
    assert_eq!(&uploads[uploads_before..], keys(&["modpacks/tfc/main_data/a.txt"]).as_slice());
    assert_eq!(read(&backend, "modpacks/tfc/main_data/a.txt").await, b"second");
}

#[tokio::test]
async fn test_failed_upload_aborts_without_persisting() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    repository.write("modpacks/tfc/main_data/b.jar", "b");
    let backend = Arc::new(MockBackend::default().failing_on("modpacks/tfc/main_data/a.jar"));

    let err = sync(&repository.publisher(&backend), &repository.assemble()).await.unwrap_err();

    assert!(matches!(
        &*err,
        ErrorKind::StorageOperationFailed { operation: FailedOperation::Upload, key }
            if key == "modpacks/tfc/main_data/a.jar"
    ));
    // Fail-fast: nothing after the failing key, and no manifest anywhere.
    assert!(backend.operations().await.is_empty());
    assert!(!repository.manifest_path().exists());
}

#[tokio::test]
async fn test_failed_manifest_publish_is_retried() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    let failing = Arc::new(MockBackend::default().failing_on("map.json"));
    let new = repository.assemble();

    let err = sync(&repository.publisher(&failing), &new).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Persist));
    assert_eq!(failing.uploads().await, keys(&["modpacks/tfc/main_data/a.jar"]));
    // The local file would hide the unpublished change from the next run.
    assert!(!repository.manifest_path().exists());

    let healthy = copy_of(&failing).await;
    let outcome = sync(&repository.publisher(&healthy), &new).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 1 });
    assert_eq!(healthy.keys().await, keys(&["map.json", "modpacks/tfc/main_data/a.jar"]));
    assert_eq!(Manifest::load(repository.manifest_path()).unwrap(), Some(new));
}

#[tokio::test]
async fn test_failed_delete_aborts_before_uploads() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/old.jar", "old");
    let previous = repository.assemble();
    let published = previous.to_json().unwrap();
    let backend = Arc::new(
        MockBackend::with_files([
            ("modpacks/tfc/main_data/old.jar", b"old".to_vec()),
            ("map.json", published.clone()),
        ])
        .failing_on("modpacks/tfc/main_data/old.jar"),
    );
    let publisher = repository.publisher(&backend);

    repository.remove("modpacks/tfc/main_data/old.jar");
    repository.write("modpacks/tfc/main_data/new.jar", "new");
    let err = sync(&publisher, &repository.assemble()).await.unwrap_err();

    assert!(matches!(&*err, ErrorKind::StorageOperationFailed { operation: FailedOperation::Delete, .. }));
    assert!(backend.uploads().await.is_empty());
    assert_eq!(read(&backend, "map.json").await, published);
    assert_eq!(publisher.published().await.unwrap(), previous);
    assert!(!repository.manifest_path().exists());
}

#[tokio::test]
async fn test_delete_of_absent_key_is_tolerated() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/gone.jar", "gone");
    let previous = repository.assemble();
    repository.remove("modpacks/tfc/main_data/gone.jar");
    // Published manifest lists a file storage never received, e.g. after an
    // interrupted earlier run.
    let backend = Arc::new(MockBackend::with_files([("map.json", previous.to_json().unwrap())]));

    let outcome = sync(&repository.publisher(&backend), &repository.assemble()).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 1, uploaded: 0 });
    assert!(backend.deletes().await.is_empty());
    assert!(repository.manifest_path().exists());
}

#[tokio::test]
async fn test_unreadable_published_manifest_counts_as_empty() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    let backend = Arc::new(MockBackend::with_files([("map.json", b"{ not json".to_vec())]));
    let publisher = repository.publisher(&backend);

    assert_eq!(publisher.published().await.unwrap(), Manifest::default());
    let outcome = sync(&publisher, &repository.assemble()).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 1 });
    assert_eq!(publisher.published().await.unwrap(), repository.assemble());
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    let backend = Arc::new(MockBackend::with_files([("modpacks/tfc/main_data/stale.jar", b"stale".to_vec())]));
    let mut previous = repository.assemble();
    let stale = {
        let mut record = previous.modpacks["tfc"].main_data[0].clone();
        record.storage_key = "modpacks/tfc/main_data/stale.jar".to_string();
        record
    };
    previous.modpacks.get_mut("tfc").unwrap().main_data.push(stale);
    repository.write("modpacks/tfc/main_data/a.jar", "changed");

    let outcome = repository.publisher(&backend).dry_run().publish(&repository.assemble(), &previous).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 1, uploaded: 1 });
    assert!(backend.operations().await.is_empty());
    assert_eq!(backend.keys().await, keys(&["modpacks/tfc/main_data/stale.jar"]));
    assert!(!repository.manifest_path().exists());
}

#[tokio::test]
async fn test_config_change_alone_is_persisted() {
    let repository = Repository::new();
    repository.write("modpacks/tfc/main_data/a.jar", "a");
    let backend = Arc::new(MockBackend::default());
    let publisher = repository.publisher(&backend);
    sync(&publisher, &repository.assemble()).await.unwrap();

    let mut new = repository.assemble();
    new.modpacks.get_mut("tfc").unwrap().config.minecraft_server_port = "25571".to_string();
    let outcome = sync(&publisher, &new).await.unwrap();

    assert_eq!(outcome, Outcome::Changed { deleted: 0, uploaded: 0 });
    assert_eq!(publisher.published().await.unwrap(), new);
    assert_eq!(Manifest::load(repository.manifest_path()).unwrap(), Some(new));
}

#[rstest]
#[case(Outcome::Unchanged, 0, false)]
#[case(Outcome::Changed { deleted: 0, uploaded: 0 }, 1, true)]
#[case(Outcome::Changed { deleted: 3, uploaded: 2 }, 1, true)]
fn test_exit_code(#[case] outcome: Outcome, #[case] code: u8, #[case] changed: bool) {
    assert_eq!(outcome.exit_code(), code);
    assert_eq!(outcome.is_changed(), changed);
}
