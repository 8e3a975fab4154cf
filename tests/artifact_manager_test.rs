mod common;

use std::path::PathBuf;

use axum::{routing::get, Router};
use moodlens::artifact_manager::sha256_hex;
use moodlens::{ArtifactError, ArtifactInfo, ArtifactManager, SentimentClassifier};

fn temp_manager(tag: &str) -> (ArtifactManager, PathBuf) {
    let dir = std::env::temp_dir().join(format!("moodlens-cache-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    (ArtifactManager::new(&dir).unwrap(), dir)
}

fn artifact_bytes() -> (Vec<u8>, Vec<u8>) {
    let vocabulary = serde_json::to_vec(&common::vocabulary()).unwrap();
    let weights = common::parameters().to_bytes().unwrap();
    (vocabulary, weights)
}

#[test]
fn test_fixture_artifacts_are_reproducible() {
    // Digests recorded once must keep matching every later serialization.
    assert_eq!(artifact_bytes(), artifact_bytes());
    let (vocabulary, _) = artifact_bytes();
    let info = info_for("http://unused.invalid", "mh");
    assert_eq!(sha256_hex(&vocabulary), info.vocabulary_hash);
}

/// Serves the fixture artifacts over HTTP on an ephemeral port.
async fn serve_artifacts() -> String {
    let (vocabulary, weights) = artifact_bytes();
    let app = Router::new()
        .route("/vocabulary.json", get(move || async move { vocabulary }))
        .route("/model.safetensors", get(move || async move { weights }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn info_for(base_url: &str, name: &str) -> ArtifactInfo {
    let (vocabulary, weights) = artifact_bytes();
    ArtifactInfo {
        name: name.to_string(),
        vocabulary_url: format!("{}/vocabulary.json", base_url),
        weights_url: format!("{}/model.safetensors", base_url),
        vocabulary_hash: sha256_hex(&vocabulary),
        weights_hash: sha256_hex(&weights),
    }
}

#[test]
fn test_artifact_paths() {
    let (manager, dir) = temp_manager("paths");
    assert!(manager.get_vocabulary_path("mh").ends_with("mh/vocabulary.json"));
    assert!(manager.get_weights_path("mh").ends_with("mh/model.safetensors"));
    assert!(!manager.is_downloaded("mh"));
    assert!(matches!(manager.require("mh"), Err(ArtifactError::NotDownloaded(_))));
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_verification() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, dir) = temp_manager("verify");
    let info = info_for("http://unused.invalid", "mh");

    // Missing files verify as false rather than erroring
    assert!(!manager.verify(&info)?);

    let (vocabulary, weights) = artifact_bytes();
    std::fs::create_dir_all(manager.get_artifact_dir("mh"))?;
    std::fs::write(manager.get_vocabulary_path("mh"), &vocabulary)?;
    std::fs::write(manager.get_weights_path("mh"), &weights)?;
    assert!(manager.verify(&info)?);
    assert_eq!(manager.require("mh")?, manager.get_artifact_dir("mh"));

    // Corrupt file and verify
    std::fs::write(manager.get_weights_path("mh"), "corrupted data")?;
    assert!(!manager.verify(&info)?);

    manager.remove_download("mh")?;
    assert!(!manager.is_downloaded("mh"));

    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_ensure_downloaded_skips_verified_files() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, dir) = temp_manager("skip");
    // The URLs are unreachable, so this only passes if nothing is fetched.
    let info = info_for("http://unused.invalid", "mh");

    let (vocabulary, weights) = artifact_bytes();
    std::fs::create_dir_all(manager.get_artifact_dir("mh"))?;
    std::fs::write(manager.get_vocabulary_path("mh"), vocabulary)?;
    std::fs::write(manager.get_weights_path("mh"), weights)?;

    tokio_test::block_on(manager.ensure_downloaded(&info))?;
    assert!(manager.is_downloaded("mh"));

    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[tokio::test]
async fn test_download_and_build() -> Result<(), Box<dyn std::error::Error>> {
    common::init();
    let base_url = serve_artifacts().await;
    let (manager, dir) = temp_manager("download");
    let info = info_for(&base_url, "mh");

    manager.download(&info).await?;
    assert!(manager.is_downloaded("mh"));
    assert!(manager.verify(&info)?);

    let classifier = SentimentClassifier::builder()
        .with_managed_artifacts(&manager, "mh")?
        .build()?;
    assert_eq!(classifier.predict("hopeless")?.sentiment, "Depression");

    // A corrupted cache is repaired on the next ensure
    std::fs::write(manager.get_vocabulary_path("mh"), "corrupted data")?;
    manager.ensure_downloaded(&info).await?;
    assert!(manager.verify(&info)?);

    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[tokio::test]
async fn test_hash_mismatch_cleans_up() {
    let base_url = serve_artifacts().await;
    let (manager, dir) = temp_manager("mismatch");
    let mut info = info_for(&base_url, "mh");
    info.weights_hash = "0".repeat(64);

    let result = manager.download(&info).await;
    assert!(matches!(
        result,
        Err(ArtifactError::HashMismatch { ref file_type, .. }) if file_type == "weights"
    ));
    assert!(!manager.is_downloaded("mh"));
    assert!(!manager.get_vocabulary_path("mh").exists());

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_managed_artifacts_must_exist() {
    let (manager, dir) = temp_manager("absent");
    let result = SentimentClassifier::builder().with_managed_artifacts(&manager, "nothing-here");
    assert!(result.is_err());
    std::fs::remove_dir_all(dir).unwrap();
}
