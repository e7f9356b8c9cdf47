//! Integration tests for bulk archive assembly.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gallery_core::archive::{
    ArchiveAssembler, ArchiveError, ArchiveStatus, ArchiveSummary, BULK_CONCURRENCY,
};
use gallery_core::config::DriveConfig;
use gallery_core::drive::{DriveClient, MediaAsset};
use gallery_core::queue::TaskQueue;
use gallery_core::retry::RetryPolicy;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::ZipArchive;

fn assembler(server: &MockServer) -> ArchiveAssembler {
    let config = DriveConfig::new("test-key").with_api_base(server.uri());
    let client = Arc::new(DriveClient::new(&config).expect("client should build"));
    let queue = TaskQueue::new(BULK_CONCURRENCY).expect("valid concurrency");
    let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(4));
    ArchiveAssembler::new(client, queue, policy)
}

fn asset(id: &str, name: &str) -> MediaAsset {
    MediaAsset {
        id: id.to_string(),
        name: name.to_string(),
    }
}

async fn mount_asset(server: &MockServer, id: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .mount(server)
        .await;
}

fn entry_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive should open");
    let mut names = Vec::new();
    for index in 0..archive.len() {
        names.push(
            archive
                .by_index(index)
                .expect("entry should open")
                .name()
                .to_string(),
        );
    }
    names
}

#[tokio::test]
async fn test_partial_failure_still_produces_archive() {
    let server = MockServer::start().await;
    mount_asset(&server, "a1", b"bytes-one", "image/jpeg").await;
    mount_asset(&server, "a2", b"bytes-two", "image/png").await;
    // Asset three fails on every attempt; the retry budget is 2.
    Mock::given(method("GET"))
        .and(path("/files/a3"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_asset(&server, "a4", b"bytes-four", "image/jpeg").await;
    mount_asset(&server, "a5", b"bytes-five", "image/jpeg").await;

    let assets = vec![
        asset("a1", "one.jpg"),
        asset("a2", "two"),
        asset("a3", "three.jpg"),
        asset("a4", "four.jpg"),
        asset("a5", "five"),
    ];

    let statuses: Arc<Mutex<Vec<ArchiveStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&statuses);
    let output = assembler(&server)
        .assemble("Wedding", &assets, move |status| {
            recorder.lock().expect("status lock").push(status);
        })
        .await
        .expect("partial failure must not abort the run");

    assert_eq!(
        output.summary,
        ArchiveSummary {
            success_count: 4,
            error_count: 1
        }
    );
    assert_eq!(output.file_name, "Wedding.zip");
    assert_eq!(
        *statuses.lock().expect("status lock"),
        vec![
            ArchiveStatus::Preparing,
            ArchiveStatus::Packaging,
            ArchiveStatus::Done
        ]
    );

    let names = entry_names(output.bytes.clone());
    assert_eq!(
        names,
        vec!["one.jpg", "two.png", "four.jpg", "five.jpg"],
        "order follows the listing; extensions are inferred from content type"
    );

    // Entry content survives compression intact.
    let mut archive = ZipArchive::new(Cursor::new(output.bytes)).expect("archive should open");
    let mut entry = archive.by_name("two.png").expect("entry should exist");
    let mut content = Vec::new();
    entry.read_to_end(&mut content).expect("entry should read");
    assert_eq!(content, b"bytes-two");
}

#[tokio::test]
async fn test_total_failure_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let assets = vec![asset("a1", "one.jpg"), asset("a2", "two.jpg")];
    let statuses: Arc<Mutex<Vec<ArchiveStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&statuses);

    let result = assembler(&server)
        .assemble("Wedding", &assets, move |status| {
            recorder.lock().expect("status lock").push(status);
        })
        .await;

    match result {
        Err(ArchiveError::AllFailed { attempted }) => assert_eq!(attempted, 2),
        other => panic!("expected AllFailed, got: {other:?}"),
    }
    assert_eq!(
        *statuses.lock().expect("status lock"),
        vec![
            ArchiveStatus::Preparing,
            ArchiveStatus::Packaging,
            ArchiveStatus::Failed
        ]
    );
}

#[tokio::test]
async fn test_duplicate_names_get_suffixes() {
    let server = MockServer::start().await;
    mount_asset(&server, "a1", b"first", "image/jpeg").await;
    mount_asset(&server, "a2", b"second", "image/jpeg").await;

    let assets = vec![asset("a1", "dup.jpg"), asset("a2", "dup.jpg")];
    let output = assembler(&server)
        .assemble("Album", &assets, |_| {})
        .await
        .expect("assembly should succeed");

    assert_eq!(entry_names(output.bytes), vec!["dup.jpg", "dup_2.jpg"]);
}

#[tokio::test]
async fn test_empty_folder_name_gets_default() {
    let server = MockServer::start().await;
    mount_asset(&server, "a1", b"first", "image/jpeg").await;

    let output = assembler(&server)
        .assemble("", &[asset("a1", "one.jpg")], |_| {})
        .await
        .expect("assembly should succeed");
    assert_eq!(output.file_name, "folder.zip");
}

#[tokio::test]
async fn test_archive_roundtrips_through_disk() {
    let server = MockServer::start().await;
    mount_asset(&server, "a1", b"payload-one", "image/jpeg").await;
    mount_asset(&server, "a2", b"payload-two", "image/jpeg").await;

    let assets = vec![asset("a1", "one.jpg"), asset("a2", "two.jpg")];
    let output = assembler(&server)
        .assemble("Session", &assets, |_| {})
        .await
        .expect("assembly should succeed");

    let dir = tempfile::TempDir::new().expect("temp dir");
    let zip_path = dir.path().join(&output.file_name);
    std::fs::write(&zip_path, &output.bytes).expect("archive written");

    let file = std::fs::File::open(&zip_path).expect("archive reopens");
    let mut archive = ZipArchive::new(file).expect("archive parses");
    assert_eq!(archive.len(), 2);

    let mut entry = archive.by_name("one.jpg").expect("entry exists");
    let mut content = Vec::new();
    entry.read_to_end(&mut content).expect("entry reads");
    assert_eq!(content, b"payload-one");
}
