//! End-to-end tests driving the client operation surface against a real
//! server on localhost.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ferroftp::config::{Config, ServerConfig};
use ferroftp::core_network::Server;
use ferroftp::ClientSession;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server(shared_root: &Path) -> u16 {
    let config = Config {
        server: ServerConfig {
            listen_addr: String::from("127.0.0.1"),
            listen_port: 0,
            shared_root: shared_root.display().to_string(),
            banner_file: None,
            upload_buffer_size: None,
            download_buffer_size: None,
        },
    };
    let server = Server::bind(Arc::new(config)).await.expect("bind server");
    let port = server.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        let _ = server.serve().await;
    });
    port
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31).wrapping_add(7) & 0xff) as u8).collect()
}

#[tokio::test]
async fn file_round_trips_are_byte_identical() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    for (index, len) in [0usize, 1, 65536, 10_000_000].into_iter().enumerate() {
        let name = format!("blob{}.bin", index);
        let source = local.path().join(&name);
        let content = patterned(len);
        std::fs::write(&source, &content).unwrap();

        let outcome = session.upload_file(&source, None).await.unwrap();
        assert!(outcome.success, "upload failed: {}", outcome.message);

        let dest = local.path().join(format!("copy_{}", name));
        let outcome = session.download_file(&name, &dest, None).await.unwrap();
        assert!(outcome.success, "download failed: {}", outcome.message);

        let echoed = std::fs::read(&dest).unwrap();
        assert_eq!(echoed.len(), len);
        assert_eq!(echoed, content, "content mismatch for {} bytes", len);
    }
    session.disconnect().await;
}

#[tokio::test]
async fn directory_round_trip_preserves_paths_and_lengths() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    let bundle = local.path().join("bundle");
    std::fs::create_dir_all(bundle.join("sub/inner")).unwrap();
    std::fs::write(bundle.join("top.txt"), b"hello").unwrap();
    std::fs::write(bundle.join("sub/empty.bin"), b"").unwrap();
    std::fs::write(bundle.join("sub/inner/deep.dat"), patterned(2048)).unwrap();

    let outcome = session.upload_directory(&bundle, None).await.unwrap();
    assert!(outcome.success, "upload failed: {}", outcome.message);
    assert!(outcome.message.contains("3 files"));

    let entries = session.list_current_directory().await.unwrap();
    assert!(entries.iter().any(|e| e.is_folder && e.name == "bundle"));

    let copy = local.path().join("bundle_copy");
    let outcome = session
        .download_directory("bundle", &copy, None)
        .await
        .unwrap();
    assert!(outcome.success, "download failed: {}", outcome.message);
    assert!(outcome.message.contains("3/3 files"));

    for (relative, len) in [
        ("top.txt", 5u64),
        ("sub/empty.bin", 0),
        ("sub/inner/deep.dat", 2048),
    ] {
        let path = copy.join(relative);
        assert!(path.is_file(), "missing {}", relative);
        assert_eq!(path.metadata().unwrap().len(), len, "length of {}", relative);
    }
    assert_eq!(
        std::fs::read(copy.join("sub/inner/deep.dat")).unwrap(),
        patterned(2048)
    );
    session.disconnect().await;
}

#[tokio::test]
async fn get_for_missing_file_fails_and_keeps_session_usable() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    let dest = local.path().join("never.bin");
    let outcome = session.download_file("never.bin", &dest, None).await.unwrap();
    assert!(!outcome.success);
    assert!(!dest.exists());

    // The error was a single line; the stream is still aligned.
    let entries = session.list_current_directory().await.unwrap();
    assert!(entries.is_empty());
    session.disconnect().await;
}

#[tokio::test]
async fn cdup_at_root_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    for _ in 0..2 {
        let outcome = session.change_directory_up().await.unwrap();
        assert!(outcome.success);
        assert_eq!(session.current_directory(), "/");
    }
    session.disconnect().await;
}

#[tokio::test]
async fn navigation_and_nested_upload() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    // Directory names may contain spaces; the argument is the whole rest
    // of the line.
    let outcome = session.make_directory("my docs").await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    let outcome = session.change_directory("my docs").await.unwrap();
    assert!(outcome.success);
    assert_eq!(session.current_directory(), "/my docs");

    let source = local.path().join("note.txt");
    std::fs::write(&source, b"in a subdirectory").unwrap();
    let outcome = session.upload_file(&source, None).await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    assert!(root.path().join("my docs/note.txt").is_file());

    let entries = session.list_current_directory().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_folder);
    assert_eq!(entries[0].name, "note.txt");

    let outcome = session.change_directory_up().await.unwrap();
    assert!(outcome.success);
    assert_eq!(session.current_directory(), "/");
    session.disconnect().await;
}

#[tokio::test]
async fn delete_file_keeps_stream_aligned() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    let source = local.path().join("doomed.txt");
    std::fs::write(&source, b"bye").unwrap();
    assert!(session.upload_file(&source, None).await.unwrap().success);

    let outcome = session.delete_remote("doomed.txt", false).await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    assert!(!root.path().join("doomed.txt").exists());

    // The END_OF_FILE trailer after deletion must have been consumed.
    let entries = session.list_current_directory().await.unwrap();
    assert!(entries.is_empty());

    let outcome = session.delete_remote("doomed.txt", false).await.unwrap();
    assert!(!outcome.success);
    session.disconnect().await;
}

#[tokio::test]
async fn rmdir_refuses_the_shared_root() {
    let root = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    for argument in [".", "", "./."] {
        let outcome = session.delete_remote(argument, true).await.unwrap();
        assert!(
            !outcome.success,
            "RMDIR {:?} should have been refused: {}",
            argument, outcome.message
        );
    }
    assert!(root.path().exists());

    // A normal subdirectory still deletes fine.
    assert!(session.make_directory("scratch").await.unwrap().success);
    let outcome = session.delete_remote("scratch", true).await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    assert!(!root.path().join("scratch").exists());
    session.disconnect().await;
}

#[tokio::test]
async fn escaping_paths_are_rejected_without_changing_state() {
    let root = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    for argument in ["..", "../..", "/etc", "a/../../b"] {
        let outcome = session.change_directory(argument).await.unwrap();
        assert!(!outcome.success, "CD {:?} should have failed", argument);
        assert_eq!(session.current_directory(), "/");
    }
    let outcome = session.delete_remote("../escape", true).await.unwrap();
    assert!(!outcome.success);
    session.disconnect().await;
}

#[tokio::test]
async fn progress_callbacks_fire_with_final_totals() {
    let root = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let session = ClientSession::connect("127.0.0.1", port, CONNECT_TIMEOUT)
        .await
        .unwrap();

    let source = local.path().join("tracked.bin");
    std::fs::write(&source, patterned(300_000)).unwrap();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: ferroftp::core_transfer::ProgressFn =
        Arc::new(move |done, total| sink.lock().unwrap().push((done, total)));

    let outcome = session.upload_file(&source, Some(progress)).await.unwrap();
    assert!(outcome.success);

    let calls = seen.lock().unwrap().clone();
    assert!(!calls.is_empty());
    // The final report always fires and carries the full byte count.
    assert_eq!(*calls.last().unwrap(), (300_000, 300_000));
    session.disconnect().await;
}
