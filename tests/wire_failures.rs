//! Failure-path tests: severed transfers, retry exhaustion, write-lock
//! atomicity and protocol shape, driven by scripted raw peers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use ferroftp::config::{Config, ServerConfig};
use ferroftp::core_channel;
use ferroftp::core_network::Server;
use ferroftp::{ClientSession, FtpError};

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

#[tokio::test]
async fn severed_download_surfaces_connection_closed_and_leaves_no_file() {
    // Fake server: accepts once, declares 1000 bytes, sends 500, hangs up.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = core_channel::split(socket);
        writer.send_line("fake server ready").await.unwrap();
        loop {
            let line = match reader.read_line(Duration::from_secs(10)).await {
                Ok(line) => line,
                Err(_) => return,
            };
            if line.starts_with("GET ") {
                writer.send_line("SENDING_FILE").await.unwrap();
                writer.send_line("1000").await.unwrap();
                writer.write_bytes(&[0xAB; 500]).await.unwrap();
                return; // drop everything: listener, socket
            }
        }
    });

    let local = tempfile::tempdir().unwrap();
    let dest = local.path().join("partial.bin");
    let session = ClientSession::connect("127.0.0.1", port, Duration::from_secs(1))
        .await
        .unwrap();

    let err = session
        .download_file("partial.bin", &dest, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, FtpError::ConnectionClosed),
        "unexpected error: {:?}",
        err
    );
    // Nothing on disk may claim to be a complete download.
    assert!(!dest.exists());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn download_timeouts_exhaust_the_retry_budget() {
    // Fake server: answers the banner on every connection but never
    // responds to GET, so each attempt times out.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let (mut reader, mut writer) = core_channel::split(socket);
                let _ = writer.send_line("fake server ready").await;
                loop {
                    match reader.read_line(Duration::from_secs(60)).await {
                        Ok(_) => {} // swallow every command, answer none
                        Err(_) => return,
                    }
                }
            });
        }
    });

    let local = tempfile::tempdir().unwrap();
    let session = ClientSession::connect("127.0.0.1", port, Duration::from_millis(300))
        .await
        .unwrap();

    let err = session
        .download_file("ghost.bin", &local.path().join("ghost.bin"), None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, FtpError::RetryExhausted(3)),
        "unexpected error: {:?}",
        err
    );
    assert!(!session.is_connected());
}

#[tokio::test]
async fn concurrent_writers_never_splice_a_line() {
    // Capture everything a mutex-guarded writer emits from many tasks and
    // assert every received line is one of the sent lines, whole.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let capture = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut bytes = Vec::new();
        socket.read_to_end(&mut bytes).await.unwrap();
        bytes
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let (_, writer) = core_channel::split(stream);
    let writer = Arc::new(Mutex::new(writer));

    let mut expected = HashSet::new();
    let mut tasks = Vec::new();
    for task_id in 0..8 {
        for line_id in 0..50 {
            expected.insert(format!(
                "NOOP {} {} {}",
                task_id,
                line_id,
                "x".repeat((task_id * 37 + line_id) % 180)
            ));
        }
    }
    for task_id in 0..8u32 {
        let writer = Arc::clone(&writer);
        tasks.push(tokio::spawn(async move {
            for line_id in 0..50u32 {
                let line = format!(
                    "NOOP {} {} {}",
                    task_id,
                    line_id,
                    "x".repeat(((task_id * 37 + line_id) % 180) as usize)
                );
                // Narrow lock scope: exactly one line per acquisition.
                writer.lock().await.send_line(&line).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    writer.lock().await.shutdown().await;
    drop(writer);

    let bytes = capture.await.unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let received: Vec<&str> = text.split_terminator('\n').collect();
    assert_eq!(received.len(), 8 * 50);
    for line in received {
        assert!(
            expected.contains(line),
            "spliced or corrupted line on the wire: {:?}",
            line
        );
    }
}

#[tokio::test]
async fn protocol_shape_for_errors_and_unknown_verbs() {
    let root = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let limit = Duration::from_secs(5);

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (mut reader, mut writer) = core_channel::split(stream);
    let _banner = reader.read_line(limit).await.unwrap();

    writer.send_line("FROB something").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "Invalid command.");

    // A failed GET is one error line with no framing sequence after it:
    // the very next response belongs to the next command.
    writer.send_line("GET missing.bin").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "File does not exist.");

    writer.send_line("LIST").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "Directory listing:");
    assert_eq!(reader.read_line(limit).await.unwrap(), "END_OF_LIST");

    // Verbs are case-insensitive.
    writer.send_line("noop").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "OK");

    writer.send_line("QUIT").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "Bye");
}

#[tokio::test]
async fn putdir_skips_escaping_entries_and_reports_the_tally() {
    let root = tempfile::tempdir().unwrap();
    let port = spawn_server(root.path()).await;
    let limit = Duration::from_secs(5);

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (mut reader, mut writer) = core_channel::split(stream);
    let _banner = reader.read_line(limit).await.unwrap();

    writer.send_line("PUTDIR incoming").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "READY_FOR_DIR");

    writer.send_line("SENDING_DIR").await.unwrap();
    writer.send_line("2").await.unwrap();

    // First entry tries to climb out of the destination; its payload must
    // be drained, not stored.
    writer.send_line("../evil.txt").await.unwrap();
    writer.send_line("4").await.unwrap();
    writer.write_bytes(b"evil").await.unwrap();

    writer.send_line("ok.txt").await.unwrap();
    writer.send_line("3").await.unwrap();
    writer.write_bytes(b"abc").await.unwrap();

    let summary = reader.read_line(limit).await.unwrap();
    assert!(
        summary.starts_with("Directory received: 1/2 files"),
        "unexpected summary: {:?}",
        summary
    );

    assert_eq!(
        std::fs::read(root.path().join("incoming/ok.txt")).unwrap(),
        b"abc"
    );
    assert!(!root.path().join("evil.txt").exists());
    assert!(!root.path().join("incoming/evil.txt").exists());
}

#[tokio::test]
async fn zero_length_file_download_has_no_payload_bytes() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("empty.bin"), b"").unwrap();
    let port = spawn_server(root.path()).await;
    let limit = Duration::from_secs(5);

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (mut reader, mut writer) = core_channel::split(stream);
    let _banner = reader.read_line(limit).await.unwrap();

    writer.send_line("GET empty.bin").await.unwrap();
    assert_eq!(reader.read_line(limit).await.unwrap(), "SENDING_FILE");
    assert_eq!(reader.read_line(limit).await.unwrap(), "0");
    // Length 0 means no raw bytes: the terminator follows immediately.
    assert_eq!(reader.read_line(limit).await.unwrap(), "END_OF_FILE");
}
