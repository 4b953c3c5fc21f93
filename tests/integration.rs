use std::fs;
use std::path::{Path, PathBuf};

use filehub_server::error::ErrorKind;
use filehub_server::storage::{self, ActionKind, ActionRequest, FileEntry};
use filehub_server::{Server, ServerConfig};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

// Helper to get a scratch root in canonical form
fn scratch_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    (dir, root)
}

fn entry(dir: &Path, name: &str) -> FileEntry {
    FileEntry::new(dir.to_str().unwrap(), name)
}

fn action(kind: ActionKind, source: FileEntry, target: Option<FileEntry>) -> ActionRequest {
    ActionRequest::new(kind, source, target)
}

#[test]
fn copy_file_into_existing_directory() {
    let (_guard, root) = scratch_root();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/f.txt"), "hi").unwrap();

    let result = storage::perform(
        &root,
        &action(
            ActionKind::Copy,
            entry(&root.join("a"), "f.txt"),
            Some(entry(&root, "b")),
        ),
    );

    assert!(!result.is_error, "{}", result.message);
    assert_eq!(fs::read_to_string(root.join("b/f.txt")).unwrap(), "hi");
    assert_eq!(fs::read_to_string(root.join("a/f.txt")).unwrap(), "hi");
}

#[test]
fn copy_directory_to_new_path() {
    let (_guard, root) = scratch_root();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/x.txt"), "x").unwrap();

    let result = storage::perform(
        &root,
        &action(
            ActionKind::Copy,
            entry(&root, "src"),
            Some(entry(&root, "dst")),
        ),
    );

    assert!(!result.is_error, "{}", result.message);
    assert!(root.join("dst/x.txt").is_file());
    assert!(root.join("src/x.txt").is_file());
}

#[test]
fn delete_missing_reports_not_found() {
    let (_guard, root) = scratch_root();

    let result = storage::perform(
        &root,
        &action(ActionKind::Delete, entry(&root, "does-not-exist"), None),
    );

    assert!(result.is_error);
    assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
}

#[test]
fn create_directory_builds_parents_and_is_idempotent() {
    let (_guard, root) = scratch_root();
    let request = action(
        ActionKind::CreateDirectory,
        entry(&root.join("new/sub"), "dir"),
        None,
    );

    let first = storage::perform(&root, &request);
    assert!(!first.is_error, "{}", first.message);
    assert!(root.join("new/sub/dir").is_dir());

    fs::write(root.join("new/sub/dir/keep.txt"), "keep").unwrap();
    let second = storage::perform(&root, &request);
    assert!(!second.is_error, "{}", second.message);
    assert_eq!(
        fs::read_to_string(root.join("new/sub/dir/keep.txt")).unwrap(),
        "keep"
    );
}

#[test]
fn listing_is_complete() {
    let (_guard, root) = scratch_root();
    fs::write(root.join("one.txt"), "1").unwrap();
    fs::write(root.join("two.txt"), "22").unwrap();
    fs::create_dir(root.join("three")).unwrap();

    let listing = storage::list_directory(&root, &entry(&root, "")).unwrap();

    assert_eq!(listing.entries.len(), 3);
    assert!(listing.total_space_bytes > 0);
    assert!(listing.free_space_bytes <= listing.total_space_bytes);

    let mut names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["one.txt", "three", "two.txt"]);
}

#[test]
fn rename_directory_onto_file_changes_nothing() {
    let (_guard, root) = scratch_root();
    fs::create_dir(root.join("a")).unwrap();
    fs::write(root.join("a/inner.txt"), "inner").unwrap();
    fs::write(root.join("b"), "plain").unwrap();

    let result = storage::perform(
        &root,
        &action(
            ActionKind::Rename,
            entry(&root, "a"),
            Some(entry(&root, "b")),
        ),
    );

    assert!(result.is_error);
    assert_eq!(result.error_kind, Some(ErrorKind::TypeConflict));
    assert_eq!(fs::read_to_string(root.join("a/inner.txt")).unwrap(), "inner");
    assert_eq!(fs::read_to_string(root.join("b")).unwrap(), "plain");
}

#[test]
fn copy_then_delete_preserves_content() {
    let (_guard, root) = scratch_root();
    let payload: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(root.join("orig.bin"), &payload).unwrap();

    let copy = storage::perform(
        &root,
        &action(
            ActionKind::Copy,
            entry(&root, "orig.bin"),
            Some(entry(&root, "copy.bin")),
        ),
    );
    assert!(!copy.is_error, "{}", copy.message);

    let delete = storage::perform(&root, &action(ActionKind::Delete, entry(&root, "orig.bin"), None));
    assert!(!delete.is_error, "{}", delete.message);

    assert!(!root.join("orig.bin").exists());
    assert_eq!(fs::read(root.join("copy.bin")).unwrap(), payload);
}

#[test]
fn traversal_is_rejected_for_every_action() {
    let (_guard, root) = scratch_root();
    let outside = format!("{}/../..", root.display());
    let escape = FileEntry::new(outside.as_str(), "etc");

    for kind in [
        ActionKind::Copy,
        ActionKind::Move,
        ActionKind::Rename,
        ActionKind::Delete,
        ActionKind::CreateDirectory,
    ] {
        let result = storage::perform(
            &root,
            &action(kind, escape.clone(), Some(entry(&root, "landing"))),
        );
        assert_eq!(
            result.error_kind,
            Some(ErrorKind::PathTraversalRejected),
            "{kind}"
        );
    }

    let err = storage::list_directory(&root, &escape).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);
    assert!(!root.join("landing").exists());
}

#[test]
fn escaping_target_is_rejected_before_copy() {
    let (_guard, root) = scratch_root();
    fs::write(root.join("f.txt"), "data").unwrap();

    let result = storage::perform(
        &root,
        &action(
            ActionKind::Copy,
            entry(&root, "f.txt"),
            Some(FileEntry::new(format!("{}/..", root.display()), "stolen.txt")),
        ),
    );

    assert_eq!(result.error_kind, Some(ErrorKind::PathTraversalRejected));
    assert!(!root.parent().unwrap().join("stolen.txt").exists());
}

// --------------------
// End-to-end sessions
// --------------------

struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line
    }

    async fn send(&mut self, command: &str) -> String {
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .unwrap();
        self.read_line().await
    }

    async fn login(&mut self) {
        assert!(self.read_line().await.starts_with("220 "));
        assert!(self.send("USER alice").await.starts_with("331 "));
        assert!(self.send("PASS alice123").await.starts_with("230 "));
    }
}

fn payload(line: &str) -> serde_json::Value {
    let (_, json) = line.trim_end().split_once(' ').unwrap();
    serde_json::from_str(json).unwrap()
}

async fn start_server(root: &Path, max_clients: usize) -> std::net::SocketAddr {
    let mut config = ServerConfig {
        bind_address: "127.0.0.1".into(),
        control_port: 0,
        server_root: root.to_string_lossy().to_string(),
        max_clients,
        ..ServerConfig::default()
    };
    config.users.insert("alice".into(), "alice123".into());

    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move { server.start().await });
    addr
}

#[tokio::test]
async fn session_lists_acts_and_downloads() {
    let (_guard, root) = scratch_root();
    fs::write(root.join("report final.txt"), "quarterly numbers").unwrap();
    let addr = start_server(&root, 4).await;

    let mut session = Session::connect(addr).await;
    session.login().await;

    let listing = session.send("LIST").await;
    assert!(listing.starts_with("200 "));
    let listing = payload(&listing);
    assert_eq!(listing["entries"].as_array().unwrap().len(), 1);
    assert_eq!(listing["entries"][0]["name"], "report final.txt");

    let created = session
        .send(r#"ACTION {"action":"newFolder","source":{"path":"","name":"archive"}}"#)
        .await;
    assert_eq!(payload(&created)["isError"], false);

    let copy = format!(
        r#"ACTION {{"kind":"copy","source":{{"path":"{0}","name":"report final.txt"}},"target":{{"path":"{0}","name":"archive"}}}}"#,
        root.display()
    );
    let copied = session.send(&copy).await;
    assert_eq!(payload(&copied)["isError"], false, "{copied}");
    assert!(root.join("archive/report final.txt").is_file());

    let header = session.send("RETR archive/report final.txt").await;
    assert!(header.starts_with("150 "));
    let header = payload(&header);
    assert_eq!(
        header["contentDisposition"],
        "attachment; filename*=UTF-8''report%20final.txt"
    );
    let length = header["contentLength"].as_u64().unwrap() as usize;
    let mut body = vec![0u8; length];
    session.reader.read_exact(&mut body).await.unwrap();
    assert_eq!(body, b"quarterly numbers");

    // The connection is still usable after a download
    assert!(session.send("NOOP").await.starts_with("200 "));
    assert!(session.send("QUIT").await.starts_with("221 "));
}

#[tokio::test]
async fn session_reports_failures() {
    let (_guard, root) = scratch_root();
    let addr = start_server(&root, 4).await;

    let mut session = Session::connect(addr).await;
    assert!(session.read_line().await.starts_with("220 "));
    assert!(session.send("LIST").await.starts_with("530 "));
    session.send("USER alice").await;
    session.send("PASS alice123").await;

    let failed = session
        .send(r#"ACTION {"action":"delete","source":{"path":"","name":"ghost"}}"#)
        .await;
    assert!(failed.starts_with("200 "));
    assert_eq!(payload(&failed)["errorKind"], "notFound");

    let escaped = session.send("RETR ../../etc/passwd").await;
    assert!(escaped.starts_with("550 "));
    assert_eq!(payload(&escaped)["errorKind"], "pathTraversalRejected");

    assert!(session.send("ACTION {oops").await.starts_with("501 "));
    assert!(session.send("STOR x").await.starts_with("500 "));
}

#[tokio::test]
async fn connections_beyond_limit_are_refused() {
    let (_guard, root) = scratch_root();
    let addr = start_server(&root, 1).await;

    let mut first = Session::connect(addr).await;
    assert!(first.read_line().await.starts_with("220 "));

    let mut second = Session::connect(addr).await;
    assert!(second.read_line().await.starts_with("421 "));

    // Freed slot is reusable
    assert!(first.send("QUIT").await.starts_with("221 "));
    drop(first);
    let mut third = None;
    for _ in 0..50 {
        let mut session = Session::connect(addr).await;
        if session.read_line().await.starts_with("220 ") {
            third = Some(session);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(third.is_some());
}
