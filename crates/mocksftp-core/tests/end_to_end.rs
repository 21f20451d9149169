// mockSFTP end-to-end: 실제 서버 기동 → 클라이언트 업로드

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mocksftp_core::client::upload;
use mocksftp_core::config::{ConnectConfig, ServerConfig, TransferRequest};
use mocksftp_core::error::Error;
use mocksftp_core::probe::is_port_listening;
use mocksftp_core::server::{MockServer, RunningServer};
use mocksftp_core::session::SftpSession;
use mocksftp_core::state::{ConnectionObserver, ConnectionState, TracingObserver};

fn server_config(base: &Path, port: u16) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1".parse().unwrap(),
        port,
        probe_delay: Duration::from_millis(10),
        ..ServerConfig::default()
    }
    .with_base_dir(base.join("tmp"))
}

async fn start(base: &Path) -> RunningServer {
    MockServer::start(server_config(base, 0), Arc::new(TracingObserver))
        .await
        .unwrap()
}

fn client_config(server: &RunningServer, password: &str) -> ConnectConfig {
    ConnectConfig::new("127.0.0.1", server.local_addr().port(), "admin", password)
}

struct Recorder(Arc<Mutex<Vec<ConnectionState>>>);

impl ConnectionObserver for Recorder {
    fn on_state_changed(&self, _prev: &ConnectionState, next: &ConnectionState) {
        self.0.lock().unwrap().push(next.clone());
    }
}

#[tokio::test]
async fn upload_lands_in_user_root_with_same_size() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    let source = dir.path().join("POC-C1.zip");
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&source, &payload).unwrap();

    let states = Arc::new(Mutex::new(Vec::new()));
    let report = upload(
        &client_config(&server, "admin"),
        &TransferRequest::new(&source),
        Box::new(Recorder(states.clone())),
    )
    .await
    .unwrap();

    assert_eq!(report.remote, "POC-C1.zip");
    assert_eq!(report.bytes, payload.len() as u64);
    assert!(report.disconnect.is_ok());

    let stored = dir.path().join("tmp").join("admin").join("POC-C1.zip");
    assert_eq!(std::fs::metadata(&stored).unwrap().len(), payload.len() as u64);
    assert_eq!(std::fs::read(&stored).unwrap(), payload);

    let states = states.lock().unwrap();
    assert_eq!(states.first(), Some(&ConnectionState::TcpConnecting));
    assert!(states.contains(&ConnectionState::Transferring));
    assert_eq!(states.last(), Some(&ConnectionState::Disconnected));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_upload_still_disconnects_and_returns_upload_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    let source = dir.path().join("blocked.bin");
    std::fs::write(&source, b"data").unwrap();
    // 같은 이름의 디렉토리가 있으면 서버 쪽 open이 실패
    std::fs::create_dir(dir.path().join("tmp").join("admin").join("blocked.bin")).unwrap();

    let states = Arc::new(Mutex::new(Vec::new()));
    let err = upload(
        &client_config(&server, "admin"),
        &TransferRequest::new(&source),
        Box::new(Recorder(states.clone())),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Sftp(_)), "{:?}", err);

    let states = states.lock().unwrap();
    assert!(states.contains(&ConnectionState::Transferring));
    let at = states
        .iter()
        .position(|s| *s == ConnectionState::Disconnecting)
        .expect("client must disconnect after a failed upload");
    assert!(matches!(
        states[at + 1..].last(),
        Some(ConnectionState::Disconnected) | Some(ConnectionState::Error { .. })
    ));
    assert!(dir.path().join("tmp").join("admin").join("blocked.bin").is_dir());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn wrong_password_is_rejected_and_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    let source = dir.path().join("payload.bin");
    std::fs::write(&source, b"secret data").unwrap();

    let err = upload(
        &client_config(&server, "wrong"),
        &TransferRequest::new(&source),
        Box::new(TracingObserver),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{:?}", err);

    let user_dir = dir.path().join("tmp").join("admin");
    assert_eq!(std::fs::read_dir(&user_dir).unwrap().count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    for user in ["root", "Admin", "guest"] {
        let config = ConnectConfig::new("127.0.0.1", server.local_addr().port(), user, "admin");
        let mut session = SftpSession::new(Box::new(TracingObserver));
        let err = session.connect(&config).await.err().expect("login must fail");
        assert!(matches!(err, Error::Auth(_)), "{}: {:?}", user, err);
        assert!(matches!(session.state(), ConnectionState::Error { .. }));
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_source_creates_nothing_on_server() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    let states = Arc::new(Mutex::new(Vec::new()));
    let err = upload(
        &client_config(&server, "admin"),
        &TransferRequest::new(dir.path().join("absent.zip")),
        Box::new(Recorder(states.clone())),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::SourceNotFound(_)));
    assert!(states.lock().unwrap().is_empty(), "client must not start connecting");
    let user_dir = dir.path().join("tmp").join("admin");
    assert_eq!(std::fs::read_dir(&user_dir).unwrap().count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn second_server_on_same_port_fails() {
    let dir = tempfile::tempdir().unwrap();
    let first = start(dir.path()).await;
    let port = first.local_addr().port();

    let second = MockServer::start(server_config(dir.path(), port), Arc::new(TracingObserver)).await;
    assert!(matches!(second, Err(Error::Bind { .. })));

    first.shutdown().await.unwrap();
}

#[tokio::test]
async fn port_accepts_connections_right_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    assert!(is_port_listening(server.local_addr(), Duration::from_secs(1)).await);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn remote_session_is_confined_to_user_root() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;
    std::fs::write(dir.path().join("tmp").join("top-secret"), b"x").unwrap();

    let config = client_config(&server, "admin");
    let mut ssh = russh::client::connect(
        Arc::new(russh::client::Config::default()),
        config.addr(),
        AcceptAll,
    )
    .await
    .unwrap();
    assert!(ssh.authenticate_password("admin", "admin").await.unwrap());
    let mut channel = ssh.channel_open_session().await.unwrap();
    channel.request_subsystem(true, "sftp").await.unwrap();
    let sftp = russh_sftp::client::SftpSession::new(channel.into_stream()).await.unwrap();

    assert_eq!(sftp.canonicalize(".").await.unwrap(), "/");
    assert!(sftp.metadata("../top-secret").await.is_err());
    assert!(sftp.create("/../escape.txt").await.is_err());
    assert!(!dir.path().join("tmp").join("escape.txt").exists());
    assert!(!dir.path().join("escape.txt").exists());

    sftp.create_dir("inner").await.unwrap();
    assert!(dir.path().join("tmp").join("admin").join("inner").is_dir());

    server.shutdown().await.unwrap();
}

struct AcceptAll;

#[async_trait::async_trait]
impl russh::client::Handler for AcceptAll {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _key: &russh::keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}
