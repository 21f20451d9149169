// mockSFTP Server (russh 기반)
// author: kodeholic
//
// 기동 순서 (앞 단계 실패 시 중단):
//   1. base 디렉토리 확보
//   2. 사용자 디렉토리 확보
//   3. TCP bind
//   4. 종료용 CancellationToken
//   5. 비밀번호 인증기 (정적 credential 1개)
//   6. 접속마다 VirtualMount 생성 (sftp subsystem 요청 시)
//   7. accept loop 시작
//   8. probe → Blocked → (cancel) → Closing → Stopped

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::server::{self, Auth, Msg, Server as _, Session};
use russh::{Channel, ChannelId, MethodSet};
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::probe::is_port_listening;
use crate::state::{ServerLifecycle, ServerObserver, ServerState};
use crate::subsystem::SftpSubsystem;
use crate::vfs;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// ── 저장소 준비 ───────────────────────────────────────────────────────────────

/// base, base/<username> 디렉토리가 없으면 생성
///
/// 반환값: 사용자 디렉토리 경로
pub fn ensure_storage(config: &ServerConfig) -> Result<PathBuf> {
    if !config.base_dir.is_dir() {
        std::fs::create_dir_all(&config.base_dir).map_err(|source| Error::CreateBaseDir {
            path: config.base_dir.clone(),
            source,
        })?;
        tracing::info!("[server] created base directory {}", config.base_dir.display());
    }

    let user_dir = config.user_dir();
    if !user_dir.is_dir() {
        std::fs::create_dir(&user_dir).map_err(|source| Error::CreateUserDir {
            path: user_dir.clone(),
            source,
        })?;
        tracing::info!("[server] created user directory {}", user_dir.display());
    }
    Ok(user_dir)
}

// ── russh Server / Handler ────────────────────────────────────────────────────

#[derive(Clone)]
struct SshServer {
    config: Arc<ServerConfig>,
}

impl server::Server for SshServer {
    type Handler = SshSession;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> Self::Handler {
        SshSession {
            config: self.config.clone(),
            peer_addr,
            user: None,
            channels: HashMap::new(),
        }
    }
}

pub struct SshSession {
    config: Arc<ServerConfig>,
    peer_addr: Option<SocketAddr>,
    user: Option<String>,
    channels: HashMap<ChannelId, Channel<Msg>>,
}

#[async_trait::async_trait]
impl server::Handler for SshSession {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> std::result::Result<Auth, Self::Error> {
        if self.config.credential.verify(user, password) {
            tracing::info!("[server] {} authenticated from {:?}", user, self.peer_addr);
            self.user = Some(user.to_string());
            return Ok(Auth::Accept);
        }
        tracing::warn!("[server] rejected login for {:?} from {:?}", user, self.peer_addr);
        Ok(Auth::Reject { proceed_with_methods: None })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> std::result::Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    async fn subsystem_request(
        &mut self,
        channel_id: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let (Some(user), true) = (self.user.as_deref(), name == "sftp") else {
            tracing::warn!("[server] refused subsystem {:?}", name);
            session.channel_failure(channel_id);
            return Ok(());
        };
        let Some(channel) = self.channels.remove(&channel_id) else {
            session.channel_failure(channel_id);
            return Ok(());
        };

        let mount = vfs::mount_for(&self.config.base_dir, user);
        session.channel_success(channel_id);
        russh_sftp::server::run(channel.into_stream(), SftpSubsystem::new(mount)).await;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel_id: ChannelId,
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        self.channels.remove(&channel_id);
        Ok(())
    }
}

/// 매 기동마다 새로 만드는 Ed25519 호스트 키
fn host_key() -> russh::keys::key::KeyPair {
    let secret: [u8; 32] = rand::random();
    russh::keys::key::KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(&secret))
}

fn ssh_config(config: &ServerConfig) -> server::Config {
    server::Config {
        methods: MethodSet::PASSWORD,
        keys: vec![host_key()],
        auth_rejection_time: Duration::from_millis(500),
        auth_rejection_time_initial: Some(Duration::ZERO),
        inactivity_timeout: config.inactivity_timeout,
        ..Default::default()
    }
}

// ── MockServer ────────────────────────────────────────────────────────────────

pub struct MockServer;

impl MockServer {
    /// 저장소 준비 → bind → accept loop 기동
    ///
    /// 반환 시점에 포트는 이미 연결을 받는 상태 (Listening)
    pub async fn start(config: ServerConfig, observer: Arc<dyn ServerObserver>) -> Result<RunningServer> {
        let mut lifecycle = ServerLifecycle::new(observer);

        if let Err(e) = ensure_storage(&config) {
            tracing::error!("[server] {}", e);
            lifecycle.fail(e.to_string());
            return Err(e);
        }

        let addr = config.addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(source) => {
                let e = Error::bind(addr, source);
                tracing::error!("[server] {}", e);
                lifecycle.fail(e.to_string());
                return Err(e);
            }
        };
        let local_addr = listener.local_addr()?;

        let probe_delay   = config.probe_delay;
        let probe_timeout = config.probe_timeout;
        let ssh_config    = Arc::new(ssh_config(&config));
        let ssh_server    = SshServer { config: Arc::new(config) };
        let token         = CancellationToken::new();

        let task = tokio::spawn(accept_loop(listener, ssh_server, ssh_config, token.clone()));

        tracing::info!("[server] SFTP server listening on {}", local_addr);
        lifecycle.transition(ServerState::Listening)?;

        Ok(RunningServer { local_addr, token, task, lifecycle, probe_delay, probe_timeout })
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut ssh_server: SshServer,
    ssh_config: Arc<server::Config>,
    token: CancellationToken,
) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("[server] accepted {}", peer);
                    let _ = stream.set_nodelay(true);
                    let handler = ssh_server.new_client(Some(peer));
                    let config  = ssh_config.clone();
                    sessions.spawn(async move {
                        match server::run_stream(config, stream, handler).await {
                            Ok(session) => {
                                if let Err(e) = session.await {
                                    tracing::debug!("[server] session {} ended: {}", peer, e);
                                }
                            }
                            // SSH 식별 문자열 전에 끊긴 접속 (포트 확인용 TCP connect 등)
                            Err(e) if is_early_close(&e) => {
                                tracing::debug!("[server] {} closed before handshake: {}", peer, e)
                            }
                            Err(e) => tracing::warn!("[server] handshake with {} failed: {}", peer, e),
                        }
                    });
                }
                Err(e) => back_off_after_accept_error(&e).await,
            },
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    }

    drop(listener);
    sessions.abort_all();
    while sessions.join_next().await.is_some() {}
    tracing::debug!("[server] accept loop stopped");
}

/// 핸드셰이크 전에 상대가 연결을 닫은 경우
fn is_early_close(e: &russh::Error) -> bool {
    match e {
        russh::Error::Disconnect | russh::Error::HUP => true,
        russh::Error::IO(io) => matches!(
            io.kind(),
            std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

/// accept 실패(EMFILE 등)가 계속될 때 루프가 공회전하지 않도록 잠시 쉰다
async fn back_off_after_accept_error(e: &std::io::Error) {
    tracing::warn!("[server] accept failed: {}, retrying in {:?}", e, ACCEPT_BACKOFF);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

// ── RunningServer ─────────────────────────────────────────────────────────────

pub struct RunningServer {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<()>,
    lifecycle: ServerLifecycle,
    probe_delay: Duration,
    probe_timeout: Duration,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &ServerState {
        self.lifecycle.state()
    }

    /// cancel()하면 run_until_cancelled()가 서버를 닫고 반환
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// probe_delay 후 포트 확인, 결과는 로그만 남기고 서버는 계속 동작
    pub async fn probe(&mut self) -> Result<bool> {
        tokio::time::sleep(self.probe_delay).await;
        let alive = is_port_listening(self.local_addr, self.probe_timeout).await;
        if alive {
            tracing::info!("[server] SFTP server started successfully");
            self.lifecycle.transition(ServerState::ProbeSucceeded)?;
        } else {
            tracing::error!("[server] SFTP server did not accept the probe connection");
            self.lifecycle.transition(ServerState::ProbeFailed)?;
        }
        Ok(alive)
    }

    /// 토큰이 cancel될 때까지 대기 후 종료
    pub async fn run_until_cancelled(mut self) -> Result<()> {
        self.lifecycle.transition(ServerState::Blocked)?;
        self.token.cancelled().await;
        self.close().await
    }

    pub async fn shutdown(self) -> Result<()> {
        self.token.cancel();
        self.close().await
    }

    async fn close(mut self) -> Result<()> {
        self.lifecycle.transition(ServerState::Closing)?;
        tracing::info!("[server] closing SFTP server");
        self.token.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::error!("[server] accept loop panicked: {}", e);
            self.lifecycle.fail(e.to_string());
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())));
        }
        self.lifecycle.transition(ServerState::Stopped)?;
        Ok(())
    }
}
