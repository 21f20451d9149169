// mockSFTP Client Session (russh 기반)
// author: kodeholic
//
// russh로 SSH 연결/인증을 처리하고
// russh-sftp로 SFTP 세션을 수립합니다.
// 모든 단계는 ConnectionState 전이로 observer에 통지

use std::sync::Arc;

use russh::client;
use russh_sftp::client::SftpSession as RusshSftpSession;
use secrecy::ExposeSecret;

use crate::config::ConnectConfig;
use crate::error::{Error, Result};
use crate::sftp::SftpClient;
use crate::state::{invalid_transition, ConnectionObserver, ConnectionState};

// russh 클라이언트 핸들러 (서버 이벤트 처리)
pub(crate) struct ClientHandler;

#[async_trait::async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // mock 서버는 매 기동마다 호스트키가 바뀜 → 검증 생략
        Ok(true)
    }
}

pub struct SftpSession {
    state: ConnectionState,
    observer: Box<dyn ConnectionObserver>,
}

impl SftpSession {
    pub fn new(observer: Box<dyn ConnectionObserver>) -> Self {
        Self { state: ConnectionState::Idle, observer }
    }

    pub fn state(&self) -> &ConnectionState { &self.state }

    pub(crate) fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(invalid_transition(&self.state, &next));
        }
        let prev = std::mem::replace(&mut self.state, next);
        self.observer.on_state_changed(&prev, &self.state);
        Ok(())
    }

    pub(crate) fn transition_to_error(&mut self, message: String) {
        let current = self.state.clone();
        let prev = std::mem::replace(
            &mut self.state,
            ConnectionState::Error { state: Box::new(current), message }
        );
        self.observer.on_state_changed(&prev, &self.state);
    }

    /// 실패 시 Error 상태로 전이 후 에러 반환
    fn fail(&mut self, e: Error) -> Error {
        self.transition_to_error(e.to_string());
        e
    }

    pub async fn connect(&mut self, config: &ConnectConfig) -> Result<SftpClient> {
        // ---- TCP 연결 + 키교환 ----
        self.transition(ConnectionState::TcpConnecting)?;

        let russh_config = Arc::new(client::Config::default());
        let addr = config.addr();
        tracing::info!("[session] connecting to {}", addr);

        let mut ssh = match client::connect(russh_config, addr.as_str(), ClientHandler).await {
            Ok(ssh) => ssh,
            Err(e)  => return Err(self.fail(Error::Protocol(e.to_string()))),
        };

        // ---- 인증 ----
        self.transition(ConnectionState::Authenticating)?;

        let authed = match ssh
            .authenticate_password(config.username.as_str(), config.password.expose_secret().as_str())
            .await
        {
            Ok(authed) => authed,
            Err(e)     => return Err(self.fail(Error::Auth(e.to_string()))),
        };
        if !authed {
            return Err(self.fail(Error::Auth(format!("server rejected credentials for {}", config.username))));
        }
        self.transition(ConnectionState::Authenticated)?;

        // ---- 채널 + SFTP ----
        self.transition(ConnectionState::ChannelOpening)?;

        let mut channel = match ssh.channel_open_session().await {
            Ok(channel) => channel,
            Err(e)      => return Err(self.fail(e.into())),
        };
        if let Err(e) = channel.request_subsystem(true, "sftp").await {
            return Err(self.fail(e.into()));
        }
        let sftp = match RusshSftpSession::new(channel.into_stream()).await {
            Ok(sftp) => sftp,
            Err(e)   => return Err(self.fail(e.into())),
        };

        self.transition(ConnectionState::SftpReady)?;
        tracing::info!("[session] SFTP ready");
        Ok(SftpClient::new(ssh, sftp))
    }

    /// 업로드 한 건 (SftpReady → Transferring → SftpReady)
    pub async fn put(&mut self, client: &mut SftpClient, local: &std::path::Path, remote: &str) -> Result<u64> {
        self.transition(ConnectionState::Transferring)?;
        match client.put(local, remote).await {
            Ok(n) => {
                self.transition(ConnectionState::SftpReady)?;
                Ok(n)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// SFTP 세션 + SSH 연결 종료
    ///
    /// 실패도 호출자가 확인할 수 있도록 그대로 반환
    pub async fn disconnect(&mut self, client: SftpClient) -> Result<()> {
        self.transition(ConnectionState::Disconnecting)?;
        match client.disconnect().await {
            Ok(()) => {
                self.transition(ConnectionState::Disconnected)?;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}
