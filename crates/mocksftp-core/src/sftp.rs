// mockSFTP SFTP Client (russh-sftp 기반)
// author: kodeholic
//
// SftpClient : put (업로드), disconnect
// 진척률/이어올리기 없음: 매번 CREATE | WRITE | TRUNCATE 로 새로 씀

use std::path::Path;

use russh::{client, Disconnect};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::session::ClientHandler;

const CHUNK_SIZE: usize = 64 * 1024; // 64KB

pub struct SftpClient {
    ssh: client::Handle<ClientHandler>,
    sftp: SftpSession,
}

impl SftpClient {
    pub(crate) fn new(ssh: client::Handle<ClientHandler>, sftp: SftpSession) -> Self {
        Self { ssh, sftp }
    }

    /// 로컬 파일 → 리모트 파일, 전송한 바이트 수 반환
    pub async fn put(&mut self, local: &Path, remote: &str) -> Result<u64> {
        let mut local_file = tokio::fs::File::open(local).await?;

        let mut remote_file = self.sftp
            .open_with_flags(remote, OpenFlags::CREATE | OpenFlags::WRITE | OpenFlags::TRUNCATE)
            .await?;

        let mut buf         = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;

        loop {
            let n = local_file.read(&mut buf).await?;
            if n == 0 { break; }

            remote_file.write_all(&buf[..n]).await
                .map_err(|e| Error::Sftp(e.to_string()))?;
            transferred += n as u64;
        }

        // shutdown = SSH_FXP_CLOSE
        remote_file.shutdown().await
            .map_err(|e| Error::Sftp(e.to_string()))?;

        tracing::info!("[sftp] uploaded {} → {} ({} bytes)", local.display(), remote, transferred);
        Ok(transferred)
    }

    /// SFTP 채널을 먼저 내려놓고 SSH disconnect
    pub async fn disconnect(self) -> Result<()> {
        drop(self.sftp);
        self.ssh
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        Ok(())
    }
}
