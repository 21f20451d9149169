// mockSFTP Mock Client
// author: kodeholic
//
// 한 번 실행에 업로드 한 건:
//   소스 확인 → 접속 → 업로드 → 접속 종료
//
// 소스 파일이 없으면 서버에 접속하지 않는다
// 접속 종료 실패는 UploadReport.disconnect로 돌려줄 뿐 업로드 결과를 바꾸지 않음

use std::path::PathBuf;

use crate::config::{ConnectConfig, TransferRequest};
use crate::error::{Error, Result};
use crate::session::SftpSession;
use crate::sftp::SftpClient;
use crate::state::ConnectionObserver;
use crate::utils::resolve_local_path;

/// 업로드 결과
#[derive(Debug)]
pub struct UploadReport {
    pub source: PathBuf,
    pub remote: String,
    pub bytes: u64,
    pub disconnect: Result<()>,
}

/// 소스 파일 존재 확인, 절대경로 반환
pub async fn verify_source(request: &TransferRequest) -> Result<PathBuf> {
    let path = resolve_local_path(&request.source);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(Error::SourceNotFound(path)),
    }
}

pub async fn upload(
    config: &ConnectConfig,
    request: &TransferRequest,
    observer: Box<dyn ConnectionObserver>,
) -> Result<UploadReport> {
    let source = verify_source(request).await.map_err(|e| {
        tracing::error!("[client] {}", e);
        e
    })?;
    let remote = request.remote_name();

    let mut session = SftpSession::new(observer);
    let mut client  = session.connect(config).await?;

    let uploaded = session.put(&mut client, &source, &remote).await;
    finish(&mut session, client, uploaded, source, remote).await
}

/// 업로드 성공/실패와 무관하게 접속 종료를 시도한 뒤 결과 조립
///
/// 업로드 에러가 우선, 종료 실패는 report에만 기록
async fn finish(
    session: &mut SftpSession,
    client: SftpClient,
    uploaded: Result<u64>,
    source: PathBuf,
    remote: String,
) -> Result<UploadReport> {
    let disconnect = session.disconnect(client).await;
    match &disconnect {
        Ok(())  => tracing::info!("[client] disconnected"),
        Err(e)  => tracing::warn!("[client] error while disconnecting: {}", e),
    }

    let bytes = uploaded?;
    Ok(UploadReport { source, remote, bytes, disconnect })
}
