// mockSFTP CLI Handler
// author: kodeholic
//
// core 호출 + 콘솔 상태 출력
// 서버: Ctrl-C → CancellationToken.cancel() → 서버 종료
// 클라이언트: 업로드 한 건 후 종료

use std::sync::Arc;

use mocksftp_core::client::upload;
use mocksftp_core::config::{ConnectConfig, ServerConfig, TransferRequest};
use mocksftp_core::error::{Error, Result};
use mocksftp_core::server::MockServer;
use mocksftp_core::state::{ConnectionObserver, ConnectionState, ServerObserver, ServerState};
use mocksftp_core::utils::fmt_size;

struct CliObserver;

impl ServerObserver for CliObserver {
    fn on_state_changed(&self, _prev: &ServerState, next: &ServerState) {
        println!("[server] → {:?}", next);
    }
}

impl ConnectionObserver for CliObserver {
    fn on_state_changed(&self, _prev: &ConnectionState, next: &ConnectionState) {
        println!("[state] → {:?}", next);
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let user = config.credential.username.clone();
    let base = config.base_dir.clone();
    println!("Starting SFTP server on port {} (user {}, root {})", config.port, user, base.join(&user).display());

    let mut server = MockServer::start(config, Arc::new(CliObserver)).await?;

    let token = server.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Shutting down SFTP server");
            token.cancel();
        }
    });

    if server.probe().await? {
        println!("SFTP server is up: {}", server.local_addr());
    } else {
        println!("SFTP server did not answer the liveness probe on {}", server.local_addr());
    }

    server.run_until_cancelled().await?;
    println!("SFTP server stopped");
    Ok(())
}

pub async fn run_client(config: ConnectConfig, request: TransferRequest) -> Result<()> {
    println!("Connecting to {} as {}...", config.addr(), config.username);

    let report = match upload(&config, &request, Box::new(CliObserver)).await {
        Ok(report) => report,
        Err(Error::SourceNotFound(path)) => {
            println!("Error: file not found - {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Uploaded: {} → {} ({})", report.source.display(), report.remote, fmt_size(report.bytes));
    match report.disconnect {
        Ok(())  => println!("Disconnected."),
        Err(e)  => println!("Error while disconnecting: {}", e),
    }
    Ok(())
}
