// mockSFTP Liveness Probe
// author: kodeholic
//
// listen 직후 TCP connect → 즉시 close
// 정합성 보장이 아닌 smoke test (실패해도 서버는 계속 동작)

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;

/// 포트가 연결을 받는지 확인
pub async fn is_port_listening(addr: SocketAddr, timeout: Duration) -> bool {
    let target = probe_target(addr);
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            tracing::debug!("[probe] connect {} failed: {}", target, e);
            false
        }
        Err(_) => {
            tracing::debug!("[probe] connect {} timed out after {:?}", target, timeout);
            false
        }
    }
}

/// 0.0.0.0 / :: 로 bind된 경우 loopback으로 접속
fn probe_target(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port()),
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_becomes_loopback() {
        let addr: SocketAddr = "0.0.0.0:2222".parse().unwrap();
        assert_eq!(probe_target(addr), "127.0.0.1:2222".parse().unwrap());
        let addr: SocketAddr = "10.0.0.5:22".parse().unwrap();
        assert_eq!(probe_target(addr), addr);
    }

    #[tokio::test]
    async fn detects_open_and_closed_ports() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(is_port_listening(addr, Duration::from_secs(1)).await);

        drop(listener);
        assert!(!is_port_listening(addr, Duration::from_secs(1)).await);
    }
}
