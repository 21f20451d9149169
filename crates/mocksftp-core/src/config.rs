// mockSFTP Config
// author: kodeholic
//
// 전역 상수 대신 설정 구조체를 서버/클라이언트 생성자에 넘긴다
// 테스트에서는 port 0 + 임시 디렉토리로 독립 인스턴스를 띄울 수 있음

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_PORT: u16 = 2222;
pub const DEFAULT_BASE_DIR: &str = "tmp";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_SOURCE_FILE: &str = r"D:\software\tmp\POC-C1.zip";

/// 정적 username/password 한 쌍
#[derive(Debug)]
pub struct Credential {
    pub username: String,
    password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// username, password 모두 일치할 때만 true
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password.expose_secret() == password
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub base_dir: PathBuf,
    pub credential: Credential,
    /// start 이후 liveness probe까지 대기
    pub probe_delay: Duration,
    pub probe_timeout: Duration,
    pub inactivity_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// `<base>/<username>`
    pub fn user_dir(&self) -> PathBuf {
        self.base_dir.join(&self.credential.username)
    }

    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            credential: Credential::default(),
            probe_delay: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(1),
            inactivity_timeout: None,
        }
    }
}

#[derive(Debug)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl ConnectConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT, DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

/// 업로드할 로컬 파일 하나
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: PathBuf,
}

impl TransferRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self { source: source.into() }
    }

    /// 원격 파일명 = 소스 경로의 마지막 요소 ('/', '\' 모두 구분자)
    pub fn remote_name(&self) -> String {
        crate::utils::extract_filename(&self.source.to_string_lossy())
    }
}

impl Default for TransferRequest {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_FILE)
    }
}
