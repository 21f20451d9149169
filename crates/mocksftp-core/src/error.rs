// mockSFTP Error Types
// author: kodeholic
//
// Display: 에러 메시지 포맷팅
// From<io::Error>: ? 연산자로 IO 에러 자동 변환
// 기동 단계별 실패는 서로 다른 variant로 구분

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    CreateBaseDir {
        path: PathBuf,
        source: std::io::Error,
    },
    CreateUserDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Bind {
        addr: String,
        source: std::io::Error,
    },
    InvalidTransition {
        from: String,
        to: String,
    },
    Protocol(String),
    Auth(String),
    Sftp(String),
    SourceNotFound(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e)                          => write!(f, "IO error: {}", e),
            Error::CreateBaseDir { path, source } => write!(f, "Failed to create base directory {}: {}", path.display(), source),
            Error::CreateUserDir { path, source } => write!(f, "Failed to create user directory {}: {}", path.display(), source),
            Error::Bind { addr, source }          => write!(f, "Failed to listen on {}: {}", addr, source),
            Error::InvalidTransition { from, to } => write!(f, "Invalid state transition: {} → {}", from, to),
            Error::Protocol(s)                    => write!(f, "Protocol error: {}", s),
            Error::Auth(s)                        => write!(f, "Auth failed: {}", s),
            Error::Sftp(s)                        => write!(f, "SFTP error: {}", s),
            Error::SourceNotFound(p)              => write!(f, "File not found: {}", p.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::CreateBaseDir { source, .. }
            | Error::CreateUserDir { source, .. }
            | Error::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<russh::Error> for Error {
    fn from(e: russh::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for Error {
    fn from(e: russh_sftp::client::error::Error) -> Self {
        Error::Sftp(e.to_string())
    }
}

impl Error {
    pub(crate) fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Error::Bind { addr: addr.to_string(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
