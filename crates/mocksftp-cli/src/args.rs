// mockSFTP CLI Arguments
// author: kodeholic
//
// 순수 파싱만 담당 (IO 없음, 테스트 용이)
// 인자가 없으면 기본값 (port 2222, tmp/, admin/admin)
//
//   mocksftp-server [port] [base_dir]
//   mocksftp-client [file] [host] [port] [username] [password]

use mocksftp_core::config::{ConnectConfig, ServerConfig, TransferRequest};
use mocksftp_core::config::{DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME};

pub enum ServerArgs {
    Run(ServerConfig),
    Help,
    Invalid(String),
}

pub enum ClientArgs {
    Run(ConnectConfig, TransferRequest),
    Help,
    Invalid(String),
}

fn is_help(arg: &str) -> bool {
    matches!(arg, "-h" | "--help" | "help" | "?")
}

fn parse_port(s: &str) -> Result<u16, String> {
    s.parse::<u16>().map_err(|_| format!("Invalid port: {}", s))
}

impl ServerArgs {
    pub fn parse(args: &[String]) -> Self {
        if args.iter().any(|a| is_help(a)) {
            return ServerArgs::Help;
        }
        if args.len() > 2 {
            return ServerArgs::Invalid("Usage: mocksftp-server [port] [base_dir]".to_string());
        }

        let mut config = ServerConfig::default();
        if let Some(port) = args.first() {
            match parse_port(port) {
                Ok(p)  => config.port = p,
                Err(e) => return ServerArgs::Invalid(e),
            }
        }
        if let Some(base) = args.get(1) {
            config = config.with_base_dir(base);
        }
        ServerArgs::Run(config)
    }
}

impl ClientArgs {
    pub fn parse(args: &[String]) -> Self {
        if args.iter().any(|a| is_help(a)) {
            return ClientArgs::Help;
        }
        if args.len() > 5 {
            return ClientArgs::Invalid(
                "Usage: mocksftp-client [file] [host] [port] [username] [password]".to_string(),
            );
        }

        let request = args.first()
            .map(TransferRequest::new)
            .unwrap_or_default();
        let host = args.get(1).map(String::as_str).unwrap_or("localhost");
        let port = match args.get(2).map(|p| parse_port(p)) {
            Some(Ok(p))  => p,
            Some(Err(e)) => return ClientArgs::Invalid(e),
            None         => DEFAULT_PORT,
        };
        let username = args.get(3).map(String::as_str).unwrap_or(DEFAULT_USERNAME);
        let password = args.get(4).map(String::as_str).unwrap_or(DEFAULT_PASSWORD);

        ClientArgs::Run(ConnectConfig::new(host, port, username, password), request)
    }
}
