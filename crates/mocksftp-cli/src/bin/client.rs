// mockSFTP Client
// author: kodeholic
//
// Usage: mocksftp-client [file] [host] [port] [username] [password]

use std::env;
use std::process::ExitCode;

use mocksftp_cli::args::ClientArgs;
use mocksftp_cli::{handler, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config, request) = match ClientArgs::parse(&args) {
        ClientArgs::Run(config, request) => (config, request),
        ClientArgs::Help => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        ClientArgs::Invalid(msg) => {
            println!("{}", msg);
            return ExitCode::from(2);
        }
    };

    match handler::run_client(config, request).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("upload failed: {:?}", e);
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("mockSFTP - upload one file to the mock SFTP server");
    println!();
    println!("Usage: mocksftp-client [file] [host] [port] [username] [password]");
    println!();
    println!("Example:");
    println!("  mocksftp-client ./POC-C1.zip");
    println!("  mocksftp-client ./POC-C1.zip 192.168.1.100 2222 admin admin");
}
