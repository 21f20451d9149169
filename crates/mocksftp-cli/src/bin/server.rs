// mockSFTP Server
// author: kodeholic
//
// Usage: mocksftp-server [port] [base_dir]

use std::env;
use std::process::ExitCode;

use mocksftp_cli::args::ServerArgs;
use mocksftp_cli::{handler, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match ServerArgs::parse(&args) {
        ServerArgs::Run(config) => config,
        ServerArgs::Help => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        ServerArgs::Invalid(msg) => {
            println!("{}", msg);
            return ExitCode::from(2);
        }
    };

    match handler::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("failed to run SFTP server: {:?}", e);
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("mockSFTP - mock SFTP server");
    println!();
    println!("Usage: mocksftp-server [port] [base_dir]");
    println!();
    println!("Defaults: port 2222, base_dir tmp, user admin/admin");
    println!("Files uploaded by <user> land in <base_dir>/<user>/");
}
