// mockSFTP CLI
// author: kodeholic
//
// mocksftp-server / mocksftp-client 공용 모듈

pub mod args;
pub mod handler;

use tracing_subscriber::{fmt, EnvFilter};

/// RUST_LOG=debug cargo run --bin mocksftp-server
pub fn init_tracing() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
