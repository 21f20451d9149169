// mockSFTP Core Library (russh 기반)
// author: kodeholic

pub mod client;
pub mod config;
pub mod error;
pub mod probe;
pub mod server;
pub mod session;
pub mod sftp;
pub mod state;
pub mod subsystem;
pub mod utils;
pub mod vfs;
