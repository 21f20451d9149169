// mockSFTP Utils
// author: kodeholic
//
// 공통 유틸 함수 모음
// - fmt_size           : 바이트 → 사람이 읽기 좋은 단위 (1.2MB 등)
// - extract_filename   : 경로에서 파일명만 추출 ('/', '\' 모두 처리)
// - resolve_local_path : 로컬 상대경로 → 절대경로

use std::path::{Path, PathBuf};

// ── 포맷 유틸 ────────────────────────────────────────────────────────────────

/// 바이트 → 사람이 읽기 좋은 단위 문자열
pub fn fmt_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB      { format!("{:.1}GB", bytes as f64 / GB as f64) }
    else if bytes >= MB { format!("{:.1}MB", bytes as f64 / MB as f64) }
    else if bytes >= KB { format!("{:.1}KB", bytes as f64 / KB as f64) }
    else                { format!("{}B",     bytes) }
}

// ── 경로 유틸 ────────────────────────────────────────────────────────────────

/// 경로에서 파일명만 추출 ("/remote/path/file.txt" → "file.txt")
///
/// Windows 경로("D:\dir\file.zip")를 Unix에서 받아도 파일명만 남긴다
pub fn extract_filename(path: &str) -> String {
    path.rsplit('/')
        .next()
        .and_then(|s| s.rsplit('\\').next())
        .unwrap_or(path)
        .to_string()
}

/// 로컬 상대경로 → 절대경로 변환
///
/// current_dir 기준으로 join, 실패 시 입력 그대로
pub fn resolve_local_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_)  => path.to_path_buf(),
    }
}
