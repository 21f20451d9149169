// mockSFTP Virtual Mount
// author: kodeholic
//
// 접속 사용자별 가상 루트: "/" → <base>/<username>
// 모든 SFTP 경로는 resolve()를 거쳐 로컬 경로로 변환된다
// 루트 밖을 가리키는 경로('..' 초과, 밖으로 나가는 symlink)는 PermissionDenied

use std::io;
use std::path::{Component, Path, PathBuf};

const MAX_LINK_HOPS: usize = 40;

/// 사용자 한 명의 파일시스템 루트
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualMount {
    username: String,
    root: PathBuf,
}

/// 연결 identity → 가상 루트 (로그 외 부수효과 없음)
pub fn mount_for(base_dir: &Path, username: &str) -> VirtualMount {
    tracing::info!("[vfs] user {} connected, root = {}", username, base_dir.join(username).display());
    VirtualMount {
        username: username.to_string(),
        root: base_dir.join(username),
    }
}

impl VirtualMount {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SFTP 경로 정규화 ("a/./b/../c" → "/a/c")
    ///
    /// 루트 위로 올라가는 '..'는 clamp하지 않고 에러
    pub fn normalize(path: &str) -> io::Result<String> {
        let mut parts: Vec<&str> = Vec::new();
        for seg in path.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(escape_error(path));
                    }
                }
                s => parts.push(s),
            }
        }
        Ok(format!("/{}", parts.join("/")))
    }

    /// 가상 경로 → 로컬 경로
    ///
    /// 존재하는 가장 가까운 조상을 canonicalize해서 루트 안인지 확인 (symlink 탈출 차단)
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let virt = Self::normalize(path)?;
        let mut local = self.root.clone();
        for seg in virt.split('/').filter(|s| !s.is_empty()) {
            // 윈도우 드라이브/구분자 섞인 세그먼트 차단
            if Path::new(seg).components().any(|c| !matches!(c, Component::Normal(_))) {
                return Err(escape_error(path));
            }
            local.push(seg);
        }
        self.check_contained(&local, path)?;
        Ok(local)
    }

    /// 로컬 경로 → 가상 경로 (realpath 응답용)
    pub fn to_virtual(&self, local: &Path) -> io::Result<String> {
        let rel = local.strip_prefix(&self.root).map_err(|_| escape_error(&local.to_string_lossy()))?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Ok(format!("/{}", parts.join("/")))
    }

    fn check_contained(&self, local: &Path, requested: &str) -> io::Result<()> {
        let root = self.root.canonicalize()?;

        let mut cursor = local.to_path_buf();
        let mut hops = 0;
        loop {
            match cursor.canonicalize() {
                Ok(real) => {
                    if real.starts_with(&root) {
                        return Ok(());
                    }
                    tracing::warn!("[vfs] {} tried to escape root via {}", self.username, requested);
                    return Err(escape_error(requested));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // 대상이 없는 symlink: 링크가 가리키는 경로로 다시 검사
                    if is_symlink(&cursor) {
                        hops += 1;
                        if hops > MAX_LINK_HOPS {
                            return Err(escape_error(requested));
                        }
                        let target = std::fs::read_link(&cursor)?;
                        cursor = match cursor.parent() {
                            Some(parent) => parent.join(target),
                            None         => target,
                        };
                        continue;
                    }
                    if !cursor.pop() {
                        return Err(escape_error(requested));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn escape_error(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("path escapes user root: {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> (tempfile::TempDir, VirtualMount) {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("admin")).unwrap();
        let m = mount_for(base.path(), "admin");
        (base, m)
    }

    #[test]
    fn root_is_base_plus_username() {
        let (base, m) = mount();
        assert_eq!(m.root(), base.path().join("admin"));
        assert_eq!(m.username(), "admin");
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(VirtualMount::normalize("").unwrap(), "/");
        assert_eq!(VirtualMount::normalize(".").unwrap(), "/");
        assert_eq!(VirtualMount::normalize("/a/./b/../c").unwrap(), "/a/c");
        assert_eq!(VirtualMount::normalize("a//b/").unwrap(), "/a/b");
    }

    #[test]
    fn dotdot_above_root_is_denied() {
        let (_base, m) = mount();
        for p in ["..", "/..", "../admin", "a/../../x", "/../../etc/passwd"] {
            let err = m.resolve(p).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::PermissionDenied, "{}", p);
        }
    }

    #[test]
    fn resolve_stays_inside_root() {
        let (base, m) = mount();
        assert_eq!(m.resolve("/").unwrap(), base.path().join("admin"));
        assert_eq!(m.resolve("new.txt").unwrap(), base.path().join("admin").join("new.txt"));
        assert_eq!(m.resolve("/x/y/../z").unwrap(), base.path().join("admin").join("x").join("z"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_denied() {
        let (base, m) = mount();
        std::fs::create_dir(base.path().join("other")).unwrap();
        std::os::unix::fs::symlink(base.path().join("other"), base.path().join("admin").join("link")).unwrap();

        let err = m.resolve("/link/secret.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_out_of_root_is_denied() {
        let (base, m) = mount();
        std::os::unix::fs::symlink(base.path().join("outside.txt"), base.path().join("admin").join("link")).unwrap();

        let err = m.resolve("/link").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(!base.path().join("outside.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn relative_dangling_symlink_out_of_root_is_denied() {
        let (base, m) = mount();
        std::os::unix::fs::symlink("../../escaped.txt", base.path().join("admin").join("rel")).unwrap();

        let err = m.resolve("rel").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_inside_root_is_allowed() {
        let (base, m) = mount();
        let user = base.path().join("admin");
        std::os::unix::fs::symlink(user.join("later.txt"), user.join("soon")).unwrap();

        assert_eq!(m.resolve("/soon").unwrap(), user.join("soon"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_rejected() {
        let (base, m) = mount();
        let user = base.path().join("admin");
        std::os::unix::fs::symlink(user.join("b"), user.join("a")).unwrap();
        std::os::unix::fs::symlink(user.join("a"), user.join("b")).unwrap();

        assert!(m.resolve("/a").is_err());
    }

    #[test]
    fn to_virtual_round_trips_root() {
        let (base, m) = mount();
        assert_eq!(m.to_virtual(&base.path().join("admin")).unwrap(), "/");
        assert_eq!(m.to_virtual(&base.path().join("admin").join("d").join("f")).unwrap(), "/d/f");
        assert!(m.to_virtual(base.path()).is_err());
    }
}
