// mockSFTP SFTP Subsystem (russh-sftp server Handler)
// author: kodeholic
//
// 세션마다 하나의 SftpSubsystem이 생성되고 VirtualMount 안에서만 동작
// 열린 핸들 테이블은 세션 소유 (세션 간 공유 없음)
//
// io::Error → StatusCode
//   NotFound         → NoSuchFile
//   PermissionDenied → PermissionDenied
//   그 외             → Failure

use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::path::PathBuf;

use russh_sftp::protocol::{
    Attrs, Data, File, FileAttributes, Handle, Name, OpenFlags, Status, StatusCode, Version,
};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::vfs::VirtualMount;

const MAX_READ_LEN: u32 = 256 * 1024;

enum OpenNode {
    File { file: tokio::fs::File, path: PathBuf },
    Dir { path: PathBuf, done: bool },
}

pub struct SftpSubsystem {
    mount: VirtualMount,
    handles: HashMap<String, OpenNode>,
    next_handle: u64,
}

impl SftpSubsystem {
    pub fn new(mount: VirtualMount) -> Self {
        Self { mount, handles: HashMap::new(), next_handle: 0 }
    }

    pub fn mount(&self) -> &VirtualMount {
        &self.mount
    }

    fn insert(&mut self, node: OpenNode) -> String {
        self.next_handle += 1;
        let handle = format!("h{}", self.next_handle);
        self.handles.insert(handle.clone(), node);
        handle
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StatusCode> {
        self.mount.resolve(path).map_err(status_of)
    }
}

pub(crate) fn status_of(e: io::Error) -> StatusCode {
    match e.kind() {
        io::ErrorKind::NotFound         => StatusCode::NoSuchFile,
        io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
        io::ErrorKind::UnexpectedEof    => StatusCode::Eof,
        _                               => StatusCode::Failure,
    }
}

fn ok(id: u32) -> Status {
    Status {
        id,
        status_code: StatusCode::Ok,
        error_message: "Ok".to_string(),
        language_tag: "en-US".to_string(),
    }
}

fn open_options(pflags: OpenFlags) -> tokio::fs::OpenOptions {
    let mut opts = tokio::fs::OpenOptions::new();
    let write = pflags.contains(OpenFlags::WRITE) || pflags.contains(OpenFlags::APPEND);
    opts.read(pflags.contains(OpenFlags::READ) || !write)
        .write(write)
        .append(pflags.contains(OpenFlags::APPEND));
    if pflags.contains(OpenFlags::CREATE) {
        if pflags.contains(OpenFlags::EXCLUDE) {
            opts.create_new(true);
        } else {
            opts.create(true);
        }
    }
    if pflags.contains(OpenFlags::TRUNCATE) {
        opts.truncate(true);
    }
    opts
}

async fn apply_attrs(path: &std::path::Path, attrs: &FileAttributes) -> io::Result<()> {
    if let Some(size) = attrs.size {
        let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(size).await?;
    }
    #[cfg(unix)]
    if let Some(mode) = attrs.permissions {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777)).await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl russh_sftp::server::Handler for SftpSubsystem {
    type Error = StatusCode;

    fn unimplemented(&self) -> Self::Error {
        StatusCode::OpUnsupported
    }

    async fn init(
        &mut self,
        version: u32,
        _extensions: HashMap<String, String>,
    ) -> Result<Version, Self::Error> {
        tracing::debug!("[sftp] {} init, client version {}", self.mount.username(), version);
        Ok(Version::new())
    }

    async fn realpath(&mut self, id: u32, path: String) -> Result<Name, Self::Error> {
        let local = self.resolve(&path)?;
        let virt  = self.mount.to_virtual(&local).map_err(status_of)?;
        tracing::debug!("[sftp] realpath {} → {}", path, virt);
        Ok(Name { id, files: vec![File::dummy(virt)] })
    }

    async fn stat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        let local = self.resolve(&path)?;
        let meta  = tokio::fs::metadata(&local).await.map_err(status_of)?;
        Ok(Attrs { id, attrs: FileAttributes::from(&meta) })
    }

    async fn lstat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        let local = self.resolve(&path)?;
        let meta  = tokio::fs::symlink_metadata(&local).await.map_err(status_of)?;
        Ok(Attrs { id, attrs: FileAttributes::from(&meta) })
    }

    async fn fstat(&mut self, id: u32, handle: String) -> Result<Attrs, Self::Error> {
        let meta = match self.handles.get(&handle) {
            Some(OpenNode::File { file, .. }) => file.metadata().await,
            Some(OpenNode::Dir { path, .. })  => tokio::fs::metadata(path).await,
            None => return Err(StatusCode::Failure),
        }
        .map_err(status_of)?;
        Ok(Attrs { id, attrs: FileAttributes::from(&meta) })
    }

    async fn setstat(&mut self, id: u32, path: String, attrs: FileAttributes) -> Result<Status, Self::Error> {
        let local = self.resolve(&path)?;
        apply_attrs(&local, &attrs).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn fsetstat(&mut self, id: u32, handle: String, attrs: FileAttributes) -> Result<Status, Self::Error> {
        let path = match self.handles.get(&handle) {
            Some(OpenNode::File { path, .. }) | Some(OpenNode::Dir { path, .. }) => path.clone(),
            None => return Err(StatusCode::Failure),
        };
        apply_attrs(&path, &attrs).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn open(
        &mut self,
        id: u32,
        filename: String,
        pflags: OpenFlags,
        _attrs: FileAttributes,
    ) -> Result<Handle, Self::Error> {
        let local = self.resolve(&filename)?;
        let file  = open_options(pflags).open(&local).await.map_err(|e| {
            tracing::warn!("[sftp] open {} failed: {}", filename, e);
            status_of(e)
        })?;
        tracing::debug!("[sftp] {} open {} ({:?})", self.mount.username(), filename, pflags);
        let handle = self.insert(OpenNode::File { file, path: local });
        Ok(Handle { id, handle })
    }

    async fn read(&mut self, id: u32, handle: String, offset: u64, len: u32) -> Result<Data, Self::Error> {
        let Some(OpenNode::File { file, .. }) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        file.seek(SeekFrom::Start(offset)).await.map_err(status_of)?;

        let mut buf = vec![0u8; len.min(MAX_READ_LEN) as usize];
        let n = file.read(&mut buf).await.map_err(status_of)?;
        if n == 0 {
            return Err(StatusCode::Eof);
        }
        buf.truncate(n);
        Ok(Data { id, data: buf })
    }

    async fn write(&mut self, id: u32, handle: String, offset: u64, data: Vec<u8>) -> Result<Status, Self::Error> {
        let Some(OpenNode::File { file, .. }) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        file.seek(SeekFrom::Start(offset)).await.map_err(status_of)?;
        file.write_all(&data).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn close(&mut self, id: u32, handle: String) -> Result<Status, Self::Error> {
        match self.handles.remove(&handle) {
            Some(OpenNode::File { mut file, path }) => {
                file.flush().await.map_err(status_of)?;
                tracing::debug!("[sftp] closed {}", path.display());
                Ok(ok(id))
            }
            Some(OpenNode::Dir { .. }) => Ok(ok(id)),
            None => Err(StatusCode::Failure),
        }
    }

    async fn opendir(&mut self, id: u32, path: String) -> Result<Handle, Self::Error> {
        let local = self.resolve(&path)?;
        let meta  = tokio::fs::metadata(&local).await.map_err(status_of)?;
        if !meta.is_dir() {
            return Err(StatusCode::NoSuchFile);
        }
        let handle = self.insert(OpenNode::Dir { path: local, done: false });
        Ok(Handle { id, handle })
    }

    /// 첫 호출에 전체 목록, 두 번째 호출에 Eof
    async fn readdir(&mut self, id: u32, handle: String) -> Result<Name, Self::Error> {
        let Some(OpenNode::Dir { path, done }) = self.handles.get_mut(&handle) else {
            return Err(StatusCode::Failure);
        };
        if *done {
            return Err(StatusCode::Eof);
        }
        *done = true;

        let mut files = Vec::new();
        let mut dir = tokio::fs::read_dir(&*path).await.map_err(status_of)?;
        while let Some(entry) = dir.next_entry().await.map_err(status_of)? {
            let name = entry.file_name().to_string_lossy().to_string();
            let attrs = match entry.metadata().await {
                Ok(meta) => FileAttributes::from(&meta),
                Err(_)   => FileAttributes::default(),
            };
            files.push(File::new(name, attrs));
        }
        Ok(Name { id, files })
    }

    async fn mkdir(&mut self, id: u32, path: String, _attrs: FileAttributes) -> Result<Status, Self::Error> {
        let local = self.resolve(&path)?;
        tokio::fs::create_dir(&local).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn rmdir(&mut self, id: u32, path: String) -> Result<Status, Self::Error> {
        let local = self.resolve(&path)?;
        if local == self.mount.root() {
            return Err(StatusCode::PermissionDenied);
        }
        tokio::fs::remove_dir(&local).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn remove(&mut self, id: u32, filename: String) -> Result<Status, Self::Error> {
        let local = self.resolve(&filename)?;
        tokio::fs::remove_file(&local).await.map_err(status_of)?;
        Ok(ok(id))
    }

    async fn rename(&mut self, id: u32, oldpath: String, newpath: String) -> Result<Status, Self::Error> {
        let from = self.resolve(&oldpath)?;
        let to   = self.resolve(&newpath)?;
        tokio::fs::rename(&from, &to).await.map_err(status_of)?;
        Ok(ok(id))
    }
}
