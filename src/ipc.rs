//! Single-instance coordination. The first process takes an exclusive lock
//! and listens on a Unix socket; later processes forward a toggle request
//! over that socket and exit.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("locking {}: {errno}", path.display())]
    Lock { path: PathBuf, errno: Errno },
    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> InstanceError + '_ {
    move |source| InstanceError::Io { path: path.to_path_buf(), source }
}

const CLIENT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Requests one instance can make of another. One JSON object per line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcMessage {
    Toggle,
}

/// Held by the primary instance for as long as it runs.
pub struct InstanceLock {
    _lock: Flock<File>,
    path: PathBuf,
}

pub enum Role {
    Primary(InstanceLock),
    Secondary,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Role, InstanceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(io_err(path))?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                debug!(path = %path.display(), "Acquired instance lock");
                Ok(Role::Primary(InstanceLock { _lock: lock, path: path.to_path_buf() }))
            }
            Err((_, Errno::EWOULDBLOCK)) => Ok(Role::Secondary),
            Err((_, errno)) => Err(InstanceError::Lock { path: path.to_path_buf(), errno }),
        }
    }

    pub fn path(&self) -> &Path { &self.path }
}

/// Accepts [`IpcMessage`]s from other instances. The socket file is removed
/// when the server is dropped.
#[derive(Debug)]
pub struct IpcServer {
    path: PathBuf,
}

impl IpcServer {
    /// Binds `path` and serves it on a background thread. Must only be called
    /// while holding the [`InstanceLock`]; a leftover socket is replaced.
    pub fn spawn(
        path: &Path,
        on_message: impl Fn(IpcMessage) + Send + 'static,
    ) -> Result<IpcServer, InstanceError> {
        if path.exists() {
            debug!(path = %path.display(), "Removing stale socket");
            std::fs::remove_file(path).map_err(io_err(path))?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let listener = UnixListener::bind(path).map_err(io_err(path))?;
        std::thread::Builder::new()
            .name("ipc".to_string())
            .spawn(move || serve(listener, on_message))
            .map_err(io_err(path))?;
        info!(path = %path.display(), "Listening for other instances");
        Ok(IpcServer { path: path.to_path_buf() })
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Could not remove {}: {e}", self.path.display());
        }
    }
}

fn serve(listener: UnixListener, on_message: impl Fn(IpcMessage)) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Accepting connection failed: {e}");
                continue;
            }
        };
        // One client that never writes must not hold up the next one.
        if let Err(e) = stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT)) {
            warn!("Setting read timeout failed: {e}");
            continue;
        }
        for line in BufReader::new(stream).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Reading from client failed: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<IpcMessage>(&line) {
                Ok(msg) => {
                    debug!(?msg, "Received message");
                    on_message(msg);
                }
                Err(e) => warn!("{}", InstanceError::from(e)),
            }
        }
    }
}

/// Takes the instance lock, or hands a toggle to the instance holding it.
/// Returns the lock when this process should run as the primary instance.
pub fn claim_or_forward(
    lock_path: &Path,
    socket_path: &Path,
) -> Result<Option<InstanceLock>, InstanceError> {
    match InstanceLock::acquire(lock_path)? {
        Role::Primary(lock) => Ok(Some(lock)),
        Role::Secondary => {
            forward_toggle(socket_path);
            Ok(None)
        }
    }
}

/// Sends one toggle to the running instance. Quiet when there is none.
pub fn forward_toggle(socket_path: &Path) {
    match send(socket_path, IpcMessage::Toggle) {
        Ok(true) => info!("Toggle sent to running instance"),
        Ok(false) => info!("No running instance"),
        Err(e) => warn!("{e}"),
    }
}

/// Delivers `msg` to the primary instance. Returns `Ok(false)` when nothing
/// is listening.
pub fn send(path: &Path, msg: IpcMessage) -> Result<bool, InstanceError> {
    let mut stream = match UnixStream::connect(path) {
        Ok(stream) => stream,
        Err(e) => {
            debug!(path = %path.display(), "No instance to notify: {e}");
            return Ok(false);
        }
    };
    let mut buf = serde_json::to_string(&msg)?;
    buf.push('\n');
    stream.write_all(buf.as_bytes()).map_err(io_err(path))?;
    Ok(true)
}
