//! Log service role: serves task log files from a single directory over TCP.
//!
//! Each connection carries one request line, a path relative to the log directory.
//! The response is the raw file contents, or `ERR <reason>` on one line. The
//! connection is closed after the response. Request lines longer than
//! [`MAX_REQUEST`] bytes are refused without reading the rest.

use super::{bind, RunningTask};
use crate::config::LogServiceConfig;
use crate::context::SharedContext;
use crate::model::RoleKind;
use async_trait::async_trait;
use role_framework::{Role, RoleError};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Longest accepted request line, newline included.
pub const MAX_REQUEST: u64 = 4096;

pub struct LogServiceRole {
    config: LogServiceConfig,
    running: Option<(RunningTask, SocketAddr)>,
}

impl LogServiceRole {
    pub fn new(config: LogServiceConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|(_, addr)| *addr)
    }
}

#[async_trait]
impl Role<SharedContext> for LogServiceRole {
    fn name(&self) -> &str {
        RoleKind::LogService.as_str()
    }

    async fn start(&mut self, _ctx: &SharedContext) -> Result<(), RoleError> {
        let root = tokio::fs::canonicalize(&self.config.log_dir)
            .await
            .map_err(|e| {
                RoleError::Config(format!(
                    "log_dir {} is not accessible: {e}",
                    self.config.log_dir.display()
                ))
            })?;
        if !root.is_dir() {
            return Err(RoleError::Config(format!(
                "log_dir {} is not a directory",
                root.display()
            )));
        }

        let listener = bind(&self.config.listen_addr).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| RoleError::Other(format!("local address unavailable: {e}")))?;

        let root = Arc::new(root);
        info!(%addr, log_dir = %root.display(), "Log service listening");
        let task = RunningTask::spawn(move |stop| run(listener, root, stop));
        self.running = Some((task, addr));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some((task, _)) = self.running.take() {
            task.stop(self.name()).await;
        }
    }
}

async fn run(listener: TcpListener, root: Arc<PathBuf>, stop: Arc<Notify>) {
    loop {
        tokio::select! {
            _ = stop.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let root = Arc::clone(&root);
                    tokio::spawn(async move {
                        if let Err(e) = handle(stream, &root).await {
                            debug!(%peer, error = %e, "Log request aborted");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Log service accept failed"),
            },
        }
    }
    info!("Log service shutdown");
}

async fn handle(stream: TcpStream, root: &Path) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream).take(MAX_REQUEST);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;

    let result = if reader.limit() == 0 && !line.ends_with(b"\n") {
        Err("request too long".to_string())
    } else {
        match std::str::from_utf8(&line) {
            Ok(request) => read_log(root, request.trim()).await,
            Err(_) => Err("request is not valid UTF-8".to_string()),
        }
    };
    let response = match result {
        Ok(bytes) => bytes,
        Err(reason) => format!("ERR {reason}\n").into_bytes(),
    };

    let mut stream = reader.into_inner().into_inner();
    stream.write_all(&response).await?;
    stream.shutdown().await
}

/// Resolve `request` under `root` and read it, refusing anything outside `root`.
pub(crate) async fn read_log(root: &Path, request: &str) -> Result<Vec<u8>, String> {
    if request.is_empty() {
        return Err("empty request".into());
    }
    let relative = Path::new(request);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(format!("path escapes log directory: {request}"));
    }

    let full = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|_| format!("not found: {request}"))?;
    // Symlinks can still point outside.
    if !full.starts_with(root) {
        return Err(format!("path escapes log directory: {request}"));
    }

    tokio::fs::read(&full)
        .await
        .map_err(|e| format!("unreadable: {request}: {e}"))
}
