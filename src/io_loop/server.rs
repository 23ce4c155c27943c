/// I/O循环服务器
///
/// The listener is built with socket2 (SO_REUSEADDR + explicit backlog) so
/// the demo port can be re-bound right after a previous run, then handed to
/// Tokio when the loop starts.

use super::{IoLoopConfig, IoSummary, QUIT_COMMAND};
use crate::error::Result;
use crate::shared::metrics::METRICS;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::TcpListener;

/// How long the listener is left alone after a failed accept.
///
/// A pending connection that cannot be accepted (EMFILE, ENFILE) keeps the
/// listener readable, so without a pause the accept branch would win every
/// pass and starve the console.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct IoServer {
    listener: std::net::TcpListener,
    config: IoLoopConfig,
}

impl IoServer {
    /// Creates, binds and starts listening on `config.listen_addr`.
    ///
    /// Port 0 picks a free port; read it back with [`local_addr`](Self::local_addr).
    pub fn bind(config: IoLoopConfig) -> Result<Self> {
        config.validate()?;

        let addr = config.listen_addr;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(config.backlog)?;

        let listener: std::net::TcpListener = socket.into();
        tracing::info!("server socket bound to {}", listener.local_addr()?);

        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs until `quit` is read or the console reaches end-of-input.
    ///
    /// Console bytes that are not valid UTF-8 are replaced, not rejected.
    pub async fn run<R>(self, console: R) -> Result<IoSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_until(console, std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` completes.
    pub async fn run_until<R, S>(self, console: R, shutdown: S) -> Result<IoSummary>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let listener = TcpListener::from_std(self.listener)?;
        let poll_timeout = self.config.poll_timeout;
        let mut console = console;
        // 跨循环保留：read_until 被其他分支取消时已读的字节留在这里
        let mut line_buf = Vec::new();
        let mut accept_paused = false;
        let mut summary = IoSummary::default();

        tokio::pin!(shutdown);

        loop {
            tracing::debug!(
                "Waiting for select() with timeout of {} ms...",
                poll_timeout.as_millis()
            );

            // biased: 先处理连接，再处理控制台输入，最后才是超时
            tokio::select! {
                biased;

                accepted = listener.accept(), if !accept_paused => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!("Accepted a connection on the server socket.");
                        tracing::debug!("peer {} closed immediately", peer);
                        summary.accepted += 1;
                        METRICS.connections_accepted_total.inc();
                        drop(stream);
                    }
                    Err(e) => {
                        METRICS.record_error("accept");
                        tracing::warn!("accept failed: {}", e);
                        accept_paused = true;
                    }
                },

                read = console.read_until(b'\n', &mut line_buf) => {
                    if read? == 0 && line_buf.is_empty() {
                        tracing::info!("console input closed");
                        break;
                    }
                    let line = console_line(&line_buf);
                    line_buf.clear();

                    tracing::info!("Console input: {}", line);
                    summary.console_lines += 1;
                    METRICS.console_lines_total.inc();
                    if line == QUIT_COMMAND {
                        break;
                    }
                }

                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }

                _ = tokio::time::sleep(ACCEPT_BACKOFF.min(poll_timeout)), if accept_paused => {
                    accept_paused = false;
                }

                _ = tokio::time::sleep(poll_timeout) => {
                    summary.timeouts += 1;
                    METRICS.poll_timeouts_total.inc();
                }
            }
        }

        tracing::info!("Shutting down server.");
        Ok(summary)
    }
}

/// Decodes one console line, dropping the trailing LF or CRLF.
fn console_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

impl std::fmt::Debug for IoServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("config", &self.config)
            .finish()
    }
}
