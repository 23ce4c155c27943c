//! Multiplexed I/O loop
//!
//! One task waits on three sources at once:
//! - the TCP listener (pending connections are accepted and closed at once)
//! - a line-oriented console (`quit` or end-of-input stops the loop)
//! - a poll timeout that produces a heartbeat log line
//!
//! ## Modules
//! - `server`: the listener and the loop itself

pub mod server;

pub use server::IoServer;

use crate::error::{EventError, Result};
use serde::Serialize;
use std::io::BufRead;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 12345;

/// Console command that ends the loop.
pub const QUIT_COMMAND: &str = "quit";

/// I/O循环配置
#[derive(Debug, Clone)]
pub struct IoLoopConfig {
    /// 监听地址
    pub listen_addr: SocketAddr,

    /// 单次等待的超时时间
    pub poll_timeout: Duration,

    /// listen() 的积压队列长度
    pub backlog: i32,
}

impl Default for IoLoopConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            poll_timeout: Duration::from_secs(1),
            backlog: 5,
        }
    }
}

impl IoLoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout.is_zero() {
            return Err(EventError::InvalidConfig(
                "poll timeout must be greater than 0".to_string(),
            ));
        }
        if self.backlog <= 0 {
            return Err(EventError::InvalidConfig(
                "listen backlog must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// What happened during one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IoSummary {
    pub accepted: u64,
    pub console_lines: u64,
    pub timeouts: u64,
}

/// Forwards the process stdin into an in-memory pipe.
///
/// Reading happens on a detached OS thread so that a pending blocking read
/// never holds up runtime shutdown. Must be called inside a Tokio runtime.
pub fn spawn_stdin_reader() -> Result<DuplexStream> {
    let (reader, mut writer) = tokio::io::duplex(4096);
    let runtime = tokio::runtime::Handle::current();

    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            // 按字节转发，非UTF-8输入由服务器端做有损解码
            for line in stdin.lock().split(b'\n') {
                let Ok(mut bytes) = line else { break };
                bytes.push(b'\n');
                if runtime.block_on(writer.write_all(&bytes)).is_err() {
                    break;
                }
            }
            // writer 在此处释放，读端看到 EOF
        })?;

    Ok(reader)
}

/// Binds, prints the banner and runs the loop on stdin until `quit` or Ctrl-C.
pub async fn run_demo(config: IoLoopConfig) -> Result<IoSummary> {
    let server = IoServer::bind(config)?;
    let port = server.local_addr()?.port();

    println!("Server listening on port {}", port);
    println!("Type '{}' to exit.", QUIT_COMMAND);

    let console = tokio::io::BufReader::new(spawn_stdin_reader()?);
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // 无法安装信号处理器时只依赖 quit 命令
            std::future::pending::<()>().await;
        }
    };
    server.run_until(console, shutdown).await
}
