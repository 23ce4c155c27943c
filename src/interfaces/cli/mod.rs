/// CLI Interface Module
///
/// Command-line entry point: one subcommand per event pattern.
///
/// ## Responsibilities
/// - Parse command-line arguments
/// - Initialize logging and (optionally) the observability endpoint
/// - Dispatch to the selected demo

use super::demos;
use crate::dispatcher::DispatcherConfig;
use crate::error::Result;
use crate::infrastructure::ObservabilityServer;
use crate::io_loop::{self, IoLoopConfig, DEFAULT_PORT};
use crate::logging::{self, LogLevel};
use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// 命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "event-patterns")]
#[command(version)]
#[command(about = "事件驱动编程模式演示：回调、事件队列、观察者、信号槽与I/O多路复用", long_about = None)]
pub struct CliConfig {
    /// 日志级别（io 子命令默认 debug，其余默认 info）
    #[arg(short = 'l', long, global = true, value_parser = ["trace", "debug", "info", "warn", "warning", "error"])]
    pub log_level: Option<String>,

    /// 启动 /metrics 与 /health HTTP端点的端口
    #[arg(long, global = true)]
    pub metrics_port: Option<u16>,

    /// 仅显示配置不运行（用于调试）
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 单一回调
    Callbacks,

    /// 线程安全事件队列
    EventQueue,

    /// 后台事件循环线程
    Dispatcher(DispatcherArgs),

    /// 观察者模式
    Observer,

    /// 信号与槽
    Signals {
        /// 通过事件队列排队调用槽函数
        #[arg(long, default_value_t = false)]
        queued: bool,
    },

    /// TCP监听 + 控制台输入的多路复用循环
    Io(IoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DispatcherArgs {
    /// 生产者线程数（0表示自动检测CPU核心数）
    #[arg(short = 'n', long, default_value_t = 0)]
    pub producers: usize,

    /// 每个生产者投递的事件数
    #[arg(short = 'e', long, default_value_t = 10)]
    pub events: usize,

    /// 通道容量
    #[arg(short = 'q', long, default_value_t = 1024)]
    pub queue_capacity: usize,

    /// 批处理大小
    #[arg(short = 'b', long, default_value_t = 64)]
    pub batch_size: usize,
}

impl DispatcherArgs {
    /// Producer count with `0` resolved to the number of CPUs.
    pub fn resolved_producers(&self) -> usize {
        if self.producers == 0 {
            let cpus = num_cpus::get();
            tracing::info!("自动检测到 {} 个CPU核心", cpus);
            cpus
        } else {
            self.producers
        }
    }

    pub fn to_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            name: "dispatcher".to_string(),
            queue_capacity: self.queue_capacity,
            batch_size: self.batch_size,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IoArgs {
    /// 监听地址
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// 监听端口
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// 单次等待超时（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub poll_timeout_ms: u64,

    /// listen() 积压队列长度
    #[arg(long, default_value_t = 5)]
    pub backlog: i32,
}

impl IoArgs {
    pub fn to_config(&self) -> IoLoopConfig {
        IoLoopConfig {
            listen_addr: SocketAddr::new(self.host, self.port),
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            backlog: self.backlog,
        }
    }
}

impl CliConfig {
    /// Effective log level: explicit flag first, then the per-command default.
    pub fn effective_log_level(&self) -> Result<LogLevel> {
        match &self.log_level {
            Some(level) => level.parse(),
            None => Ok(match self.command {
                Command::Io(_) => LogLevel::Debug,
                _ => LogLevel::Info,
            }),
        }
    }
}

/// Runs the CLI application
pub async fn run() -> Result<()> {
    let config = CliConfig::parse();
    run_with(config).await
}

/// Runs an already parsed configuration.
pub async fn run_with(config: CliConfig) -> Result<()> {
    let level = config.effective_log_level()?;
    let log = logging::init(level);

    tracing::info!("event-patterns 启动");
    tracing::debug!("配置: {:?}", config);

    if config.dry_run {
        print_config(&config, log.level());
        println!("\nDry-run 模式 - 不运行演示");
        return Ok(());
    }

    if let Some(port) = config.metrics_port {
        let server = ObservabilityServer::new(port);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("observability server stopped: {}", e);
            }
        });
    }

    match &config.command {
        Command::Callbacks => demos::callbacks_demo()?,
        Command::EventQueue => {
            demos::event_queue_demo()?;
        }
        Command::Dispatcher(args) => {
            let producers = args.resolved_producers();
            let dispatcher_config = args.to_config();
            let events = args.events;
            tokio::task::spawn_blocking(move || {
                demos::dispatcher_demo(dispatcher_config, producers, events)
            })
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        }
        Command::Observer => {
            demos::observer_demo()?;
        }
        Command::Signals { queued } => {
            demos::signals_demo(*queued)?;
        }
        Command::Io(args) => {
            let summary = io_loop::run_demo(args.to_config()).await?;
            tracing::info!("io loop summary: {}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}

fn print_config(config: &CliConfig, level: LogLevel) {
    println!("========================================");
    println!("  event-patterns v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("子命令:       {:?}", config.command);
    println!("日志级别:     {}", level);
    match config.metrics_port {
        Some(port) => println!("指标端口:     {}", port),
        None => println!("指标端口:     禁用"),
    }
    if let Command::Io(args) = &config.command {
        let io = args.to_config();
        println!("监听地址:     {}", io.listen_addr);
        println!("等待超时:     {} ms", io.poll_timeout.as_millis());
        println!("积压队列:     {}", io.backlog);
    }
    println!("========================================");
}
