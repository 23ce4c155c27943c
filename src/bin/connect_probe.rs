//! 连接探测工具
//!
//! Opens concurrent TCP connections against a running `event-patterns io`
//! loop and measures how long each one takes to be accepted and closed.

use clap::Parser;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(name = "connect-probe")]
#[command(about = "向 I/O 循环发起并发连接并统计关闭延迟", long_about = None)]
struct ProbeConfig {
    /// 目标地址
    #[arg(short, long, default_value = "127.0.0.1:12345")]
    addr: SocketAddr,

    /// 并发客户端数量
    #[arg(short, long, default_value_t = 8)]
    clients: u32,

    /// 每个客户端的连接次数
    #[arg(short, long, default_value_t = 10)]
    rounds: u32,

    /// 等待服务器关闭连接的超时（毫秒）
    #[arg(short, long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    let config = ProbeConfig::parse();
    println!("目标地址: {}", config.addr);
    println!("模拟客户端数量: {}", config.clients);
    println!("每客户端连接次数: {}", config.rounds);

    let timeout = Duration::from_millis(config.timeout_ms);
    let started = Instant::now();

    let handles: Vec<_> = (0..config.clients)
        .map(|client_id| tokio::spawn(run_client(client_id, config.addr, config.rounds, timeout)))
        .collect();

    let mut latencies = Vec::new();
    let mut failures = 0u64;
    for handle in handles {
        match handle.await {
            Ok((ok, failed)) => {
                latencies.extend(ok);
                failures += failed;
            }
            Err(e) => {
                eprintln!("客户端任务异常: {}", e);
                failures += u64::from(config.rounds);
            }
        }
    }

    let elapsed = started.elapsed();
    let avg_latency = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u128>() as f64 / latencies.len() as f64
    };

    println!("\n--- 测试结果 ---");
    println!("成功连接数: {}", latencies.len());
    println!("失败连接数: {}", failures);
    println!("总耗时: {:?}", elapsed);
    println!("平均接受-关闭延迟: {:.2} µs", avg_latency / 1000.0);

    if failures > 0 {
        std::process::exit(1);
    }
}

/// 返回 (每次成功连接的延迟纳秒, 失败次数)
async fn run_client(
    client_id: u32,
    addr: SocketAddr,
    rounds: u32,
    timeout: Duration,
) -> (Vec<u128>, u64) {
    let mut latencies = Vec::with_capacity(rounds as usize);
    let mut failures = 0;

    for _ in 0..rounds {
        let start = Instant::now();
        let mut stream = match TcpStream::connect(addr).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[客户端 {}] 连接失败: {}", client_id, e);
                failures += 1;
                continue;
            }
        };

        // 服务器接受后立即关闭，读到 EOF（或 RST）即表示已被处理
        let mut buf = [0u8; 1];
        match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
            Ok(_) => latencies.push(start.elapsed().as_nanos()),
            Err(_) => {
                eprintln!("[客户端 {}] 等待服务器关闭超时", client_id);
                failures += 1;
            }
        }
    }

    (latencies, failures)
}
