//! Accept failures must not starve the console.
//!
//! Lives in its own test binary: it lowers the process fd limit and fills the
//! table, which would break any test running alongside it.

#![cfg(target_os = "linux")]

use event_patterns::io_loop::{IoLoopConfig, IoServer};
use std::fs::File;
use std::time::Duration;
use tokio::net::TcpStream;

const FD_LIMIT: libc::rlim_t = 256;

fn lower_fd_limit() -> libc::rlimit {
    let mut original = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: plain getrlimit/setrlimit on a valid struct
    unsafe {
        assert_eq!(libc::getrlimit(libc::RLIMIT_NOFILE, &mut original), 0);
        let lowered = libc::rlimit {
            rlim_cur: original.rlim_cur.min(FD_LIMIT),
            rlim_max: original.rlim_max,
        };
        assert_eq!(libc::setrlimit(libc::RLIMIT_NOFILE, &lowered), 0);
    }
    original
}

fn restore_fd_limit(original: &libc::rlimit) {
    // SAFETY: see lower_fd_limit
    unsafe {
        libc::setrlimit(libc::RLIMIT_NOFILE, original);
    }
}

/// Opens files until the process runs out of descriptors.
fn exhaust_fds() -> Vec<File> {
    let mut held = Vec::new();
    while let Ok(file) = File::open("/dev/null") {
        held.push(file);
    }
    held
}

#[tokio::test]
async fn test_quit_processed_while_accept_fails() {
    let server = IoServer::bind(IoLoopConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        poll_timeout: Duration::from_millis(50),
        backlog: 5,
    })
    .unwrap();
    let addr = server.local_addr().unwrap();

    let original = lower_fd_limit();

    // 连接停在 backlog 中，监听socket持续可读，但 accept 因 EMFILE 失败
    let client = TcpStream::connect(addr).await.unwrap();
    let held = exhaust_fds();
    assert!(!held.is_empty());

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        server.run(&b"hello\nquit\n"[..]),
    )
    .await;

    drop(held);
    drop(client);
    restore_fd_limit(&original);

    let summary = result
        .expect("accept errors starved the console")
        .unwrap();
    assert_eq!(summary.console_lines, 2);
    assert_eq!(summary.accepted, 0);
}
