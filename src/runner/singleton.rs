//! Single instance guard
//!
//! Holding a listening socket on a port proves no other build with the same port runs.
//! Connections are accepted and dropped until the guard goes out of scope.

use crate::error::{ExecutionError, ExecutionResult};
use std::io;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct SingletonGuard {
    port: u16,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SingletonGuard {
    /// Bind `127.0.0.1:port`, failing if another process holds it
    pub fn acquire(port: u16) -> ExecutionResult<Self> {
        let busy = |e: io::Error| ExecutionError::SingletonBusy {
            port,
            error: e.to_string(),
        };

        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(busy)?;
        listener.set_nonblocking(true).map_err(busy)?;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => drop(stream),
                    Err(_) => thread::sleep(POLL_INTERVAL),
                }
            }
        });

        Ok(SingletonGuard {
            port,
            stop,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for SingletonGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
