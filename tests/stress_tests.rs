//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Pooled buffers are never shared between concurrent holders
//! - Released buffers come back empty
//! - Lines from many threads are routed whole, and counted
//! - Reconfiguration while logging is observed between records

use rust_severity_logger::appenders::{FileAppender, MemoryAppender};
use rust_severity_logger::core::logging::Logging;
use rust_severity_logger::{BufferPool, Logger, Severity, ThresholdConfig};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

#[test]
fn test_buffer_pool_exclusive_ownership() {
    let pool = Arc::new(BufferPool::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let mut buf = pool.acquire();
                    assert!(buf.is_empty(), "released buffer came back dirty");
                    let tag = format!("{}:{}", t, i);
                    buf.write_all(tag.as_bytes()).unwrap();
                    thread::yield_now();
                    assert_eq!(buf.as_bytes(), tag.as_bytes(), "buffer shared between holders");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert!(pool.allocated() <= THREADS as u64);
    assert_eq!(pool.idle() as u64, pool.allocated());
}

#[test]
fn test_concurrent_lines_are_whole() {
    let logging = Arc::new(Logging::new());
    let console = MemoryAppender::new();
    logging.set_stderr(Arc::new(console.clone()));
    let logger = Logger::from_logging(Arc::clone(&logging));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logger.with_values(&rust_severity_logger::kvs!["worker" => t]);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info("tick", &rust_severity_logger::kvs!["i" => i]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let lines = console.lines();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    let unique: HashSet<&str> = lines
        .iter()
        .map(|line| line.split_once("] ").map(|(_, body)| body).unwrap_or(""))
        .collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert!(lines.iter().all(|line| line.starts_with('I') && line.ends_with(char::is_numeric)));
    assert_eq!(logging.stats().lines(Severity::Info), (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_reconfiguration_while_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logging = Arc::new(Logging::new());
    let console = MemoryAppender::new();
    logging.set_stderr(Arc::new(console.clone()));
    let info = FileAppender::new(temp_dir.path().join("stress.INFO")).expect("Failed to create appender");
    logging.set_output_by_severity("INFO", Arc::new(info)).unwrap();

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let logging = Arc::clone(&logging);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logging.print(Severity::Info, format_args!("thread {} line {}", t, i));
                }
            })
        })
        .collect();

    let toggler = {
        let logging = Arc::clone(&logging);
        thread::spawn(move || {
            for i in 0..100 {
                logging.set_thresholds(ThresholdConfig {
                    to_stderr: i % 2 == 0,
                    ..ThresholdConfig::default()
                });
                thread::yield_now();
            }
        })
    };

    for handle in writers {
        handle.join().expect("writer panicked");
    }
    toggler.join().expect("toggler panicked");
    logging.flush().unwrap();

    let file = std::fs::read_to_string(temp_dir.path().join("stress.INFO")).unwrap();
    let to_file = file.lines().count();
    let to_console = console.lines().len();

    // Each record took exactly one of the two paths.
    assert_eq!(to_file + to_console, THREADS * PER_THREAD);
    assert!(file.lines().all(|line| line.starts_with('I') && line.contains("] thread ")));
    assert_eq!(logging.stats().write_errors(), 0);
}
