//! Logger setup plus the in-app console buffer
//!
//! Records go to `env_logger` as usual and, when they pass its filter, into a
//! bounded buffer the settings window renders.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use env_logger::{Builder, Env};
use log::{Log, Metadata, Record};

pub const CONSOLE_CAPACITY: usize = 500;

/// Shared ring of formatted log lines, newest last.
#[derive(Clone, Default)]
pub struct ConsoleBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        let Ok(mut lines) = self.lines.lock() else { return };
        lines.push_back(line);
        while lines.len() > CONSOLE_CAPACITY {
            lines.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
        self.push(format_line("INFO", "Console cleared"));
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }
}

pub fn format_line(level: &str, message: &str) -> String {
    format!("[{}] [{}] {}", chrono::Local::now().format("%H:%M:%S"), level, message)
}

struct ConsoleLogger {
    inner: env_logger::Logger,
    console: ConsoleBuffer,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        self.console
            .push(format_line(record.level().as_str(), &record.args().to_string()));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger (`RUST_LOG`, default `info`) and return the
/// console it feeds.
pub fn init() -> ConsoleBuffer {
    let inner = Builder::from_env(Env::default().default_filter_or("info")).build();
    let max_level = inner.filter();
    let console = ConsoleBuffer::new();

    let logger = ConsoleLogger {
        inner,
        console: console.clone(),
    };
    match log::set_boxed_logger(Box::new(logger)) {
        Ok(()) => log::set_max_level(max_level),
        Err(e) => eprintln!("Logger already installed: {}", e),
    }
    console
}
