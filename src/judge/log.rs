//! JSONL result log: one `ExampleResult` per line.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use super::types::ExampleResult;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("{path}:{line}: malformed result: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("result log channel closed")]
    Closed,
    #[error("result log worker failed: {0}")]
    Join(String),
}

pub trait ResultSink: Send + Sync {
    fn record(&self, result: &ExampleResult) -> Result<(), LogError>;
}

/// Sends results to a single writer thread.
#[derive(Clone)]
pub struct JsonlResultSink {
    sender: mpsc::Sender<ExampleResult>,
}

pub struct LogWorker {
    handle: Option<std::thread::JoinHandle<Result<(), LogError>>>,
}

impl LogWorker {
    /// Wait for the writer to drain and flush. Drop every sink first.
    pub fn join(mut self) -> Result<(), LogError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(LogError::Join("result log worker panicked".to_string())),
            },
            None => Ok(()),
        }
    }

    /// Turn a failed `record` into the writer's own error when it has one.
    /// Every sink must be dropped before calling this.
    pub fn into_error(self, err: LogError) -> LogError {
        match self.join() {
            Err(worker_err) => worker_err,
            Ok(()) => err,
        }
    }
}

impl JsonlResultSink {
    /// Truncate or create `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<(Self, LogWorker), LogError> {
        let file = std::fs::File::create(path)?;
        Ok(Self::spawn(file))
    }

    /// Append to `path`, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<(Self, LogWorker), LogError> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::spawn(file))
    }

    fn spawn(file: std::fs::File) -> (Self, LogWorker) {
        let (sender, receiver) = mpsc::channel::<ExampleResult>();
        let handle = std::thread::spawn(move || write_log_loop(file, receiver));
        (
            Self { sender },
            LogWorker {
                handle: Some(handle),
            },
        )
    }
}

impl ResultSink for JsonlResultSink {
    fn record(&self, result: &ExampleResult) -> Result<(), LogError> {
        self.sender
            .send(result.clone())
            .map_err(|_| LogError::Closed)
    }
}

fn write_log_loop(
    file: std::fs::File,
    receiver: mpsc::Receiver<ExampleResult>,
) -> Result<(), LogError> {
    let mut writer = BufWriter::new(file);
    for result in receiver {
        let line = serde_json::to_string(&result).map_err(|e| LogError::Serde(e.to_string()))?;
        writeln!(writer, "{line}")?;
        // Flush per record so a crash loses at most the line in flight.
        writer.flush()?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a result log back. Blank lines are skipped.
pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<ExampleResult>, LogError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str(line).map_err(|source| LogError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(result);
    }
    Ok(out)
}

/// Write a whole log in one go.
pub fn save_results(path: impl AsRef<Path>, results: &[ExampleResult]) -> Result<(), LogError> {
    let (sink, worker) = JsonlResultSink::create(path)?;
    for result in results {
        if let Err(err) = sink.record(result) {
            drop(sink);
            return Err(worker.into_error(err));
        }
    }
    drop(sink);
    worker.join()
}
