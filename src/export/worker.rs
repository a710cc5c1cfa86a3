use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::annotations::AnnotationSnapshot;

use super::{export_document, ExportError, ExportResult, ExportStyle, ExportedPdf};

/// Everything a background export needs, detached from the live session.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Document generation the snapshot was taken from.
    pub generation: u64,
    pub source: Arc<[u8]>,
    pub snapshot: AnnotationSnapshot,
    pub style: ExportStyle,
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub generation: u64,
    pub result: ExportResult<ExportedPdf>,
}

#[derive(Debug)]
pub enum WorkerPoll<T> {
    Pending,
    Ready(T),
    Disconnected,
}

/// Receiving end of a job running on its own thread.
#[derive(Debug)]
pub struct ExportHandle {
    generation: u64,
    receiver: mpsc::Receiver<ExportOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl ExportHandle {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn poll(&mut self) -> WorkerPoll<ExportOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.join();
                WorkerPoll::Ready(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => WorkerPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.join();
                WorkerPoll::Disconnected
            }
        }
    }

    /// Blocks until the worker reports. A worker that dies without reporting
    /// yields [`ExportError::WorkerDisconnected`].
    pub fn wait(mut self) -> ExportOutcome {
        let outcome = self.receiver.recv().unwrap_or(ExportOutcome {
            generation: self.generation,
            result: Err(ExportError::WorkerDisconnected),
        });
        self.join();
        outcome
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(generation = self.generation, "export worker panicked");
            }
        }
    }
}

fn spawn_worker<T, W>(work: W) -> (mpsc::Receiver<T>, JoinHandle<()>)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<T>();
    let thread = std::thread::spawn(move || {
        let result = work();
        let _ = tx.send(result);
    });
    (rx, thread)
}

pub fn spawn_export(job: ExportJob) -> ExportHandle {
    let generation = job.generation;
    tracing::debug!(generation, entries = job.snapshot.len(), "export worker started");
    let (receiver, thread) = spawn_worker(move || ExportOutcome {
        generation: job.generation,
        result: export_document(&job.source, &job.snapshot, &job.style),
    });
    ExportHandle {
        generation,
        receiver,
        thread: Some(thread),
    }
}
