//! Background export workers and the status handle of an export

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use super::export::{log_result, IOCode, IOWriteResult, MeshWriter, WriteMesh, WriteOptions};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct Progress {
    current: AtomicUsize,
    max: AtomicUsize,
}

/// Handle of one export. Polled from the main thread.
#[derive(Debug)]
pub struct ExportStatus {
    progress: Arc<Progress>,
    receiver: Option<Receiver<IOWriteResult>>,
    result: Option<IOWriteResult>,
}

impl ExportStatus {
    pub(crate) fn finished(result: IOWriteResult) -> ExportStatus {
        ExportStatus {
            progress: Arc::new(Progress::default()),
            receiver: None,
            result: Some(result),
        }
    }

    fn pending(progress: Arc<Progress>, receiver: Receiver<IOWriteResult>) -> ExportStatus {
        ExportStatus {
            progress,
            receiver: Some(receiver),
            result: None,
        }
    }

    /// Picks up the result if the write has completed.
    pub fn poll(&mut self) -> Option<&IOWriteResult> {
        if self.result.is_none() {
            if let Some(rx) = &self.receiver {
                match rx.try_recv() {
                    Ok(r) => self.result = Some(r),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => self.result = Some(lost_worker()),
                }
            }
        }
        self.result.as_ref()
    }

    /// Blocks until the write completes.
    pub fn wait(&mut self) -> &IOWriteResult {
        if self.result.is_none() {
            let r = match &self.receiver {
                Some(rx) => rx.recv().unwrap_or_else(|_| lost_worker()),
                None => lost_worker(),
            };
            self.result = Some(r);
        }
        self.result.get_or_insert_with(lost_worker)
    }

    pub fn is_computing(&mut self) -> bool {
        self.poll().is_none()
    }

    /// `(current, max)` as last reported by the writer.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress.current.load(Ordering::Acquire),
            self.progress.max.load(Ordering::Acquire),
        )
    }

    pub fn result(&self) -> Option<&IOWriteResult> {
        self.result.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.result.as_ref().map_or(false, IOWriteResult::is_ok)
    }
}

fn lost_worker() -> IOWriteResult {
    IOWriteResult::new(IOCode::WriteError, "export worker exited without a result")
}

/// Fixed pool of threads running export jobs in submission order.
pub struct ExportWorker {
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl ExportWorker {
    pub fn new(threads: usize) -> ExportWorker {
        let (sender, receiver) = channel::unbounded::<Job>();
        let threads = (0..threads.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("export-{}", i))
                    .spawn(move || {
                        for job in receiver.iter() {
                            job();
                        }
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::error!("Failed to spawn export thread: {}", e);
                    None
                }
            })
            .collect();
        ExportWorker {
            sender: Some(sender),
            threads,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Queues a write of already-snapshotted meshes.
    pub fn submit(
        &self,
        path: PathBuf,
        meshes: Vec<WriteMesh>,
        mut options: WriteOptions,
        writer: Arc<dyn MeshWriter>,
    ) -> ExportStatus {
        let progress = Arc::new(Progress::default());
        progress.max.store(meshes.len(), Ordering::Release);
        let user_progress = options.progress.take();
        let shared = progress.clone();
        options.progress = Some(Arc::new(move |current, max| {
            shared.max.store(max, Ordering::Release);
            shared.current.store(current, Ordering::Release);
            if let Some(f) = &user_progress {
                f(current, max);
            }
        }));

        let (done_tx, done_rx) = channel::bounded(1);
        let job: Job = Box::new(move || {
            let result = writer.write(&path, &meshes, &options);
            log_result(&path, &result);
            let _ = done_tx.send(result);
        });

        let queued = match &self.sender {
            Some(sender) if !self.threads.is_empty() => sender.send(job).is_ok(),
            _ => false,
        };
        if queued {
            ExportStatus::pending(progress, done_rx)
        } else {
            log::error!("Export worker is not running");
            ExportStatus::finished(IOWriteResult::new(IOCode::WriteError, "export worker is not running"))
        }
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        // closing the channel ends every worker loop once the queue drains
        self.sender.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::error!("Export thread panicked");
            }
        }
    }
}
