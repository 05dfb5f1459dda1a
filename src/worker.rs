use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use crate::decode::{self, CancelToken, DecodeError};
use crate::sequence::FrameSequence;

/// A pending GIF decode, tagged with the ticket of the request that made it.
pub struct DecodeJob {
    pub ticket: u64,
    pub name: String,
    bytes: Vec<u8>,
    cancel: CancelToken,
}

/// Result of a job, carried back to the UI thread.
pub struct DecodeOutcome {
    pub ticket: u64,
    pub name: String,
    pub result: Result<FrameSequence, DecodeError>,
}

impl DecodeJob {
    pub fn new(ticket: u64, name: String, bytes: Vec<u8>, cancel: CancelToken) -> Self {
        Self {
            ticket,
            name,
            bytes,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn run(self) -> DecodeOutcome {
        let result = decode::decode_cancellable(&self.bytes, &self.cancel);
        DecodeOutcome {
            ticket: self.ticket,
            name: self.name,
            result,
        }
    }
}

/// Single background thread that decodes jobs in submission order.
/// Cancelled jobs are skipped and their results never delivered.
pub struct DecodeWorker {
    jobs: Option<Sender<DecodeJob>>,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    pub fn spawn<F>(deliver: F) -> io::Result<Self>
    where
        F: Fn(DecodeOutcome) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<DecodeJob>();
        let handle = thread::Builder::new()
            .name("gif-decode".into())
            .spawn(move || {
                for job in rx {
                    if job.is_cancelled() {
                        log::debug!("Skipping cancelled decode of {}", job.name);
                        continue;
                    }
                    let outcome = job.run();
                    if matches!(outcome.result, Err(DecodeError::Cancelled)) {
                        log::debug!("Decode of {} cancelled mid-stream", outcome.name);
                        continue;
                    }
                    deliver(outcome);
                }
            })?;

        Ok(Self {
            jobs: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn submit(&self, job: DecodeJob) {
        let Some(tx) = &self.jobs else { return };
        if tx.send(job).is_err() {
            log::error!("Decode worker has exited, dropping job");
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        // closing the channel ends the thread's loop
        self.jobs = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
