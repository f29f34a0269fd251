use crossbeam_channel::{bounded, unbounded, Sender};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Flush(Sender<()>),
}

/// A single background thread running jobs in submission order.
///
/// Used for disk writes and tile source fetches so the render thread never
/// waits on I/O. If the thread cannot be started, or has died, jobs run inline
/// on the caller instead of being lost.
pub struct BackgroundWorker {
    name: String,
    tx: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    /// Spawn a worker thread with the given name
    pub fn new(name: &str) -> Self {
        let (tx, rx) = unbounded::<Message>();

        let spawned = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Run(job) => job(),
                        Message::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                name: name.to_string(),
                tx: Some(tx),
                handle: Some(handle),
            },
            Err(e) => {
                log::error!("failed to start worker '{}': {}; running jobs inline", name, e);
                Self {
                    name: name.to_string(),
                    tx: None,
                    handle: None,
                }
            }
        }
    }

    /// Queue a job
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(tx) = &self.tx else {
            job();
            return;
        };
        if let Err(e) = tx.send(Message::Run(Box::new(job))) {
            log::warn!("worker '{}' is gone, running job inline", self.name);
            if let Message::Run(job) = e.into_inner() {
                job();
            }
        }
    }

    /// Block until every job queued before this call has finished
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (done_tx, done_rx) = bounded(1);
        if tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Jobs waiting to run
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map(|tx| tx.len()).unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        // closing the channel lets the thread drain its queue and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("worker '{}' panicked", self.name);
            }
        }
    }
}
