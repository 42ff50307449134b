use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use log::{debug, error};

use crate::errors::{Error, Result};

/// Fixed-size thread pool, joining all threads on drop.
///
/// Heavily inspired by the one in the Rust book:
/// https://doc.rust-lang.org/book/ch20-02-multithreaded.html
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
}

impl ThreadPool {
    /// Create a new ThreadPool with `size` threads.
    ///
    /// 'size' must be greater than 0.
    pub fn new(size: usize) -> Result<ThreadPool> {
        if size == 0 {
            return Err(Error::Config("The worker pool needs at least one thread".to_string()));
        }

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| Worker::new(id, Arc::clone(&receiver)))
            .collect::<Result<Vec<_>>>()?;
        debug!("Started {} workers", size);

        Ok(ThreadPool {
            workers,
            sender: Some(sender),
        })
    }

    /// Queue a task to run on the pool when a worker is available.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .as_ref()
            .ok_or(Error::PoolClosed)?
            .send(Box::new(f))
            .map_err(|_| Error::PoolClosed)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in &mut self.workers {
            if let Some(thread) = worker.handle.take() {
                if thread.join().is_err() {
                    error!("Worker {} panicked", worker.id);
                }
            }
        }
    }
}

/// Type of jobs to be executed by the pool.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker struct, holding a thread handle.
struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Spawn a worker executing jobs from the given receiver until this one is closed.
    ///
    /// A panicking job is logged and doesn't take the worker down.
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) -> Result<Worker> {
        let handle = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || loop {
                let message = match receiver.lock() {
                    Ok(receiver) => receiver.recv(),
                    Err(_) => break,
                };
                match message {
                    Ok(job) => {
                        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
                            error!("Job panicked on worker {}", id);
                        }
                    }
                    Err(_) => break,
                }
            })?;
        Ok(Worker {
            id,
            handle: Some(handle),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_threadpool_runs_all_jobs() {
        let results = Arc::new(Mutex::new(Vec::<u64>::new()));
        {
            let pool = ThreadPool::new(4).unwrap();
            for i in 0..10 {
                let vec_handle = Arc::clone(&results);
                pool.execute(move || {
                    thread::sleep(Duration::from_millis(10 - i));
                    vec_handle.lock().unwrap().push(i);
                })
                .unwrap();
            }
            // Dropping the pool waits for the queued jobs
        }

        let mut results = results.lock().unwrap().clone();
        results.sort();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_threadpool_survives_panicking_job() {
        let pool = ThreadPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.execute(|| panic!("boom")).unwrap();
        pool.execute(move || tx.send(42).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_empty_threadpool_is_rejected() {
        assert!(ThreadPool::new(0).is_err());
    }
}
