use std::{
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use crate::github::FetchError;

pub type JobOutcome<T> = Result<T, FetchError>;

/// Poll schedule for the dashboard query. It only fires while started, so
/// the owner arms it when the dashboard becomes visible and disarms it on
/// logout.
pub struct RefreshScheduler {
    interval: Duration,
    last_run: Option<Instant>,
    running: bool,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_run = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_run = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn should_trigger(&self) -> bool {
        if !self.running {
            return false;
        }
        match self.last_run {
            None => true,
            Some(instant) => instant.elapsed() >= self.interval,
        }
    }

    pub fn mark_triggered(&mut self) {
        self.last_run = Some(Instant::now());
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        if !self.running {
            return None;
        }
        Some(match self.last_run {
            None => Duration::ZERO,
            Some(instant) => self.interval.saturating_sub(instant.elapsed()),
        })
    }
}

/// Work running on a background thread; the UI polls it once per frame.
pub struct PendingJob<T> {
    receiver: Receiver<JobOutcome<T>>,
}

impl<T: Send + 'static> PendingJob<T> {
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> JobOutcome<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(work());
        });
        Self { receiver: rx }
    }

    pub fn try_take(&self) -> Option<JobOutcome<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FetchError::BackgroundWorkerGone)),
        }
    }
}
