use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use super::reconcile::Reconciler;
use super::types::{ProgressHandle, ScanCmd, ScanPhase, ScanProgress, ScanReport};

/// Invoked once with the cycle's success flag.
pub type ScanCallback = Box<dyn FnOnce(bool) + Send + 'static>;

#[derive(Default)]
struct ScanState {
    in_flight: bool,
    waiting: Vec<ScanCallback>,
    last_report: Option<ScanReport>,
}

type StateHandle = Arc<Mutex<ScanState>>;

/// Runs reconciliation cycles on a dedicated worker thread.
///
/// Overlapping [`scan`](Self::scan) calls collapse into the cycle already in
/// flight; every caller is notified when that cycle finishes. Callbacks run on
/// the worker thread.
pub struct LibraryScanner {
    tx: Sender<ScanCmd>,
    state: StateHandle,
    progress: ProgressHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl LibraryScanner {
    pub fn new(reconciler: Reconciler) -> Self {
        let (tx, rx) = mpsc::channel::<ScanCmd>();
        let state: StateHandle = Arc::new(Mutex::new(ScanState::default()));
        let progress: ProgressHandle = Arc::new(Mutex::new(ScanProgress::default()));

        let handle = spawn_scan_thread(reconciler, rx, state.clone(), progress.clone());

        Self {
            tx,
            state,
            progress,
            join: Mutex::new(Some(handle)),
        }
    }

    /// Request a cycle. A call made while one is running only registers
    /// `on_complete` with it.
    pub fn scan(&self, progress: bool, on_complete: impl FnOnce(bool) + Send + 'static) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.waiting.push(Box::new(on_complete));
        if state.in_flight {
            debug!("Scan already running, queued callback");
            return;
        }
        state.in_flight = true;
        drop(state);

        if self.tx.send(ScanCmd::Scan { progress }).is_err() {
            error!("Scan worker is gone");
            let waiting = {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                state.in_flight = false;
                std::mem::take(&mut state.waiting)
            };
            for cb in waiting {
                cb(false);
            }
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
    }

    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Report of the most recent successful cycle.
    pub fn last_report(&self) -> Option<ScanReport> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_report
            .clone()
    }

    /// Stop the worker after the cycle in flight (if any) and wait for it.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ScanCmd::Quit);

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

fn spawn_scan_thread(
    mut reconciler: Reconciler,
    rx: Receiver<ScanCmd>,
    state: StateHandle,
    progress: ProgressHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                ScanCmd::Scan { progress: publish } => {
                    if publish {
                        *progress.lock().unwrap_or_else(PoisonError::into_inner) =
                            ScanProgress::default();
                    }
                    let cycle = panic::catch_unwind(AssertUnwindSafe(|| {
                        reconciler.run_cycle(publish.then_some(&progress))
                    }));
                    let report = match cycle {
                        Ok(Ok(report)) => Some(report),
                        Ok(Err(e)) => {
                            error!("Scan failed: {e}");
                            None
                        }
                        Err(payload) => {
                            error!("Scan cycle panicked: {}", panic_message(&*payload));
                            None
                        }
                    };
                    if report.is_none() && publish {
                        progress.lock().unwrap_or_else(PoisonError::into_inner).phase =
                            ScanPhase::Idle;
                    }

                    let ok = report.is_some();
                    let waiting = {
                        let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
                        s.in_flight = false;
                        if let Some(report) = report {
                            s.last_report = Some(report);
                        }
                        std::mem::take(&mut s.waiting)
                    };
                    for cb in waiting {
                        cb(ok);
                    }
                }
                ScanCmd::Quit => break,
            }
        }
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
