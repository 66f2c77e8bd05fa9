//! Daemon mode: background service that runs the capture pipeline on
//! demand.
//!
//! The global hotkey itself lives in the desktop environment; bind it to
//! `pkill -SIGUSR1 picshot` and the daemon runs one capture-and-upload
//! pass per signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;

/// One synchronous pipeline pass; the daemon owns no pipeline details.
pub type ShotRunner = dyn Fn() -> Result<()> + Send + Sync;

pub struct Daemon {
    should_quit: Arc<AtomicBool>,
    shot_requested: Arc<AtomicBool>,
    shot_runner: Arc<ShotRunner>,
}

impl Daemon {
    pub fn new(shot_runner: Arc<ShotRunner>) -> Self {
        Self {
            should_quit: Arc::new(AtomicBool::new(false)),
            shot_requested: Arc::new(AtomicBool::new(false)),
            shot_runner,
        }
    }

    /// Run until SIGTERM/SIGINT, firing one pipeline pass per SIGUSR1.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting picshot daemon");
        info!("Send SIGUSR1 to capture and upload (e.g., pkill -SIGUSR1 picshot)");
        info!("Bind it to a hotkey, e.g. Hyprland: bind = SUPER, P, exec, pkill -SIGUSR1 picshot");

        let mut signals = Signals::new([SIGUSR1, SIGTERM, SIGINT])
            .context("Failed to register signal handler")?;

        let shot_flag = self.shot_requested.clone();
        let quit_flag = self.should_quit.clone();

        // The signal thread runs until process termination; it holds no
        // resources needing explicit cleanup.
        thread::spawn(move || {
            for sig in signals.forever() {
                match sig {
                    SIGUSR1 => {
                        info!("Received SIGUSR1 - running capture pipeline");
                        shot_flag.store(true, Ordering::Release);
                    }
                    SIGTERM | SIGINT => {
                        info!("Received termination signal - shutting down");
                        quit_flag.store(true, Ordering::Release);
                    }
                    _ => warn!("Received unexpected signal: {sig}"),
                }
            }
        });

        info!("Daemon ready - waiting for trigger signal");

        loop {
            if self.should_quit.load(Ordering::Acquire) {
                info!("Quit signal received - exiting daemon");
                break;
            }
            self.run_pending();
            thread::sleep(Duration::from_millis(100));
        }

        Ok(())
    }

    /// Run the pipeline if a trigger arrived since the last check.
    /// Pipeline failures are logged; the daemon stays up for the next
    /// trigger.
    fn run_pending(&self) -> bool {
        if !self.shot_requested.swap(false, Ordering::Acquire) {
            return false;
        }
        if let Err(err) = (self.shot_runner)() {
            error!("Capture pipeline failed: {err:#}");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_runner(count: Arc<AtomicUsize>) -> Arc<ShotRunner> {
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn pending_trigger_runs_the_pipeline_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let daemon = Daemon::new(counting_runner(count.clone()));

        daemon.shot_requested.store(true, Ordering::Release);
        assert!(daemon.run_pending());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // The flag is consumed; nothing runs until the next signal.
        assert!(!daemon.run_pending());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pipeline_failure_does_not_stop_the_daemon() {
        let count = Arc::new(AtomicUsize::new(0));
        let failures = count.clone();
        let runner: Arc<ShotRunner> = Arc::new(move || {
            failures.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("upload endpoint unreachable"))
        });
        let daemon = Daemon::new(runner);

        daemon.shot_requested.store(true, Ordering::Release);
        assert!(daemon.run_pending());
        daemon.shot_requested.store(true, Ordering::Release);
        assert!(daemon.run_pending());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!daemon.should_quit.load(Ordering::Acquire));
    }
}
