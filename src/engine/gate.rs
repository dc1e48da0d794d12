//! One-shot gates.
//!
//! A gate is a channel that never carries a message: waiters block on
//! `recv` until every opener has been dropped. Opening is therefore tied to
//! ownership, and a thread that exits early (or panics) while holding the
//! opener still releases its waiters.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Create a closed gate and the handle that opens it.
pub fn gate() -> (GateOpener, Gate) {
    let (tx, rx) = bounded(0);
    (GateOpener { _tx: tx }, Gate { rx })
}

/// Opens its [`Gate`] when consumed or dropped.
#[derive(Debug)]
pub struct GateOpener {
    _tx: Sender<()>,
}

impl GateOpener {
    pub fn open(self) {}
}

/// Waitable side of a one-shot gate.
#[derive(Debug, Clone)]
pub struct Gate {
    rx: Receiver<()>,
}

impl Gate {
    /// Block until the gate is open.
    pub fn wait(&self) {
        while self.rx.recv().is_ok() {}
    }

    /// Block until the gate opens or `timeout` elapses. Returns whether it opened.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => return false,
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_gate_opens_on_open() {
        let (opener, gate) = gate();
        assert!(!gate.is_open());
        opener.open();
        assert!(gate.is_open());
        gate.wait();
    }

    #[test]
    fn test_gate_opens_when_holder_thread_exits() {
        let (opener, gate) = gate();
        let handle = thread::spawn(move || {
            let _held = opener;
            thread::sleep(Duration::from_millis(20));
        });
        gate.wait();
        assert!(gate.is_open());
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_on_closed_gate() {
        let (_opener, gate) = gate();
        assert!(!gate.wait_timeout(Duration::from_millis(10)));
    }
}
