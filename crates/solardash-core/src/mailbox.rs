//! Single-slot mailboxes
//!
//! Background workers publish into a mailbox that holds only the most recent
//! value; publishing overwrites whatever was there and never blocks. The
//! scheduler reads without blocking and only ever sees the latest value.

use tokio::sync::watch;

/// Create a connected publisher/reader pair with an empty slot
pub fn mailbox<T>() -> (Publisher<T>, Latest<T>) {
    let (tx, rx) = watch::channel(None);
    (Publisher { tx }, Latest { rx })
}

/// Writing half of a mailbox
#[derive(Debug)]
pub struct Publisher<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Publisher<T> {
    /// Replace the slot contents
    ///
    /// Succeeds even when no reader is left.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Whether every reader has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading half of a mailbox
#[derive(Debug, Clone)]
pub struct Latest<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Latest<T> {
    /// The latest value, if one was published since the last `take_fresh`
    pub fn take_fresh(&mut self) -> Option<T> {
        let slot = self.rx.borrow_and_update();
        if slot.has_changed() {
            slot.clone()
        } else {
            None
        }
    }

    /// The latest value without marking it as seen
    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}
