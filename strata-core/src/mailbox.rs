//! Hand-off from background threads to the coordination thread.
//!
//! The tree is only ever touched on the thread that owns the [`Mailbox`].
//! Device watchers and timers post messages through a [`MailboxSender`];
//! the owner drains them on its next pump. Messages from one sender arrive
//! in the order they were posted.

use std::thread::{self, ThreadId};

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    /// The set of connected MIDI devices changed.
    DevicesChanged {
        midi_inputs: Vec<String>,
        midi_outputs: Vec<String>,
    },
    /// Close the current undo transaction and name the next one.
    BeginTransaction(String),
}

#[derive(Clone)]
pub struct MailboxSender {
    tx: Sender<Posted>,
    owner: ThreadId,
}

impl MailboxSender {
    /// Returns false once the mailbox is gone.
    pub fn post(&self, message: Posted) -> bool {
        if thread::current().id() == self.owner {
            log::trace!(target: "mailbox", "posting from the coordination thread: {:?}", message);
        }
        self.tx.send(message).is_ok()
    }
}

pub struct Mailbox {
    tx: Sender<Posted>,
    rx: Receiver<Posted>,
    owner: ThreadId,
}

impl Mailbox {
    /// Bind a mailbox to the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            owner: thread::current().id(),
        }
    }

    pub fn sender(&self) -> MailboxSender {
        MailboxSender {
            tx: self.tx.clone(),
            owner: self.owner,
        }
    }

    pub fn is_coordination_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Everything posted so far.
    pub fn drain(&self) -> Vec<Posted> {
        if !self.is_coordination_thread() {
            log::error!(target: "mailbox", "drain called off the coordination thread");
            return Vec::new();
        }
        self.rx.try_iter().collect()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_sender_order_is_kept() {
        let mailbox = Mailbox::new();
        let sender = mailbox.sender();
        let handle = thread::spawn(move || {
            for i in 0..5 {
                assert!(sender.post(Posted::BeginTransaction(format!("t{}", i))));
            }
        });
        handle.join().unwrap();

        let names: Vec<String> = mailbox
            .drain()
            .into_iter()
            .map(|m| match m {
                Posted::BeginTransaction(name) => name,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["t0", "t1", "t2", "t3", "t4"]);
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn only_owner_thread_drains() {
        let mailbox = std::sync::Arc::new(Mailbox::new());
        mailbox.sender().post(Posted::BeginTransaction("x".into()));
        let remote = mailbox.clone();
        let drained = thread::spawn(move || remote.drain().len()).join().unwrap();
        assert_eq!(drained, 0);
        assert_eq!(mailbox.drain().len(), 1);
    }
}
