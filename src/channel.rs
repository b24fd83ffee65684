//! Message passing between the network side and the frame loop.
//!
//! Network tasks hold a [`ChannelSender`] and may run on any thread; the
//! frame loop owns the [`MessageChannel`] and drains it once per frame.
//! Every message carries the origin it came from, and only allowed origins
//! get through.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChannelError {
    #[error("messages from {0} are not accepted")]
    UnknownOrigin(String),
    #[error("channel is closed")]
    Closed,
}

/// Message along with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub origin: String,
    pub message: T,
}

#[derive(Debug)]
struct Shared<T> {
    queue: Mutex<VecDeque<Envelope<T>>>,
    allowed: RwLock<HashSet<String>>,
    closed: AtomicBool,
}

/// Receiving end, owned by the frame loop.
#[derive(Debug)]
pub struct MessageChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> MessageChannel<T> {
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                allowed: RwLock::new(allowed_origins.into_iter().map(Into::into).collect()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn sender(&self) -> ChannelSender<T> {
        ChannelSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn allow(&self, origin: impl Into<String>) {
        self.shared.allowed.write().insert(origin.into());
    }

    pub fn revoke(&self, origin: &str) -> bool {
        self.shared.allowed.write().remove(origin)
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every pending message, oldest first.
    pub fn drain(&self) -> Vec<Envelope<T>> {
        self.shared.queue.lock().drain(..).collect()
    }
}

impl<T> Drop for MessageChannel<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

/// Sending end; cheap to clone and usable from any thread.
#[derive(Debug)]
pub struct ChannelSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> ChannelSender<T> {
    pub fn send(&self, origin: &str, message: T) -> Result<(), ChannelError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        if !self.shared.allowed.read().contains(origin) {
            return Err(ChannelError::UnknownOrigin(origin.to_string()));
        }
        self.shared.queue.lock().push_back(Envelope {
            origin: origin.to_string(),
            message,
        });
        Ok(())
    }
}

impl<T: DeserializeOwned> ChannelSender<T> {
    /// Decodes a JSON message received from the wire and queues it.
    pub fn send_json(&self, origin: &str, json: &str) -> Result<()> {
        let message = serde_json::from_str(json)
            .with_context(|| format!("malformed message from {origin}"))?;
        self.send(origin, message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn unknown_origins_are_rejected() {
        let channel = MessageChannel::new(["lobby"]);
        let sender = channel.sender();
        assert_eq!(
            sender.send("evil.example", 1),
            Err(ChannelError::UnknownOrigin("evil.example".into()))
        );
        sender.send("lobby", 2).unwrap();
        let received = channel.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message, 2);
        assert_eq!(received[0].origin, "lobby");
    }

    #[test]
    fn drain_keeps_arrival_order() {
        let channel = MessageChannel::new(["a"]);
        let sender = channel.sender();
        for value in 0..5 {
            sender.send("a", value).unwrap();
        }
        let values: Vec<i32> = channel.drain().into_iter().map(|e| e.message).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert!(channel.is_empty());
    }

    #[test]
    fn origins_can_be_granted_and_revoked() {
        let channel = MessageChannel::new(Vec::<String>::new());
        let sender = channel.sender();
        assert!(sender.send("peer", ()).is_err());
        channel.allow("peer");
        assert!(sender.send("peer", ()).is_ok());
        assert!(channel.revoke("peer"));
        assert!(sender.send("peer", ()).is_err());
    }

    #[test]
    fn senders_work_across_threads() {
        let channel = MessageChannel::new(["net"]);
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let sender = channel.sender();
                thread::spawn(move || {
                    for value in 0..10 {
                        sender.send("net", worker * 10 + value).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(channel.len(), 40);
    }

    #[test]
    fn dropped_channel_closes_senders() {
        let channel = MessageChannel::new(["a"]);
        let sender = channel.sender();
        drop(channel);
        assert_eq!(sender.send("a", 1), Err(ChannelError::Closed));
    }

    #[test]
    fn json_messages_are_decoded() {
        let channel = MessageChannel::<Vec<u8>>::new(["a"]);
        let sender = channel.sender();
        sender.send_json("a", "[1, 2]").unwrap();
        assert!(sender.send_json("a", "not json").is_err());
        assert_eq!(channel.drain()[0].message, vec![1, 2]);
    }
}
