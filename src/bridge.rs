//! Named-channel message bridge between the UI and the host
//!
//! Senders are cheap clonable handles that only queue messages. The host
//! owns the listener table and delivers queued messages once per frame, so
//! listeners always run on the UI thread.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub channel: String,
    pub payload: Value,
}

type Listener = Box<dyn FnMut(&Value)>;

/// Send side of the bridge
#[derive(Clone)]
pub struct BridgeHandle {
    tx: Sender<Message>,
}

impl BridgeHandle {
    /// Queue a message. Returns false once the bridge has been dropped.
    pub fn send(&self, channel: &str, payload: Value) -> bool {
        self.tx
            .send(Message {
                channel: channel.to_string(),
                payload,
            })
            .is_ok()
    }
}

pub struct Bridge {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle { tx: self.tx.clone() }
    }

    pub fn on(&mut self, channel: &str, listener: impl FnMut(&Value) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(channel.to_string())
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, channel: &str, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(channel) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(channel);
        }
        removed
    }

    /// Deliver everything queued so far. Returns the number of messages
    /// taken off the queue, delivered or not.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(message) = self.rx.try_recv() {
            count += 1;
            match self.listeners.get_mut(&message.channel) {
                Some(list) => {
                    for (_, listener) in list.iter_mut() {
                        listener(&message.payload);
                    }
                }
                None => log::debug!("No listener for bridge channel {}", message.channel),
            }
        }
        count
    }
}
