//! Banner-style sink showing one line per active condition.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use sensorwatch_types::Event;

use super::Notifier;
use crate::error::NotifyError;

/// Where a [`BannerNotifier`] draws its messages.
///
/// `render` receives the complete set of active messages each time, so an
/// implementation only needs to replace what it showed before.
pub trait BannerTarget: Send {
    fn render(&mut self, messages: &[String]) -> io::Result<()>;
}

/// Keeps the latest message per condition and renders the active set.
///
/// Conditions are keyed by [`Event::dedup_key`]. A resolution event (type
/// ending in `_RESOLVED` or `_RESUMED`) removes its condition; any other event
/// inserts or replaces it. Messages keep the order their conditions were
/// first raised in.
#[derive(Debug)]
pub struct BannerNotifier<T> {
    target: T,
    active: Vec<(String, String)>,
}

impl<T: BannerTarget> BannerNotifier<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            active: Vec::new(),
        }
    }

    /// Currently displayed messages.
    pub fn active(&self) -> Vec<&str> {
        self.active.iter().map(|(_, msg)| msg.as_str()).collect()
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn apply(&mut self, event: &Event) {
        let key = event.dedup_key();
        let position = self.active.iter().position(|(k, _)| *k == key);

        if event.kind.is_resolution() {
            if let Some(i) = position {
                self.active.remove(i);
            }
            return;
        }

        match position {
            Some(i) => self.active[i].1 = event.message.clone(),
            None => self.active.push((key, event.message.clone())),
        }
    }
}

impl<T: BannerTarget> Notifier for BannerNotifier<T> {
    fn name(&self) -> &str {
        "banner"
    }

    fn handle(&mut self, event: &Event) -> Result<(), NotifyError> {
        self.apply(event);
        let messages: Vec<String> = self.active.iter().map(|(_, msg)| msg.clone()).collect();
        self.target.render(&messages)?;
        Ok(())
    }
}

/// An in-memory banner target.
///
/// Clones share the same state, so a test (or a UI thread) can keep one
/// clone and inspect what the notifier rendered.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    inner: Arc<Mutex<MemoryFrame>>,
}

#[derive(Debug, Default)]
struct MemoryFrame {
    messages: Vec<String>,
    renders: usize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages from the most recent render.
    pub fn current(&self) -> Vec<String> {
        self.inner.lock().messages.clone()
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.inner.lock().renders
    }
}

impl BannerTarget for MemoryTarget {
    fn render(&mut self, messages: &[String]) -> io::Result<()> {
        let mut frame = self.inner.lock();
        frame.messages = messages.to_vec();
        frame.renders += 1;
        Ok(())
    }
}
