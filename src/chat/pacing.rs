//! Staged follow-up messages.
//!
//! Some steps answer with several bot messages spaced out in time. They are
//! queued in issue order and drained one at a time; each waits for the
//! previous one before its own delay starts.

use std::collections::VecDeque;
use std::time::Duration;

use super::transcript::{Message, Transcript};

/// One pending render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    /// Wait before appending, measured from the previous render.
    pub delay: Duration,
    pub message: Message,
}

impl Staged {
    pub fn now(message: Message) -> Self {
        Self {
            delay: Duration::ZERO,
            message,
        }
    }

    pub fn after(delay: Duration, message: Message) -> Self {
        Self { delay, message }
    }
}

/// Ordered queue of pending renders.
#[derive(Debug, Default)]
pub struct RenderQueue {
    pending: VecDeque<Staged>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, staged: Staged) {
        self.pending.push_back(staged);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append every queued message to `transcript`, in order.
    ///
    /// With `paced == false` delays are skipped but the order is unchanged.
    pub async fn drain(&mut self, transcript: &mut Transcript, paced: bool) {
        while let Some(staged) = self.pending.pop_front() {
            if paced && !staged.delay.is_zero() {
                tokio::time::sleep(staged.delay).await;
            }
            transcript.append(staged.message);
        }
    }
}

impl FromIterator<Staged> for RenderQueue {
    fn from_iter<I: IntoIterator<Item = Staged>>(iter: I) -> Self {
        Self {
            pending: iter.into_iter().collect(),
        }
    }
}
