//! Per-frame accumulation of detached descendants.
//!
//! Every open decomposition frame owns one accumulator, keyed by the
//! [`LineageToken`] handed out when the frame opened. Each detached child is
//! folded into every open accumulator at once, so a frame's closure covers
//! descendants at any distance, not only its direct children.

use bos_types::{Closure, ObjectId};

use crate::error::{SerializeError, SerializeResult};

/// Marker for one open decomposition frame. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineageToken(u64);

#[derive(Debug)]
struct Frame {
    token: LineageToken,
    opened_at: usize,
    entries: Closure,
}

/// Stack of open frames and their closure accumulators.
#[derive(Debug, Default)]
pub struct ClosureTracker {
    frames: Vec<Frame>,
    next_token: u64,
}

impl ClosureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame. `opened_at` is the detach-stack length before the frame
    /// pushed its own flag; depths are rebased against it on close.
    pub fn open(&mut self, opened_at: usize) -> LineageToken {
        let token = LineageToken(self.next_token);
        self.next_token += 1;
        self.frames.push(Frame {
            token,
            opened_at,
            entries: Closure::new(),
        });
        token
    }

    /// Record a detached id at an absolute depth in every open frame,
    /// keeping the smaller depth on conflict.
    pub fn record(&mut self, id: &ObjectId, depth: usize) {
        for frame in &mut self.frames {
            frame.entries.insert_min(id.clone(), depth);
        }
    }

    /// Close the innermost frame and return its closure with depths made
    /// relative to the frame.
    pub fn close(&mut self, token: LineageToken) -> SerializeResult<Closure> {
        match self.frames.last() {
            Some(frame) if frame.token == token => {}
            _ => return Err(SerializeError::LineageMismatch),
        }
        let Some(frame) = self.frames.pop() else {
            return Err(SerializeError::LineageMismatch);
        };
        let opened_at = frame.opened_at;
        Ok(frame
            .entries
            .iter()
            .map(|(id, depth)| (id.clone(), depth.saturating_sub(opened_at)))
            .collect())
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_digest(&[byte; 16])
    }

    #[test]
    fn record_reaches_every_open_frame() {
        let mut tracker = ClosureTracker::new();
        let root = tracker.open(0);
        let child = tracker.open(1);
        tracker.record(&oid(1), 2);

        let child_closure = tracker.close(child).unwrap();
        assert_eq!(child_closure.get(&oid(1)), Some(1));

        tracker.record(&oid(2), 1);
        let root_closure = tracker.close(root).unwrap();
        assert_eq!(root_closure.get(&oid(1)), Some(2));
        assert_eq!(root_closure.get(&oid(2)), Some(1));
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn smaller_depth_wins() {
        let mut tracker = ClosureTracker::new();
        let root = tracker.open(0);
        tracker.record(&oid(7), 3);
        tracker.record(&oid(7), 1);
        tracker.record(&oid(7), 2);
        assert_eq!(tracker.close(root).unwrap().get(&oid(7)), Some(1));
    }

    #[test]
    fn closed_frames_stop_accumulating() {
        let mut tracker = ClosureTracker::new();
        let root = tracker.open(0);
        let first = tracker.open(1);
        assert!(tracker.close(first).unwrap().is_empty());
        tracker.record(&oid(3), 1);
        assert_eq!(tracker.close(root).unwrap().len(), 1);
    }

    #[test]
    fn out_of_order_close_is_an_error() {
        let mut tracker = ClosureTracker::new();
        let root = tracker.open(0);
        let _child = tracker.open(1);
        assert!(matches!(
            tracker.close(root),
            Err(SerializeError::LineageMismatch)
        ));
    }

    #[test]
    fn tokens_are_unique() {
        let mut tracker = ClosureTracker::new();
        let a = tracker.open(0);
        tracker.close(a).unwrap();
        let b = tracker.open(0);
        assert_ne!(a, b);
    }
}
