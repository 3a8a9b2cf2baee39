//! Bounded input queue
//!
//! Admission side of the pipeline: a FIFO of at most `capacity` frames,
//! written by the single caller thread and drained by every worker. The lock
//! covers pointer movement and ticket assignment only; waiting for space
//! happens outside of it, in the caller's polling loop.

use crate::pipeline::types::VideoFrame;
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) struct InputQueue {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    frames: VecDeque<VideoFrame>,
    /// Next sequence ticket to assign; monotonic, never reused
    next_ticket: u64,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity),
                next_ticket: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit one frame, assigning it the next sequence ticket.
    ///
    /// Returns the frame unchanged when the queue is at capacity; the caller
    /// waits and retries. A ticket is only ever assigned on success, so
    /// ticket order equals admission order.
    pub fn try_push(&self, mut frame: VideoFrame) -> Result<u64, VideoFrame> {
        let mut inner = self.inner.lock().unwrap();
        if inner.frames.len() >= self.capacity {
            return Err(frame);
        }
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        frame.ticket = ticket;
        inner.frames.push_back(frame);
        Ok(ticket)
    }

    /// Remove and return the oldest frame. Empty is not an error.
    pub fn try_pop(&self) -> Option<VideoFrame> {
        self.inner.lock().unwrap().frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().frames.len()
    }

    /// Drop every queued frame, returning how many were released.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let released = inner.frames.len();
        inner.frames.clear();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{FrameGeometry, PixelFormat, Timestamp};
    use bytes::Bytes;

    fn frame(tag: u8) -> VideoFrame {
        VideoFrame::new(
            Bytes::copy_from_slice(&[tag]),
            FrameGeometry::new(64, 64, PixelFormat::Rgba),
            Timestamp::from_micros(tag as i64),
        )
    }

    #[test]
    fn assigns_tickets_in_admission_order() {
        let queue = InputQueue::new(8);
        assert_eq!(queue.try_push(frame(0)).unwrap(), 0);
        assert_eq!(queue.try_push(frame(1)).unwrap(), 1);
        assert_eq!(queue.try_push(frame(2)).unwrap(), 2);

        let first = queue.try_pop().unwrap();
        assert_eq!(first.ticket, 0);
        assert_eq!(first.data.as_ref(), &[0]);
        assert_eq!(queue.try_pop().unwrap().ticket, 1);
    }

    #[test]
    fn full_queue_returns_frame_without_ticket() {
        let queue = InputQueue::new(2);
        queue.try_push(frame(0)).unwrap();
        queue.try_push(frame(1)).unwrap();

        let rejected = queue.try_push(frame(2)).unwrap_err();
        assert_eq!(rejected.ticket, u64::MAX);

        // Space freed: the next admission gets the next ticket, not a reused one
        queue.try_pop().unwrap();
        assert_eq!(queue.try_push(rejected).unwrap(), 2);
    }

    #[test]
    fn empty_pop_is_none() {
        let queue = InputQueue::new(2);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn drain_counts_released_frames() {
        let queue = InputQueue::new(4);
        queue.try_push(frame(0)).unwrap();
        queue.try_push(frame(1)).unwrap();
        assert_eq!(queue.drain(), 2);
        assert_eq!(queue.len(), 0);
        assert!(queue.try_pop().is_none());
    }
}
