//! Output reorder buffer
//!
//! Fixed array of `capacity` slots keyed by `ticket % capacity`, read by a
//! single cursor that only ever advances one slot at a time. Workers finish
//! in any order; admission order is recovered purely from slot keying.
//!
//! Tickets are monotonic, so the ticket value itself doubles as a generation
//! tag: a store is admitted only while its ticket lies inside the read window
//! `[next, next + capacity)`. Two live frames can therefore never collide on
//! one slot index, no matter how skewed per-frame latency gets.
//!
//! A ticket whose frame was released before reaching its slot (stage consumed
//! it, stage unavailable, fatal stage error) is retired with a skip marker;
//! otherwise the cursor would wait on it forever.

use crate::pipeline::types::VideoFrame;
use std::sync::Mutex;

enum Slot {
    Frame(VideoFrame),
    /// The ticket was retired without an output frame
    Skipped,
}

pub(crate) struct ReorderBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    slots: Vec<Option<Slot>>,
    /// Ticket the read cursor is waiting for; the cursor slot is
    /// `next % capacity`
    next: u64,
}

impl Inner {
    fn in_window(&self, ticket: u64, capacity: usize) -> bool {
        ticket < self.next + capacity as u64
    }
}

impl ReorderBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            inner: Mutex::new(Inner { slots, next: 0 }),
            capacity,
        }
    }

    /// Park a finished frame in its slot.
    ///
    /// Returns the frame unchanged while its slot is occupied or while its
    /// ticket is ahead of the read window; the worker waits and retries.
    pub fn try_store(&self, frame: VideoFrame) -> Result<(), VideoFrame> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.in_window(frame.ticket, self.capacity) {
            return Err(frame);
        }
        let index = (frame.ticket % self.capacity as u64) as usize;
        if inner.slots[index].is_some() {
            return Err(frame);
        }
        inner.slots[index] = Some(Slot::Frame(frame));
        Ok(())
    }

    /// Retire a ticket that will never produce a frame.
    ///
    /// Returns `false` while the ticket is ahead of the read window; the
    /// worker waits and retries exactly as for a store.
    pub fn try_skip(&self, ticket: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.in_window(ticket, self.capacity) {
            return false;
        }
        let index = (ticket % self.capacity as u64) as usize;
        if inner.slots[index].is_none() {
            inner.slots[index] = Some(Slot::Skipped);
        }
        true
    }

    /// Take the next in-order frame, or `None` when it has not arrived yet.
    ///
    /// Skip markers are consumed silently: the cursor steps over retired
    /// tickets until it finds a frame or an empty slot.
    pub fn try_pop(&self) -> Option<VideoFrame> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let index = (inner.next % self.capacity as u64) as usize;
            match inner.slots[index].take()? {
                Slot::Frame(frame) => {
                    inner.next += 1;
                    return Some(frame);
                }
                Slot::Skipped => {
                    inner.next += 1;
                }
            }
        }
    }

    /// Drop every parked frame and reset the cursor, returning how many
    /// frames were released.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let released = inner
            .slots
            .iter()
            .filter(|s| matches!(s, Some(Slot::Frame(_))))
            .count();
        for slot in inner.slots.iter_mut() {
            *slot = None;
        }
        inner.next = 0;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{FrameGeometry, PixelFormat, Timestamp};
    use bytes::Bytes;

    fn ticketed(ticket: u64) -> VideoFrame {
        let mut frame = VideoFrame::new(
            Bytes::copy_from_slice(&[ticket as u8]),
            FrameGeometry::new(64, 64, PixelFormat::Rgba),
            Timestamp::from_micros(ticket as i64),
        );
        frame.ticket = ticket;
        frame
    }

    #[test]
    fn out_of_order_stores_pop_in_ticket_order() {
        let buffer = ReorderBuffer::new(4);
        buffer.try_store(ticketed(2)).unwrap();
        buffer.try_store(ticketed(0)).unwrap();
        buffer.try_store(ticketed(1)).unwrap();

        assert_eq!(buffer.try_pop().unwrap().ticket, 0);
        assert_eq!(buffer.try_pop().unwrap().ticket, 1);
        assert_eq!(buffer.try_pop().unwrap().ticket, 2);
        assert!(buffer.try_pop().is_none());
    }

    #[test]
    fn cursor_waits_for_the_missing_ticket() {
        let buffer = ReorderBuffer::new(4);
        buffer.try_store(ticketed(1)).unwrap();
        buffer.try_store(ticketed(2)).unwrap();

        // Ticket 0 has not arrived: nothing is observable yet
        assert!(buffer.try_pop().is_none());

        buffer.try_store(ticketed(0)).unwrap();
        assert_eq!(buffer.try_pop().unwrap().ticket, 0);
        assert_eq!(buffer.try_pop().unwrap().ticket, 1);
    }

    #[test]
    fn store_ahead_of_window_is_refused() {
        let buffer = ReorderBuffer::new(4);
        // Ticket 4 maps to slot 0, but the window is [0, 4)
        let bounced = buffer.try_store(ticketed(4)).unwrap_err();
        assert_eq!(bounced.ticket, 4);

        buffer.try_store(ticketed(0)).unwrap();
        assert_eq!(buffer.try_pop().unwrap().ticket, 0);

        // Window advanced to [1, 5): ticket 4 now fits in the freed slot
        buffer.try_store(bounced).unwrap();
    }

    #[test]
    fn occupied_slot_is_refused() {
        let buffer = ReorderBuffer::new(4);
        buffer.try_store(ticketed(1)).unwrap();
        // Same ticket again: slot 1 already holds a frame
        assert!(buffer.try_store(ticketed(1)).is_err());
    }

    #[test]
    fn skipped_tickets_are_stepped_over() {
        let buffer = ReorderBuffer::new(4);
        buffer.try_store(ticketed(2)).unwrap();
        assert!(buffer.try_skip(0));
        assert!(buffer.try_skip(1));

        let frame = buffer.try_pop().unwrap();
        assert_eq!(frame.ticket, 2);
        assert!(buffer.try_pop().is_none());

        // Window advanced past the skips: ticket 3 then 4 fit
        buffer.try_store(ticketed(3)).unwrap();
        buffer.try_store(ticketed(4)).unwrap();
        assert_eq!(buffer.try_pop().unwrap().ticket, 3);
        assert_eq!(buffer.try_pop().unwrap().ticket, 4);
    }

    #[test]
    fn skip_ahead_of_window_is_refused() {
        let buffer = ReorderBuffer::new(2);
        assert!(!buffer.try_skip(2));
        assert!(buffer.try_skip(0));
        assert!(buffer.try_skip(1));
        assert!(buffer.try_pop().is_none());
        // Cursor moved past both skips
        assert!(buffer.try_skip(2));
    }

    #[test]
    fn wraparound_keeps_order_across_generations() {
        let buffer = ReorderBuffer::new(2);
        for round in 0..3u64 {
            let a = round * 2;
            buffer.try_store(ticketed(a + 1)).unwrap();
            buffer.try_store(ticketed(a)).unwrap();
            assert_eq!(buffer.try_pop().unwrap().ticket, a);
            assert_eq!(buffer.try_pop().unwrap().ticket, a + 1);
        }
    }

    #[test]
    fn drain_resets_cursor_and_counts_frames_only() {
        let buffer = ReorderBuffer::new(4);
        buffer.try_store(ticketed(0)).unwrap();
        buffer.try_skip(1);
        buffer.try_store(ticketed(2)).unwrap();
        assert_eq!(buffer.drain(), 2);
        assert!(buffer.try_pop().is_none());

        // Cursor back at ticket 0
        buffer.try_store(ticketed(0)).unwrap();
        assert_eq!(buffer.try_pop().unwrap().ticket, 0);
    }
}
