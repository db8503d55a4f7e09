//! Bounded producer/consumer queue (§4.2) with drop-oldest overflow and an
//! explicit close signal, the same shape as a `threading.Condition`-guarded
//! Python deque: one mutex, two wait conditions (`not_empty`, `not_full`).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// A bounded MPMC ring buffer. `put` drops the oldest element when full and
/// called non-blocking; `get` blocks (optionally with a timeout) until an
/// item is available or the buffer is closed and drained.
pub struct RingBuffer<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            capacity,
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Insert `item`. If `blocking` is true, waits (up to `timeout`, if
    /// given) for room; otherwise drops the oldest queued item to make room,
    /// matching the Python ring buffer's overflow policy. Returns `false` if
    /// the buffer is closed (item is not inserted).
    pub fn put(&self, item: T, blocking: bool, timeout: Option<Duration>) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return false;
        }

        if state.queue.len() >= self.capacity {
            if blocking {
                let deadline = timeout.map(|t| Instant::now() + t);
                while state.queue.len() >= self.capacity && !state.closed {
                    let wait_for = match deadline {
                        Some(d) => {
                            let now = Instant::now();
                            if now >= d {
                                break;
                            }
                            d - now
                        }
                        None => Duration::from_secs(3600),
                    };
                    let (guard, result) =
                        self.not_full.wait_timeout(state, wait_for).unwrap();
                    state = guard;
                    if result.timed_out() && deadline.is_some() {
                        break;
                    }
                }
                if state.closed {
                    return false;
                }
                if state.queue.len() >= self.capacity {
                    // Timed out still full: drop oldest rather than block forever.
                    state.queue.pop_front();
                }
            } else {
                state.queue.pop_front();
            }
        }

        state.queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Remove and return the oldest item, blocking (optionally with a
    /// timeout) until one is available or the buffer closes empty.
    pub fn get(&self, blocking: bool, timeout: Option<Duration>) -> Option<T> {
        let mut state = self.state.lock().unwrap();

        if blocking {
            let deadline = timeout.map(|t| Instant::now() + t);
            while state.queue.is_empty() && !state.closed {
                let wait_for = match deadline {
                    Some(d) => {
                        let now = Instant::now();
                        if now >= d {
                            break;
                        }
                        d - now
                    }
                    None => Duration::from_secs(3600),
                };
                let (guard, result) = self.not_empty.wait_timeout(state, wait_for).unwrap();
                state = guard;
                if result.timed_out() && deadline.is_some() {
                    break;
                }
            }
        }

        let item = state.queue.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Signal shutdown: blocked `put`/`get` callers wake and return
    /// immediately (`get` still drains any items already queued).
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn qsize(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qsize() == 0
    }

    pub fn is_full(&self) -> bool {
        self.qsize() >= self.capacity
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.queue.clear();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drop_oldest_on_non_blocking_overflow() {
        // N+1 non-blocking puts into capacity-N buffer keep only the last N.
        let rb: RingBuffer<i32> = RingBuffer::new(3);
        for i in 0..4 {
            rb.put(i, false, None);
        }
        assert_eq!(rb.qsize(), 3);
        assert_eq!(rb.get(false, None), Some(1));
        assert_eq!(rb.get(false, None), Some(2));
        assert_eq!(rb.get(false, None), Some(3));
        assert_eq!(rb.get(false, None), None);
    }

    #[test]
    fn close_wakes_blocked_get_with_none() {
        let rb: Arc<RingBuffer<i32>> = Arc::new(RingBuffer::new(2));
        let rb2 = rb.clone();
        let handle = thread::spawn(move || rb2.get(true, None));
        thread::sleep(Duration::from_millis(50));
        rb.close();
        let result = handle.join().unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn close_then_put_rejected() {
        let rb: RingBuffer<i32> = RingBuffer::new(2);
        rb.close();
        assert!(!rb.put(1, false, None));
    }

    #[test]
    fn get_drains_queued_items_after_close() {
        let rb: RingBuffer<i32> = RingBuffer::new(2);
        rb.put(1, false, None);
        rb.close();
        assert_eq!(rb.get(true, None), Some(1));
        assert_eq!(rb.get(true, None), None);
    }
}
