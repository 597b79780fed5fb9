//! Latency-tagged input queue between the session readers and the simulator

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::physics::Direction;
use super::InputEvent;

/// FIFO of input events ordered by arrival.
///
/// Every event is tagged with `ready_at = arrival + simulated_latency`. With a
/// constant latency, arrival order and readiness order coincide, so draining
/// only ever needs to look at the head.
pub struct InputQueue {
    queue: Mutex<VecDeque<InputEvent>>,
    /// Artificial delay added to every admission (seconds)
    simulated_latency: f64,
}

impl InputQueue {
    pub fn new(simulated_latency: f64) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            simulated_latency: simulated_latency.max(0.0),
        }
    }

    /// Append an input that arrived at `now`; returns its admission timestamp
    pub fn admit(&self, slot: usize, seq: i32, direction: Direction, now: f64) -> f64 {
        let ready_at = now + self.simulated_latency;
        self.queue.lock().push_back(InputEvent {
            slot,
            seq,
            direction,
            ready_at,
        });
        ready_at
    }

    /// Remove and return, in arrival order, every head event with `ready_at <= now`.
    ///
    /// Stops at the first event that is not ready yet. Never waits.
    pub fn drain_ready(&self, now: f64) -> Vec<InputEvent> {
        let mut queue = self.queue.lock();
        let ready = queue.iter().take_while(|ev| ev.ready_at <= now).count();
        queue.drain(..ready).collect()
    }

    /// Get queue length
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Check if queue is empty
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    #[cfg(test)]
    pub fn simulated_latency(&self) -> f64 {
        self.simulated_latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn right() -> Direction {
        Direction { dx: 1, dy: 0 }
    }

    #[test]
    fn nothing_released_before_ready() {
        let queue = InputQueue::new(0.2);
        let ready_at = queue.admit(0, 1, right(), 10.0);
        assert!((ready_at - 10.2).abs() < 1e-9);

        assert!(queue.drain_ready(10.0).is_empty());
        assert!(queue.drain_ready(10.199).is_empty());
        assert_eq!(queue.len(), 1);

        let released = queue.drain_ready(10.2);
        assert_eq!(released.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn releases_in_arrival_order_not_sequence_order() {
        let queue = InputQueue::new(0.1);
        queue.admit(0, 9, right(), 1.00);
        queue.admit(1, 3, Direction::NONE, 1.01);
        queue.admit(0, 2, Direction { dx: 0, dy: -1 }, 1.02);

        let released = queue.drain_ready(5.0);
        let seqs: Vec<i32> = released.iter().map(|ev| ev.seq).collect();
        assert_eq!(seqs, vec![9, 3, 2]);
    }

    #[test]
    fn drain_stops_at_first_unready_head() {
        let queue = InputQueue::new(0.2);
        queue.admit(0, 1, right(), 0.0);
        queue.admit(0, 2, right(), 0.5);

        let first = queue.drain_ready(0.3);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].seq, 1);
        assert_eq!(queue.len(), 1);

        assert!(queue.drain_ready(0.6).is_empty());
        assert_eq!(queue.drain_ready(0.7)[0].seq, 2);
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        let queue = Arc::new(InputQueue::new(0.0));
        let handles: Vec<_> = (0..2)
            .map(|slot| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for seq in 0..100 {
                        queue.admit(slot, seq, Direction::NONE, 0.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let released = queue.drain_ready(0.0);
        assert_eq!(released.len(), 200);
        for slot in 0..2 {
            let seqs: Vec<i32> = released
                .iter()
                .filter(|ev| ev.slot == slot)
                .map(|ev| ev.seq)
                .collect();
            assert_eq!(seqs, (0..100).collect::<Vec<_>>());
        }
    }
}
