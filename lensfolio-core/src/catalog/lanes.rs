//! Per-entity FIFO serialization of remote work
//!
//! Every job entering a lane receives the completion signal of the job before
//! it. A job waits for that signal, runs, and signals the next one by dropping
//! its ticket.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::ids::EntityId;

#[derive(Default)]
pub(crate) struct Lanes {
    tails: Mutex<HashMap<EntityId, Tail>>,
    next_seq: Mutex<u64>,
}

struct Tail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

pub(crate) struct LaneTicket {
    lane: EntityId,
    seq: u64,
    prev: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
}

impl Lanes {
    /// Join the back of `lane`. Must be called in submission order.
    pub(crate) fn enter(&self, lane: &EntityId) -> LaneTicket {
        let seq = {
            let mut next = self.next_seq.lock().unwrap();
            *next += 1;
            *next
        };
        let (tx, rx) = oneshot::channel();
        let prev = self
            .tails
            .lock()
            .unwrap()
            .insert(lane.clone(), Tail { seq, done: rx })
            .map(|tail| tail.done);
        LaneTicket {
            lane: lane.clone(),
            seq,
            prev,
            _done: tx,
        }
    }

    /// Release the lane; the next job starts once the ticket is dropped.
    pub(crate) fn leave(&self, ticket: LaneTicket) {
        let mut tails = self.tails.lock().unwrap();
        if tails.get(&ticket.lane).is_some_and(|t| t.seq == ticket.seq) {
            tails.remove(&ticket.lane);
        }
    }

    #[cfg(test)]
    pub(crate) fn busy(&self) -> usize {
        self.tails.lock().unwrap().len()
    }
}

impl LaneTicket {
    pub(crate) async fn wait_turn(&mut self) {
        if let Some(prev) = self.prev.take() {
            // An error only means the previous job is gone, which also frees the lane
            let _ = prev.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex as AsyncMutex;

    #[tokio::test]
    async fn test_same_lane_runs_in_order() {
        let lanes = Arc::new(Lanes::default());
        let order = Arc::new(AsyncMutex::new(Vec::new()));
        let lane = EntityId::from("a");

        let mut handles = Vec::new();
        for i in 0..5u64 {
            let mut ticket = lanes.enter(&lane);
            let lanes = Arc::clone(&lanes);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                ticket.wait_turn().await;
                // Later jobs would overtake earlier ones without the lane
                tokio::time::sleep(std::time::Duration::from_millis(10 * (5 - i))).await;
                order.lock().await.push(i);
                lanes.leave(ticket);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
        assert_eq!(lanes.busy(), 0);
    }

    #[tokio::test]
    async fn test_other_lanes_do_not_wait() {
        let lanes = Lanes::default();
        let _held = lanes.enter(&EntityId::from("a"));
        let mut other = lanes.enter(&EntityId::from("b"));
        // Would hang if lanes were shared
        other.wait_turn().await;
        lanes.leave(other);
        assert_eq!(lanes.busy(), 1);
    }
}
