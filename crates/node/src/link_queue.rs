//! Single-flight outbound link queues.

use fogmesh_core::{Action, TimerId};
use fogmesh_types::{DeviceId, LinkKind, Message};
use std::collections::VecDeque;
use std::time::Duration;

/// A message waiting for its link.
#[derive(Debug, Clone)]
struct Pending {
    to: DeviceId,
    latency: Duration,
    message: Box<Message>,
}

#[derive(Debug, Clone, Default)]
struct LinkQueue {
    busy: bool,
    pending: VecDeque<Pending>,
}

/// Outbound links of one device.
///
/// Each link carries one transmission at a time; further messages wait in
/// FIFO order until the link reports itself free through
/// [`TimerId::LinkFree`].
#[derive(Debug, Clone)]
pub struct LinkQueues {
    bandwidth: [f64; 3],
    queues: [LinkQueue; 3],
}

fn slot(link: LinkKind) -> usize {
    match link {
        LinkKind::Uplink => 0,
        LinkKind::Downlink => 1,
        LinkKind::Cluster => 2,
    }
}

impl LinkQueues {
    /// Bandwidths are in bytes per second.
    pub fn new(uplink: f64, downlink: f64, cluster: f64) -> Self {
        Self {
            bandwidth: [uplink, downlink, cluster],
            queues: Default::default(),
        }
    }

    /// Send `message` to the adjacent device `to`, or queue it if the link
    /// is busy.
    pub fn send(
        &mut self,
        link: LinkKind,
        to: DeviceId,
        latency: Duration,
        message: Box<Message>,
    ) -> Vec<Action> {
        let pending = Pending {
            to,
            latency,
            message,
        };
        let queue = &mut self.queues[slot(link)];
        if queue.busy {
            queue.pending.push_back(pending);
            return vec![];
        }
        self.transmit(link, pending)
    }

    /// The link finished its transmission: start the next one, if any.
    pub fn on_link_freed(&mut self, link: LinkKind) -> Vec<Action> {
        let queue = &mut self.queues[slot(link)];
        match queue.pending.pop_front() {
            Some(next) => self.transmit(link, next),
            None => {
                queue.busy = false;
                vec![]
            }
        }
    }

    pub fn is_busy(&self, link: LinkKind) -> bool {
        self.queues[slot(link)].busy
    }

    pub fn queued(&self, link: LinkKind) -> usize {
        self.queues[slot(link)].pending.len()
    }

    fn transmit(&mut self, link: LinkKind, pending: Pending) -> Vec<Action> {
        let index = slot(link);
        self.queues[index].busy = true;

        let bytes = pending.message.size_bytes();
        let transmission = Duration::from_secs_f64(bytes as f64 / self.bandwidth[index]);
        fogmesh_metrics::record_message_transmitted(link_label(link), bytes);

        vec![
            Action::SetTimer {
                id: TimerId::LinkFree(link),
                duration: transmission,
            },
            Action::Transmit {
                to: pending.to,
                link,
                message: pending.message,
                transmission,
                latency: pending.latency,
            },
        ]
    }
}

fn link_label(link: LinkKind) -> &'static str {
    match link {
        LinkKind::Uplink => "uplink",
        LinkKind::Downlink => "downlink",
        LinkKind::Cluster => "cluster",
    }
}
