use std::collections::VecDeque;

use seamlight_core::{BlockPos, LightChannel};
use serde::{Deserialize, Serialize};

use super::RelightEngine;

/// One request handed to the light engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecheckRequest {
    /// Inclusive vertical span of one column.
    Column {
        channel: LightChannel,
        x: i32,
        z: i32,
        y_min: i32,
        y_max: i32,
    },
    /// Inclusive box.
    Area {
        channel: LightChannel,
        min: BlockPos,
        max: BlockPos,
    },
}

impl RecheckRequest {
    pub fn channel(&self) -> LightChannel {
        match *self {
            Self::Column { channel, .. } | Self::Area { channel, .. } => channel,
        }
    }

    /// Whether the request covers the voxel at `pos`.
    pub fn contains(&self, pos: BlockPos) -> bool {
        match *self {
            Self::Column { x, z, y_min, y_max, .. } => {
                pos.x == x && pos.z == z && (y_min..=y_max).contains(&pos.y)
            }
            Self::Area { min, max, .. } => {
                (min.x..=max.x).contains(&pos.x)
                    && (min.y..=max.y).contains(&pos.y)
                    && (min.z..=max.z).contains(&pos.z)
            }
        }
    }

    /// Number of voxels covered.
    pub fn volume(&self) -> u64 {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as u64;
        match *self {
            Self::Column { y_min, y_max, .. } => span(y_min, y_max),
            Self::Area { min, max, .. } => {
                span(min.x, max.x) * span(min.y, max.y) * span(min.z, max.z)
            }
        }
    }
}

/// Engine that just records requests in FIFO order.
#[derive(Debug, Default, Clone)]
pub struct RelightQueue {
    pending: VecDeque<RecheckRequest>,
    total: u64,
}

impl RelightQueue {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Requests ever queued, including drained ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Pending requests without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &RecheckRequest> {
        self.pending.iter()
    }

    /// Hand out every pending request, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = RecheckRequest> + '_ {
        self.pending.drain(..)
    }

    fn push(&mut self, request: RecheckRequest) {
        self.total += 1;
        self.pending.push_back(request);
    }
}

impl RelightEngine for RelightQueue {
    fn recheck_column(&mut self, channel: LightChannel, x: i32, z: i32, y_min: i32, y_max: i32) {
        self.push(RecheckRequest::Column {
            channel,
            x,
            z,
            y_min,
            y_max,
        });
    }

    fn recheck_area(&mut self, channel: LightChannel, min: BlockPos, max: BlockPos) {
        self.push(RecheckRequest::Area { channel, min, max });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_keeps_order_and_counts() {
        let mut queue = RelightQueue::default();
        queue.recheck_column(LightChannel::Sky, 1, 2, 0, 15);
        queue.recheck_area(
            LightChannel::Block,
            BlockPos::new(0, 0, 0),
            BlockPos::new(1, 1, 1),
        );
        assert_eq!(queue.len(), 2);
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained[0].channel(), LightChannel::Sky);
        assert_eq!(drained[1].volume(), 8);
        assert!(queue.is_empty());
        assert_eq!(queue.total(), 2);
    }

    #[test]
    fn contains_checks_bounds() {
        let column = RecheckRequest::Column {
            channel: LightChannel::Sky,
            x: 3,
            z: 4,
            y_min: 16,
            y_max: 31,
        };
        assert!(column.contains(BlockPos::new(3, 20, 4)));
        assert!(!column.contains(BlockPos::new(3, 32, 4)));
        assert_eq!(column.volume(), 16);
        let empty = RecheckRequest::Column {
            channel: LightChannel::Sky,
            x: 0,
            z: 0,
            y_min: 5,
            y_max: 4,
        };
        assert_eq!(empty.volume(), 0);
    }

    #[test]
    fn requests_serialize_with_kind_tag() {
        let request = RecheckRequest::Column {
            channel: LightChannel::Block,
            x: 0,
            z: 0,
            y_min: 0,
            y_max: 0,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"kind\":\"column\""));
    }
}
