//! Poll-batch planner for register range reads
//!
//! This module turns the register addresses of the currently active channels
//! into a minimal set of contiguous range reads. Addresses separated by a
//! small gap are merged into one range: the extra registers inside the gap
//! are read and discarded, which costs a few wasted words but saves whole
//! request/response round-trips on a serial link where per-exchange latency
//! dominates.
//!
//! # Example
//!
//! ```
//! use servoscope::backend::planner::PollPlanner;
//!
//! let planner = PollPlanner::default();
//! let ranges = planner.plan_addresses([5, 6, 9, 20]);
//!
//! // 6 → 9 is a gap of 3, merged; 9 → 20 splits.
//! assert_eq!(ranges.len(), 2);
//! assert_eq!((ranges[0].start, ranges[0].end), (5, 9));
//! assert_eq!((ranges[1].start, ranges[1].end), (20, 20));
//! ```

use crate::types::Channel;

/// Default maximum address gap merged into a single range
pub const DEFAULT_GAP_THRESHOLD: u16 = 3;

/// An inclusive range of register addresses, the unit of work for one
/// transport read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRange {
    /// First address of the range
    pub start: u16,
    /// Last address of the range (inclusive)
    pub end: u16,
}

impl RegisterRange {
    /// Number of registers covered
    pub fn count(&self) -> u16 {
        self.end - self.start + 1
    }

    /// Check whether an address falls inside the range
    pub fn contains(&self, address: u16) -> bool {
        (self.start..=self.end).contains(&address)
    }

    /// Iterate the covered addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl std::fmt::Display for RegisterRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "0x{:02X}", self.start)
        } else {
            write!(f, "0x{:02X}..0x{:02X}", self.start, self.end)
        }
    }
}

/// Plans batched register reads for a set of channels
#[derive(Debug, Clone)]
pub struct PollPlanner {
    /// Maximum gap between requested addresses to combine into one range
    gap_threshold: u16,
}

impl PollPlanner {
    /// Create a planner with the given gap threshold
    pub fn new(gap_threshold: u16) -> Self {
        Self { gap_threshold }
    }

    /// The configured gap threshold
    pub fn gap_threshold(&self) -> u16 {
        self.gap_threshold
    }

    /// Plan ranges for the active channels of a set
    ///
    /// Inactive channels contribute no addresses. An empty active set
    /// yields an empty plan (no I/O that tick).
    pub fn plan(&self, channels: &[Channel]) -> Vec<RegisterRange> {
        self.plan_addresses(
            channels
                .iter()
                .filter(|ch| ch.is_active())
                .flat_map(|ch| ch.registers().addresses()),
        )
    }

    /// Plan ranges for a raw address set
    ///
    /// Duplicates are harmless. Output ranges are sorted ascending,
    /// non-overlapping, and cover every input address; two inputs whose
    /// gap is at most the threshold share a range.
    pub fn plan_addresses(&self, addresses: impl IntoIterator<Item = u16>) -> Vec<RegisterRange> {
        let mut addrs: Vec<u16> = addresses.into_iter().collect();
        if addrs.is_empty() {
            return Vec::new();
        }
        addrs.sort_unstable();

        let mut ranges = Vec::new();
        let mut start = addrs[0];
        let mut end = addrs[0];

        for &addr in &addrs[1..] {
            if addr - end <= self.gap_threshold {
                end = addr;
            } else {
                ranges.push(RegisterRange { start, end });
                start = addr;
                end = addr;
            }
        }
        ranges.push(RegisterRange { start, end });

        ranges
    }

    /// How many round-trips batching saves for a channel set
    ///
    /// Returns `(ranges, per_channel_reads_saved)` against the naive
    /// one-read-per-channel baseline.
    pub fn savings(&self, channels: &[Channel]) -> (usize, usize) {
        let active = channels.iter().filter(|ch| ch.is_active()).count();
        if active == 0 {
            return (0, 0);
        }
        let ranges = self.plan(channels).len();
        (ranges, active.saturating_sub(ranges))
    }
}

impl Default for PollPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_THRESHOLD)
    }
}
