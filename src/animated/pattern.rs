// SPDX-License-Identifier: MPL-2.0

//! Hybrid frame caching patterns.
//!
//! A memory load ratio such as `0.6` means "realize 60% of frames up front and
//! keep the rest as raw buffers". The ratio is reduced to its smallest period
//! (`3/5` here) and the realized slots are spread across that period by
//! recursive bisection, so realized and buffered frames interleave instead of
//! forming long runs.

use super::types::StorageKind;

/// Repeating schedule of realized (`true`) and buffered (`false`) slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridPattern {
    slots: Vec<bool>,
}

impl HybridPattern {
    /// Build the pattern for a ratio in `[0, 1]`.
    ///
    /// A ratio that rounds to zero yields the period-1 pattern `[false]`.
    #[must_use]
    pub fn generate(ratio: f32) -> Self {
        let rate = (ratio.clamp(0.0, 1.0) * 100.0).round() as u32;

        if rate == 0 {
            return Self { slots: vec![false] };
        }

        let divisor = gcf(rate, 100);
        let period = (100 / divisor) as usize;
        let realized = (rate / divisor) as usize;

        let mut slots = vec![false; period];
        spread(&mut slots, realized);

        Self { slots }
    }

    /// Length of one cycle of the pattern.
    #[cfg(test)]
    #[must_use]
    pub fn period(&self) -> usize {
        self.slots.len()
    }

    /// Number of realized slots per cycle.
    #[cfg(test)]
    #[must_use]
    pub fn realized_per_period(&self) -> usize {
        self.slots.iter().filter(|slot| **slot).count()
    }

    #[cfg(test)]
    #[must_use]
    pub fn slots(&self) -> &[bool] {
        &self.slots
    }

    /// Storage kind for the frame at `index`.
    #[must_use]
    pub fn kind_for(&self, index: usize) -> StorageKind {
        if self.slots[index % self.slots.len()] {
            StorageKind::Realized
        } else {
            StorageKind::Buffered
        }
    }
}

/// Which representation each decoded frame gets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoragePlan {
    /// Every frame is realized as soon as it is decoded.
    #[default]
    Realized,
    /// Frames follow a hybrid pattern.
    Hybrid(HybridPattern),
}

impl StoragePlan {
    /// Hybrid caching when a memory load is configured, realized otherwise.
    #[must_use]
    pub fn from_memory_load(memory_load: Option<f32>) -> Self {
        match memory_load {
            Some(ratio) => Self::Hybrid(HybridPattern::generate(ratio)),
            None => Self::Realized,
        }
    }

    #[must_use]
    pub fn kind_for(&self, index: usize) -> StorageKind {
        match self {
            Self::Realized => StorageKind::Realized,
            Self::Hybrid(pattern) => pattern.kind_for(index),
        }
    }
}

/// Greatest common factor of `a` and `b`, by linear scan.
#[must_use]
pub fn gcf(a: u32, b: u32) -> u32 {
    (1..=a.min(b))
        .rev()
        .find(|i| a % i == 0 && b % i == 0)
        .unwrap_or(1)
}

/// Place `count` realized slots in `slots` by bisection: an odd leftover takes
/// the midpoint, the rest is split between the halves on either side of it.
fn spread(slots: &mut [bool], count: usize) {
    if count == 0 {
        return;
    }

    if count >= slots.len() {
        slots.fill(true);
        return;
    }

    let mid = slots.len() / 2;
    let mut remaining = count;
    if remaining % 2 == 1 {
        slots[mid] = true;
        remaining -= 1;
    }

    let (left, right) = slots.split_at_mut(mid);
    let right = &mut right[1..];

    // An even split can overflow the shorter right half; spill into the left.
    let right_count = (remaining / 2).min(right.len());
    let left_count = remaining - right_count;

    spread(left, left_count);
    spread(right, right_count);
}
