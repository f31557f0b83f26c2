//! SubstituteAllocator: hands out companion names under a distribution policy.
//!
//! # Policies
//! - `NonRepeating`: walk the pool in order, never repeat until all nine are
//!   used, then start over.
//! - `Balanced`: pick uniformly among the least-used entries. Counts never
//!   drift apart by more than one.

use serde::{Deserialize, Serialize};

use super::pool::Companion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    #[default]
    NonRepeating,
    Balanced,
}

/// Per-policy usage bookkeeping.
#[derive(Debug, Clone)]
enum UsageState {
    NonRepeating {
        used: [bool; Companion::COUNT],
    },
    Balanced {
        counts: [u32; Companion::COUNT],
        rng_state: u64,
    },
}

#[derive(Debug, Clone)]
pub struct SubstituteAllocator {
    state: UsageState,
    issued: u64,
}

impl SubstituteAllocator {
    /// `seed` only matters for the balanced policy.
    pub fn new(policy: AllocationPolicy, seed: u64) -> Self {
        let state = match policy {
            AllocationPolicy::NonRepeating => UsageState::NonRepeating {
                used: [false; Companion::COUNT],
            },
            AllocationPolicy::Balanced => UsageState::Balanced {
                counts: [0; Companion::COUNT],
                rng_state: seed,
            },
        };
        Self { state, issued: 0 }
    }

    pub fn policy(&self) -> AllocationPolicy {
        match self.state {
            UsageState::NonRepeating { .. } => AllocationPolicy::NonRepeating,
            UsageState::Balanced { .. } => AllocationPolicy::Balanced,
        }
    }

    /// Total substitutes handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Pick the next identity and record its use.
    pub fn next(&mut self) -> Companion {
        self.issued += 1;
        match &mut self.state {
            UsageState::NonRepeating { used } => {
                if used.iter().all(|u| *u) {
                    *used = [false; Companion::COUNT];
                }
                // The reset above guarantees at least one free slot.
                let idx = used.iter().position(|u| !*u).unwrap_or(0);
                used[idx] = true;
                Companion::ALL[idx]
            }
            UsageState::Balanced { counts, rng_state } => {
                let min = counts.iter().copied().min().unwrap_or(0);
                let tied: Vec<usize> = (0..Companion::COUNT).filter(|&i| counts[i] == min).collect();
                let pick = tied[next_random(rng_state) as usize % tied.len()];
                counts[pick] += 1;
                Companion::ALL[pick]
            }
        }
    }

    /// How many times each companion has been issued in the current cycle
    /// (non-repeating) or overall (balanced).
    pub fn usage(&self) -> [u32; Companion::COUNT] {
        match &self.state {
            UsageState::NonRepeating { used } => used.map(u32::from),
            UsageState::Balanced { counts, .. } => *counts,
        }
    }
}

/// 64-bit LCG step; returns the high 31 bits.
fn next_random(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state >> 33
}
