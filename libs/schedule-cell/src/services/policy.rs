use std::sync::{Arc, Mutex};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use shared_config::{FallbackPolicyKind, ScheduleSettings};

use crate::models::{CandidateSlot, SlotStatus};

/// Decides the status of a generated slot when no persisted schedule exists.
pub trait FallbackStatusPolicy: Send + Sync {
    fn status_for(&self, slot: &CandidateSlot) -> SlotStatus;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

impl FallbackStatusPolicy for AlwaysAvailable {
    fn status_for(&self, _slot: &CandidateSlot) -> SlotStatus {
        SlotStatus::Available
    }
}

/// Demo-only policy that marks roughly a third of generated slots as taken.
/// Generated slots never have a patient, so "taken" is `Unavailable`.
pub struct RandomizedDemo {
    rng: Mutex<StdRng>,
}

impl RandomizedDemo {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomizedDemo {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackStatusPolicy for RandomizedDemo {
    fn status_for(&self, _slot: &CandidateSlot) -> SlotStatus {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if rng.gen_ratio(2, 3) {
            SlotStatus::Available
        } else {
            SlotStatus::Unavailable
        }
    }
}

pub fn policy_from_settings(settings: &ScheduleSettings) -> Arc<dyn FallbackStatusPolicy> {
    match settings.fallback_policy {
        FallbackPolicyKind::AlwaysAvailable => Arc::new(AlwaysAvailable),
        FallbackPolicyKind::Random => {
            info!("Schedule fallback uses randomized demo statuses");
            match settings.fallback_seed {
                Some(seed) => Arc::new(RandomizedDemo::seeded(seed)),
                None => Arc::new(RandomizedDemo::new()),
            }
        }
    }
}
