//! The configuration object the engine consumes (§6 of the external interfaces).
//!
//! Parsing this from a file or CLI is someone else's job; the engine only ever sees the validated
//! struct below.

use std::path::PathBuf;

use sim_time::SimulationTime;

use crate::error::StartupError;

/// Configuration consumed by [`crate::engine::Engine::new`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Width of an execution window; also the lookahead bound for cross-host events.
    pub min_time_jump: SimulationTime,
    /// The simulation ends once the clock reaches this time.
    pub end_time: SimulationTime,
    /// Worker pool size. `0` runs hosts inline on the engine thread.
    pub n_workers: usize,
    /// Path to the declarative graph description consumed by the topology service.
    pub topology_path: PathBuf,
    /// Seed for the PRNG used for tie-breaking (PoI selection, packet loss draws, etc).
    pub seed: u64,
}

impl EngineConfig {
    /// Validate the configuration, returning `ConfigInvalid` with a human-readable reason on
    /// failure. The engine calls this itself in `new`, but callers building configuration
    /// pipelines upstream may want to call it eagerly too.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.min_time_jump.is_zero() {
            return Err(StartupError::ConfigInvalid(
                "min_time_jump must be greater than zero".into(),
            ));
        }
        if self.end_time.is_zero() {
            return Err(StartupError::ConfigInvalid(
                "end_time must be greater than zero".into(),
            ));
        }
        if self.end_time < self.min_time_jump {
            return Err(StartupError::ConfigInvalid(
                "end_time must be at least one min_time_jump wide".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            min_time_jump: SimulationTime::from_millis(1),
            end_time: SimulationTime::from_secs(1),
            n_workers: 0,
            topology_path: PathBuf::from("topology.gml"),
            seed: 42,
        }
    }

    #[test]
    fn rejects_zero_min_time_jump() {
        let mut config = base_config();
        config.min_time_jump = SimulationTime::ZERO;
        assert!(matches!(
            config.validate(),
            Err(StartupError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn rejects_end_time_shorter_than_window() {
        let mut config = base_config();
        config.end_time = SimulationTime::from_nanos(1);
        config.min_time_jump = SimulationTime::from_millis(1);
        assert!(matches!(
            config.validate(),
            Err(StartupError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn accepts_valid_config() {
        assert!(base_config().validate().is_ok());
    }
}
