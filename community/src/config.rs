use crate::budget::Budget;
use crate::{CommunityError, Result};
use smart_default::SmartDefault;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Default modularity resolution.
pub const DEFAULT_RESOLUTION: f64 = 1.0;
/// Default minimum modularity gain between Louvain levels.
pub const DEFAULT_THRESHOLD: f64 = 1e-7;
/// Default PRNG seed.
pub const DEFAULT_SEED: u64 = 123;

/// Parameters of a Louvain run.
#[derive(Debug, Clone, PartialEq, SmartDefault)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LouvainConfig {
    /// Modularity resolution. Values below 1 favor larger communities.
    #[default(DEFAULT_RESOLUTION)]
    pub resolution: f64,
    /// Stop once a level improves modularity by no more than this.
    #[default(DEFAULT_THRESHOLD)]
    pub threshold: f64,
    /// Seed for the node-order shuffles.
    #[default(DEFAULT_SEED)]
    pub seed: u64,
    /// Use stored edge weights. When unset every edge counts as weight 1.
    #[default(true)]
    pub weighted: bool,
    /// Pass and time limits.
    pub budget: Budget,
}

impl LouvainConfig {
    /// Reject parameters a run cannot use.
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution < 0.0 {
            return Err(CommunityError::config(format!(
                "resolution must be finite and non-negative, got {}",
                self.resolution
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(CommunityError::config(format!(
                "threshold must be finite and non-negative, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// How label propagation visits the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum UpdateStrategy {
    /// Nodes update one at a time in index order, ties broken at random.
    #[default]
    Async,
    /// Color classes update in turn, nodes of a class together. Ties are
    /// broken by Prec-Max, so the result does not depend on a seed.
    SemiSync,
}

impl FromStr for UpdateStrategy {
    type Err = CommunityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "async" => Ok(UpdateStrategy::Async),
            "semi" | "semi_sync" | "semi-sync" => Ok(UpdateStrategy::SemiSync),
            _ => Err(CommunityError::config(format!(
                "label propagation strategy not recognized: {}",
                s
            ))),
        }
    }
}

impl Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStrategy::Async => f.write_str("async"),
            UpdateStrategy::SemiSync => f.write_str("semi_sync"),
        }
    }
}

/// Parameters of a label propagation run.
#[derive(Debug, Clone, PartialEq, SmartDefault)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LpaConfig {
    /// Update strategy.
    pub strategy: UpdateStrategy,
    /// Scale of incoming arcs on directed graphs.
    #[default = 1.0]
    pub alpha: f64,
    /// Scale of outgoing arcs on directed graphs.
    #[default = 1.0]
    pub beta: f64,
    /// Seed for tie-breaking in the asynchronous strategy.
    #[default(DEFAULT_SEED)]
    pub seed: u64,
    /// Use stored edge weights. When unset every edge counts as weight 1.
    #[default(true)]
    pub weighted: bool,
    /// Pass and time limits.
    pub budget: Budget,
}

impl LpaConfig {
    /// Reject parameters a run cannot use.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CommunityError::config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let c = LouvainConfig::default();
        assert_eq!(c.resolution, 1.0);
        assert_eq!(c.threshold, 1e-7);
        assert_eq!(c.seed, 123);
        assert_eq!(c.budget, Budget::unlimited());
        assert!(c.weighted);
        assert!(c.validate().is_ok());

        let l = LpaConfig::default();
        assert_eq!(l.strategy, UpdateStrategy::Async);
        assert_eq!((l.alpha, l.beta, l.seed), (1.0, 1.0, 123));
        assert!(l.weighted);
        assert!(l.validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let bad = [
            LouvainConfig {
                resolution: -1.0,
                ..Default::default()
            },
            LouvainConfig {
                resolution: f64::NAN,
                ..Default::default()
            },
            LouvainConfig {
                threshold: f64::INFINITY,
                ..Default::default()
            },
            LouvainConfig {
                threshold: -1e-3,
                ..Default::default()
            },
        ];
        for c in bad {
            assert!(matches!(c.validate(), Err(CommunityError::Configuration(_))));
        }

        let lpa = LpaConfig {
            beta: f64::NEG_INFINITY,
            ..Default::default()
        };
        assert!(matches!(lpa.validate(), Err(CommunityError::Configuration(_))));
    }

    #[test]
    fn parse_strategy() {
        assert_eq!("async".parse(), Ok(UpdateStrategy::Async));
        assert_eq!("semi".parse(), Ok(UpdateStrategy::SemiSync));
        assert_eq!("semi_sync".parse(), Ok(UpdateStrategy::SemiSync));
        assert!(matches!(
            "sync".parse::<UpdateStrategy>(),
            Err(CommunityError::Configuration(_))
        ));

        let s = UpdateStrategy::SemiSync;
        assert_eq!(s.to_string().parse(), Ok(s));
    }

    #[test]
    fn serde_round_trip() -> serde_json::Result<()> {
        let c = LpaConfig {
            strategy: UpdateStrategy::SemiSync,
            alpha: 0.5,
            budget: Budget::default().with_max_passes(10),
            ..Default::default()
        };
        let json = serde_json::to_string(&c)?;
        assert!(json.contains("\"semi_sync\""));
        assert_eq!(serde_json::from_str::<LpaConfig>(&json)?, c);

        let partial: LouvainConfig = serde_json::from_str(r#"{"resolution": 0.5}"#)?;
        assert_eq!(partial.resolution, 0.5);
        assert_eq!(partial.threshold, DEFAULT_THRESHOLD);
        assert!(partial.weighted);

        let unit: LpaConfig = serde_json::from_str(r#"{"weighted": false}"#)?;
        assert!(!unit.weighted);
        Ok(())
    }
}
