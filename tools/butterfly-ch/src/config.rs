//! Contraction tuning parameters
//!
//! Every field has a default, so a config file only needs the values it
//! changes. The CLI applies its flags on top of the loaded file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{ContractError, Result};

/// Coefficients of the vertex priority
///
/// `priority = edge_difference * (added - removed) + depth * depth
///           + contracted_neighbours * contracted_neighbours`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityParams {
    pub edge_difference: f32,
    pub depth: f32,
    pub contracted_neighbours: f32,
}

impl Default for PriorityParams {
    fn default() -> Self {
        Self {
            edge_difference: 5.0,
            depth: 5.0,
            contracted_neighbours: 1.0,
        }
    }
}

impl PriorityParams {
    pub fn edge_difference(mut self, coeff: f32) -> Self {
        self.edge_difference = coeff;
        self
    }

    pub fn depth(mut self, coeff: f32) -> Self {
        self.depth = coeff;
        self
    }

    pub fn contracted_neighbours(mut self, coeff: f32) -> Self {
        self.contracted_neighbours = coeff;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractionConfig {
    /// Max hops of a witness search
    pub hop_limit: u32,
    /// Max settled vertices per direction of a witness search
    pub max_settles: usize,
    /// Settle bound of the two-hop precompute
    pub neighbour_max_settles: usize,
    /// Witness slack: a witness within `epsilon` of a shortcut dominates it
    pub epsilon: f64,
    pub neighbour_witnesses: bool,
    pub priority: PriorityParams,
    /// Worker threads for the parallel phases, 0 = rayon default
    pub threads: usize,
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self {
            hop_limit: 16,
            max_settles: 500,
            neighbour_max_settles: 64,
            epsilon: 0.0,
            neighbour_witnesses: true,
            priority: PriorityParams::default(),
            threads: 0,
        }
    }
}

impl ContractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn hop_limit(mut self, hops: u32) -> Self {
        self.hop_limit = hops;
        self
    }

    pub fn max_settles(mut self, settles: usize) -> Self {
        self.max_settles = settles;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn neighbour_witnesses(mut self, enabled: bool) -> Self {
        self.neighbour_witnesses = enabled;
        self
    }

    pub fn priority(mut self, params: PriorityParams) -> Self {
        self.priority = params;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.hop_limit == 0 {
            return Err(ContractError::InvalidConfig("hop_limit must be at least 1".into()));
        }
        if self.max_settles == 0 {
            return Err(ContractError::InvalidConfig("max_settles must be at least 1".into()));
        }
        if self.neighbour_witnesses && self.neighbour_max_settles == 0 {
            return Err(ContractError::InvalidConfig(
                "neighbour_max_settles must be at least 1".into(),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ContractError::InvalidConfig(format!(
                "epsilon must be a finite non-negative number, got {}",
                self.epsilon
            )));
        }
        let p = &self.priority;
        for (name, coeff) in [
            ("edge_difference", p.edge_difference),
            ("depth", p.depth),
            ("contracted_neighbours", p.contracted_neighbours),
        ] {
            if !coeff.is_finite() || coeff < 0.0 {
                return Err(ContractError::InvalidConfig(format!(
                    "priority.{name} must be a finite non-negative number, got {coeff}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ContractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hop_limit, 16);
        assert_eq!(config.epsilon, 0.0);
        assert_eq!(config.priority.edge_difference, 5.0);
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(ContractionConfig::new().hop_limit(0).validate().is_err());
        assert!(ContractionConfig::new().max_settles(0).validate().is_err());
        assert!(ContractionConfig::new().epsilon(-0.1).validate().is_err());
        assert!(ContractionConfig::new().epsilon(f64::NAN).validate().is_err());
        let bad = PriorityParams::default().depth(f32::NAN);
        assert!(ContractionConfig::new().priority(bad).validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"epsilon": 0.5, "priority": {{"depth": 2.0}}}}"#).unwrap();
        let config = ContractionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.epsilon, 0.5);
        assert_eq!(config.priority.depth, 2.0);
        assert_eq!(config.priority.edge_difference, 5.0);
        assert_eq!(config.max_settles, 500);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hop_limit": 0}}"#).unwrap();
        assert!(matches!(
            ContractionConfig::from_file(file.path()),
            Err(ContractError::InvalidConfig(_))
        ));
    }
}
