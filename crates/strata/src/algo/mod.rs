pub mod force;
pub mod layered;

use crate::error::{Error, Result};
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Algorithm {
    /// Depth layers from `root`, crowded layers re-spaced by a local force pass.
    Layered { root: NodeId },
    /// Plain spring embedder from a seeded random start.
    ForceDirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensionality {
    Two,
    #[default]
    Three,
}

impl Dimensionality {
    /// Number of axes the simulation moves particles along.
    pub fn axes(self) -> usize {
        match self {
            Dimensionality::Two => 2,
            Dimensionality::Three => 3,
        }
    }
}

/// Parameters of one force simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceParams {
    pub iterations: usize,
    /// Scales both forces; also the spring rest length.
    pub force_strength: f64,
    /// Multiplier applied to the accumulated force before it moves a node.
    pub dampening: f64,
    /// Per-axis cap on the distance a node moves in one step.
    pub max_velocity: f64,
    /// Pairs further apart than this do not repel; springs are truncated to it.
    pub max_distance: f64,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            iterations: 1000,
            force_strength: 5.0,
            dampening: 0.05,
            max_velocity: 2.0,
            max_distance: 50.0,
        }
    }
}

impl ForceParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.force_strength.is_finite() && self.force_strength > 0.0) {
            return Err(Error::InvalidRange {
                name: "forceStrength",
                value: self.force_strength,
                expected: "a finite value > 0",
            });
        }
        if !(self.dampening.is_finite() && self.dampening >= 0.0) {
            return Err(Error::InvalidRange {
                name: "dampening",
                value: self.dampening,
                expected: "a finite value >= 0",
            });
        }
        if !(self.max_velocity.is_finite() && self.max_velocity >= 0.0) {
            return Err(Error::InvalidRange {
                name: "maxVelocity",
                value: self.max_velocity,
                expected: "a finite value >= 0",
            });
        }
        if !(self.max_distance > 0.0) {
            return Err(Error::InvalidRange {
                name: "maxDistance",
                value: self.max_distance,
                expected: "a value > 0",
            });
        }
        Ok(())
    }
}

/// Configuration surface shared by both algorithms.
///
/// Deserializes from camelCase JSON; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Distance between consecutive layers along the stacking (z) axis.
    pub separation: f64,
    /// Radius at which siblings are spread around their parent. Force-directed layouts draw
    /// initial positions from `[-radial_distance, radial_distance]`.
    pub radial_distance: f64,
    pub force_strength: f64,
    pub dampening: f64,
    pub max_velocity: f64,
    pub max_distance: f64,
    /// Simulation steps for full force-directed runs.
    pub iterations: usize,
    /// Simulation steps for each de-crowding pass.
    pub spacing_iterations: usize,
    /// A layer with more members than this is re-spaced.
    pub crowding_threshold: usize,
    #[serde(rename = "is3D")]
    pub is_3d: bool,
    pub seed: u64,
    pub parallel: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        let force = ForceParams::default();
        Self {
            separation: 10.0,
            radial_distance: 20.0,
            force_strength: force.force_strength,
            dampening: force.dampening,
            max_velocity: force.max_velocity,
            max_distance: force.max_distance,
            iterations: force.iterations,
            spacing_iterations: 10,
            crowding_threshold: 20,
            is_3d: true,
            seed: 0,
            parallel: true,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.separation.is_finite() {
            return Err(Error::InvalidRange {
                name: "separation",
                value: self.separation,
                expected: "a finite value",
            });
        }
        if !(self.radial_distance.is_finite() && self.radial_distance >= 0.0) {
            return Err(Error::InvalidRange {
                name: "radialDistance",
                value: self.radial_distance,
                expected: "a finite value >= 0",
            });
        }
        self.force_params().validate()
    }

    pub fn dimensionality(&self) -> Dimensionality {
        if self.is_3d {
            Dimensionality::Three
        } else {
            Dimensionality::Two
        }
    }

    /// Parameters for a full force-directed run.
    pub fn force_params(&self) -> ForceParams {
        ForceParams {
            iterations: self.iterations,
            force_strength: self.force_strength,
            dampening: self.dampening,
            max_velocity: self.max_velocity,
            max_distance: self.max_distance,
        }
    }

    /// Same forces, but only `spacing_iterations` steps.
    pub fn spacing_params(&self) -> ForceParams {
        ForceParams {
            iterations: self.spacing_iterations,
            ..self.force_params()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        LayoutOptions::default().validate().unwrap();
        ForceParams::default().validate().unwrap();
    }

    #[test]
    fn zero_force_strength_is_rejected() {
        let opts = LayoutOptions {
            force_strength: 0.0,
            ..Default::default()
        };
        match opts.validate() {
            Err(Error::InvalidRange { name, .. }) => assert_eq!(name, "forceStrength"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn negative_velocity_cap_is_rejected() {
        let params = ForceParams {
            max_velocity: -1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn options_deserialize_from_partial_camel_case_json() {
        let opts: LayoutOptions = serde_json::from_str(
            r#"{"forceStrength": 7.5, "is3D": false, "crowdingThreshold": 3}"#,
        )
        .unwrap();
        assert_eq!(opts.force_strength, 7.5);
        assert!(!opts.is_3d);
        assert_eq!(opts.crowding_threshold, 3);
        assert_eq!(opts.separation, 10.0);
        assert_eq!(opts.dimensionality(), Dimensionality::Two);
    }

    #[test]
    fn negative_iteration_count_fails_to_deserialize() {
        assert!(serde_json::from_str::<LayoutOptions>(r#"{"iterations": -1}"#).is_err());
    }

    #[test]
    fn spacing_params_only_change_iterations() {
        let opts = LayoutOptions::default();
        let spacing = opts.spacing_params();
        assert_eq!(spacing.iterations, 10);
        assert_eq!(spacing.force_strength, opts.force_strength);
    }
}
