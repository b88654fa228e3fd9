use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    column::{MAX_NODES, NodeVec, SoilColumn},
    constants::PhysicalConstants,
    properties::{ice_content, soil_conductivity, volumetric_heat_capacity},
};

/// Thermal state of every node in a soil column.
///
/// Moisture and ice are volumetric fractions, conductivity is in W/m/K, and
/// heat capacity in J/m³/K. A profile is validated on construction and
/// never mutated by the solvers; each solve returns a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProfile {
    pub(crate) temperature: NodeVec<f64>,
    pub(crate) ice: NodeVec<f64>,
    pub(crate) moist: NodeVec<f64>,
    pub(crate) kappa: NodeVec<f64>,
    pub(crate) heat_capacity: NodeVec<f64>,
}

/// Errors raised when a node profile is inconsistent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("profile needs between 3 and {MAX_NODES} nodes, got {nodes}")]
    NodeCount { nodes: usize },

    #[error("{field} has {found} values, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{field} at node {node} is not finite")]
    NonFinite { field: &'static str, node: usize },

    #[error("{field} at node {node} is negative")]
    Negative { field: &'static str, node: usize },

    #[error("ice {ice} exceeds moisture {moist} at node {node}")]
    IceExceedsMoisture { node: usize, ice: f64, moist: f64 },
}

impl NodeProfile {
    /// Builds a profile from per-node values.
    ///
    /// # Errors
    ///
    /// Returns an error if lengths differ or are out of range, a value is
    /// not finite, moisture, ice, conductivity, or heat capacity is
    /// negative, or ice exceeds moisture.
    pub fn new(
        temperature: &[f64],
        ice: &[f64],
        moist: &[f64],
        kappa: &[f64],
        heat_capacity: &[f64],
    ) -> Result<Self, ProfileError> {
        let n = temperature.len();
        if !(3..=MAX_NODES).contains(&n) {
            return Err(ProfileError::NodeCount { nodes: n });
        }

        let fields = [
            ("temperature", temperature, false),
            ("ice", ice, true),
            ("moist", moist, true),
            ("kappa", kappa, true),
            ("heat_capacity", heat_capacity, true),
        ];
        for (field, values, non_negative) in fields {
            if values.len() != n {
                return Err(ProfileError::LengthMismatch {
                    field,
                    expected: n,
                    found: values.len(),
                });
            }
            for (node, &value) in values.iter().enumerate() {
                if !value.is_finite() {
                    return Err(ProfileError::NonFinite { field, node });
                }
                if non_negative && value < 0.0 {
                    return Err(ProfileError::Negative { field, node });
                }
            }
        }

        for (node, (&ice, &moist)) in ice.iter().zip(moist).enumerate() {
            if ice > moist + 1e-12 {
                return Err(ProfileError::IceExceedsMoisture { node, ice, moist });
            }
        }

        Ok(Self {
            temperature: SmallVec::from_slice(temperature),
            ice: SmallVec::from_slice(ice),
            moist: SmallVec::from_slice(moist),
            kappa: SmallVec::from_slice(kappa),
            heat_capacity: SmallVec::from_slice(heat_capacity),
        })
    }

    /// Builds a profile from node temperatures and layer moisture.
    ///
    /// Each node takes the volumetric moisture of the layer containing it
    /// (the mean of both layers on a boundary). Ice follows from the
    /// temperature when `frozen_soil` is set; conductivity and heat
    /// capacity follow from moisture and ice.
    ///
    /// # Errors
    ///
    /// Returns an error if there is not one temperature per column node or
    /// one moisture value per layer, or the result fails [`NodeProfile::new`].
    pub fn from_layers(
        column: &SoilColumn,
        temperature: &[f64],
        layer_moist: &[f64],
        frozen_soil: bool,
        constants: &PhysicalConstants,
    ) -> Result<Self, ProfileError> {
        let n = column.node_count();
        if temperature.len() != n {
            return Err(ProfileError::LengthMismatch {
                field: "temperature",
                expected: n,
                found: temperature.len(),
            });
        }
        if layer_moist.len() != column.layer_count() {
            return Err(ProfileError::LengthMismatch {
                field: "layer_moist",
                expected: column.layer_count(),
                found: layer_moist.len(),
            });
        }

        let mut ice = NodeVec::new();
        let mut moist = NodeVec::new();
        let mut kappa = NodeVec::new();
        let mut heat_capacity = NodeVec::new();

        for (j, &t) in temperature.iter().enumerate() {
            let soil = column.node(j);
            let m = if soil.boundary {
                (layer_moist[soil.layer] + layer_moist[soil.layer + 1]) / 2.0
            } else {
                layer_moist[soil.layer]
            };
            let i = ice_content(
                t,
                m,
                soil.max_moist,
                soil.bubble,
                soil.expt,
                frozen_soil,
                constants,
            );
            let (k, cs) = node_properties(column, j, m, i);
            moist.push(m);
            ice.push(i);
            kappa.push(k);
            heat_capacity.push(cs);
        }

        Self::new(temperature, &ice, &moist, &kappa, &heat_capacity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }

    /// Node temperatures (°C).
    #[must_use]
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    #[must_use]
    pub fn ice(&self) -> &[f64] {
        &self.ice
    }

    #[must_use]
    pub fn moist(&self) -> &[f64] {
        &self.moist
    }

    #[must_use]
    pub fn kappa(&self) -> &[f64] {
        &self.kappa
    }

    #[must_use]
    pub fn heat_capacity(&self) -> &[f64] {
        &self.heat_capacity
    }

    /// Liquid water at node `j`.
    #[must_use]
    pub fn liquid(&self, node: usize) -> f64 {
        self.moist[node] - self.ice[node]
    }

    /// Returns a profile at new temperatures with ice, conductivity, and
    /// heat capacity recomputed for the first `active` nodes.
    ///
    /// Nodes from `active` on keep their current state.
    pub(crate) fn with_temperatures(
        &self,
        column: &SoilColumn,
        temperature: &[f64],
        active: usize,
        frozen_soil: bool,
        constants: &PhysicalConstants,
    ) -> Self {
        let mut next = self.clone();
        for j in 0..active {
            let soil = column.node(j);
            let t = temperature[j];
            let ice = ice_content(
                t,
                self.moist[j],
                soil.max_moist,
                soil.bubble,
                soil.expt,
                frozen_soil,
                constants,
            );
            let (kappa, heat_capacity) = node_properties(column, j, self.moist[j], ice);
            next.temperature[j] = t;
            next.ice[j] = ice;
            next.kappa[j] = kappa;
            next.heat_capacity[j] = heat_capacity;
        }
        next
    }
}

/// Conductivity and heat capacity of node `j` holding `moist` water of which
/// `ice` is frozen.
pub(crate) fn node_properties(column: &SoilColumn, node: usize, moist: f64, ice: f64) -> (f64, f64) {
    let texture = column.node_texture(node);
    let liquid = moist - ice;
    (
        soil_conductivity(moist, liquid, texture),
        volumetric_heat_capacity(texture.solid_fraction(), liquid, ice, texture.organic),
    )
}
