//! Soil column geometry: layers, thermal nodes, and finite-difference spacing.
//!
//! A [`SoilColumn`] is built once per cell from the soil layers, the damping
//! depth, and a [`NodeLayout`]. Node depths, spacing coefficients, and the
//! soil parameters seen by each node are computed at construction and reused
//! by every solve. Rebuild the column with [`SoilColumn::with_layer_depths`]
//! if layer thicknesses change.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use uom::si::{f64::Length, length::meter};

use crate::{config::Grid, properties::SoilTexture};

/// Maximum number of thermal nodes in a column.
pub const MAX_NODES: usize = 50;

/// Maximum number of soil layers in a column.
pub const MAX_LAYERS: usize = 5;

/// Maximum number of freezing or thawing fronts tracked.
pub const MAX_FRONTS: usize = 3;

/// Per-node storage.
pub type NodeVec<T> = SmallVec<[T; MAX_NODES]>;

/// Per-layer storage.
pub type LayerVec<T> = SmallVec<[T; MAX_LAYERS]>;

/// Hydraulic and thermal parameters of one soil layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    pub thickness: Length,
    /// Volumetric water content at saturation.
    pub max_moist: f64,
    /// Bubbling pressure (cm).
    pub bubble: f64,
    /// Brooks–Corey exponent.
    pub expt: f64,
    pub texture: SoilTexture,
}

/// How thermal nodes are placed between the surface and the damping depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeLayout {
    /// Three nodes: surface, base of the first layer, damping depth.
    QuickFlux,
    /// Surface, first-layer base, twice that depth, then even spacing.
    Linear { nodes: usize },
    /// `z = exp(B·i) - 1` with `B` chosen so the last node sits at the
    /// damping depth.
    Exponential { nodes: usize },
}

impl NodeLayout {
    /// Picks the layout implied by the run options.
    #[must_use]
    pub fn for_grid(grid: Grid, quick_flux: bool, nodes: usize) -> Self {
        match (quick_flux, grid) {
            (true, _) => Self::QuickFlux,
            (false, Grid::Linear) => Self::Linear { nodes },
            (false, Grid::Exponential) => Self::Exponential { nodes },
        }
    }

    /// Returns the node count.
    #[must_use]
    pub fn nodes(&self) -> usize {
        match *self {
            Self::QuickFlux => 3,
            Self::Linear { nodes } | Self::Exponential { nodes } => nodes,
        }
    }
}

/// Finite-difference spacing around node `j`.
///
/// `beta` is the distance to the node above, `gamma` to the node below, and
/// `alpha = beta + gamma`. For the bottom node under a zero-flux boundary
/// the missing node below is mirrored, so `gamma = beta`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spacing {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Soil parameters seen by one thermal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSoil {
    /// Index of the layer whose texture the node uses.
    pub layer: usize,
    /// The node sits on the boundary between `layer` and the layer below.
    pub boundary: bool,
    /// Volumetric water content at saturation.
    pub max_moist: f64,
    pub bubble: f64,
    pub expt: f64,
}

/// Errors raised when a column cannot be built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column needs between 1 and {MAX_LAYERS} layers, got {layers}")]
    LayerCount { layers: usize },

    #[error("column needs between {min} and {MAX_NODES} nodes, got {nodes}")]
    NodeCount { nodes: usize, min: usize },

    #[error("layer {layer} thickness must be finite and positive")]
    LayerThickness { layer: usize },

    #[error("damping depth {damping_depth} m must be finite and positive")]
    DampingDepth { damping_depth: f64 },

    #[error("node {node} is not deeper than the node above it")]
    NotIncreasing { node: usize },

    #[error("bottom node at {bottom} m does not reach the damping depth {damping_depth} m")]
    BottomMismatch { bottom: f64, damping_depth: f64 },

    #[error(
        "first thermal node at {node_depth} m lies below the first layer ({layer_depth} m); \
         add nodes or reduce the damping depth"
    )]
    FirstNodeTooDeep { node_depth: f64, layer_depth: f64 },
}

/// Geometry and per-node soil parameters of a soil column.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilColumn {
    layout: NodeLayout,
    layers: LayerVec<SoilLayer>,
    layer_bottoms: LayerVec<f64>,
    damping_depth: f64,
    depths: NodeVec<f64>,
    spacing: NodeVec<Spacing>,
    bottom_mirror: Spacing,
    nodes: NodeVec<NodeSoil>,
    exp_scale: Option<f64>,
    frozen_soil: bool,
}

impl SoilColumn {
    /// Builds a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or node count is out of range, a
    /// thickness or the damping depth is not positive, nodes fail to
    /// deepen monotonically, the bottom node misses the damping depth by
    /// more than a millimetre, or an exponential grid puts its first
    /// interior node below the first layer.
    pub fn new(
        layout: NodeLayout,
        layers: &[SoilLayer],
        damping_depth: Length,
    ) -> Result<Self, ColumnError> {
        if layers.is_empty() || layers.len() > MAX_LAYERS {
            return Err(ColumnError::LayerCount {
                layers: layers.len(),
            });
        }

        let mut layer_bottoms = LayerVec::new();
        let mut bottom = 0.0;
        for (layer, params) in layers.iter().enumerate() {
            let thickness = params.thickness.get::<meter>();
            if !thickness.is_finite() || thickness <= 0.0 {
                return Err(ColumnError::LayerThickness { layer });
            }
            bottom += thickness;
            layer_bottoms.push(bottom);
        }

        let dp = damping_depth.get::<meter>();
        if !dp.is_finite() || dp <= 0.0 {
            return Err(ColumnError::DampingDepth { damping_depth: dp });
        }

        let d0 = layers[0].thickness.get::<meter>();
        let (depths, exp_scale) = match layout {
            NodeLayout::QuickFlux => (node_depths_quick_flux(d0, dp), None),
            NodeLayout::Linear { nodes } => (node_depths_linear(nodes, d0, dp)?, None),
            NodeLayout::Exponential { nodes } => {
                let (depths, scale) = node_depths_exponential(nodes, d0, dp)?;
                (depths, Some(scale))
            }
        };

        for node in 1..depths.len() {
            if depths[node] <= depths[node - 1] {
                return Err(ColumnError::NotIncreasing { node });
            }
        }
        check_bottom(&depths, dp)?;

        let spacing = interior_spacing(&depths);
        let n = depths.len();
        let below = depths[n - 1] - depths[n - 2];
        let bottom_mirror = Spacing {
            alpha: 2.0 * below,
            beta: below,
            gamma: below,
        };
        let nodes = node_soil(&depths, layers, &layer_bottoms);

        Ok(Self {
            layout,
            layers: layers.iter().copied().collect(),
            layer_bottoms,
            damping_depth: dp,
            depths,
            spacing,
            bottom_mirror,
            nodes,
            exp_scale,
            frozen_soil: true,
        })
    }

    /// Returns a copy with frozen-soil physics enabled or disabled for this
    /// column alone.
    #[must_use]
    pub fn with_frozen_soil(mut self, active: bool) -> Self {
        self.frozen_soil = active;
        self
    }

    /// Rebuilds the column after layer thicknesses change.
    ///
    /// # Errors
    ///
    /// See [`SoilColumn::new`].
    pub fn with_layer_depths(&self, thicknesses: &[Length]) -> Result<Self, ColumnError> {
        if thicknesses.len() != self.layers.len() {
            return Err(ColumnError::LayerCount {
                layers: thicknesses.len(),
            });
        }
        let layers: LayerVec<SoilLayer> = self
            .layers
            .iter()
            .zip(thicknesses)
            .map(|(layer, &thickness)| SoilLayer {
                thickness,
                ..*layer
            })
            .collect();
        Ok(Self::new(self.layout, &layers, Length::new::<meter>(self.damping_depth))?
            .with_frozen_soil(self.frozen_soil))
    }

    #[must_use]
    pub fn layout(&self) -> NodeLayout {
        self.layout
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.depths.len()
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn layers(&self) -> &[SoilLayer] {
        &self.layers
    }

    /// Depth of each layer's bottom boundary (m).
    #[must_use]
    pub fn layer_bottoms(&self) -> &[f64] {
        &self.layer_bottoms
    }

    /// Thickness of layer `layer` (m).
    #[must_use]
    pub fn layer_thickness(&self, layer: usize) -> f64 {
        let top = if layer == 0 {
            0.0
        } else {
            self.layer_bottoms[layer - 1]
        };
        self.layer_bottoms[layer] - top
    }

    /// Damping depth (m).
    #[must_use]
    pub fn damping_depth(&self) -> f64 {
        self.damping_depth
    }

    /// Node depths below the surface (m), strictly increasing from 0.
    #[must_use]
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    /// Spacing around node `j`.
    ///
    /// For the bottom node this is the mirrored spacing used with a
    /// zero-flux boundary. Node 0 has no spacing and returns zeros.
    #[must_use]
    pub fn spacing(&self, node: usize) -> Spacing {
        if node + 1 == self.depths.len() {
            self.bottom_mirror
        } else {
            self.spacing[node]
        }
    }

    /// Soil parameters for node `j`.
    #[must_use]
    pub fn node(&self, node: usize) -> &NodeSoil {
        &self.nodes[node]
    }

    /// Texture of the layer node `j` belongs to.
    #[must_use]
    pub fn node_texture(&self, node: usize) -> &SoilTexture {
        &self.layers[self.nodes[node].layer].texture
    }

    /// Exponential grid constant `B`, if the grid is exponential.
    #[must_use]
    pub fn exp_scale(&self) -> Option<f64> {
        self.exp_scale
    }

    /// Whether frozen-soil physics applies to this column.
    #[must_use]
    pub fn frozen_soil(&self) -> bool {
        self.frozen_soil
    }

    /// Returns the index of the layer containing `depth`.
    ///
    /// Depths below the last layer map to the last layer.
    #[must_use]
    pub fn layer_at(&self, depth: f64) -> usize {
        self.layer_bottoms
            .iter()
            .position(|&bottom| depth < bottom)
            .unwrap_or(self.layers.len() - 1)
    }
}

fn node_depths_quick_flux(d0: f64, dp: f64) -> NodeVec<f64> {
    SmallVec::from_slice(&[0.0, d0, dp])
}

fn node_depths_linear(nodes: usize, d0: f64, dp: f64) -> Result<NodeVec<f64>, ColumnError> {
    if !(4..=MAX_NODES).contains(&nodes) {
        return Err(ColumnError::NodeCount { nodes, min: 4 });
    }

    let mut depths: NodeVec<f64> = SmallVec::from_slice(&[0.0, d0, 2.0 * d0]);
    #[allow(clippy::cast_precision_loss)]
    let interior = (dp - 2.5 * d0) / (nodes as f64 - 3.5);

    let mut thickness_above = d0;
    let mut zsum = 2.0 * d0;
    for _ in 3..nodes - 1 {
        zsum += (interior + thickness_above) / 2.0;
        thickness_above = interior;
        depths.push(zsum);
    }

    let bottom_thickness = (dp - zsum - thickness_above / 2.0) * 2.0;
    zsum += (thickness_above + bottom_thickness) / 2.0;
    depths.push(zsum);
    Ok(depths)
}

fn node_depths_exponential(
    nodes: usize,
    d0: f64,
    dp: f64,
) -> Result<(NodeVec<f64>, f64), ColumnError> {
    if !(3..=MAX_NODES).contains(&nodes) {
        return Err(ColumnError::NodeCount { nodes, min: 3 });
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = (dp + 1.0).ln() / (nodes - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let depths: NodeVec<f64> = (0..nodes).map(|i| (scale * i as f64).exp() - 1.0).collect();

    if depths[1] > d0 {
        return Err(ColumnError::FirstNodeTooDeep {
            node_depth: depths[1],
            layer_depth: d0,
        });
    }
    Ok((depths, scale))
}

fn interior_spacing(depths: &[f64]) -> NodeVec<Spacing> {
    let n = depths.len();
    (0..n)
        .map(|j| {
            if j == 0 || j + 1 == n {
                Spacing::default()
            } else {
                let beta = depths[j] - depths[j - 1];
                let gamma = depths[j + 1] - depths[j];
                Spacing {
                    alpha: beta + gamma,
                    beta,
                    gamma,
                }
            }
        })
        .collect()
}

/// Assigns each node the parameters of the layer containing it.
///
/// A node sitting exactly on an internal layer boundary averages the
/// retention parameters of the two layers and takes its texture from the
/// upper one.
/// The bottom node must sit at the damping depth within this distance (m).
const BOTTOM_TOLERANCE: f64 = 1e-3;

fn check_bottom(depths: &[f64], damping_depth: f64) -> Result<(), ColumnError> {
    let bottom = depths[depths.len() - 1];
    if (bottom - damping_depth).abs() > BOTTOM_TOLERANCE {
        return Err(ColumnError::BottomMismatch {
            bottom,
            damping_depth,
        });
    }
    Ok(())
}

fn node_soil(depths: &[f64], layers: &[SoilLayer], bottoms: &[f64]) -> NodeVec<NodeSoil> {
    let last = layers.len() - 1;
    depths
        .iter()
        .enumerate()
        .map(|(node, &depth)| {
            let on_boundary = (node > 0)
                .then(|| bottoms[..last].iter().position(|&b| (b - depth).abs() < 1e-9))
                .flatten();

            if let Some(upper) = on_boundary {
                let (a, b) = (&layers[upper], &layers[upper + 1]);
                NodeSoil {
                    layer: upper,
                    boundary: true,
                    max_moist: (a.max_moist + b.max_moist) / 2.0,
                    bubble: (a.bubble + b.bubble) / 2.0,
                    expt: (a.expt + b.expt) / 2.0,
                }
            } else {
                let layer = bottoms.iter().position(|&b| depth < b).unwrap_or(last);
                let params = &layers[layer];
                NodeSoil {
                    layer,
                    boundary: false,
                    max_moist: params.max_moist,
                    bubble: params.bubble,
                    expt: params.expt,
                }
            }
        })
        .collect()
}
