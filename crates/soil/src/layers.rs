//! Layer averages derived from the node profile.
//!
//! Hydrology works on soil layers, conduction on nodes. After every surface
//! solve the node temperatures are averaged back onto the layers and the
//! ice each layer holds is recomputed from its average. Nothing flows the
//! other way, so reconciling the same profile twice gives the same answer.

use smallvec::SmallVec;

use crate::{
    column::{LayerVec, MAX_FRONTS, SoilColumn},
    config::Config,
    node::frozen_soil_active,
    profile::{NodeProfile, ProfileError},
    properties::ice_content,
};

/// Depths (m) where the node profile crosses 0 °C.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrostFronts {
    /// Fronts with frozen soil below and unfrozen soil above.
    pub freezing: SmallVec<[f64; MAX_FRONTS]>,
    /// Fronts with unfrozen soil below and frozen soil above.
    pub thawing: SmallVec<[f64; MAX_FRONTS]>,
}

/// Per-layer view of the soil state.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    /// Average temperature (°C).
    pub temperature: LayerVec<f64>,
    /// Ice content (volumetric fraction).
    pub ice: LayerVec<f64>,
    /// Total moisture (volumetric fraction), as given.
    pub moist: LayerVec<f64>,
    pub fronts: FrostFronts,
}

/// Averages node temperatures onto the soil layers.
///
/// Under quick flux the profile is `[Ts, T1, T2]`: the top layer takes
/// `(Ts + T1)/2` and deeper layers the mean of
/// `T(z) = T2 + (T1 - T2)·exp(-(z - d0)/dp)` over their depth range.
/// Otherwise the profile is linear between nodes and held at the bottom
/// node's temperature below the damping depth; ice is computed segment by
/// segment and weighted by how much of the layer each segment covers.
///
/// # Errors
///
/// Returns an error if `layer_moist` does not have one entry per layer.
pub fn reconcile(
    column: &SoilColumn,
    profile: &NodeProfile,
    layer_moist: &[f64],
    config: &Config,
) -> Result<LayerSummary, ProfileError> {
    if layer_moist.len() != column.layer_count() {
        return Err(ProfileError::LengthMismatch {
            field: "layer moisture",
            expected: column.layer_count(),
            found: layer_moist.len(),
        });
    }

    let frozen = frozen_soil_active(column, config);
    let (temperature, ice) = if config.options().quick_flux {
        quick_flux_layers(column, profile, layer_moist, frozen, config)
    } else {
        integrated_layers(column, profile, layer_moist, frozen, config)
    };

    let fronts = if frozen {
        frost_fronts(column.depths(), profile.temperature())
    } else {
        FrostFronts::default()
    };

    Ok(LayerSummary {
        temperature,
        ice,
        moist: layer_moist.iter().copied().collect(),
        fronts,
    })
}

fn quick_flux_layers(
    column: &SoilColumn,
    profile: &NodeProfile,
    layer_moist: &[f64],
    frozen: bool,
    config: &Config,
) -> (LayerVec<f64>, LayerVec<f64>) {
    let t = profile.temperature();
    let (t0, t1, t2) = (t[0], t[1], t[t.len() - 1]);
    let dp = column.damping_depth();
    let d0 = column.layer_bottoms()[0];

    let mut temperature = LayerVec::new();
    let mut ice = LayerVec::new();
    let mut top = 0.0;
    for (l, &bottom) in column.layer_bottoms().iter().enumerate() {
        let average = if l == 0 {
            0.5 * (t0 + t1)
        } else {
            let decay = |z: f64| (-(z - d0) / dp).exp();
            t2 + (t1 - t2) * dp / (bottom - top) * (decay(top) - decay(bottom))
        };
        let layer = &column.layers()[l];
        temperature.push(average);
        ice.push(ice_content(
            average,
            layer_moist[l],
            layer.max_moist,
            layer.bubble,
            layer.expt,
            frozen,
            config.constants(),
        ));
        top = bottom;
    }
    (temperature, ice)
}

fn integrated_layers(
    column: &SoilColumn,
    profile: &NodeProfile,
    layer_moist: &[f64],
    frozen: bool,
    config: &Config,
) -> (LayerVec<f64>, LayerVec<f64>) {
    let z = column.depths();
    let t = profile.temperature();
    let n = z.len();

    // Linear interpolation, constant below the last node.
    let at = |depth: f64| -> f64 {
        if depth >= z[n - 1] {
            return t[n - 1];
        }
        let j = z.partition_point(|&zj| zj <= depth).max(1);
        let w = (depth - z[j - 1]) / (z[j] - z[j - 1]);
        t[j - 1] + w * (t[j] - t[j - 1])
    };

    let mut temperature = LayerVec::new();
    let mut ice = LayerVec::new();
    let mut top = 0.0;
    for (l, &bottom) in column.layer_bottoms().iter().enumerate() {
        let layer = &column.layers()[l];
        let thickness = bottom - top;

        // Break points: the layer edges and every node between them.
        let mut edges: SmallVec<[f64; 16]> = SmallVec::new();
        edges.push(top);
        edges.extend(z.iter().copied().filter(|&zj| zj > top && zj < bottom));
        edges.push(bottom);

        let mut heat = 0.0;
        let mut layer_ice = 0.0;
        for pair in edges.windows(2) {
            let width = pair[1] - pair[0];
            let mean = 0.5 * (at(pair[0]) + at(pair[1]));
            heat += mean * width;
            layer_ice += width
                * ice_content(
                    mean,
                    layer_moist[l],
                    layer.max_moist,
                    layer.bubble,
                    layer.expt,
                    frozen,
                    config.constants(),
                );
        }

        temperature.push(heat / thickness);
        ice.push(layer_ice / thickness);
        top = bottom;
    }
    (temperature, ice)
}

/// Scans from the bottom node up, keeping the deepest fronts of each kind.
fn frost_fronts(depths: &[f64], temperature: &[f64]) -> FrostFronts {
    let mut fronts = FrostFronts::default();
    for j in (1..depths.len()).rev() {
        let (upper, lower) = (temperature[j - 1], temperature[j]);
        let crossing = || depths[j - 1] + (depths[j] - depths[j - 1]) * upper / (upper - lower);

        if lower < 0.0 && upper >= 0.0 {
            if fronts.freezing.len() < MAX_FRONTS {
                fronts.freezing.push(crossing());
            }
        } else if lower > 0.0 && upper <= 0.0 && fronts.thawing.len() < MAX_FRONTS {
            fronts.thawing.push(crossing());
        }
    }
    fronts.freezing.reverse();
    fronts.thawing.reverse();
    fronts
}
