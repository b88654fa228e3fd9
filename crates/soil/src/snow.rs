//! Snowpack state and the mass update that follows a surface solve.

use crate::{constants::PhysicalConstants, vapor::VaporPartition};

/// Density of water used to convert snow water equivalent to depth (kg/m³).
const SWQ_DEPTH_DENSITY: f64 = 1000.0;

/// State of a snowpack.
///
/// Water quantities are depths of liquid water equivalent in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowState {
    /// Snow water equivalent of the whole pack.
    pub swq: f64,
    /// Snow water equivalent of the surface layer.
    pub surface_swq: f64,
    /// Bulk density (kg/m³).
    pub density: f64,
    /// Depth (m).
    pub depth: f64,
    /// Surface layer temperature (°C).
    pub surface_temperature: f64,
    /// Pack layer temperature (°C).
    pub pack_temperature: f64,
    /// Liquid water in the surface layer.
    pub surface_water: f64,
    /// Liquid water in the pack layer.
    pub pack_water: f64,
    /// Fraction of the cell covered by snow.
    pub coverage: f64,
    /// Cold content of the surface layer (J/m²).
    pub cold_content: f64,
}

impl SnowState {
    /// Whether any snow is on the ground.
    #[must_use]
    pub fn has_snow(&self) -> bool {
        self.swq > 0.0
    }
}

/// Result of [`apply_snow_mass_balance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowMassBalance {
    pub state: SnowState,
    /// Vapor exchange after clipping to the available snow.
    pub partition: VaporPartition,
    /// Refreeze energy after clipping to the available liquid water (W/m²).
    /// Negative values are energy spent on melt.
    pub refreeze_energy: f64,
    /// Melt this step (m).
    pub melt: f64,
}

/// Updates a snowpack for vapor exchange, refreezing, and melt.
///
/// Sublimation cannot remove more than the pack holds; when it would, the
/// total and blowing exchange are scaled back together. Positive refreeze
/// energy freezes surface water, limited to what is there, with no melt.
/// Negative refreeze energy melts snow, limited to the pack. A pack that
/// survives is capped at 0 °C and its depth, cold content, and coverage are
/// recomputed; a pack that disappears is reset.
#[must_use]
pub fn apply_snow_mass_balance(
    snow: &SnowState,
    vapor: VaporPartition,
    refreeze_energy: f64,
    surface_temperature: f64,
    dt: f64,
    constants: &PhysicalConstants,
) -> SnowMassBalance {
    let mut state = *snow;
    let mut partition = vapor;
    let latent_per_metre = constants.latent_heat_fusion * constants.water_density / dt;

    if -partition.vapor > state.swq {
        partition.blowing *= -(state.swq / partition.vapor);
        partition.vapor = -state.swq;
        partition.surface = partition.vapor - partition.blowing;
    }

    state.swq += partition.vapor;
    state.surface_water = (state.surface_water + partition.vapor).max(0.0);

    let mut refreeze_energy = refreeze_energy;
    let mut melt = 0.0;
    if refreeze_energy >= 0.0 {
        let mut refrozen = refreeze_energy / latent_per_metre;
        if refrozen > state.surface_water {
            refrozen = state.surface_water;
            refreeze_energy = refrozen * latent_per_metre;
        }
        state.surface_water = (state.surface_water - refrozen).max(0.0);
    } else {
        melt = refreeze_energy.abs() / latent_per_metre;
        state.swq -= melt;
        if state.swq < 0.0 {
            melt += state.swq;
            state.swq = 0.0;
        }
    }

    if state.swq > 0.0 {
        state.surface_temperature = surface_temperature.min(0.0);
        state.cold_content = constants.volumetric_heat_ice * state.surface_temperature * state.swq;
        if state.density > 0.0 {
            state.depth = SWQ_DEPTH_DENSITY * state.swq / state.density;
        }
        state.coverage = 1.0;
    } else {
        state = SnowState::default();
    }

    SnowMassBalance {
        state,
        partition,
        refreeze_energy,
        melt,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use approx::assert_relative_eq;

    pub(crate) fn thin_pack() -> SnowState {
        SnowState {
            swq: 0.02,
            surface_swq: 0.02,
            density: 200.0,
            depth: 0.1,
            surface_temperature: -1.0,
            pack_temperature: -1.0,
            surface_water: 0.001,
            pack_water: 0.0,
            coverage: 1.0,
            cold_content: 0.0,
        }
    }

    #[test]
    fn refreeze_is_clipped_to_surface_water() {
        let c = PhysicalConstants::default();
        let pack = thin_pack();
        let dt = 3600.0;
        let capacity = pack.surface_water * c.latent_heat_fusion * c.water_density / dt;

        let result =
            apply_snow_mass_balance(&pack, VaporPartition::default(), 10.0 * capacity, -2.0, dt, &c);

        assert_relative_eq!(result.melt, 0.0);
        assert_relative_eq!(result.refreeze_energy, capacity, max_relative = 1e-12);
        assert_relative_eq!(result.state.surface_water, 0.0);
        assert_relative_eq!(result.state.swq, 0.02);
        assert_relative_eq!(result.state.surface_temperature, -2.0);
    }

    #[test]
    fn melt_is_clipped_to_the_pack() {
        let c = PhysicalConstants::default();
        let pack = thin_pack();

        let result =
            apply_snow_mass_balance(&pack, VaporPartition::default(), -1e6, 0.0, 3600.0, &c);

        assert_relative_eq!(result.melt, 0.02, max_relative = 1e-12);
        assert_eq!(result.state, SnowState::default());
    }

    #[test]
    fn sublimation_cannot_exceed_the_pack() {
        let c = PhysicalConstants::default();
        let pack = thin_pack();
        let vapor = VaporPartition {
            vapor: -0.04,
            blowing: -0.01,
            surface: -0.03,
        };

        let result = apply_snow_mass_balance(&pack, vapor, 0.0, -3.0, 3600.0, &c);

        assert_relative_eq!(result.partition.vapor, -0.02);
        assert_relative_eq!(result.partition.blowing, -0.005);
        assert_relative_eq!(result.partition.surface, -0.015);
        assert_relative_eq!(result.state.swq, 0.0);
    }

    #[test]
    fn surviving_pack_is_capped_at_freezing() {
        let c = PhysicalConstants::default();
        let result =
            apply_snow_mass_balance(&thin_pack(), VaporPartition::default(), 0.0, 1.5, 3600.0, &c);

        assert_relative_eq!(result.state.surface_temperature, 0.0);
        assert_relative_eq!(result.state.depth, 0.1);
        assert_relative_eq!(result.state.coverage, 1.0);
        assert_relative_eq!(result.state.cold_content, 0.0);
    }
}
