//! Thermal and hydraulic properties of soil, air, and snow.
//!
//! Every function here is pure and works in plain SI `f64` values with
//! temperatures in degrees Celsius.

use crate::constants::PhysicalConstants;

/// Critical bulk Richardson number for stable conditions.
const RI_CRITICAL: f64 = 0.2;

/// Johansen (1975) dry-soil and component conductivities (W/m/K).
const K_WATER: f64 = 0.57;
const K_ICE: f64 = 2.2;
const K_QUARTZ: f64 = 7.7;
const K_DRY_ORGANIC: f64 = 0.05;
const K_SOLID_ORGANIC: f64 = 0.25;

/// Soil texture and density parameters of one layer.
///
/// Densities are in kg/m³. `quartz` and `organic` are mass fractions.
/// The `*_mineral` densities describe the mineral fraction alone.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SoilTexture {
    pub quartz: f64,
    pub organic: f64,
    pub bulk_density: f64,
    pub soil_density: f64,
    pub bulk_density_mineral: f64,
    pub soil_density_mineral: f64,
}

impl SoilTexture {
    /// Volume fraction occupied by solids.
    #[must_use]
    pub fn solid_fraction(&self) -> f64 {
        self.bulk_density / self.soil_density
    }

    /// Volume fraction available to water, ice, and air.
    #[must_use]
    pub fn porosity(&self) -> f64 {
        1.0 - self.solid_fraction()
    }
}

/// Maximum liquid water that can coexist with ice at `temperature`.
///
/// Freezing-point depression after Flerchinger and Saxton (1989): below 0 °C
/// the unfrozen content follows the soil water retention curve evaluated at
/// the matric potential in equilibrium with ice. `max_moist` and the result
/// are volumetric fractions; `bubble` is the bubbling pressure in cm and
/// `expt` the Brooks–Corey exponent. The result is clamped to
/// `[0, max_moist]`, and equals `max_moist` at or above 0 °C.
#[must_use]
pub fn maximum_unfrozen_water(
    temperature: f64,
    max_moist: f64,
    bubble: f64,
    expt: f64,
    constants: &PhysicalConstants,
) -> f64 {
    if temperature >= 0.0 {
        return max_moist;
    }
    let potential = (-constants.latent_heat_fusion * temperature)
        / (temperature + constants.kelvin)
        / (constants.gravity * bubble / 100.0);
    let unfrozen = max_moist * potential.powf(-2.0 / (expt - 3.0));
    unfrozen.clamp(0.0, max_moist)
}

/// Ice content of soil holding `moist` total water at `temperature`.
///
/// Zero when frozen soil is inactive or the soil is not below freezing.
#[must_use]
pub fn ice_content(
    temperature: f64,
    moist: f64,
    max_moist: f64,
    bubble: f64,
    expt: f64,
    frozen_soil: bool,
    constants: &PhysicalConstants,
) -> f64 {
    if !frozen_soil || temperature >= 0.0 {
        return 0.0;
    }
    let unfrozen = maximum_unfrozen_water(temperature, max_moist, bubble, expt, constants);
    (moist - unfrozen).clamp(0.0, moist.max(0.0))
}

/// Soil thermal conductivity (W/m/K) by the Johansen (1975) method.
///
/// `moist` is the total volumetric water content and `liquid` its unfrozen
/// part. Organic matter mixes into both the dry and the solid conductivity
/// in proportion to its mass fraction.
#[must_use]
pub fn soil_conductivity(moist: f64, liquid: f64, texture: &SoilTexture) -> f64 {
    let bulk_min = texture.bulk_density_mineral;
    let dry_mineral = (0.135 * bulk_min + 64.7) / (texture.soil_density_mineral - 0.947 * bulk_min);
    let dry = mix(dry_mineral, K_DRY_ORGANIC, texture.organic);

    if moist <= 0.0 {
        return dry;
    }

    let porosity = texture.porosity();
    let saturation = moist / porosity;

    let other_minerals: f64 = if texture.quartz < 0.2 { 3.0 } else { 2.0 };
    let solid_mineral = K_QUARTZ.powf(texture.quartz) * other_minerals.powf(1.0 - texture.quartz);
    let solid = mix(solid_mineral, K_SOLID_ORGANIC, texture.organic);

    #[allow(clippy::float_cmp)]
    let (kersten, saturated) = if liquid == moist {
        (
            0.7 * saturation.log10() + 1.0,
            solid.powf(1.0 - porosity) * K_WATER.powf(porosity),
        )
    } else {
        (
            saturation,
            solid.powf(1.0 - porosity) * K_ICE.powf(porosity - liquid) * K_WATER.powf(liquid),
        )
    };

    ((saturated - dry) * kersten.max(0.0) + dry).max(dry)
}

/// Volumetric heat capacity (J/m³/K) of a soil mixture after de Vries (1963).
///
/// Fractions are by volume; air fills whatever solids, water, and ice leave.
#[must_use]
pub fn volumetric_heat_capacity(
    solid_fraction: f64,
    water_fraction: f64,
    ice_fraction: f64,
    organic: f64,
) -> f64 {
    let air_fraction = 1.0 - (solid_fraction + water_fraction + ice_fraction);
    2.0e6 * solid_fraction * (1.0 - organic)
        + 2.7e6 * solid_fraction * organic
        + 4.2e6 * water_fraction
        + 1.9e6 * ice_fraction
        + 1.3e3 * air_fraction
}

/// Multiplier for the neutral aerodynamic conductance.
///
/// Uses the bulk Richardson number between `reference_height` and the
/// surface. Stable conditions (`Ri > 0`) reduce exchange as
/// `(1 - Ri/0.2)²`, with `Ri` capped where the correction would otherwise
/// reverse; unstable conditions enhance it as `sqrt(1 - 16 Ri)` with
/// `Ri >= -0.5`. Divide the neutral resistance by the result.
#[must_use]
pub fn stability_correction(
    reference_height: f64,
    displacement: f64,
    surface_temperature: f64,
    air_temperature: f64,
    wind: f64,
    roughness: f64,
    constants: &PhysicalConstants,
) -> f64 {
    #[allow(clippy::float_cmp)]
    if surface_temperature == air_temperature {
        return 1.0;
    }

    let air_k = air_temperature + constants.kelvin;
    let mean_k = (air_k + surface_temperature + constants.kelvin) / 2.0;
    let height = reference_height - displacement;

    let ri = constants.gravity * (air_temperature - surface_temperature) * height
        / (mean_k * wind * wind);
    let ri_limit = air_k / (mean_k * ((height / roughness).ln() + 5.0));
    let ri = ri.min(ri_limit);

    if ri > 0.0 {
        (1.0 - ri / RI_CRITICAL).powi(2)
    } else {
        (1.0 - 16.0 * ri.max(-0.5)).sqrt()
    }
}

/// Saturated vapor pressure (kPa) over water, or over ice below 0 °C.
#[must_use]
pub fn saturated_vapor_pressure(temperature: f64) -> f64 {
    let over_water = 0.610_78 * (17.269 * temperature / (237.3 + temperature)).exp();
    if temperature < 0.0 {
        over_water * (1.0 + 0.00972 * temperature + 0.000_042 * temperature * temperature)
    } else {
        over_water
    }
}

/// Latent heat of vaporization (J/kg).
#[must_use]
pub fn latent_heat_vaporization(temperature: f64) -> f64 {
    2.501e6 - 0.002_361e6 * temperature
}

/// Latent heat of sublimation (J/kg), after Bras (1990).
#[must_use]
pub fn latent_heat_sublimation(temperature: f64) -> f64 {
    const JOULES_PER_CAL: f64 = 4.1868;
    (677.0 - 0.07 * temperature) * JOULES_PER_CAL * 1000.0
}

/// Inputs to [`estimate_t1`].
///
/// Layer 1 is the thin surface layer of thickness `d1`; layer 2 the layer of
/// thickness `d2` beneath it. `damping_depth` is where the soil temperature
/// is held at `t2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLayerColumn {
    pub d1: f64,
    pub d2: f64,
    pub kappa1: f64,
    pub kappa2: f64,
    pub heat_capacity2: f64,
    pub damping_depth: f64,
}

/// Temperature at the base of the surface layer (°C).
///
/// Closed-form two-layer solution of Liang et al. (1999) used by quick flux:
/// `surface` is the trial surface temperature, `previous` the temperature
/// at the same depth one step earlier, and `deep` the fixed temperature at
/// the damping depth.
#[must_use]
pub fn estimate_t1(
    surface: f64,
    previous: f64,
    deep: f64,
    column: &TwoLayerColumn,
    dt: f64,
) -> f64 {
    let TwoLayerColumn {
        d1,
        d2,
        kappa1,
        kappa2,
        heat_capacity2,
        damping_depth: dp,
    } = *column;

    let decay1 = (-d1 / dp).exp();
    let decay2 = (-d2 / dp).exp();

    let c1 = heat_capacity2 * dp / d2 * (1.0 - decay2);
    let c2 = -(1.0 - (d1 / dp).exp()) * decay2;
    let c3 = kappa1 / d1 - kappa2 / d1 + kappa2 / d1 * decay1;

    let numerator = kappa1 / 2.0 / d1 / d2 * surface
        + c1 / dt * previous
        + (2.0 * c2 - 1.0 + decay1) * kappa2 / 2.0 / d1 / d2 * deep;
    let denominator = c1 / dt + kappa2 / d1 / d2 * c2 + c3 / 2.0 / d2;

    numerator / denominator
}

fn mix(mineral: f64, organic_value: f64, organic: f64) -> f64 {
    if organic > 0.0 {
        (1.0 - organic) * mineral + organic * organic_value
    } else {
        mineral
    }
}
