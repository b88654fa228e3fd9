//! Run options and physical constants.
//!
//! Everything a solve needs to know beyond its inputs lives in one immutable
//! [`Config`], passed by reference. A config is always valid: it is built
//! from [`Settings`] (directly or through serde) and checked once.
//!
//! ```
//! use tundra_soil::config::Config;
//!
//! let config = Config::from_toml_str(
//!     r#"
//!     [options]
//!     implicit = true
//!     quick_solve = true
//!
//!     [options.brackets]
//!     soil = 0.5
//!     "#,
//! )
//! .expect("valid settings");
//!
//! assert!(config.options().implicit);
//! assert_eq!(config.options().brackets.soil, 0.5);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tundra_solvers::equation::{brent, newton};

use crate::constants::PhysicalConstants;

/// Node placement within the damping depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grid {
    /// Two thin surface nodes, then evenly spaced nodes to the damping depth.
    #[default]
    Linear,
    /// Node depths grow exponentially, `z = exp(B·i) - 1`.
    Exponential,
}

/// Half-widths of the initial root-finder brackets (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Brackets {
    /// Surface temperature bracket.
    pub surface: f64,
    /// Frozen soil node bracket around the previous node temperature.
    pub soil: f64,
    /// Snowpack surface temperature bracket.
    pub snow: f64,
}

impl Default for Brackets {
    fn default() -> Self {
        Self {
            surface: 1.0,
            soil: 0.25,
            snow: 5.0,
        }
    }
}

/// Stopping rules for the explicit node sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplicitSettings {
    /// Largest node change between sweeps that counts as settled (°C).
    pub threshold: f64,
    /// Sweep cap.
    pub max_sweeps: usize,
}

impl Default for ExplicitSettings {
    fn default() -> Self {
        Self {
            threshold: 1e-2,
            max_sweeps: 1000,
        }
    }
}

/// Brent root finder settings shared by the surface, snow, and node solves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootFinderSettings {
    pub max_iters: usize,
    /// Temperature tolerance (°C).
    pub tolerance: f64,
    /// Times a non-bracketing interval is widened before giving up.
    pub max_expansions: usize,
    /// Distance each end moves per widening (°C).
    pub expansion_step: f64,
}

impl Default for RootFinderSettings {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            tolerance: 1e-7,
            max_expansions: 5,
            expansion_step: 10.0,
        }
    }
}

/// Newton–Raphson settings for the implicit profile solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtonSettings {
    pub max_iters: usize,
    /// Largest acceptable heat-balance residual (W/m³).
    pub residual_tol: f64,
    /// Largest temperature update that counts as settled (°C).
    pub step_tol: f64,
    /// Relative perturbation for Jacobian columns.
    pub perturbation: f64,
    /// Largest temperature update per iteration (°C).
    pub max_step: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iters: 50,
            residual_tol: 1e-4,
            step_tol: 1e-6,
            perturbation: 1e-6,
            max_step: 5.0,
        }
    }
}

/// Feature switches and solver settings for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Close the surface energy balance; otherwise surface temperature
    /// follows air temperature.
    pub full_energy: bool,
    /// Allow soil water to freeze.
    pub frozen_soil: bool,
    /// Use the two-node analytic ground flux instead of a node profile.
    pub quick_flux: bool,
    /// Solve the surface balance on a reduced node set, then refine.
    pub quick_solve: bool,
    /// Use the implicit (Newton) node solver instead of explicit sweeps.
    pub implicit: bool,
    /// Zero-flux bottom boundary instead of a fixed bottom temperature.
    pub no_flux: bool,
    pub grid: Grid,
    /// Continue with the previous temperature when a solve fails.
    pub fallback: bool,
    pub brackets: Brackets,
    pub explicit: ExplicitSettings,
    pub root_finder: RootFinderSettings,
    pub newton: NewtonSettings,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            full_energy: true,
            frozen_soil: true,
            quick_flux: false,
            quick_solve: false,
            implicit: false,
            no_flux: false,
            grid: Grid::Linear,
            fallback: true,
            brackets: Brackets::default(),
            explicit: ExplicitSettings::default(),
            root_finder: RootFinderSettings::default(),
            newton: NewtonSettings::default(),
        }
    }
}

/// Unvalidated configuration, as written in a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub options: Options,
    pub constants: PhysicalConstants,
}

/// Errors raised while reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} must be finite and positive")]
    NonPositive { name: &'static str },

    #[error("quick flux needs a fixed-temperature bottom and a linear grid")]
    QuickFluxLayout,

    #[error("root finder settings: {0}")]
    RootFinder(#[from] brent::ConfigError),

    #[error("newton settings: {0}")]
    Newton(#[from] newton::ConfigError),
}

/// Validated, immutable configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Settings")]
pub struct Config {
    options: Options,
    constants: PhysicalConstants,
    root_finder: brent::Config,
    newton: newton::Config,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, expect is safe
        Self::new(Options::default(), PhysicalConstants::default())
            .expect("default settings are valid")
    }
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        Self::new(settings.options, settings.constants)
    }
}

impl Config {
    /// Validates options and constants.
    ///
    /// # Errors
    ///
    /// Returns an error if a bracket, threshold, or physical constant is not
    /// positive, if solver settings are invalid, or if quick flux is combined
    /// with a zero-flux bottom or an exponential grid.
    pub fn new(options: Options, constants: PhysicalConstants) -> Result<Self, ConfigError> {
        positive("brackets.surface", options.brackets.surface)?;
        positive("brackets.soil", options.brackets.soil)?;
        positive("brackets.snow", options.brackets.snow)?;
        positive("explicit.threshold", options.explicit.threshold)?;
        if options.explicit.max_sweeps == 0 {
            return Err(ConfigError::NonPositive {
                name: "explicit.max_sweeps",
            });
        }
        positive("constants.latent_heat_fusion", constants.latent_heat_fusion)?;
        positive("constants.water_density", constants.water_density)?;
        positive("constants.ice_density", constants.ice_density)?;
        positive("constants.gravity", constants.gravity)?;

        if options.quick_flux && (options.no_flux || options.grid == Grid::Exponential) {
            return Err(ConfigError::QuickFluxLayout);
        }

        let rf = options.root_finder;
        let root_finder = brent::Config::new(rf.max_iters, rf.tolerance, 3e-16)?
            .with_expansion(rf.max_expansions, rf.expansion_step)?;

        let nw = options.newton;
        let newton = newton::Config::new(nw.max_iters, nw.residual_tol, nw.step_tol, nw.perturbation)?
            .with_max_step(nw.max_step)?;

        Ok(Self {
            options,
            constants,
            root_finder,
            newton,
        })
    }

    /// Parses and validates TOML settings.
    ///
    /// Missing tables and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML, names unknown keys,
    /// or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        Self::try_from(settings)
    }

    /// Returns a copy with different options, revalidated.
    ///
    /// # Errors
    ///
    /// See [`Config::new`].
    pub fn with_options(&self, options: Options) -> Result<Self, ConfigError> {
        Self::new(options, self.constants)
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Returns the Brent settings derived from [`Options::root_finder`].
    #[must_use]
    pub fn root_finder(&self) -> &brent::Config {
        &self.root_finder
    }

    /// Returns the Newton settings derived from [`Options::newton`].
    #[must_use]
    pub fn newton(&self) -> &newton::Config {
        &self.newton
    }

    /// Returns the settings this config was built from.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            options: self.options,
            constants: self.constants,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = Config::from_toml_str("").expect("defaults");
        assert_eq!(config, Config::default());
        assert!(config.options().full_energy);
        assert!(!config.options().implicit);
        assert_relative_eq!(config.options().brackets.surface, 1.0);
        assert_relative_eq!(config.constants().kelvin, 273.15);
    }

    #[test]
    fn toml_overrides_nested_values() {
        let config = Config::from_toml_str(
            r#"
            [options]
            no_flux = true
            grid = "exponential"

            [options.explicit]
            max_sweeps = 10

            [constants]
            ice_density = 920.0
            "#,
        )
        .expect("valid");

        assert!(config.options().no_flux);
        assert_eq!(config.options().grid, Grid::Exponential);
        assert_eq!(config.options().explicit.max_sweeps, 10);
        assert_relative_eq!(config.options().explicit.threshold, 1e-2);
        assert_relative_eq!(config.constants().ice_density, 920.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = Config::from_toml_str("[options]\nturbo = true\n").expect_err("unknown");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn non_positive_bracket_is_rejected() {
        let error = Config::from_toml_str("[options.brackets]\nsoil = 0.0\n").expect_err("zero");
        assert!(matches!(
            error,
            ConfigError::NonPositive {
                name: "brackets.soil"
            }
        ));
    }

    #[test]
    fn quick_flux_needs_fixed_bottom() {
        let options = Options {
            quick_flux: true,
            no_flux: true,
            ..Options::default()
        };
        let error = Config::new(options, PhysicalConstants::default()).expect_err("layout");
        assert!(matches!(error, ConfigError::QuickFluxLayout));
    }

    #[test]
    fn solver_settings_are_carried_over() {
        let mut options = Options::default();
        options.root_finder.max_iters = 42;
        options.newton.max_iters = 7;
        let config = Config::new(options, PhysicalConstants::default()).expect("valid");

        assert_eq!(config.root_finder().max_iters(), 42);
        assert_eq!(config.root_finder().max_expansions(), 5);
        assert_eq!(config.newton().max_iters(), 7);
        assert_relative_eq!(config.newton().max_step(), 5.0);
    }

    #[test]
    fn invalid_newton_settings_surface_as_config_errors() {
        let mut options = Options::default();
        options.newton.perturbation = 0.0;
        let error = Config::new(options, PhysicalConstants::default()).expect_err("invalid");
        assert!(matches!(error, ConfigError::Newton(_)));
    }
}
