//! Structured records of the state behind a failed solve.
//!
//! Each record implements [`Display`] as one `name = value` line per field,
//! so a caller can write it to whatever log or report it keeps.

use std::fmt::{self, Display, Formatter};

use crate::{
    column::NodeVec,
    snow::SnowState,
    surface::{Aerodynamics, Forcing, GroundState},
};

/// State of a soil node whose phase-change equation could not be solved.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDiagnostics {
    pub node: usize,
    /// Temperature of the node below (°C).
    pub t_lower: f64,
    /// Temperature of the node above (°C).
    pub t_upper: f64,
    /// Temperature at the start of the step (°C).
    pub t_previous: f64,
    pub moist: f64,
    pub max_moist: f64,
    pub bubble: f64,
    pub expt: f64,
    /// Ice at the start of the step.
    pub ice: f64,
    pub gamma: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl Display for NodeDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "node = {}", self.node)?;
        lines(
            f,
            &[
                ("TL", self.t_lower),
                ("TU", self.t_upper),
                ("T0", self.t_previous),
                ("moist", self.moist),
                ("max_moist", self.max_moist),
                ("bubble", self.bubble),
                ("expt", self.expt),
                ("ice0", self.ice),
                ("gamma", self.gamma),
                ("A", self.a),
                ("B", self.b),
                ("C", self.c),
                ("D", self.d),
                ("E", self.e),
            ],
        )
    }
}

/// Inputs of a surface balance that could not be closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDiagnostics {
    /// Interval searched for the surface temperature (°C).
    pub bracket: [f64; 2],
    /// Nodes in the column being solved.
    pub nodes: usize,
    pub no_flux: bool,
    /// Time step (s).
    pub dt: f64,
    pub ground: GroundState,
    pub forcing: Forcing,
    pub aerodynamics: Aerodynamics,
    pub snow: Option<SnowState>,
    /// Node temperatures at the start of the step (°C).
    pub temperatures: NodeVec<f64>,
}

impl Display for SurfaceDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        lines(
            f,
            &[
                ("T_lower", self.bracket[0]),
                ("T_upper", self.bracket[1]),
                ("delta_t", self.dt),
            ],
        )?;
        writeln!(f, "Nnodes = {}", self.nodes)?;
        writeln!(f, "NOFLUX = {}", self.no_flux)?;
        ground(f, &self.ground)?;
        forcing(f, &self.forcing)?;
        aerodynamics(f, &self.aerodynamics)?;
        match &self.snow {
            Some(snow) => self::snow(f, snow)?,
            None => writeln!(f, "INCLUDE_SNOW = false")?,
        }
        for (j, t) in self.temperatures.iter().enumerate() {
            writeln!(f, "T_node[{j}] = {t}")?;
        }
        Ok(())
    }
}

/// Inputs of a snowpack surface balance that could not be closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowDiagnostics {
    pub bracket: [f64; 2],
    pub dt: f64,
    /// Temperature of the ground below the pack (°C).
    pub ground_temperature: f64,
    pub forcing: Forcing,
    pub aerodynamics: Aerodynamics,
    pub snow: SnowState,
}

impl Display for SnowDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        lines(
            f,
            &[
                ("T_lower", self.bracket[0]),
                ("T_upper", self.bracket[1]),
                ("delta_t", self.dt),
                ("TGrnd", self.ground_temperature),
            ],
        )?;
        forcing(f, &self.forcing)?;
        aerodynamics(f, &self.aerodynamics)?;
        snow(f, &self.snow)
    }
}

/// Either kind of surface failure record.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostics {
    Surface(Box<SurfaceDiagnostics>),
    Snow(Box<SnowDiagnostics>),
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(d) => Display::fmt(d, f),
            Self::Snow(d) => Display::fmt(d, f),
        }
    }
}

fn lines(f: &mut Formatter<'_>, values: &[(&str, f64)]) -> fmt::Result {
    for (name, value) in values {
        writeln!(f, "{name} = {value}")?;
    }
    Ok(())
}

fn ground(f: &mut Formatter<'_>, g: &GroundState) -> fmt::Result {
    lines(
        f,
        &[
            ("Ts_old", g.ts_old),
            ("T1_old", g.t1_old),
            ("T2", g.deep),
            ("kappa1", g.kappa1),
            ("kappa2", g.kappa2),
            ("Cs1", g.cs1),
            ("Cs2", g.cs2),
            ("D1", g.d1),
            ("D2", g.d2),
            ("dp", g.damping_depth),
            ("moist", g.moist),
            ("ice0", g.ice0),
            ("max_moist", g.max_moist),
            ("bubble", g.bubble),
            ("expt", g.expt),
        ],
    )
}

fn forcing(f: &mut Formatter<'_>, w: &Forcing) -> fmt::Result {
    lines(
        f,
        &[
            ("Tair", w.air_temperature),
            ("atmos_density", w.air_density),
            ("atmos_pressure", w.pressure),
            ("vp", w.vapor_pressure),
            ("vpd", w.vapor_pressure_deficit),
            ("NetShortBare", w.net_short_bare),
            ("NetShortSnow", w.net_short_snow),
            ("LongBareIn", w.long_bare_in),
            ("LongSnowIn", w.long_snow_in),
            ("rainfall", w.rain),
            ("wind_speed", w.wind),
        ],
    )
}

fn aerodynamics(f: &mut Formatter<'_>, a: &Aerodynamics) -> fmt::Result {
    lines(
        f,
        &[
            ("ref_height", a.reference_height),
            ("displacement", a.displacement),
            ("roughness", a.roughness),
            ("snow_roughness", a.snow_roughness),
            ("aero_resist", a.resistance),
            ("emissivity", a.emissivity),
        ],
    )
}

fn snow(f: &mut Formatter<'_>, s: &SnowState) -> fmt::Result {
    lines(
        f,
        &[
            ("snow_swq", s.swq),
            ("snow_surface_swq", s.surface_swq),
            ("snow_density", s.density),
            ("snow_depth", s.depth),
            ("Tsnow_surf", s.surface_temperature),
            ("TPack", s.pack_temperature),
            ("snow_water", s.surface_water),
            ("pack_water", s.pack_water),
            ("snow_coverage", s.coverage),
            ("cold_content", s.cold_content),
        ],
    )
}
