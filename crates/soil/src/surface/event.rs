/// Which surface solve produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Search for the surface temperature, possibly on a reduced column.
    Search,
    /// Repeat search on the full column after the surface changed sign.
    Refine,
    /// Evaluation of every flux at the accepted temperature.
    Final,
}

/// Progress of a surface solve, for observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// A trial surface temperature was evaluated.
    Trial {
        stage: Stage,
        iter: usize,
        temperature: f64,
        residual: f64,
    },
    /// The search failed and the previous temperature was kept.
    Fallback { stage: Stage, temperature: f64 },
    /// The surface temperature was accepted.
    Accepted {
        temperature: f64,
        residual: f64,
        iterations: usize,
    },
}
