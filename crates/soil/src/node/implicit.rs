use tundra_solvers::equation::newton;

use crate::{config::Config, error::ThermalError};

use super::{
    NodeSolution, ProfileRequest, ProfileResidual, finish, frozen_soil_active,
    initial_temperatures,
};

pub(super) fn solve(
    request: &ProfileRequest<'_>,
    config: &Config,
) -> Result<NodeSolution, ThermalError> {
    let system = ProfileResidual::new(
        request,
        frozen_soil_active(request.column(), config),
        config.constants(),
    );
    let (mut t, mut fallbacks) = initial_temperatures(request);
    let end = request.unknowns_end();

    match newton::solve_unobserved(&system, &system.initial(), config.newton()) {
        Ok(solution) => {
            t[1..end].copy_from_slice(&solution.x);
            Ok(finish(request, config, &t, fallbacks, solution.iters))
        }
        Err(_) if config.options().fallback => {
            for events in &mut fallbacks[1..end] {
                *events += 1;
            }
            Ok(finish(request, config, &t, fallbacks, config.newton().max_iters()))
        }
        Err(error) => Err(ThermalError::ProfileUnconverged(error)),
    }
}
