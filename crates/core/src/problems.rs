mod equation;
mod system;

pub use equation::EquationProblem;
pub use system::ResidualSystem;
