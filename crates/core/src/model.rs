/// A callable model that maps an input to an output.
///
/// Models are evaluated repeatedly by solvers with trial inputs, so `call`
/// takes `&self` and must not mutate shared state between evaluations.
pub trait Model {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Calls the model with the given input.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// A captured input/output pair from a model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot<I, O> {
    pub input: I,
    pub output: O,
}

impl<I, O> Snapshot<I, O> {
    /// Creates a new snapshot from input and output values.
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    struct Doubler;

    impl Model for Doubler {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&self, input: &f64) -> Result<f64, Infallible> {
            Ok(2.0 * input)
        }
    }

    #[test]
    fn snapshot_keeps_input_and_output() {
        let model = Doubler;
        let output = model.call(&1.5).expect("infallible");
        let snapshot = Snapshot::new(1.5, output);

        assert_eq!(snapshot, Snapshot { input: 1.5, output: 3.0 });
    }
}
