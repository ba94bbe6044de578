use crate::checked::{BoundArgs, CallArgs, Checked, Output};
use crate::error::UnitError;
use crate::quantity::TrackedQuantity;
use crate::store::get_registry;
use rayon::prelude::*;
use tracing::debug;

/// Evaluates `checked` once per entry of `calls` on the rayon pool.
///
/// Results come back in input order, and one failing call does not affect
/// the others. The registry is built before fan-out so workers never race
/// on first use.
pub fn run_batch<F>(checked: &Checked<F>, calls: Vec<CallArgs>) -> Vec<Result<Output, UnitError>>
where
    F: Fn(&BoundArgs) -> Result<f64, UnitError> + Sync,
{
    let registry = get_registry();
    debug!(
        function = checked.name(),
        calls = calls.len(),
        units = registry.len(),
        "starting checked batch"
    );
    calls.into_par_iter().map(|args| checked.call(args)).collect()
}

/// Converts every quantity to `unit_expr`, parsing the target once.
///
/// Fails with the error of the first quantity, in input order, whose
/// dimension does not match.
pub fn convert_all(quantities: &[TrackedQuantity], unit_expr: &str) -> Result<Vec<TrackedQuantity>, UnitError> {
    let target = get_registry().parse(unit_expr)?;
    // rayon's own `Result` collection picks an arbitrary error.
    let converted: Vec<Result<TrackedQuantity, UnitError>> = quantities
        .par_iter()
        .map(|q| q.to_unit(&target).map_err(UnitError::from))
        .collect();
    converted.into_iter().collect()
}
