//! Entry points a dataflow engine drives besides the plain one-shot call.

/// Folds batches of one group into a running result.
///
/// The state lives in the implementing value, owned by whoever drives the
/// group. `reset` returns it to the state of a fresh value.
pub trait Accumulator {
    type Batch;
    type Output;

    fn accumulate(&mut self, batch: Self::Batch);

    /// Result over everything accumulated since the last reset, or `None`
    /// if nothing has been accumulated.
    fn current_value(&self) -> Option<Self::Output>;

    fn reset(&mut self);
}

/// A function that can be evaluated as a tree of partial reductions.
///
/// `initial` runs on the leaves, `intermediate` merges partials into a new
/// partial any number of times and `finalize` merges the last layer into the
/// result.
pub trait Algebraic {
    type Record;
    type Partial;
    type Output;

    fn initial(&self, bag: &[Self::Record]) -> Option<Self::Partial>;

    fn intermediate(&self, partials: Vec<Self::Partial>) -> Option<Self::Partial>;

    fn finalize(&self, partials: Vec<Self::Partial>) -> Option<Self::Output>;
}
