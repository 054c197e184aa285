pub mod models;
pub mod reconciler;

pub use models::{Propagation, PropagationErrorKind, ReconcileOutcome, ReconcileRequest};
pub use reconciler::{ReconcileError, Reconciler};
