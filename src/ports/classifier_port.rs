//! External classification collaborator port.

use crate::domain::classification::{Classification, ClassificationRequest};
use crate::domain::error::LedgerError;

/// Proposes a column mapping for headers the pattern layer could not handle.
///
/// Implementations may time out, fail, or return nonsense; the ingest
/// pipeline treats any `Err` as "no suggestion".
pub trait ClassifierPort {
    fn propose(&self, request: &ClassificationRequest) -> Result<Classification, LedgerError>;
}
