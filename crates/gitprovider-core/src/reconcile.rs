//! The reconciliation engine.
//!
//! One algorithm for every resource kind and every backend:
//!
//! ```text
//! Unknown --validate+default--> Failed (invalid desired state, no calls made)
//!    |
//!   get --NotFound--> create ------> Created
//!    |  --other error-------------> Failed
//!    v
//! Fetched --equal--> NoOp
//!    |
//!   set + update -----------------> Updated
//! ```
//!
//! At most one write (create or update) happens per call, and nothing is
//! retried.

use std::fmt;

use tracing::{debug, info};

use crate::client::{ResourceClient, ResourceObject};
use crate::error::Result;
use crate::info::{validate_and_default_info, InfoRequest};

/// What a reconcile call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The resource did not exist and was created
    Created,
    /// The resource differed and was updated
    Updated,
    /// The resource already matched
    NoOp,
}

impl ReconcileOutcome {
    pub fn action_taken(&self) -> bool {
        !matches!(self, ReconcileOutcome::NoOp)
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::NoOp => "noop",
        };
        f.write_str(name)
    }
}

/// The resource as it stands after reconciliation.
#[derive(Debug)]
pub struct Reconciled<R> {
    pub resource: R,
    pub outcome: ReconcileOutcome,
}

impl<R> Reconciled<R> {
    pub fn action_taken(&self) -> bool {
        self.outcome.action_taken()
    }
}

/// Converge the resource at `reference` to `desired`.
///
/// Validation happens before any backend call. `get` must succeed or fail
/// with `NotFound`; every other error is returned unchanged.
pub async fn reconcile<C>(
    client: &C,
    reference: &C::Ref,
    desired: C::Info,
    options: C::CreateOptions,
) -> Result<Reconciled<C::Resource>>
where
    C: ResourceClient + ?Sized,
{
    let desired = validate_and_default_info(desired)?;

    let mut actual = match client.get(reference).await {
        Ok(actual) => actual,
        Err(e) if e.is_not_found() => {
            debug!(reference = ?reference, "Resource absent, creating");
            let resource = client.create(reference, desired, options).await?;
            info!(reference = ?reference, outcome = %ReconcileOutcome::Created, "Reconciled");
            return Ok(Reconciled {
                resource,
                outcome: ReconcileOutcome::Created,
            });
        }
        Err(e) => return Err(e),
    };
    debug!(reference = ?reference, "Resource fetched");

    if desired.equals(&actual.get()) {
        debug!(reference = ?reference, outcome = %ReconcileOutcome::NoOp, "Reconciled");
        return Ok(Reconciled {
            resource: actual,
            outcome: ReconcileOutcome::NoOp,
        });
    }

    actual.set(desired)?;
    actual.update().await?;
    info!(reference = ?reference, outcome = %ReconcileOutcome::Updated, "Reconciled");

    Ok(Reconciled {
        resource: actual,
        outcome: ReconcileOutcome::Updated,
    })
}
