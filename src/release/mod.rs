//! Rolling a running service onto a new image
//!
//! [`ReleaseUpdater`] reads the current task definition from a
//! [`ReleaseTarget`], swaps in the new image and tier sizing, registers and
//! activates the result, then polls the instance counts. A rollout that never
//! settles within the polling budget is reported, not treated as an error.

mod definition;
mod ecs;
mod updater;

pub use definition::{substitute_image, READ_ONLY_FIELDS};
pub use ecs::EcsReleaseTarget;
pub use updater::{ReleaseError, ReleaseReport, ReleaseTarget, ReleaseUpdater, ServiceCounts};
