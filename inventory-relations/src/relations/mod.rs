//! Relation-set reconciliation
//!
//! Editing, diffing and syncing of item <-> catalog entity associations.
//! Everything here is generic over the catalog payload; colors and
//! materials are two instantiations of the same machinery.

pub mod diff;
pub mod error;
pub mod operation;
pub mod primary;
pub mod report;
pub mod set;
pub mod sync;

pub use diff::{RelationDiff, diff};
pub use error::{PartialSyncError, SyncError};
pub use operation::{Bucket, RelationOperation, build_operations};
pub use primary::{primary_of, set_primary};
pub use report::{BucketStats, SyncFailure, SyncReport};
pub use set::RelationSet;
pub use sync::{SyncExecutor, SyncOutcome};

use crate::models::{Color, Material};

/// Colors assigned to an inventory item
pub type ItemColors = RelationSet<Color>;

/// Materials assigned to an inventory item
pub type ItemMaterials = RelationSet<Material>;
