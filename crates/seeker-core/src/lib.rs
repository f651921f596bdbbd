//! Seeker Core Engine
//!
//! The scanning core: the `ScanVariant` value model with its comparator
//! algebra, the `ScannerTarget` address-space abstraction, the Dolphin
//! shared-memory target, and the dynamic-value bridge exposed to user
//! scripts.
//!
//! The engine is single-threaded cooperative: no operation suspends and no
//! locks are taken internally. A driver may parallelize chunk scanning by
//! giving each worker a prepared, immutable variant and a disjoint buffer.

pub mod script;
pub mod target;
pub mod variant;

pub use seeker_common::{Error, Result};
pub use target::dolphin::ScannerTargetDolphin;
pub use target::{RegionQuery, ScannerTarget};
pub use variant::traits::{traits_for, TypeTraits};
pub use variant::{Scalar, ScanValue, ScanVariant, UnderlyingType, VariantType};
