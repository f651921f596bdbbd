//! Target addresses and memory region types

use serde::{Deserialize, Serialize};

/// An address in a target's logical address space.
///
/// Targets with narrower pointers (the Dolphin guest is 32-bit) report their
/// width through `ScannerTarget::pointer_size`; the host-side type is wide
/// enough for any supported guest.
pub type Address = usize;

/// Identifier used to select a target instance at attach time
pub type ProcessId = u32;

/// Description of one region of a target's address space
///
/// `allocation_end` is the address of the last byte in the region,
/// i.e. `allocation_base + allocation_size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryInformation {
    pub allocation_base: Address,
    pub allocation_size: usize,
    pub allocation_end: Address,
    pub is_committed: bool,
    pub is_module: bool,
    pub is_mirror: bool,
    pub is_mapped_image: bool,
    pub is_mapped: bool,
    pub is_writeable: bool,
    pub is_executable: bool,
}

impl MemoryInformation {
    /// Whether `address` falls inside this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.allocation_base && address <= self.allocation_end
    }
}
