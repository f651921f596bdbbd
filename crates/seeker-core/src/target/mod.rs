//! Scanner target abstraction
//!
//! A target is an address space the scanner attaches to: a native process,
//! or an emulator exposing its guest memory. Implementations provide region
//! enumeration and raw I/O; everything above them is target-agnostic.

pub mod dolphin;
mod shm;

use seeker_common::{Address, MemoryInformation, ProcessId, Result};

/// Result of a region query: the region containing the probed address (or,
/// when the address falls in a gap, the next region above it) and the next
/// address worth probing.
///
/// `region` is `None` once the address lies past the last region; then
/// `next_address` is the target's highest address and enumeration stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionQuery {
    pub region: Option<MemoryInformation>,
    pub next_address: Address,
}

/// Uniform view over a target's address space
pub trait ScannerTarget {
    /// Bind to a target instance. Idempotent: attaching an already-attached
    /// target succeeds without side effects.
    fn attach(&mut self, process: ProcessId) -> Result<()>;

    /// Release all resources. Safe to call on an unattached instance.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Report the region containing `address`, or the next one above it
    fn query_memory(&self, address: Address) -> Result<RegionQuery>;

    /// Read up to `buffer.len()` bytes at `address`, truncating to the
    /// containing region's remaining length. Returns the bytes copied.
    fn raw_read(&self, address: Address, buffer: &mut [u8]) -> Result<usize>;

    /// Write up to `data.len()` bytes at `address`, truncating to the
    /// containing region's remaining length. Returns the bytes copied.
    fn raw_write(&self, address: Address, data: &[u8]) -> Result<usize>;

    /// Bounds of the module containing the given span, when module
    /// introspection is supported
    fn module_containing(&self, start: Address, end: Address) -> Option<(Address, Address)> {
        let _ = (start, end);
        None
    }

    /// Bounds of the target's main module, when known
    fn main_module_bounds(&self) -> Option<(Address, Address)> {
        None
    }

    /// Target wall time; zero when the target has no clock source
    fn file_time64(&self) -> u64 {
        0
    }

    /// Monotonic target tick counter; zero when unsupported
    fn tick_time32(&self) -> u32 {
        0
    }

    /// Width in bytes of a pointer in the target
    fn pointer_size(&self) -> usize;

    fn is_little_endian(&self) -> bool;

    fn lowest_address(&self) -> Address;

    fn highest_address(&self) -> Address;

    /// Enumerate regions from the lowest address up.
    ///
    /// Each successful query advances strictly past the reported region, so
    /// the walk terminates for any target honoring the query contract.
    fn regions(&self) -> Result<Vec<MemoryInformation>> {
        let mut out = Vec::new();
        let mut address = self.lowest_address();
        loop {
            let query = self.query_memory(address)?;
            let Some(info) = query.region else {
                break;
            };
            out.push(info);
            let Some(next) = info.allocation_end.checked_add(1) else {
                break;
            };
            address = next;
        }
        Ok(out)
    }
}
