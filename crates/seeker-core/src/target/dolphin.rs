//! Dolphin emulator target
//!
//! Models the GameCube/Wii main RAM (MEM1) exposed by the Dolphin emulator
//! through a named shared memory segment. The guest CPU sees the same
//! 24 MiB of physical RAM at two logical bases at once: the cached view at
//! `0x8000_0000` and the uncached mirror at `0xC000_0000`. Both map to the
//! same host bytes, so a write through one view is observable through the
//! other.
//!
//! The segment name is a contract with a patched Dolphin 5.0 build, which
//! names its otherwise-anonymous main-RAM file mapping so it can be opened
//! from outside the emulator.

use super::shm::{self, Segment, SegmentView};
use super::{RegionQuery, ScannerTarget};
use seeker_common::{Address, Error, MemoryInformation, ProcessId, Result};
use tracing::{debug, info};

/// Name of Dolphin's main-RAM file mapping, as injected by the patched
/// emulator build
pub const SHARED_SEGMENT_NAME: &str = "Dolphin Direct3D 11 backend";

const MEM1_SIZE: usize = 0x0180_0000;
const MEM1_CACHED_BASE: Address = 0x8000_0000;
const MEM1_UNCACHED_BASE: Address = 0xC000_0000;

// guest addresses are 32-bit and must fit the host-side Address type
const _: () = assert!(std::mem::size_of::<Address>() >= std::mem::size_of::<u32>());

/// One record of the guest's physical-to-logical memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapEntry {
    pub physical_base: usize,
    pub logical_base: Address,
    pub size: usize,
    pub is_mirror: bool,
}

impl MemoryMapEntry {
    pub const fn new(physical_base: usize, logical_base: Address, size: usize) -> Self {
        Self {
            physical_base,
            logical_base,
            size,
            is_mirror: false,
        }
    }

    /// An alias of the same physical range at a different logical base
    pub const fn mirror(self, logical_base: Address) -> Self {
        Self {
            physical_base: self.physical_base,
            logical_base,
            size: self.size,
            is_mirror: true,
        }
    }

    /// Address of the last byte in the entry
    pub const fn logical_end(&self) -> Address {
        self.logical_base + self.size - 1
    }

    pub const fn contains(&self, address: Address) -> bool {
        address >= self.logical_base && address <= self.logical_end()
    }
}

/// Logical layout of MEM1, in ascending logical order
const MEMORY_LAYOUT: [MemoryMapEntry; 2] = [
    MemoryMapEntry::new(0, MEM1_CACHED_BASE, MEM1_SIZE),
    MemoryMapEntry::new(0, MEM1_CACHED_BASE, MEM1_SIZE).mirror(MEM1_UNCACHED_BASE),
];

/// A map entry plus the mapped window backing it
struct MemoryView {
    entry: MemoryMapEntry,
    window: Box<dyn SegmentView>,
}

impl MemoryView {
    fn info(&self) -> MemoryInformation {
        MemoryInformation {
            allocation_base: self.entry.logical_base,
            allocation_size: self.entry.size,
            allocation_end: self.entry.logical_end(),
            is_committed: true,
            is_module: false,
            is_mirror: self.entry.is_mirror,
            is_mapped_image: false,
            is_mapped: false,
            is_writeable: true,
            is_executable: false,
        }
    }

    /// View-relative offset of a logical address
    fn offset_of(&self, address: Address) -> Option<usize> {
        self.entry
            .contains(address)
            .then(|| address - self.entry.logical_base)
    }
}

/// Scanner target for a running Dolphin emulator
///
/// The shared segment handle and its mapped views are owned exclusively by
/// one instance; attach and detach bracket the lifecycle. At most one
/// Dolphin target can be attached process-wide since the segment's name is
/// fixed.
pub struct ScannerTargetDolphin {
    views: Vec<MemoryView>,
    segment: Option<Box<dyn Segment>>,
    lowest_address: Address,
    highest_address: Address,
}

impl ScannerTargetDolphin {
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            segment: None,
            lowest_address: 0,
            highest_address: 0,
        }
    }

    /// Map every layout entry out of an opened segment. Any mapping failure
    /// detaches; partial attachment is not observable.
    fn attach_segment(&mut self, segment: Box<dyn Segment>) -> Result<()> {
        self.highest_address = 0;
        self.lowest_address = Address::MAX;

        for entry in MEMORY_LAYOUT {
            let window = match segment.map_view(entry.physical_base, entry.size) {
                Ok(window) => window,
                Err(e) => {
                    self.detach();
                    return Err(e);
                }
            };
            self.views.push(MemoryView { entry, window });

            self.highest_address = self.highest_address.max(entry.logical_end());
            self.lowest_address = self.lowest_address.min(entry.logical_base);

            debug!(
                target: "seeker_core::target",
                base = format!("{:#x}", entry.logical_base),
                size = entry.size,
                mirror = entry.is_mirror,
                "mapped MEM1 view"
            );
        }

        self.segment = Some(segment);
        info!(
            target: "seeker_core::target",
            views = self.views.len(),
            "attached to Dolphin shared segment"
        );
        Ok(())
    }
}

impl Default for ScannerTargetDolphin {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerTarget for ScannerTargetDolphin {
    fn attach(&mut self, _process: ProcessId) -> Result<()> {
        // only one dolphin emulator can be active at a time
        if self.is_attached() {
            return Ok(());
        }
        let segment = shm::open_segment(SHARED_SEGMENT_NAME)?;
        self.attach_segment(segment)
    }

    fn detach(&mut self) {
        self.views.clear();
        self.segment = None;
    }

    fn is_attached(&self) -> bool {
        self.segment.is_some()
    }

    fn query_memory(&self, address: Address) -> Result<RegionQuery> {
        if !self.is_attached() {
            return Err(Error::NotAttached);
        }

        // within a known view, or else the next view above (views are in
        // ascending logical order)
        let view = self
            .views
            .iter()
            .find(|v| v.entry.contains(address))
            .or_else(|| self.views.iter().find(|v| address < v.entry.logical_base));

        match view {
            Some(view) => {
                let info = view.info();
                Ok(RegionQuery {
                    next_address: info.allocation_end,
                    region: Some(info),
                })
            }
            None => Ok(RegionQuery {
                region: None,
                next_address: self.highest_address,
            }),
        }
    }

    fn raw_read(&self, address: Address, buffer: &mut [u8]) -> Result<usize> {
        if !self.is_attached() {
            return Err(Error::NotAttached);
        }
        for view in &self.views {
            if let Some(offset) = view.offset_of(address) {
                let copied = view.window.read_at(offset, buffer);
                if copied > 0 {
                    return Ok(copied);
                }
            }
        }
        Err(Error::MemoryAccess {
            address,
            message: "address not backed by any view".to_string(),
        })
    }

    fn raw_write(&self, address: Address, data: &[u8]) -> Result<usize> {
        if !self.is_attached() {
            return Err(Error::NotAttached);
        }
        for view in &self.views {
            if let Some(offset) = view.offset_of(address) {
                let copied = view.window.write_at(offset, data);
                if copied > 0 {
                    return Ok(copied);
                }
            }
        }
        Err(Error::MemoryAccess {
            address,
            message: "address not backed by any view".to_string(),
        })
    }

    fn pointer_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }

    fn is_little_endian(&self) -> bool {
        false
    }

    fn lowest_address(&self) -> Address {
        self.lowest_address
    }

    fn highest_address(&self) -> Address {
        self.highest_address
    }
}

#[cfg(test)]
mod tests {
    use super::super::shm::testing::InMemorySegment;
    use super::*;

    fn attached() -> ScannerTargetDolphin {
        let mut target = ScannerTargetDolphin::new();
        target
            .attach_segment(Box::new(InMemorySegment::new(MEM1_SIZE)))
            .unwrap();
        target
    }

    #[test]
    fn test_mirror_entry_preserves_physical_range() {
        let cached = MemoryMapEntry::new(0, MEM1_CACHED_BASE, MEM1_SIZE);
        let uncached = cached.mirror(MEM1_UNCACHED_BASE);
        assert_eq!(uncached.physical_base, cached.physical_base);
        assert_eq!(uncached.size, cached.size);
        assert_eq!(uncached.logical_base, MEM1_UNCACHED_BASE);
        assert!(uncached.is_mirror);
        assert!(!cached.is_mirror);
    }

    #[test]
    fn test_attach_tracks_address_bounds() {
        let target = attached();
        assert!(target.is_attached());
        assert_eq!(target.lowest_address(), 0x8000_0000);
        assert_eq!(target.highest_address(), 0xC17F_FFFF);
        assert_eq!(target.pointer_size(), 4);
        assert!(!target.is_little_endian());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut target = attached();
        // already attached; must not touch the platform segment again
        target.attach(0).unwrap();
        assert!(target.is_attached());
    }

    #[test]
    fn test_detach_is_safe_when_unattached() {
        let mut target = ScannerTargetDolphin::new();
        target.detach();
        assert!(!target.is_attached());

        let mut target = attached();
        target.detach();
        assert!(!target.is_attached());
        assert!(target.query_memory(0x8000_0000).is_err());
    }

    #[test]
    fn test_query_reports_both_views() {
        let target = attached();
        let regions = target.regions().unwrap();
        assert_eq!(regions.len(), 2);

        assert_eq!(regions[0].allocation_base, 0x8000_0000);
        assert_eq!(regions[0].allocation_end, 0x817F_FFFF);
        assert!(!regions[0].is_mirror);

        assert_eq!(regions[1].allocation_base, 0xC000_0000);
        assert_eq!(regions[1].allocation_end, 0xC17F_FFFF);
        assert!(regions[1].is_mirror);

        for region in &regions {
            assert!(region.is_committed);
            assert!(region.is_writeable);
            assert!(!region.is_executable);
            assert!(!region.is_module);
        }
    }

    #[test]
    fn test_query_in_gap_returns_next_view() {
        let target = attached();
        let query = target.query_memory(0xA000_0000).unwrap();
        let info = query.region.unwrap();
        assert_eq!(info.allocation_base, 0xC000_0000);
        assert_eq!(query.next_address, info.allocation_end);
    }

    #[test]
    fn test_query_past_end_terminates_enumeration() {
        let target = attached();
        let query = target.query_memory(0xC180_0000).unwrap();
        assert!(query.region.is_none());
        assert_eq!(query.next_address, target.highest_address());
    }

    #[test]
    fn test_mirror_views_alias_the_same_bytes() {
        let target = attached();
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(target.raw_write(0x8000_0100, &payload).unwrap(), 4);

        let mut through_mirror = [0u8; 4];
        assert_eq!(
            target.raw_read(0xC000_0100, &mut through_mirror).unwrap(),
            4
        );
        assert_eq!(through_mirror, payload);

        // and the other direction
        let payload = [0x01, 0x02];
        target.raw_write(0xC17F_0000, &payload).unwrap();
        let mut through_cached = [0u8; 2];
        target.raw_read(0x817F_0000, &mut through_cached).unwrap();
        assert_eq!(through_cached, payload);
    }

    #[test]
    fn test_raw_read_truncates_at_view_end() {
        let target = attached();
        let mut buffer = [0u8; 8];
        let copied = target.raw_read(0x817F_FFFC, &mut buffer).unwrap();
        assert_eq!(copied, 4);
    }

    #[test]
    fn test_raw_io_outside_views_fails() {
        let target = attached();
        let mut buffer = [0u8; 4];
        assert!(target.raw_read(0x7000_0000, &mut buffer).is_err());
        assert!(target.raw_write(0xA000_0000, &buffer).is_err());
    }

    #[test]
    fn test_unattached_io_fails() {
        let target = ScannerTargetDolphin::new();
        let mut buffer = [0u8; 4];
        assert!(matches!(
            target.raw_read(0x8000_0000, &mut buffer),
            Err(Error::NotAttached)
        ));
    }

    #[test]
    fn test_variant_round_trips_through_target() {
        use crate::variant::ScanVariant;
        use seeker_common::ScalarType;

        let target = attached();
        let v = ScanVariant::from(0x0102_0304u32);
        v.write_to_target(&target, 0x8000_0200).unwrap();

        // the guest is big-endian on the wire
        let mut raw = [0u8; 4];
        target.raw_read(0x8000_0200, &mut raw).unwrap();
        assert_eq!(raw, [0x01, 0x02, 0x03, 0x04]);

        // read back through the mirror
        let back =
            ScanVariant::from_target_memory(&target, 0xC000_0200, ScalarType::U32).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_placeholder_write_fails_without_touching_target() {
        use crate::variant::ScanVariant;
        use seeker_common::ScalarType;

        let target = attached();
        let placeholder = ScanVariant::placeholder(ScalarType::U32);
        assert!(placeholder.write_to_target(&target, 0x8000_0300).is_err());

        let mut raw = [0xFFu8; 4];
        target.raw_read(0x8000_0300, &mut raw).unwrap();
        assert_eq!(raw, [0, 0, 0, 0]);
    }

    #[test]
    fn test_module_introspection_unsupported() {
        let target = attached();
        assert!(target.module_containing(0x8000_0000, 0x8000_0010).is_none());
        assert!(target.main_module_bounds().is_none());
        assert_eq!(target.file_time64(), 0);
        assert_eq!(target.tick_time32(), 0);
    }
}
