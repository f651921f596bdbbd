//! Named shared memory segments
//!
//! The one platform seam of the target layer: a named shared segment that
//! hands out mapped views of its physical range. Windows binds to a real
//! file mapping; other hosts report the binding as unimplemented.

use seeker_common::Result;

/// A handle to a named shared memory segment
pub(crate) trait Segment {
    /// Map `size` bytes starting at `offset` into the segment's physical
    /// range
    fn map_view(&self, offset: usize, size: usize) -> Result<Box<dyn SegmentView>>;
}

/// A mapped window into a segment
pub(crate) trait SegmentView {
    fn len(&self) -> usize;

    /// Copy out of the view; returns the bytes copied, truncated at the
    /// view end
    fn read_at(&self, offset: usize, out: &mut [u8]) -> usize;

    /// Copy into the view; returns the bytes copied, truncated at the view
    /// end
    fn write_at(&self, offset: usize, data: &[u8]) -> usize;
}

/// Open the named segment on this host
pub(crate) fn open_segment(name: &str) -> Result<Box<dyn Segment>> {
    platform::open(name)
}

#[cfg(windows)]
mod platform {
    use super::{Segment, SegmentView};
    use seeker_common::{Error, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Memory::{
        MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_ALL_ACCESS,
        MEMORY_MAPPED_VIEW_ADDRESS,
    };

    struct FileMappingSegment {
        handle: HANDLE,
    }

    impl Segment for FileMappingSegment {
        fn map_view(&self, offset: usize, size: usize) -> Result<Box<dyn SegmentView>> {
            let address = unsafe {
                MapViewOfFile(
                    self.handle,
                    FILE_MAP_ALL_ACCESS,
                    (offset as u64 >> 32) as u32,
                    offset as u32,
                    size,
                )
            };
            if address.Value.is_null() {
                return Err(Error::SegmentUnavailable(format!(
                    "MapViewOfFile failed at offset {:#x}",
                    offset
                )));
            }
            Ok(Box::new(MappedView { address, len: size }))
        }
    }

    impl Drop for FileMappingSegment {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }

    struct MappedView {
        address: MEMORY_MAPPED_VIEW_ADDRESS,
        len: usize,
    }

    impl SegmentView for MappedView {
        fn len(&self) -> usize {
            self.len
        }

        fn read_at(&self, offset: usize, out: &mut [u8]) -> usize {
            if offset >= self.len {
                return 0;
            }
            let count = out.len().min(self.len - offset);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    (self.address.Value as *const u8).add(offset),
                    out.as_mut_ptr(),
                    count,
                );
            }
            count
        }

        fn write_at(&self, offset: usize, data: &[u8]) -> usize {
            if offset >= self.len {
                return 0;
            }
            let count = data.len().min(self.len - offset);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    (self.address.Value as *mut u8).add(offset),
                    count,
                );
            }
            count
        }
    }

    impl Drop for MappedView {
        fn drop(&mut self) {
            unsafe {
                let _ = UnmapViewOfFile(self.address);
            }
        }
    }

    pub(super) fn open(name: &str) -> Result<Box<dyn Segment>> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let handle =
            unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS.0, false, PCWSTR(wide.as_ptr())) }
                .map_err(|e| {
                    Error::SegmentUnavailable(format!("OpenFileMappingW({:?}): {}", name, e))
                })?;
        Ok(Box::new(FileMappingSegment { handle }))
    }
}

#[cfg(not(windows))]
mod platform {
    use super::Segment;
    use seeker_common::{Error, Result};

    pub(super) fn open(name: &str) -> Result<Box<dyn Segment>> {
        Err(Error::NotImplemented(format!(
            "shared segment {:?} is only reachable on Windows",
            name
        )))
    }
}
