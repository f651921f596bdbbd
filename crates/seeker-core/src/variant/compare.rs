//! Byte-level comparison against raw target buffers
//!
//! One pass over a buffer answers every comparator relation at once: each
//! family returns the full `CompareFlags` set satisfied by the buffer value
//! relative to the variant, and the scan driver tests the bits it wants.

use super::{Scalar, ScanValue, ScanVariant};
use crate::target::ScannerTarget;
use seeker_common::{Address, CompareFlags, Error, Result, ScalarType};
use std::cmp::Ordering;
use tracing::trace;

/// Comparator family selected for a prepared variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparatorKind {
    Numeric,
    Range,
    Placeholder,
    Structure,
    AsciiString,
    WideString,
}

impl ComparatorKind {
    fn for_value(value: &ScanValue) -> Option<Self> {
        match value {
            ScanValue::Null => None,
            ScanValue::Scalar(_) => Some(Self::Numeric),
            ScanValue::Range { .. } => Some(Self::Range),
            ScanValue::Placeholder(_) => Some(Self::Placeholder),
            ScanValue::Struct(_) => Some(Self::Structure),
            ScanValue::Ascii(_) => Some(Self::AsciiString),
            ScanValue::Wide(_) => Some(Self::WideString),
        }
    }
}

/// Search context bound by `prepare_for_search`: the comparator family plus
/// the owning target's byte order
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub(crate) kind: ComparatorKind,
    little_endian: bool,
}

impl SearchContext {
    /// Byte order of the target the variant was prepared against
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }
}

impl ScanVariant {
    /// Bind the search context from the owning target.
    ///
    /// Must be called once before `compare_to` or
    /// `search_for_matches_in_chunk`; repeated calls reuse the existing
    /// context. Null variants carry no comparator and cannot be prepared.
    pub fn prepare_for_search(&self, target: &dyn ScannerTarget) -> Result<()> {
        let Some(kind) = ComparatorKind::for_value(&self.value) else {
            return Err(Error::IncompatibleVariant(
                "null variant cannot be searched".to_string(),
            ));
        };
        if let ScanValue::Struct(children) = &self.value {
            for child in children {
                child.prepare_for_search(target)?;
            }
        }
        let _ = self.context.set(SearchContext {
            kind,
            little_endian: target.is_little_endian(),
        });
        Ok(())
    }

    /// The cached search context, once prepared
    pub fn search_context(&self) -> Option<&SearchContext> {
        self.context.get()
    }

    /// Relations satisfied by the buffer value relative to this variant.
    ///
    /// The buffer must hold at least `size()` bytes; callers guarantee this
    /// when scanning chunks. Calling before `prepare_for_search` is a
    /// programmer error and reports no relations.
    pub fn compare_to(&self, memory: &[u8], little_endian: bool) -> CompareFlags {
        let Some(context) = self.context.get() else {
            debug_assert!(false, "compare_to called before prepare_for_search");
            return CompareFlags::EMPTY;
        };
        if memory.len() < self.size {
            debug_assert!(false, "buffer shorter than the variant's wire size");
            return CompareFlags::EMPTY;
        }
        match context.kind {
            ComparatorKind::Numeric => match &self.value {
                ScanValue::Scalar(s) => s.compare_bytes(memory, little_endian),
                _ => CompareFlags::EMPTY,
            },
            ComparatorKind::Range => match &self.value {
                ScanValue::Range { min, max } => compare_range(min, max, memory, little_endian),
                _ => CompareFlags::EMPTY,
            },
            ComparatorKind::Placeholder => CompareFlags::ALL,
            ComparatorKind::Structure => match &self.value {
                ScanValue::Struct(children) => {
                    compare_structure(children, memory, little_endian)
                }
                _ => CompareFlags::EMPTY,
            },
            ComparatorKind::AsciiString => match &self.value {
                ScanValue::Ascii(bytes) => compare_ascii(bytes, memory),
                _ => CompareFlags::EMPTY,
            },
            ComparatorKind::WideString => match &self.value {
                ScanValue::Wide(elems) => compare_wide(elems, memory, little_endian),
                _ => CompareFlags::EMPTY,
            },
        }
    }

    /// Scan a chunk for offsets whose comparison intersects `wanted`.
    ///
    /// The step is one byte; matches need not be naturally aligned. Offsets
    /// are appended to `locations` in ascending order and never read past
    /// the chunk.
    pub fn search_for_matches_in_chunk(
        &self,
        chunk: &[u8],
        wanted: CompareFlags,
        start_address: Address,
        little_endian: bool,
        locations: &mut Vec<usize>,
    ) {
        let size = self.size;
        if size == 0 || chunk.len() < size {
            return;
        }
        let before = locations.len();
        for offset in 0..=(chunk.len() - size) {
            if self.compare_to(&chunk[offset..], little_endian).intersects(wanted) {
                locations.push(offset);
            }
        }
        trace!(
            target: "seeker_core::variant",
            start = format!("{:#x}", start_address),
            bytes = chunk.len(),
            matches = locations.len() - before,
            "chunk scanned"
        );
    }
}

/// Relations produced by one ordering outcome; an incomparable pair (NaN on
/// either side) is unequal and nothing else
fn ordering_flags(ord: Option<Ordering>) -> CompareFlags {
    match ord {
        Some(Ordering::Equal) => {
            CompareFlags::EQUALS
                | CompareFlags::GREATER_THAN_OR_EQUAL
                | CompareFlags::LESS_THAN_OR_EQUAL
        }
        Some(Ordering::Greater) => {
            CompareFlags::GREATER_THAN
                | CompareFlags::GREATER_THAN_OR_EQUAL
                | CompareFlags::NOT_EQUAL
        }
        Some(Ordering::Less) => {
            CompareFlags::LESS_THAN | CompareFlags::LESS_THAN_OR_EQUAL | CompareFlags::NOT_EQUAL
        }
        None => CompareFlags::NOT_EQUAL,
    }
}

/// Ordering of two same-typed scalars; `None` for mismatched types or NaN
pub(crate) fn scalar_partial_cmp(a: Scalar, b: Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::U8(x), Scalar::U8(y)) => Some(x.cmp(&y)),
        (Scalar::I8(x), Scalar::I8(y)) => Some(x.cmp(&y)),
        (Scalar::U16(x), Scalar::U16(y)) => Some(x.cmp(&y)),
        (Scalar::I16(x), Scalar::I16(y)) => Some(x.cmp(&y)),
        (Scalar::U32(x), Scalar::U32(y)) => Some(x.cmp(&y)),
        (Scalar::I32(x), Scalar::I32(y)) => Some(x.cmp(&y)),
        (Scalar::U64(x), Scalar::U64(y)) => Some(x.cmp(&y)),
        (Scalar::I64(x), Scalar::I64(y)) => Some(x.cmp(&y)),
        (Scalar::F64(x), Scalar::F64(y)) => x.partial_cmp(&y),
        (Scalar::F32(x), Scalar::F32(y)) => x.partial_cmp(&y),
        (Scalar::FileTime64(x), Scalar::FileTime64(y)) => Some(x.cmp(&y)),
        (Scalar::TickTime32(x), Scalar::TickTime32(y)) => Some(x.cmp(&y)),
        _ => None,
    }
}

fn compare_range(min: &Scalar, max: &Scalar, memory: &[u8], little_endian: bool) -> CompareFlags {
    // a range has no single ordering point; only containment is reported
    let at_least = min
        .compare_bytes(memory, little_endian)
        .intersects(CompareFlags::GREATER_THAN_OR_EQUAL);
    let at_most = max
        .compare_bytes(memory, little_endian)
        .intersects(CompareFlags::LESS_THAN_OR_EQUAL);
    if at_least && at_most {
        CompareFlags::EQUALS
    } else {
        CompareFlags::NOT_EQUAL
    }
}

fn compare_structure(children: &[ScanVariant], memory: &[u8], little_endian: bool) -> CompareFlags {
    // only relations satisfied by every field hold for the tuple
    let mut flags = CompareFlags::ALL;
    let mut offset = 0usize;
    for child in children {
        let Some(slice) = memory.get(offset..) else {
            return CompareFlags::EMPTY;
        };
        flags = flags & child.compare_to(slice, little_endian);
        if flags.is_empty() {
            return flags;
        }
        offset += child.size();
    }
    flags
}

fn compare_ascii(bytes: &[u8], memory: &[u8]) -> CompareFlags {
    match memory.get(..bytes.len()) {
        Some(window) if window == bytes => CompareFlags::EQUALS,
        _ => CompareFlags::NOT_EQUAL,
    }
}

fn compare_wide(elems: &[u16], memory: &[u8], little_endian: bool) -> CompareFlags {
    for (i, &elem) in elems.iter().enumerate() {
        let Some(pair) = memory.get(i * 2..i * 2 + 2) else {
            return CompareFlags::NOT_EQUAL;
        };
        let decoded = if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        };
        if decoded != elem {
            return CompareFlags::NOT_EQUAL;
        }
    }
    CompareFlags::EQUALS
}

// Bounds-checked byte decoding, byte order applied per load
fn read_u16(b: &[u8], little_endian: bool) -> u16 {
    let arr: [u8; 2] = b.get(..2).and_then(|s| s.try_into().ok()).unwrap_or([0; 2]);
    if little_endian {
        u16::from_le_bytes(arr)
    } else {
        u16::from_be_bytes(arr)
    }
}

fn read_u32(b: &[u8], little_endian: bool) -> u32 {
    let arr: [u8; 4] = b.get(..4).and_then(|s| s.try_into().ok()).unwrap_or([0; 4]);
    if little_endian {
        u32::from_le_bytes(arr)
    } else {
        u32::from_be_bytes(arr)
    }
}

fn read_u64(b: &[u8], little_endian: bool) -> u64 {
    let arr: [u8; 8] = b.get(..8).and_then(|s| s.try_into().ok()).unwrap_or([0; 8]);
    if little_endian {
        u64::from_le_bytes(arr)
    } else {
        u64::from_be_bytes(arr)
    }
}

impl Scalar {
    /// Decode the wire form; `None` when the buffer is too short
    pub fn from_bytes(ty: ScalarType, buffer: &[u8], little_endian: bool) -> Option<Self> {
        if buffer.len() < ty.size() {
            return None;
        }
        Some(match ty {
            ScalarType::U8 => Scalar::U8(buffer[0]),
            ScalarType::I8 => Scalar::I8(buffer[0] as i8),
            ScalarType::U16 => Scalar::U16(read_u16(buffer, little_endian)),
            ScalarType::I16 => Scalar::I16(read_u16(buffer, little_endian) as i16),
            ScalarType::U32 => Scalar::U32(read_u32(buffer, little_endian)),
            ScalarType::I32 => Scalar::I32(read_u32(buffer, little_endian) as i32),
            ScalarType::U64 => Scalar::U64(read_u64(buffer, little_endian)),
            ScalarType::I64 => Scalar::I64(read_u64(buffer, little_endian) as i64),
            ScalarType::F64 => Scalar::F64(f64::from_bits(read_u64(buffer, little_endian))),
            ScalarType::F32 => Scalar::F32(f32::from_bits(read_u32(buffer, little_endian))),
            ScalarType::FileTime64 => Scalar::FileTime64(read_u64(buffer, little_endian)),
            ScalarType::TickTime32 => Scalar::TickTime32(read_u32(buffer, little_endian)),
        })
    }

    /// Encode the wire form in the given byte order
    pub fn to_bytes(self, little_endian: bool) -> Vec<u8> {
        fn put<const N: usize>(le: [u8; N], be: [u8; N], little_endian: bool) -> Vec<u8> {
            if little_endian {
                le.to_vec()
            } else {
                be.to_vec()
            }
        }
        match self {
            Scalar::U8(v) => vec![v],
            Scalar::I8(v) => vec![v as u8],
            Scalar::U16(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::I16(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::U32(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::I32(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::U64(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::I64(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::F64(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::F32(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::FileTime64(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
            Scalar::TickTime32(v) => put(v.to_le_bytes(), v.to_be_bytes(), little_endian),
        }
    }

    /// Relations satisfied by the buffer value relative to this value
    pub fn compare_bytes(self, buffer: &[u8], little_endian: bool) -> CompareFlags {
        let Some(decoded) = Self::from_bytes(self.scalar_type(), buffer, little_endian) else {
            return CompareFlags::EMPTY;
        };
        ordering_flags(scalar_partial_cmp(decoded, self))
    }
}
