//! The scan value model
//!
//! A `ScanVariant` is the typed, possibly-composite value used as a search
//! pattern. It describes scalars, `[min, max]` ranges, placeholders (values
//! of known type but unknown content), heterogeneous structures, and two
//! string encodings, and knows how to compare itself bit-for-bit against raw
//! target buffers under either endianness.
//!
//! Inconsistent construction inputs collapse to the null variant instead of
//! failing noisily; callers test with `is_null` before use.

pub mod compare;
pub mod traits;

pub use compare::SearchContext;

use crate::target::ScannerTarget;
use once_cell::sync::OnceCell;
use seeker_common::{Address, Error, Result, ScalarType};
use std::fmt;

/// Native payload of a numeric scan value
///
/// Carries the value in its own width; the widest representation is only
/// materialized on demand. `FileTime64`/`TickTime32` compare like their
/// unsigned carriers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F64(f64),
    F32(f32),
    FileTime64(u64),
    TickTime32(u32),
}

impl Scalar {
    /// The tag of this value
    pub const fn scalar_type(self) -> ScalarType {
        match self {
            Scalar::U8(_) => ScalarType::U8,
            Scalar::I8(_) => ScalarType::I8,
            Scalar::U16(_) => ScalarType::U16,
            Scalar::I16(_) => ScalarType::I16,
            Scalar::U32(_) => ScalarType::U32,
            Scalar::I32(_) => ScalarType::I32,
            Scalar::U64(_) => ScalarType::U64,
            Scalar::I64(_) => ScalarType::I64,
            Scalar::F64(_) => ScalarType::F64,
            Scalar::F32(_) => ScalarType::F32,
            Scalar::FileTime64(_) => ScalarType::FileTime64,
            Scalar::TickTime32(_) => ScalarType::TickTime32,
        }
    }

    /// Byte width of the wire form
    pub const fn size(self) -> usize {
        self.scalar_type().size()
    }

    /// Narrowing construction of the given type from a 64-bit source
    pub fn from_u64(value: u64, ty: ScalarType) -> Self {
        match ty {
            ScalarType::U8 => Scalar::U8(value as u8),
            ScalarType::I8 => Scalar::I8(value as i8),
            ScalarType::U16 => Scalar::U16(value as u16),
            ScalarType::I16 => Scalar::I16(value as i16),
            ScalarType::U32 => Scalar::U32(value as u32),
            ScalarType::I32 => Scalar::I32(value as i32),
            ScalarType::U64 => Scalar::U64(value),
            ScalarType::I64 => Scalar::I64(value as i64),
            ScalarType::F64 => Scalar::F64(value as f64),
            ScalarType::F32 => Scalar::F32(value as f32),
            ScalarType::FileTime64 => Scalar::FileTime64(value),
            ScalarType::TickTime32 => Scalar::TickTime32(value as u32),
        }
    }

    pub const fn as_u8(self) -> Option<u8> {
        match self {
            Scalar::U8(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i8(self) -> Option<i8> {
        match self {
            Scalar::I8(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_u16(self) -> Option<u16> {
        match self {
            Scalar::U16(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i16(self) -> Option<i16> {
        match self {
            Scalar::I16(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_u32(self) -> Option<u32> {
        match self {
            Scalar::U32(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i32(self) -> Option<i32> {
        match self {
            Scalar::I32(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_u64(self) -> Option<u64> {
        match self {
            Scalar::U64(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i64(self) -> Option<i64> {
        match self {
            Scalar::I64(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_f64(self) -> Option<f64> {
        match self {
            Scalar::F64(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_f32(self) -> Option<f32> {
        match self {
            Scalar::F32(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_file_time64(self) -> Option<u64> {
        match self {
            Scalar::FileTime64(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_tick_time32(self) -> Option<u32> {
        match self {
            Scalar::TickTime32(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::I8(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::I16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::FileTime64(v) => write!(f, "{}", v),
            Scalar::TickTime32(v) => write!(f, "{}", v),
        }
    }
}

/// Shape and payload of a scan variant
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    /// The uninitialized/absent value
    Null,
    /// A single numeric value
    Scalar(Scalar),
    /// Known type, unknown value; matches every comparator on the initial
    /// scan and is materialized into a scalar by later passes
    Placeholder(ScalarType),
    /// Inclusive `[min, max]` interval over one numeric type
    Range { min: Scalar, max: Scalar },
    /// Byte string
    Ascii(Vec<u8>),
    /// UTF-16 code units, host order
    Wide(Vec<u16>),
    /// Heterogeneous ordered sequence of child variants, packed on the wire
    Struct(Vec<ScanVariant>),
}

/// Underlying type tag of a variant, with range/placeholder projected onto
/// their numeric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnderlyingType {
    Scalar(ScalarType),
    AsciiString,
    WideString,
    Structure,
    Null,
}

/// Externally-requested variant shape, used where a script or caller names
/// the type it wants a value parsed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantType {
    AsciiString,
    WideString,
    Scalar(ScalarType),
}

/// Typed, possibly-composite value used as a search pattern
///
/// Immutable after construction; factories return new instances. The search
/// context is populated by `prepare_for_search` and shared by every
/// subsequent pass over the variant.
#[derive(Debug, Clone)]
pub struct ScanVariant {
    value: ScanValue,
    size: usize,
    context: OnceCell<SearchContext>,
}

impl PartialEq for ScanVariant {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl ScanVariant {
    fn from_value(value: ScanValue) -> Self {
        let size = Self::wire_size(&value);
        Self {
            value,
            size,
            context: OnceCell::new(),
        }
    }

    /// Byte size of the wire form for a given payload
    fn wire_size(value: &ScanValue) -> usize {
        match value {
            ScanValue::Null => 0,
            ScanValue::Scalar(s) => s.size(),
            ScanValue::Placeholder(ty) => ty.size(),
            ScanValue::Range { min, .. } => min.size(),
            ScanValue::Ascii(bytes) => bytes.len(),
            ScanValue::Wide(elems) => elems.len() * 2,
            ScanValue::Struct(children) => children.iter().map(|c| c.size()).sum(),
        }
    }

    /// The null variant
    pub fn null() -> Self {
        Self::from_value(ScanValue::Null)
    }

    /// A placeholder of the given numeric type
    pub fn placeholder(ty: ScalarType) -> Self {
        Self::from_value(ScanValue::Placeholder(ty))
    }

    /// Wrap a scalar payload
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self::from_value(ScanValue::Scalar(scalar))
    }

    /// Narrowing construction of the given numeric type from a 64-bit source
    pub fn from_number_typed(value: u64, ty: ScalarType) -> Self {
        Self::from_scalar(Scalar::from_u64(value, ty))
    }

    /// String variant of the requested encoding; non-string requests
    /// collapse to null
    pub fn from_string_typed(input: &str, ty: VariantType) -> Self {
        match ty {
            VariantType::AsciiString => Self::from_value(ScanValue::Ascii(input.as_bytes().to_vec())),
            VariantType::WideString => {
                Self::from_value(ScanValue::Wide(input.encode_utf16().collect()))
            }
            VariantType::Scalar(_) => Self::null(),
        }
    }

    /// Structure variant; collapses to null when empty or when any child is
    /// itself null
    pub fn from_struct(children: Vec<ScanVariant>) -> Self {
        if children.is_empty() || children.iter().any(|c| c.is_null()) {
            return Self::null();
        }
        Self::from_value(ScanValue::Struct(children))
    }

    /// Range variant over one numeric type; collapses to null when the
    /// bounds disagree on type, are non-scalar, or are out of order
    pub fn from_variant_range(min: &ScanVariant, max: &ScanVariant) -> Self {
        let (ScanValue::Scalar(lo), ScanValue::Scalar(hi)) = (&min.value, &max.value) else {
            return Self::null();
        };
        if lo.scalar_type() != hi.scalar_type() {
            return Self::null();
        }
        match compare::scalar_partial_cmp(*lo, *hi) {
            Some(ord) if ord != std::cmp::Ordering::Greater => {
                Self::from_value(ScanValue::Range { min: *lo, max: *hi })
            }
            _ => Self::null(),
        }
    }

    /// Pointer-width numeric holding a memory address
    pub fn from_memory_address(address: Address) -> Self {
        if std::mem::size_of::<Address>() >= 8 {
            Self::from_scalar(Scalar::U64(address as u64))
        } else {
            Self::from_scalar(Scalar::U32(address as u32))
        }
    }

    /// Parse a raw buffer as the same type as `reference`, honoring
    /// endianness for scalars.
    ///
    /// Strings copy up to the first terminator or the end of the buffer;
    /// structures parse each child at the running offset of the declared
    /// layout. Range and placeholder references parse as a scalar of the
    /// underlying type. A buffer too short for the reference yields null.
    pub fn from_raw_buffer(buffer: &[u8], little_endian: bool, reference: &ScanVariant) -> Self {
        match &reference.value {
            ScanValue::Null => Self::null(),
            ScanValue::Scalar(s) => Self::parse_scalar(buffer, little_endian, s.scalar_type()),
            ScanValue::Placeholder(ty) => Self::parse_scalar(buffer, little_endian, *ty),
            ScanValue::Range { min, .. } => {
                Self::parse_scalar(buffer, little_endian, min.scalar_type())
            }
            ScanValue::Ascii(_) => {
                let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
                Self::from_value(ScanValue::Ascii(buffer[..end].to_vec()))
            }
            ScanValue::Wide(_) => {
                let mut elems = Vec::new();
                for pair in buffer.chunks_exact(2) {
                    let elem = if little_endian {
                        u16::from_le_bytes([pair[0], pair[1]])
                    } else {
                        u16::from_be_bytes([pair[0], pair[1]])
                    };
                    if elem == 0 {
                        break;
                    }
                    elems.push(elem);
                }
                Self::from_value(ScanValue::Wide(elems))
            }
            ScanValue::Struct(children) => {
                let mut parsed = Vec::with_capacity(children.len());
                let mut offset = 0usize;
                for child in children {
                    let Some(slice) = buffer.get(offset..) else {
                        return Self::null();
                    };
                    let value = Self::from_raw_buffer(slice, little_endian, child);
                    if value.is_null() {
                        return Self::null();
                    }
                    offset += child.size();
                    parsed.push(value);
                }
                Self::from_struct(parsed)
            }
        }
    }

    fn parse_scalar(buffer: &[u8], little_endian: bool, ty: ScalarType) -> Self {
        match Scalar::from_bytes(ty, buffer, little_endian) {
            Some(scalar) => Self::from_scalar(scalar),
            None => Self::null(),
        }
    }

    /// Read the type's wire size from the target and parse it in the
    /// target's byte order
    pub fn from_target_memory(
        target: &dyn ScannerTarget,
        address: Address,
        ty: ScalarType,
    ) -> Result<Self> {
        let mut buffer = vec![0u8; ty.size()];
        let read = target.raw_read(address, &mut buffer)?;
        if read < buffer.len() {
            return Err(Error::MemoryAccess {
                address,
                message: format!("short read: {} of {} bytes", read, buffer.len()),
            });
        }
        Ok(Self::from_raw_buffer(
            &buffer,
            target.is_little_endian(),
            &Self::placeholder(ty),
        ))
    }

    /// Byte size of the wire form
    pub fn size(&self) -> usize {
        self.size
    }

    /// Shape and payload
    pub fn value(&self) -> &ScanValue {
        &self.value
    }

    /// Underlying type, with range/placeholder projected onto their numeric
    /// type
    pub fn underlying_type(&self) -> UnderlyingType {
        match &self.value {
            ScanValue::Null => UnderlyingType::Null,
            ScanValue::Scalar(s) => UnderlyingType::Scalar(s.scalar_type()),
            ScanValue::Placeholder(ty) => UnderlyingType::Scalar(*ty),
            ScanValue::Range { min, .. } => UnderlyingType::Scalar(min.scalar_type()),
            ScanValue::Ascii(_) => UnderlyingType::AsciiString,
            ScanValue::Wide(_) => UnderlyingType::WideString,
            ScanValue::Struct(_) => UnderlyingType::Structure,
        }
    }

    /// Underlying numeric type, when there is one
    pub fn underlying_scalar(&self) -> Option<ScalarType> {
        match self.underlying_type() {
            UnderlyingType::Scalar(ty) => Some(ty),
            _ => None,
        }
    }

    /// Static descriptor for the underlying type
    pub fn traits(&self) -> &'static traits::TypeTraits {
        traits::traits_for(self.underlying_type())
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, ScanValue::Null)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.value, ScanValue::Placeholder(_))
    }

    pub fn is_range(&self) -> bool {
        matches!(self.value, ScanValue::Range { .. })
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.value, ScanValue::Struct(_))
    }

    /// Structures and ranges expose their children
    pub fn is_composite(&self) -> bool {
        matches!(self.value, ScanValue::Struct(_) | ScanValue::Range { .. })
    }

    /// Children of a composite variant: a structure's fields, or a range's
    /// `[min, max]` pair as scalar variants
    pub fn composite_values(&self) -> Option<Vec<ScanVariant>> {
        match &self.value {
            ScanValue::Struct(children) => Some(children.clone()),
            ScanValue::Range { min, max } => {
                Some(vec![Self::from_scalar(*min), Self::from_scalar(*max)])
            }
            _ => None,
        }
    }

    /// The scalar payload, when this is a scalar variant
    pub fn scalar(&self) -> Option<Scalar> {
        match &self.value {
            ScanValue::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// ASCII payload bytes
    pub fn as_ascii_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            ScanValue::Ascii(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Wide payload elements, host order
    pub fn as_wide_elements(&self) -> Option<&[u16]> {
        match &self.value {
            ScanValue::Wide(elems) => Some(elems),
            _ => None,
        }
    }

    /// Whether two variants can participate in the same scan step.
    ///
    /// Same underlying type is compatible; a placeholder of T matches any
    /// variant of underlying T; a range of T matches a scalar of T; strings
    /// require identical encoding; structures require equal arity with
    /// pairwise-compatible children. `strict` additionally requires the same
    /// shape (no range/scalar or placeholder/scalar mixing).
    pub fn is_compatible_with(&self, other: &ScanVariant, strict: bool) -> bool {
        match (&self.value, &other.value) {
            (ScanValue::Struct(a), ScanValue::Struct(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.is_compatible_with(y, strict))
            }
            (ScanValue::Ascii(_), ScanValue::Ascii(_)) => true,
            (ScanValue::Wide(_), ScanValue::Wide(_)) => true,
            _ => {
                let (Some(a), Some(b)) = (self.underlying_scalar(), other.underlying_scalar())
                else {
                    return false;
                };
                if a != b {
                    return false;
                }
                !strict
                    || std::mem::discriminant(&self.value) == std::mem::discriminant(&other.value)
            }
        }
    }

    /// Canonical name of the variant's type
    pub fn type_name(&self) -> String {
        match &self.value {
            ScanValue::Null => "null".to_string(),
            ScanValue::Scalar(s) => s.scalar_type().name().to_string(),
            ScanValue::Placeholder(ty) => format!("placeholder of {}", ty.name()),
            ScanValue::Range { min, .. } => format!("range of {}", min.scalar_type().name()),
            ScanValue::Ascii(_) => "ascii string".to_string(),
            ScanValue::Wide(_) => "wide string".to_string(),
            ScanValue::Struct(_) => "struct".to_string(),
        }
    }

    /// The wire form in the given byte order; `None` for shapes with no
    /// single wire form (null, placeholders, ranges)
    pub fn to_bytes(&self, little_endian: bool) -> Option<Vec<u8>> {
        match &self.value {
            ScanValue::Null | ScanValue::Placeholder(_) | ScanValue::Range { .. } => None,
            ScanValue::Scalar(s) => Some(s.to_bytes(little_endian)),
            ScanValue::Ascii(bytes) => Some(bytes.clone()),
            ScanValue::Wide(elems) => {
                let mut out = Vec::with_capacity(elems.len() * 2);
                for &elem in elems {
                    let pair = if little_endian {
                        elem.to_le_bytes()
                    } else {
                        elem.to_be_bytes()
                    };
                    out.extend_from_slice(&pair);
                }
                Some(out)
            }
            ScanValue::Struct(children) => {
                let mut out = Vec::with_capacity(self.size);
                for child in children {
                    out.extend_from_slice(&child.to_bytes(little_endian)?);
                }
                Some(out)
            }
        }
    }

    /// Emit the wire form into the target at `address`, in the target's
    /// byte order. Shapes with no wire form fail without writing.
    pub fn write_to_target(&self, target: &dyn ScannerTarget, address: Address) -> Result<()> {
        let Some(bytes) = self.to_bytes(target.is_little_endian()) else {
            return Err(Error::IncompatibleVariant(format!(
                "{} has no wire form",
                self.type_name()
            )));
        };
        let written = target.raw_write(address, &bytes)?;
        if written != bytes.len() {
            return Err(Error::MemoryAccess {
                address,
                message: format!("short write: {} of {} bytes", written, bytes.len()),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ScanVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ScanValue::Null => write!(f, "(null)"),
            ScanValue::Scalar(s) => write!(f, "{}", s),
            ScanValue::Placeholder(ty) => write!(f, "(unknown {})", ty.name()),
            ScanValue::Range { min, max } => write!(f, "[{}, {}]", min, max),
            ScanValue::Ascii(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            ScanValue::Wide(elems) => write!(f, "{}", String::from_utf16_lossy(elems)),
            ScanValue::Struct(children) => {
                write!(f, "{{")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<u8> for ScanVariant {
    fn from(v: u8) -> Self {
        Self::from_scalar(Scalar::U8(v))
    }
}

impl From<i8> for ScanVariant {
    fn from(v: i8) -> Self {
        Self::from_scalar(Scalar::I8(v))
    }
}

impl From<u16> for ScanVariant {
    fn from(v: u16) -> Self {
        Self::from_scalar(Scalar::U16(v))
    }
}

impl From<i16> for ScanVariant {
    fn from(v: i16) -> Self {
        Self::from_scalar(Scalar::I16(v))
    }
}

impl From<u32> for ScanVariant {
    fn from(v: u32) -> Self {
        Self::from_scalar(Scalar::U32(v))
    }
}

impl From<i32> for ScanVariant {
    fn from(v: i32) -> Self {
        Self::from_scalar(Scalar::I32(v))
    }
}

impl From<u64> for ScanVariant {
    fn from(v: u64) -> Self {
        Self::from_scalar(Scalar::U64(v))
    }
}

impl From<i64> for ScanVariant {
    fn from(v: i64) -> Self {
        Self::from_scalar(Scalar::I64(v))
    }
}

impl From<f32> for ScanVariant {
    fn from(v: f32) -> Self {
        Self::from_scalar(Scalar::F32(v))
    }
}

impl From<f64> for ScanVariant {
    fn from(v: f64) -> Self {
        Self::from_scalar(Scalar::F64(v))
    }
}

impl From<&str> for ScanVariant {
    fn from(v: &str) -> Self {
        Self::from_string_typed(v, VariantType::AsciiString)
    }
}
