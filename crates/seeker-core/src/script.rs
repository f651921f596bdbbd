//! Dynamic value bridge
//!
//! Round-trips engine objects to the dynamic value type exposed to user
//! scripts. Scalars become numbers, structures become ordered lists, ranges
//! become keyed maps with `__min`/`__max` fields, placeholders become empty
//! collections, and opaque engine references travel as
//! `{objectType, objectPointer}` maps.
//!
//! Conversion into a variant takes the requested type and collapses to the
//! null variant on any mismatch; callers test with `is_null`.

use crate::variant::{Scalar, ScanValue, ScanVariant, VariantType};
use seeker_common::{MemoryInformation, ScalarType};
use serde_json::{json, Map, Number, Value};

pub const KEY_RANGE_MIN: &str = "__min";
pub const KEY_RANGE_MAX: &str = "__max";
pub const KEY_OBJECT_TYPE: &str = "objectType";
pub const KEY_OBJECT_POINTER: &str = "objectPointer";

/// Render a variant for scripts
pub fn variant_to_dynamic(variant: &ScanVariant) -> Value {
    match variant.value() {
        ScanValue::Null => Value::Null,
        ScanValue::Scalar(s) => scalar_to_dynamic(*s),
        ScanValue::Placeholder(_) => Value::Object(Map::new()),
        ScanValue::Range { min, max } => json!({
            KEY_RANGE_MIN: scalar_to_dynamic(*min),
            KEY_RANGE_MAX: scalar_to_dynamic(*max),
        }),
        ScanValue::Ascii(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ScanValue::Wide(elems) => Value::String(String::from_utf16_lossy(elems)),
        ScanValue::Struct(children) => {
            Value::Array(children.iter().map(variant_to_dynamic).collect())
        }
    }
}

fn scalar_to_dynamic(scalar: Scalar) -> Value {
    match scalar {
        Scalar::U8(v) => json!(v),
        Scalar::I8(v) => json!(v),
        Scalar::U16(v) => json!(v),
        Scalar::I16(v) => json!(v),
        Scalar::U32(v) => json!(v),
        Scalar::I32(v) => json!(v),
        Scalar::U64(v) => json!(v),
        Scalar::I64(v) => json!(v),
        Scalar::FileTime64(v) => json!(v),
        Scalar::TickTime32(v) => json!(v),
        Scalar::F64(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        Scalar::F32(v) => Number::from_f64(v as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// Parse a scripted value as a variant of the requested type.
///
/// Strings become string variants, numbers become scalars, maps with
/// `__min`/`__max` become ranges, and empty collections become placeholders
/// when blanks are allowed. Everything else collapses to null.
pub fn dynamic_to_variant(value: &Value, ty: VariantType, allow_blank: bool) -> ScanVariant {
    match value {
        Value::String(s) if !s.is_empty() => ScanVariant::from_string_typed(s, ty),
        Value::Number(n) => match ty {
            VariantType::Scalar(scalar_ty) => number_to_scalar(n, scalar_ty)
                .map(ScanVariant::from_scalar)
                .unwrap_or_else(ScanVariant::null),
            _ => ScanVariant::null(),
        },
        Value::Object(map) => {
            if let (Some(min), Some(max)) = (map.get(KEY_RANGE_MIN), map.get(KEY_RANGE_MAX)) {
                let VariantType::Scalar(scalar_ty) = ty else {
                    return ScanVariant::null();
                };
                let (Some(min), Some(max)) = (
                    min.as_number().and_then(|n| number_to_scalar(n, scalar_ty)),
                    max.as_number().and_then(|n| number_to_scalar(n, scalar_ty)),
                ) else {
                    return ScanVariant::null();
                };
                return ScanVariant::from_variant_range(
                    &ScanVariant::from_scalar(min),
                    &ScanVariant::from_scalar(max),
                );
            }
            blank_to_placeholder(map.is_empty(), ty, allow_blank)
        }
        Value::Array(items) => blank_to_placeholder(items.is_empty(), ty, allow_blank),
        _ => ScanVariant::null(),
    }
}

fn blank_to_placeholder(is_empty: bool, ty: VariantType, allow_blank: bool) -> ScanVariant {
    match ty {
        VariantType::Scalar(scalar_ty) if is_empty && allow_blank => {
            ScanVariant::placeholder(scalar_ty)
        }
        _ => ScanVariant::null(),
    }
}

fn number_to_scalar(n: &Number, ty: ScalarType) -> Option<Scalar> {
    match ty {
        ScalarType::F64 => n.as_f64().map(Scalar::F64),
        ScalarType::F32 => n.as_f64().map(|f| Scalar::F32(f as f32)),
        _ => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v as u64))
            .map(|v| Scalar::from_u64(v, ty)),
    }
}

/// Wrap an opaque engine object reference for scripts
pub fn object_to_dynamic(type_name: &str, pointer: usize) -> Value {
    json!({
        KEY_OBJECT_TYPE: type_name,
        KEY_OBJECT_POINTER: pointer,
    })
}

/// Unwrap a reference created by `object_to_dynamic`, checking its type tag
pub fn object_from_dynamic(value: &Value, type_name: &str) -> Option<usize> {
    let map = value.as_object()?;
    if map.get(KEY_OBJECT_TYPE)?.as_str()? != type_name {
        return None;
    }
    map.get(KEY_OBJECT_POINTER)?.as_u64().map(|p| p as usize)
}

/// Render a region record for scripts
pub fn memory_information_to_dynamic(info: &MemoryInformation) -> Value {
    json!({
        "start": info.allocation_base,
        "end": info.allocation_end,
        "size": info.allocation_size,
        "isModule": info.is_module,
        "isCommitted": info.is_committed,
        "isMirror": info.is_mirror,
        "isWriteable": info.is_writeable,
        "isExecutable": info.is_executable,
        "isMappedImage": info.is_mapped_image,
        "isMapped": info.is_mapped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let v = ScanVariant::from(42u32);
        let dynamic = variant_to_dynamic(&v);
        assert_eq!(dynamic, json!(42));

        let back = dynamic_to_variant(&dynamic, VariantType::Scalar(ScalarType::U32), false);
        assert_eq!(back, v);
    }

    #[test]
    fn test_negative_and_float_scalars() {
        assert_eq!(variant_to_dynamic(&ScanVariant::from(-7i16)), json!(-7));
        assert_eq!(variant_to_dynamic(&ScanVariant::from(2.5f64)), json!(2.5));

        let back = dynamic_to_variant(&json!(-7), VariantType::Scalar(ScalarType::I16), false);
        assert_eq!(back.scalar().and_then(Scalar::as_i16), Some(-7));

        let back = dynamic_to_variant(&json!(2.5), VariantType::Scalar(ScalarType::F32), false);
        assert_eq!(back.scalar().and_then(Scalar::as_f32), Some(2.5));
    }

    #[test]
    fn test_nan_renders_as_null() {
        assert_eq!(variant_to_dynamic(&ScanVariant::from(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_string_round_trip() {
        let v = ScanVariant::from("health");
        assert_eq!(variant_to_dynamic(&v), json!("health"));

        let back = dynamic_to_variant(&json!("health"), VariantType::AsciiString, false);
        assert_eq!(back, v);

        // empty strings convert to nothing
        let blank = dynamic_to_variant(&json!(""), VariantType::AsciiString, false);
        assert!(blank.is_null());
    }

    #[test]
    fn test_structure_becomes_ordered_list() {
        let v = ScanVariant::from_struct(vec![
            ScanVariant::from(1u8),
            ScanVariant::from("hp"),
        ]);
        assert_eq!(variant_to_dynamic(&v), json!([1, "hp"]));
    }

    #[test]
    fn test_range_round_trip() {
        let v = ScanVariant::from_variant_range(&ScanVariant::from(10u8), &ScanVariant::from(20u8));
        let dynamic = variant_to_dynamic(&v);
        assert_eq!(dynamic, json!({ "__min": 10, "__max": 20 }));

        let back = dynamic_to_variant(&dynamic, VariantType::Scalar(ScalarType::U8), false);
        assert_eq!(back, v);
    }

    #[test]
    fn test_range_requires_numeric_type() {
        let dynamic = json!({ "__min": 10, "__max": 20 });
        let back = dynamic_to_variant(&dynamic, VariantType::AsciiString, false);
        assert!(back.is_null());
    }

    #[test]
    fn test_placeholder_from_empty_collections() {
        let v = ScanVariant::placeholder(ScalarType::U32);
        assert_eq!(variant_to_dynamic(&v), json!({}));

        for blank in [json!({}), json!([])] {
            let back = dynamic_to_variant(&blank, VariantType::Scalar(ScalarType::U32), true);
            assert_eq!(back, v);

            // blanks rejected unless explicitly allowed
            let back = dynamic_to_variant(&blank, VariantType::Scalar(ScalarType::U32), false);
            assert!(back.is_null());
        }
    }

    #[test]
    fn test_type_mismatches_collapse_to_null() {
        assert!(dynamic_to_variant(&json!(5), VariantType::AsciiString, false).is_null());
        assert!(dynamic_to_variant(&json!(true), VariantType::Scalar(ScalarType::U8), false)
            .is_null());
        assert!(dynamic_to_variant(&Value::Null, VariantType::Scalar(ScalarType::U8), true)
            .is_null());
    }

    #[test]
    fn test_object_reference_round_trip() {
        let wrapped = object_to_dynamic("ScannerPair", 0xDEAD_BEEF);
        assert_eq!(object_from_dynamic(&wrapped, "ScannerPair"), Some(0xDEAD_BEEF));
        assert_eq!(object_from_dynamic(&wrapped, "ScannerTarget"), None);
        assert_eq!(object_from_dynamic(&json!({}), "ScannerPair"), None);
        assert_eq!(object_from_dynamic(&json!(7), "ScannerPair"), None);
    }

    #[test]
    fn test_memory_information_fields() {
        let info = MemoryInformation {
            allocation_base: 0x8000_0000,
            allocation_size: 0x0180_0000,
            allocation_end: 0x817F_FFFF,
            is_committed: true,
            is_writeable: true,
            is_mirror: false,
            is_mapped: true,
            ..Default::default()
        };
        let dynamic = memory_information_to_dynamic(&info);
        assert_eq!(dynamic["start"], json!(0x8000_0000usize));
        assert_eq!(dynamic["end"], json!(0x817F_FFFFusize));
        assert_eq!(dynamic["size"], json!(0x0180_0000usize));
        assert_eq!(dynamic["isCommitted"], json!(true));
        assert_eq!(dynamic["isMirror"], json!(false));
        assert_eq!(dynamic["isMapped"], json!(true));
        assert_eq!(dynamic["isExecutable"], json!(false));
    }
}
