//! Fixed-width value vectors.
//!
//! Every node sample is padded to exactly `VALUE_SLOTS` components, NaN in
//! the unused trailing slots. Both table builders share this padding, so
//! the flat and normalized representations can never disagree on width.
//! On disk an unused slot becomes a NULL; in memory it stays NaN.

use crate::utils::config::VALUE_SLOTS;
use crate::utils::error::SchemaError;

/// A padded, fixed-width value vector
pub type ValueSlots = [f64; VALUE_SLOTS];

/// Pad a sample's components to the fixed slot count
///
/// **Public** - shared by the flat and normalized builders
///
/// # Arguments
/// * `components` - The sample's numeric components (possibly empty)
///
/// # Returns
/// A vector of exactly `VALUE_SLOTS` values, NaN-filled on the right
///
/// # Errors
/// * `SchemaError::VectorTooLong` - the sample has more than `VALUE_SLOTS`
///   components; samples are never silently truncated
pub fn pad_values(components: &[f64]) -> Result<ValueSlots, SchemaError> {
    if components.len() > VALUE_SLOTS {
        return Err(SchemaError::VectorTooLong {
            len: components.len(),
            max: VALUE_SLOTS,
        });
    }

    let mut slots = [f64::NAN; VALUE_SLOTS];
    slots[..components.len()].copy_from_slice(components);
    Ok(slots)
}

/// Map an in-memory slot to its nullable on-disk representation
pub fn slot_to_nullable(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Map a nullable on-disk value back to its in-memory slot
pub fn nullable_to_slot(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_short_vector() {
        let slots = pad_values(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(&slots[..3], &[1.0, 2.0, 3.0]);
        assert!(slots[3..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_pad_full_vector() {
        let slots = pad_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(slots, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_pad_empty_vector() {
        let slots = pad_values(&[]).unwrap();
        assert!(slots.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_too_long_vector_is_schema_error() {
        let result = pad_values(&[1.0; 7]);
        assert!(matches!(
            result,
            Err(SchemaError::VectorTooLong { len: 7, max: 6 })
        ));
    }

    #[test]
    fn test_nullable_round_trip() {
        assert_eq!(slot_to_nullable(2.5), Some(2.5));
        assert_eq!(slot_to_nullable(f64::NAN), None);
        assert_eq!(nullable_to_slot(Some(2.5)), 2.5);
        assert!(nullable_to_slot(None).is_nan());
    }
}
