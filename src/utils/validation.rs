//! Utilidades de validación
//!
//! Funciones helper usadas por los DTOs (`#[validate(schema(...))]`) y por el
//! gestor de viajes para validar identificadores sueltos.

use serde::Serialize;
use validator::ValidationError;

/// Validar coordenadas GPS: finitas y dentro de rango
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !lng.is_finite() {
        let mut error = ValidationError::new("finite");
        error.message = Some("coordinates must be finite numbers".into());
        return Err(error);
    }

    if !(-90.0..=90.0).contains(&lat) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &lat);
        error.add_param("range".into(), &"-90.0 to 90.0");
        return Err(error);
    }

    if !(-180.0..=180.0).contains(&lng) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &lng);
        error.add_param("range".into(), &"-180.0 to 180.0");
        return Err(error);
    }

    Ok(())
}

/// Validar que un valor sea positivo
pub fn validate_positive<T: PartialOrd + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(45.0, -75.0).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(91.0, -75.0).is_err());
        assert!(validate_coordinates(45.0, -181.0).is_err());
    }

    #[test]
    fn test_validate_coordinates_rejects_non_finite() {
        assert_eq!(validate_coordinates(f64::NAN, 0.0).unwrap_err().code, "finite");
        assert_eq!(validate_coordinates(0.0, f64::INFINITY).unwrap_err().code, "finite");
        assert!(validate_coordinates(f64::NEG_INFINITY, f64::NAN).is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(5_i64).is_ok());
        assert!(validate_positive(0_i64).is_err());
        assert!(validate_positive(-5_i64).is_err());
    }
}
