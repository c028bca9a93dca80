use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;
use std::sync::LazyLock;

/// ISO 3779: 17 chars, letters I/O/Q excluded.
static RE_VIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap());

pub fn validate_vin(vin: &str) -> bool {
    vin.len() == 17 && RE_VIN.is_match(vin)
}

/// What the registry hands back to the submission path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VehicleSummary {
    pub id: i32,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_vin_accepts_valid() {
        assert!(validate_vin("2HGFC2F59MH528491"));
        assert!(validate_vin("1FTFW1ET5DFC10312"));
    }

    #[test]
    fn test_validate_vin_rejects_length() {
        assert!(!validate_vin(""));
        assert!(!validate_vin("2HGFC2F59MH52849"));
        assert!(!validate_vin("2HGFC2F59MH5284911"));
    }

    #[test]
    fn test_validate_vin_rejects_ioq() {
        assert!(!validate_vin("2HGFC2F59MH52849I"));
        assert!(!validate_vin("2HGFC2F59MH52849O"));
        assert!(!validate_vin("2HGFC2F59MH52849Q"));
    }

    #[test]
    fn test_validate_vin_rejects_lowercase() {
        assert!(!validate_vin("2hgfc2f59mh528491"));
    }
}
