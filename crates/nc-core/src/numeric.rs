use crate::{CoreError, CoreResult};

/// Floating point type used for every plant reading
pub type Real = f64;

/// Errors closer than this are treated as the same reading.
pub const DISTINCT_EPS: Real = 1e-8;

/// Reject NaN and infinities, naming the offending quantity.
pub fn ensure_finite(v: Real, what: &str) -> CoreResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite {
            what: what.to_string(),
            value: v,
        })
    }
}

/// Parse a plant reading into a finite [`Real`].
///
/// The plant formats numbers with whatever decimal separator its host locale
/// uses, so both `12.5` and `12,5` are accepted. Thousands separators are not.
pub fn parse_real(raw: &str, what: &str) -> CoreResult<Real> {
    let normalized = raw.trim().replace(',', ".");
    let value: Real = normalized.parse().map_err(|_| CoreError::Parse {
        what: what.to_string(),
        raw: raw.to_string(),
    })?;
    ensure_finite(value, what)
}

/// Format a value for the plant, always with a period decimal separator.
pub fn format_real(v: Real) -> String {
    format!("{v}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn parse_real_accepts_both_separators() {
        assert_eq!(parse_real("312.75", "CORE_TEMP").unwrap(), 312.75);
        assert_eq!(parse_real(" 312,75\n", "CORE_TEMP").unwrap(), 312.75);
        assert_eq!(parse_real("-4", "CORE_STATE_CRITICALITY").unwrap(), -4.0);
    }

    #[test]
    fn parse_real_rejects_garbage() {
        let err = parse_real("n/a", "CORE_TEMP").unwrap_err();
        assert_eq!(
            err,
            CoreError::Parse {
                what: "CORE_TEMP".to_string(),
                raw: "n/a".to_string()
            }
        );
        assert!(parse_real("1.000,5", "CORE_TEMP").is_err());
        assert!(matches!(
            parse_real("inf", "CORE_TEMP"),
            Err(CoreError::NonFinite { .. })
        ));
    }

    #[test]
    fn format_real_uses_period() {
        assert_eq!(format_real(12.5), "12.5");
        assert_eq!(format_real(100.0), "100");
    }
}
