use crate::sensor::{OrientationSample, ScreenRotation};

/// Raw gamma beyond this magnitude is considered near the wrap boundary
pub const GIMBAL_WRAP_ZONE_DEG: f64 = 60.0;

/// Effective tilt plus the continuity-corrected gamma it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedTilt {
    /// Rotation-invariant forward/backward lean, degrees
    pub tilt: f64,
    /// Gamma after gimbal unwrap (not sign-flipped); feeds the raw baseline
    pub raw_gamma: f64,
}

/// Keep gamma continuous across the ±180° boundary.
///
/// When the reference sits deep on one side and the new reading jumps to the
/// opposite extreme, the reading is shifted by 180° toward the reference.
pub fn unwrap_gamma(raw_gamma: f64, reference: Option<f64>) -> f64 {
    match reference {
        Some(r) if r > GIMBAL_WRAP_ZONE_DEG && raw_gamma < -GIMBAL_WRAP_ZONE_DEG => raw_gamma + 180.0,
        Some(r) if r < -GIMBAL_WRAP_ZONE_DEG && raw_gamma > GIMBAL_WRAP_ZONE_DEG => raw_gamma - 180.0,
        _ => raw_gamma,
    }
}

/// Map a raw sample into the rotation-invariant tilt frame.
///
/// Portrait (and unknown rotation) reads the front-back axis directly.
/// Landscape reads gamma, sign-flipped for landscape-secondary so a forward
/// lean is positive in both orientations.
pub fn normalize(
    sample: &OrientationSample,
    rotation: ScreenRotation,
    raw_gamma_reference: Option<f64>,
) -> NormalizedTilt {
    let raw_gamma = unwrap_gamma(sample.gamma_or_zero(), raw_gamma_reference);

    let tilt = match rotation {
        ScreenRotation::LandscapePrimary => raw_gamma,
        ScreenRotation::LandscapeSecondary => -raw_gamma,
        ScreenRotation::Portrait | ScreenRotation::Unknown => sample.beta_or_zero(),
    };

    NormalizedTilt { tilt, raw_gamma }
}

/// Convenience wrapper returning only the effective tilt
pub fn effective_tilt(
    sample: &OrientationSample,
    rotation: ScreenRotation,
    raw_gamma_reference: Option<f64>,
) -> f64 {
    normalize(sample, rotation, raw_gamma_reference).tilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_portrait_uses_beta() {
        let sample = OrientationSample::new(10.0, 33.0, -70.0);
        assert_relative_eq!(effective_tilt(&sample, ScreenRotation::Portrait, None), 33.0);
        assert_relative_eq!(effective_tilt(&sample, ScreenRotation::Unknown, Some(80.0)), 33.0);
    }

    #[test]
    fn test_landscape_sign_flip() {
        let sample = OrientationSample::from_gamma(20.0);
        let primary = effective_tilt(&sample, ScreenRotation::LandscapePrimary, None);
        let secondary = effective_tilt(&sample, ScreenRotation::LandscapeSecondary, None);
        assert_relative_eq!(primary, 20.0);
        assert_relative_eq!(secondary, -20.0);
    }

    #[test]
    fn test_null_axes_are_zero() {
        let sample = OrientationSample::default();
        assert_eq!(effective_tilt(&sample, ScreenRotation::Portrait, None), 0.0);
        assert_eq!(effective_tilt(&sample, ScreenRotation::LandscapePrimary, None), 0.0);
    }

    #[test]
    fn test_gimbal_unwrap_positive_side() {
        // Baseline near +85°, device pushed past vertical reads as -88°
        let unwrapped = unwrap_gamma(-88.0, Some(85.0));
        assert_relative_eq!(unwrapped, 92.0);

        let tilt = effective_tilt(
            &OrientationSample::from_gamma(-88.0),
            ScreenRotation::LandscapePrimary,
            Some(85.0),
        );
        assert_relative_eq!(tilt, 92.0);
    }

    #[test]
    fn test_gimbal_unwrap_negative_side() {
        assert_relative_eq!(unwrap_gamma(87.0, Some(-82.0)), -93.0);
        let tilt = effective_tilt(
            &OrientationSample::from_gamma(87.0),
            ScreenRotation::LandscapeSecondary,
            Some(-82.0),
        );
        assert_relative_eq!(tilt, 93.0);
    }

    #[test]
    fn test_no_unwrap_outside_wrap_zone() {
        assert_relative_eq!(unwrap_gamma(-70.0, Some(40.0)), -70.0);
        assert_relative_eq!(unwrap_gamma(-50.0, Some(80.0)), -50.0);
        assert_relative_eq!(unwrap_gamma(75.0, None), 75.0);
    }

    #[test]
    fn test_continuity_across_sweep() {
        // A sweep that stays clear of the wrap boundary never jumps by more
        // than the raw step size.
        let step = 2.5;
        let mut previous: Option<f64> = None;
        let mut gamma = -55.0;
        while gamma <= 55.0 {
            let tilt = effective_tilt(
                &OrientationSample::from_gamma(gamma),
                ScreenRotation::LandscapeSecondary,
                Some(5.0),
            );
            if let Some(prev) = previous {
                assert_relative_eq!((tilt - prev).abs(), step, epsilon = 1e-9);
            }
            previous = Some(tilt);
            gamma += step;
        }
    }

    #[test]
    fn test_continuity_through_wrap_with_reference() {
        // Crossing +90 -> -90 while referenced to a high baseline stays smooth
        let readings = [84.0, 87.0, 89.5, -89.0, -86.0];
        let tilts: Vec<f64> = readings
            .iter()
            .map(|g| {
                effective_tilt(
                    &OrientationSample::from_gamma(*g),
                    ScreenRotation::LandscapePrimary,
                    Some(86.0),
                )
            })
            .collect();
        for pair in tilts.windows(2) {
            assert!((pair[1] - pair[0]).abs() < 5.0, "jump in {:?}", tilts);
        }
    }
}
