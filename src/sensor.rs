use serde::{Deserialize, Serialize};

/// Device orientation angles in degrees, as reported by the platform.
///
/// Any axis may be missing; sensors intermittently report partial data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
}

impl OrientationSample {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    /// Sample with only the front-back axis populated
    pub fn from_beta(beta: f64) -> Self {
        Self {
            beta: Some(beta),
            ..Self::default()
        }
    }

    /// Sample with only the left-right axis populated
    pub fn from_gamma(gamma: f64) -> Self {
        Self {
            gamma: Some(gamma),
            ..Self::default()
        }
    }

    pub fn beta_or_zero(&self) -> f64 {
        self.beta.unwrap_or(0.0)
    }

    pub fn gamma_or_zero(&self) -> f64 {
        self.gamma.unwrap_or(0.0)
    }
}

/// Screen rotation reported alongside each sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenRotation {
    Portrait,
    LandscapePrimary,
    LandscapeSecondary,
    #[default]
    Unknown,
}

impl ScreenRotation {
    pub fn is_landscape(&self) -> bool {
        matches!(
            self,
            ScreenRotation::LandscapePrimary | ScreenRotation::LandscapeSecondary
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenRotation::Portrait => "portrait",
            ScreenRotation::LandscapePrimary => "landscape-primary",
            ScreenRotation::LandscapeSecondary => "landscape-secondary",
            ScreenRotation::Unknown => "unknown",
        }
    }
}

/// One delivery from an orientation source: the sample plus the rotation in
/// effect when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationReading {
    pub t_ms: u64,
    pub rotation: ScreenRotation,
    #[serde(flatten)]
    pub sample: OrientationSample,
}

impl OrientationReading {
    pub fn new(t_ms: u64, rotation: ScreenRotation, sample: OrientationSample) -> Self {
        Self {
            t_ms,
            rotation,
            sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_axes_read_as_zero() {
        let sample = OrientationSample::default();
        assert_eq!(sample.beta_or_zero(), 0.0);
        assert_eq!(sample.gamma_or_zero(), 0.0);

        let sample = OrientationSample::from_gamma(42.0);
        assert_eq!(sample.gamma_or_zero(), 42.0);
        assert_eq!(sample.beta_or_zero(), 0.0);
    }

    #[test]
    fn test_landscape_detection() {
        assert!(ScreenRotation::LandscapePrimary.is_landscape());
        assert!(ScreenRotation::LandscapeSecondary.is_landscape());
        assert!(!ScreenRotation::Portrait.is_landscape());
        assert!(!ScreenRotation::Unknown.is_landscape());
    }

    #[test]
    fn test_reading_json_shape() {
        let json = r#"{"t_ms": 40, "rotation": "landscape-secondary", "beta": 3.5, "gamma": null}"#;
        let reading: OrientationReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.t_ms, 40);
        assert_eq!(reading.rotation, ScreenRotation::LandscapeSecondary);
        assert_eq!(reading.sample.beta, Some(3.5));
        assert_eq!(reading.sample.gamma, None);
        assert_eq!(reading.sample.alpha, None);
    }
}
