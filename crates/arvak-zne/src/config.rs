//! Mitigation configuration.
//!
//! A [`ZneConfig`] selects the scale-factor policy, the noise scaler and the
//! extrapolation model. It is plain data: it can be built in code or loaded
//! from YAML/JSON, and [`ZneConfig::validate`] rejects bad parameters before
//! any circuit is executed.
//!
//! ```yaml
//! policy:
//!   kind: static
//!   scale_factors: [1.0, 2.0, 3.0]
//! scaler:
//!   method: local
//!   order: from_left
//! extrapolation:
//!   model: polynomial
//!   degree: 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ZneError, ZneResult};
use crate::extrapolation::Extrapolation;
use crate::factory::{AdaptiveConfig, Factory};
use crate::scaling::NoiseScaler;

/// How scale factors are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalePolicy {
    /// A fixed sequence.
    Static { scale_factors: Vec<f64> },
    /// Adaptive exponential sampling. The configured extrapolation model is
    /// ignored: adaptive runs always reduce with the exponential model.
    Adaptive(AdaptiveConfig),
}

impl Default for ScalePolicy {
    fn default() -> Self {
        ScalePolicy::Static {
            scale_factors: vec![1.0, 2.0, 3.0],
        }
    }
}

/// Complete configuration of a zero-noise extrapolation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZneConfig {
    /// Scale-factor policy.
    pub policy: ScalePolicy,
    /// Circuit folding strategy.
    pub scaler: NoiseScaler,
    /// Extrapolation model for static policies.
    pub extrapolation: Extrapolation,
}

impl ZneConfig {
    /// Create a configuration with default settings: scale factors
    /// `[1, 2, 3]`, local folding from the left, linear extrapolation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a static scale-factor sequence.
    pub fn with_scale_factors(mut self, scale_factors: Vec<f64>) -> Self {
        self.policy = ScalePolicy::Static { scale_factors };
        self
    }

    /// Use the adaptive policy.
    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.policy = ScalePolicy::Adaptive(adaptive);
        self
    }

    /// Set the noise scaler.
    pub fn with_scaler(mut self, scaler: NoiseScaler) -> Self {
        self.scaler = scaler;
        self
    }

    /// Set the extrapolation model.
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> ZneResult<()> {
        self.build_factory().map(|_| ())
    }

    /// A fresh factory for one mitigation run.
    pub fn build_factory(&self) -> ZneResult<Factory> {
        match &self.policy {
            ScalePolicy::Static { scale_factors } => {
                Factory::new_static(scale_factors.clone(), self.extrapolation)
            }
            ScalePolicy::Adaptive(adaptive) => Factory::adaptive(adaptive.clone()),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> ZneResult<Self> {
        let config: ZneConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ZneResult<Self> {
        let config: ZneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> ZneResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ZneError::Config(format!("failed to read {}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            _ => Err(ZneError::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> ZneResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::FoldOrder;

    #[test]
    fn test_default_config() {
        let config = ZneConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.scaler, NoiseScaler::local(FoldOrder::FromLeft));
        assert_eq!(config.extrapolation, Extrapolation::Linear);
        let factory = config.build_factory().unwrap();
        assert_eq!(factory.static_scale_factors(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_builder() {
        let config = ZneConfig::new()
            .with_scale_factors(vec![1.0, 1.5, 2.0, 2.5])
            .with_scaler(NoiseScaler::Global)
            .with_extrapolation(Extrapolation::Polynomial { degree: 3 });
        assert!(config.validate().is_ok());

        let config = config.with_extrapolation(Extrapolation::Polynomial { degree: 4 });
        assert!(matches!(
            config.validate(),
            Err(ZneError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_yaml() {
        let yaml = r#"
policy:
  kind: static
  scale_factors: [1.0, 3.0, 5.0]
scaler:
  method: global
extrapolation:
  model: richardson
"#;
        let config = ZneConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.scaler, NoiseScaler::Global);
        assert_eq!(config.extrapolation, Extrapolation::Richardson);
        assert_eq!(
            config.policy,
            ScalePolicy::Static {
                scale_factors: vec![1.0, 3.0, 5.0]
            }
        );
    }

    #[test]
    fn test_yaml_adaptive_with_defaults() {
        let yaml = r#"
policy:
  kind: adaptive
  max_iterations: 6
  asymptote: 0.0
"#;
        let config = ZneConfig::from_yaml_str(yaml).unwrap();
        match &config.policy {
            ScalePolicy::Adaptive(adaptive) => {
                assert_eq!(adaptive.max_iterations, 6);
                assert_eq!(adaptive.asymptote, Some(0.0));
                assert_eq!(adaptive.initial_scale_factor, 2.0);
            }
            other => panic!("expected adaptive policy, got {other:?}"),
        }
        assert!(!config.build_factory().unwrap().is_static());
    }

    #[test]
    fn test_invalid_documents() {
        let bad_factor = r#"{"policy":{"kind":"static","scale_factors":[0.5,1.0]}}"#;
        assert!(matches!(
            ZneConfig::from_json_str(bad_factor),
            Err(ZneError::InvalidConfiguration(_))
        ));

        let negative_degree = "extrapolation:\n  model: polynomial\n  degree: -1\n";
        assert!(matches!(
            ZneConfig::from_yaml_str(negative_degree),
            Err(ZneError::InvalidConfiguration(_))
        ));

        let malformed = r#"{"policy":{"kind":"sometimes"}}"#;
        assert!(matches!(
            ZneConfig::from_json_str(malformed),
            Err(ZneError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ZneConfig::new()
            .with_adaptive(AdaptiveConfig::new().with_tolerance(1e-4))
            .with_scaler(NoiseScaler::local(FoldOrder::AtRandom { seed: 9 }));
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ZneConfig::from_yaml_str(&yaml).unwrap(), config);

        for order in [FoldOrder::FromRight, FoldOrder::AtRandom { seed: 2 }] {
            let config = ZneConfig::new()
                .with_scale_factors(vec![1.0, 2.0, 3.0])
                .with_scaler(NoiseScaler::local(order))
                .with_extrapolation(Extrapolation::Polynomial { degree: 2 });
            let yaml = config.to_yaml().unwrap();
            assert_eq!(ZneConfig::from_yaml_str(&yaml).unwrap(), config);
            let json = serde_json::to_string(&config).unwrap();
            assert_eq!(ZneConfig::from_json_str(&json).unwrap(), config);
        }
    }

    #[test]
    fn test_yaml_random_order() {
        let yaml = r#"
scaler:
  method: local
  order:
    at_random:
      seed: 9
"#;
        let config = ZneConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.scaler,
            NoiseScaler::local(FoldOrder::AtRandom { seed: 9 })
        );
    }

    #[test]
    fn test_from_file_unknown_extension() {
        let err = ZneConfig::from_file("does-not-exist.toml").unwrap_err();
        assert!(matches!(err, ZneError::Config(_)));
    }
}
