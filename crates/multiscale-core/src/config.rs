//! Builder configuration.
//!
//! Loaded in two tiers:
//! 1. TOML file (base values, every field optional)
//! 2. Environment variables (runtime overrides)

use crate::connectivity::{ConnSpec, DEFAULT_CONNECTION_PROBABILITY};
use crate::synapse::Receptor;
use crate::{MultiscaleError, Params, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scaling of synaptic weights by the expected number of connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScaling {
    #[default]
    Identity,
    /// `weight / n_connections`
    InverseConnections,
}

impl WeightScaling {
    pub fn apply(&self, weight: f64, n_connections: usize) -> f64 {
        match self {
            Self::Identity => weight,
            Self::InverseConnections if n_connections > 0 => weight / n_connections as f64,
            Self::InverseConnections => weight,
        }
    }
}

/// Default synapse of population and device connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    pub synapse_model: String,
    pub weight: f64,
    pub receptor_type: Receptor,
    pub conn_spec: ConnSpec,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            synapse_model: "static_synapse".into(),
            weight: 1.0,
            receptor_type: Receptor::Index(0),
            conn_spec: ConnSpec::default(),
        }
    }
}

/// Extension module sources and their compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Directory holding one source directory per module
    pub modules_dir: Option<PathBuf>,
    /// Directory where modules are copied and compiled
    pub build_dir: PathBuf,
    /// Program and arguments run inside the module build directory.
    /// `{module}` and `{build_dir}` are substituted.
    pub compile_command: Vec<String>,
    pub compile_timeout_secs: u64,
    /// Forced compilations tried after a failed install
    pub max_compile_attempts: usize,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            modules_dir: None,
            build_dir: PathBuf::from("target/multiscale-modules"),
            compile_command: vec!["make".into(), "install".into()],
            compile_timeout_secs: 600,
            max_compile_attempts: 1,
        }
    }
}

/// Complete builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Neurons of a population of scale 1
    pub population_order: usize,
    pub tvb_to_spiking_dt_ratio: f64,
    pub default_min_spiking_dt: f64,
    pub default_min_delay_ratio: f64,
    pub default_min_delay: f64,
    /// Neuron model of populations that do not name one
    pub default_model: String,
    pub default_connection: ConnectionDefaults,
    /// Probability used by rules that need one when none is given
    pub default_probability: f64,
    pub weight_scaling: WeightScaling,
    /// Default parameters per neuron model
    pub model_params: BTreeMap<String, Params>,
    /// Default parameters per stimulating device model
    pub input_device_params: BTreeMap<String, Params>,
    /// Default parameters per recording device model
    pub output_device_params: BTreeMap<String, Params>,
    pub modules_to_install: Vec<String>,
    pub extensions: ExtensionConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            population_order: 100,
            tvb_to_spiking_dt_ratio: 2.0,
            default_min_spiking_dt: 0.001,
            default_min_delay_ratio: 2.0,
            default_min_delay: 0.001,
            default_model: "iaf_cond_alpha".into(),
            default_connection: ConnectionDefaults::default(),
            default_probability: DEFAULT_CONNECTION_PROBABILITY,
            weight_scaling: WeightScaling::Identity,
            model_params: BTreeMap::new(),
            input_device_params: BTreeMap::new(),
            output_device_params: BTreeMap::new(),
            modules_to_install: Vec::new(),
            extensions: ExtensionConfig::default(),
        }
    }
}

impl BuilderConfig {
    /// Parse a TOML document, apply environment overrides and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| MultiscaleError::Config(format!("invalid TOML: {}", e)))?;
        apply_environment_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_order == 0 {
            return Err(MultiscaleError::Config("population_order must be positive".into()));
        }
        for (name, value) in [
            ("tvb_to_spiking_dt_ratio", self.tvb_to_spiking_dt_ratio),
            ("default_min_spiking_dt", self.default_min_spiking_dt),
            ("default_min_delay_ratio", self.default_min_delay_ratio),
        ] {
            if !(value > 0.0) {
                return Err(MultiscaleError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.default_min_delay < 0.0 {
            return Err(MultiscaleError::Config(format!(
                "default_min_delay must be non-negative, got {}",
                self.default_min_delay
            )));
        }
        if !(0.0..=1.0).contains(&self.default_probability) {
            return Err(MultiscaleError::Config(format!(
                "default_probability must be in [0, 1], got {}",
                self.default_probability
            )));
        }
        if self.default_model.is_empty() {
            return Err(MultiscaleError::Config("default_model must not be empty".into()));
        }
        if self.extensions.compile_command.is_empty() {
            return Err(MultiscaleError::Config("extensions.compile_command must not be empty".into()));
        }
        Ok(())
    }

    /// Default parameters of a neuron model, empty if none are configured
    pub fn model_defaults(&self, model: &str) -> Params {
        self.model_params.get(model).cloned().unwrap_or_default()
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<BuilderConfig> {
    let content = fs::read_to_string(path)?;
    debug!(target: "multiscale::config", "Loaded configuration from {}", path.display());
    BuilderConfig::from_toml_str(&content)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `MULTISCALE_POPULATION_ORDER` -> `population_order`
/// - `MULTISCALE_TVB_TO_SPIKING_DT_RATIO` -> `tvb_to_spiking_dt_ratio`
/// - `MULTISCALE_DEFAULT_MIN_DELAY` -> `default_min_delay`
/// - `MULTISCALE_MODULES_DIR` -> `extensions.modules_dir`
/// - `MULTISCALE_BUILD_DIR` -> `extensions.build_dir`
pub fn apply_environment_overrides(config: &mut BuilderConfig) {
    apply_overrides(config, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup; unparsable values are ignored
pub fn apply_overrides<F>(config: &mut BuilderConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("MULTISCALE_POPULATION_ORDER") {
        if let Ok(order) = value.parse::<usize>() {
            config.population_order = order;
        }
    }
    if let Some(value) = lookup("MULTISCALE_TVB_TO_SPIKING_DT_RATIO") {
        if let Ok(ratio) = value.parse::<f64>() {
            config.tvb_to_spiking_dt_ratio = ratio;
        }
    }
    if let Some(value) = lookup("MULTISCALE_DEFAULT_MIN_DELAY") {
        if let Ok(delay) = value.parse::<f64>() {
            config.default_min_delay = delay;
        }
    }
    if let Some(value) = lookup("MULTISCALE_MODULES_DIR") {
        config.extensions.modules_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = lookup("MULTISCALE_BUILD_DIR") {
        config.extensions.build_dir = PathBuf::from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityRule;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BuilderConfig::default();
        assert_eq!(config.population_order, 100);
        assert_eq!(config.default_connection.synapse_model, "static_synapse");
        assert_eq!(config.default_connection.weight, 1.0);
        assert_eq!(config.default_connection.receptor_type, Receptor::Index(0));
        assert_eq!(config.default_connection.conn_spec.rule, ConnectivityRule::AllToAll);
        assert!(config.default_connection.conn_spec.allow_autapses);
        assert!(config.default_connection.conn_spec.allow_multapses);
        assert_eq!(config.default_probability, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: BuilderConfig = toml::from_str(
            r#"
            population_order = 200
            default_model = "izhikevich"

            [default_connection.conn_spec]
            rule = "pairwise_bernoulli"
            p = 0.2

            [model_params.izhikevich]
            a = 0.02
            "#,
        )
        .unwrap();
        assert_eq!(config.population_order, 200);
        assert_eq!(config.tvb_to_spiking_dt_ratio, 2.0);
        assert_eq!(config.default_connection.conn_spec.p, Some(0.2));
        assert_eq!(config.model_defaults("izhikevich")["a"], 0.02);
        assert!(config.model_defaults("iaf_psc_alpha").is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "population_order = 50\nweight_scaling = \"inverse_connections\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.weight_scaling, WeightScaling::InverseConnections);
        assert!(config.population_order > 0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(BuilderConfig::from_toml_str("population_order = 0").is_err());
        assert!(BuilderConfig::from_toml_str("default_probability = 1.5").is_err());
        assert!(BuilderConfig::from_toml_str("population_order = \"many\"").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = BuilderConfig::default();
        apply_overrides(&mut config, |key| match key {
            "MULTISCALE_POPULATION_ORDER" => Some("250".into()),
            "MULTISCALE_DEFAULT_MIN_DELAY" => Some("not-a-number".into()),
            "MULTISCALE_MODULES_DIR" => Some("/opt/modules".into()),
            _ => None,
        });
        assert_eq!(config.population_order, 250);
        assert_eq!(config.default_min_delay, 0.001);
        assert_eq!(config.extensions.modules_dir, Some(PathBuf::from("/opt/modules")));
    }

    #[test]
    fn test_weight_scaling() {
        assert_eq!(WeightScaling::Identity.apply(2.0, 10), 2.0);
        assert_eq!(WeightScaling::InverseConnections.apply(2.0, 10), 0.2);
        assert_eq!(WeightScaling::InverseConnections.apply(2.0, 0), 2.0);
    }
}
