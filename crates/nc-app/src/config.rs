//! Controller configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration for a stock plant.

use std::path::Path;
use std::time::Duration;

use nc_controls::{HysteresisBand, PidGains};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::supervisor::RetryPolicy;

/// Where the plant web server lives and how often to poll it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Delay between timestep polls in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            timeout_ms: 2_000,
            poll_interval_ms: 500,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Variables of one secondary coolant loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryLoopNames {
    /// Measured liquid level.
    pub level: String,
    /// Measured pump speed, used to seed the controller.
    pub pump_speed: String,
    /// Ordered pump speed.
    pub pump_command: String,
}

impl SecondaryLoopNames {
    pub fn numbered(index: usize) -> Self {
        Self {
            level: format!("COOLANT_SEC_{index}_LIQUID_VOLUME"),
            pump_speed: format!("COOLANT_SEC_CIRCULATION_PUMP_{index}_SPEED"),
            pump_command: format!("COOLANT_SEC_CIRCULATION_PUMP_{index}_ORDERED_SPEED"),
        }
    }
}

/// Plant variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    pub timestamp: String,
    pub core_temperature: String,
    pub criticality: String,
    pub operation_mode: String,
    pub rod_position: String,
    pub rod_command: String,
    pub secondary_loops: Vec<SecondaryLoopNames>,
    pub condenser_temperature: String,
    pub condenser_volume: String,
    pub condenser_pump_speed: String,
    pub condenser_pump_command: String,
    pub condenser_fill: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            timestamp: "TIME_STAMP".to_string(),
            core_temperature: "CORE_TEMP".to_string(),
            criticality: "CORE_STATE_CRITICALITY".to_string(),
            operation_mode: "CORE_OPERATION_MODE".to_string(),
            rod_position: "RODS_POS_ACTUAL".to_string(),
            rod_command: "RODS_POS_ORDERED".to_string(),
            secondary_loops: (0..3).map(SecondaryLoopNames::numbered).collect(),
            condenser_temperature: "CONDENSER_TEMPERATURE".to_string(),
            condenser_volume: "CONDENSER_VOLUME".to_string(),
            condenser_pump_speed: "CONDENSER_CIRCULATION_PUMP_SPEED".to_string(),
            condenser_pump_command: "CONDENSER_CIRCULATION_PUMP_ORDERED_SPEED".to_string(),
            condenser_fill: "CONDENSER_FILL_PUMP_SWITCH".to_string(),
        }
    }
}

/// Nominal operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    /// Core temperature with criticality near neutral.
    pub core_temperature: f64,
    /// Liquid level of every secondary loop.
    pub secondary_level: f64,
    pub condenser_temperature: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            core_temperature: 360.0,
            secondary_level: 4_500.0,
            condenser_temperature: 65.0,
        }
    }
}

/// Outer loop that picks the core temperature needed for a power output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTrackingConfig {
    /// Measured power output.
    pub variable: String,
    pub target_kw: f64,
    /// Gains; the integral limits also bound the chosen temperature.
    pub gains: PidGains,
}

impl Default for PowerTrackingConfig {
    fn default() -> Self {
        Self {
            variable: "AUX_EFFECTIVELY_DERIVED_ENERGY_KW".to_string(),
            target_kw: 3_750.0,
            gains: PidGains::new(0.000_05, 0.000_01, 0.02).with_integral_limits(120.0, 450.0),
        }
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub endpoint: EndpointConfig,
    pub variables: VariableNames,
    pub targets: Targets,
    /// Core temperature to rod position. Inverted: more rod, less heat.
    /// Criticality feeds the derivative directly; it has the opposite sign
    /// of the error slope, hence the negative `kd`.
    pub rods: PidGains,
    /// Secondary level to pump speed, one instance per loop.
    pub secondary: PidGains,
    /// Condenser temperature to condenser pump speed.
    pub condenser: PidGains,
    /// Lowest condenser pump speed allowed in normal operation.
    pub condenser_min_speed: f64,
    /// Condenser inventory band for the fill pump.
    pub inventory: HysteresisBand,
    /// Commanded-mode value that means the reactor is shut down.
    pub shutdown_sentinel: String,
    /// Readings tracked tick over tick for diagnostics.
    pub observed: Vec<String>,
    pub retry: RetryPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_tracking: Option<PowerTrackingConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let variables = VariableNames::default();
        let observed = vec![
            variables.core_temperature.clone(),
            variables.criticality.clone(),
            variables.rod_position.clone(),
            variables.condenser_temperature.clone(),
            variables.condenser_volume.clone(),
        ];
        Self {
            endpoint: EndpointConfig::default(),
            variables,
            targets: Targets::default(),
            rods: PidGains::new(0.01, 0.01, -2.0)
                .inverted()
                .with_integral_limits(0.0, 100.0),
            secondary: PidGains::new(0.01, 0.002, 0.0).with_integral_limits(0.0, 100.0),
            condenser: PidGains::new(2.0, 0.5, 0.0)
                .inverted()
                .with_integral_limits(0.0, 100.0),
            condenser_min_speed: 10.0,
            inventory: HysteresisBand {
                low: 26_000.0,
                high: 29_000.0,
            },
            shutdown_sentinel: "SHUTDOWN".to_string(),
            observed,
            retry: RetryPolicy::default(),
            power_tracking: None,
        }
    }
}

impl ControllerConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> AppResult<Self> {
        let config: ControllerConfig = serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let channels = [
            ("rods", &self.rods),
            ("secondary", &self.secondary),
            ("condenser", &self.condenser),
        ];
        for (name, gains) in channels {
            gains
                .validate()
                .map_err(|e| AppError::Config(format!("{name} controller: {e}")))?;
        }
        if let Some(power) = &self.power_tracking {
            power
                .gains
                .validate()
                .map_err(|e| AppError::Config(format!("power tracking controller: {e}")))?;
            ensure_finite(power.target_kw, "power_tracking.target_kw")?;
        }

        ensure_finite(self.targets.core_temperature, "targets.core_temperature")?;
        ensure_finite(self.targets.secondary_level, "targets.secondary_level")?;
        ensure_finite(
            self.targets.condenser_temperature,
            "targets.condenser_temperature",
        )?;

        HysteresisBand::new(self.inventory.low, self.inventory.high)
            .map_err(|e| AppError::Config(format!("inventory: {e}")))?;

        if !(self.condenser_min_speed > 0.0 && self.condenser_min_speed <= 100.0) {
            return Err(AppError::Config(
                "condenser_min_speed must be in (0, 100]".to_string(),
            ));
        }
        if self.variables.secondary_loops.is_empty() {
            return Err(AppError::Config(
                "at least one secondary loop is required".to_string(),
            ));
        }
        if self.endpoint.poll_interval_ms == 0 || self.endpoint.timeout_ms == 0 {
            return Err(AppError::Config(
                "endpoint poll interval and timeout must be positive".to_string(),
            ));
        }
        self.retry.validate()
    }
}

fn ensure_finite(value: f64, what: &str) -> AppResult<()> {
    nc_core::ensure_finite(value, what)
        .map(|_| ())
        .map_err(|e| AppError::Config(e.to_string()))
}
