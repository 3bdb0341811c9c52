//! The cascade that drives the plant.
//!
//! One [`CascadeController`] is one control session. It owns every PID
//! instance and all per-session state, and is advanced one plant timestep at
//! a time by [`CascadeController::tick`]. Any failure ends the session; the
//! supervisor builds a new one from fresh readings.

use std::collections::BTreeMap;
use std::thread;

use nc_controls::{DeltaTracker, HysteresisSwitch, PIDController, PidComponents, TimestepGate};
use nc_link::{PlantLink, TickCache};
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::error::AppResult;
use crate::mode::{Mode, ModeTracker};

/// Criticality magnitude at which the core target is relaxed.
pub const CRITICALITY_BAND: f64 = 1.0;

/// Offset applied to the core target while criticality is outside the band.
pub const CRITICALITY_OFFSET: f64 = 500.0;

/// Actuator range shared by rods and pumps, in percent.
const ACTUATOR_MIN: f64 = 0.0;
const ACTUATOR_MAX: f64 = 100.0;

/// Core temperature target after criticality limiting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapedSetpoint {
    pub target: f64,
    /// Set when criticality moved the target away from nominal.
    pub limited: bool,
}

/// Relax the core temperature target while the reactor is far from neutral.
///
/// Inside the band the nominal target is used as is. Outside it the target
/// moves by [`CRITICALITY_OFFSET`] against the sign of `criticality`, so a
/// supercritical core is asked for a much colder temperature.
pub fn shape_core_target(nominal: f64, criticality: f64) -> ShapedSetpoint {
    if criticality.abs() < CRITICALITY_BAND {
        ShapedSetpoint {
            target: nominal,
            limited: false,
        }
    } else {
        ShapedSetpoint {
            target: nominal - CRITICALITY_OFFSET * criticality.signum(),
            limited: true,
        }
    }
}

/// A value sent to one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActuatorCommand {
    Level(f64),
    Switch(bool),
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Ticks completed in this session, including this one.
    pub tick: u64,
    pub timestamp: f64,
    pub mode: Mode,
    /// The mode differs from the previous tick's.
    pub transition: bool,
    pub core_temperature: f64,
    pub criticality: f64,
    /// Core target before criticality limiting.
    pub nominal_target: f64,
    pub core_target: f64,
    pub limited: bool,
    /// Commands actually sent, by actuator variable.
    pub commands: BTreeMap<String, ActuatorCommand>,
    /// PID terms of this tick, by channel.
    pub components: BTreeMap<String, PidComponents>,
    /// Change of every observed reading since the previous tick, read
    /// after this tick's commands were sent.
    pub deltas: BTreeMap<String, f64>,
}

/// Mode-aware cascade of PID channels over one plant link.
#[derive(Debug)]
pub struct CascadeController<L> {
    config: ControllerConfig,
    plant: TickCache<L>,
    gate: TimestepGate,
    modes: ModeTracker,
    rods: PIDController,
    secondary: Vec<PIDController>,
    condenser: PIDController,
    power: Option<PIDController>,
    fill: HysteresisSwitch,
    deltas: DeltaTracker<f64>,
    ticks: u64,
}

impl<L: PlantLink> CascadeController<L> {
    /// Start a session, seeding every controller from live plant readings.
    pub fn start(link: L, config: ControllerConfig) -> AppResult<Self> {
        config.validate()?;
        let mut plant = TickCache::new(link);
        let names = &config.variables;

        let rods = PIDController::new(config.rods, plant.read_real(&names.rod_position)?)?;
        let secondary = names
            .secondary_loops
            .iter()
            .map(|loop_names| -> AppResult<PIDController> {
                let speed = plant.read_real(&loop_names.pump_speed)?;
                Ok(PIDController::new(config.secondary, speed)?)
            })
            .collect::<AppResult<Vec<_>>>()?;
        let condenser = PIDController::new(
            config.condenser,
            plant.read_real(&names.condenser_pump_speed)?,
        )?;
        let power = match &config.power_tracking {
            Some(power) => {
                let core = plant.read_real(&names.core_temperature)?;
                Some(PIDController::new(power.gains, core)?)
            }
            None => None,
        };
        let deltas = DeltaTracker::new(plant.read_snapshot(&config.observed)?);

        tracing::info!(
            secondary_loops = secondary.len(),
            power_tracking = power.is_some(),
            rods = %rods,
            "control session started"
        );

        Ok(Self {
            fill: HysteresisSwitch::new(config.inventory),
            config,
            plant,
            gate: TimestepGate::new(),
            modes: ModeTracker::new(),
            rods,
            secondary,
            condenser,
            power,
            deltas,
            ticks: 0,
        })
    }

    /// Block until the plant reports a timestep not seen before.
    ///
    /// There is no timeout: a paused simulation keeps this waiting.
    pub fn wait_for_timestep(&mut self) -> AppResult<f64> {
        let variable = &self.config.variables.timestamp;
        loop {
            let timestamp = self.plant.read_real_fresh(variable)?;
            if self.gate.observe(timestamp) {
                return Ok(timestamp);
            }
            thread::sleep(self.config.endpoint.poll_interval());
        }
    }

    /// Run one control tick at the next plant timestep.
    pub fn tick(&mut self) -> AppResult<TickReport> {
        let t = self.wait_for_timestep()?;
        self.plant.begin_tick();

        let names = &self.config.variables;
        let core_temperature = self.plant.read_real(&names.core_temperature)?;
        let criticality = self.plant.read_real(&names.criticality)?;
        let commanded = self.plant.read_text(&names.operation_mode)?;
        let levels = names
            .secondary_loops
            .iter()
            .map(|loop_names| self.plant.read_real(&loop_names.level))
            .collect::<Result<Vec<_>, _>>()?;
        let condenser_temperature = self.plant.read_real(&names.condenser_temperature)?;
        let inventory = self.plant.read_real(&names.condenser_volume)?;

        let mode = Mode::classify(&commanded, core_temperature, &self.config.shutdown_sentinel);
        let transition = self.modes.update(mode);
        if transition {
            let position = self.plant.read_real(&names.rod_position)?;
            self.rods.reset(position);
            tracing::info!(%mode, rod_position = position, "mode changed, rod controller re-homed");
        }

        let mut components = BTreeMap::new();
        let nominal_target = match (&mut self.power, &self.config.power_tracking) {
            (Some(pid), Some(power)) => {
                let output = self.plant.read_real(&power.variable)?;
                let limits = power.gains.integral_limits;
                let target = pid
                    .step(t, power.target_kw, output, None)
                    .clamp(limits.min, limits.max);
                components.insert("power".to_string(), pid.components());
                target
            }
            _ => self.config.targets.core_temperature,
        };

        let shaped = shape_core_target(nominal_target, criticality);
        if shaped.limited {
            tracing::warn!(
                criticality,
                target = shaped.target,
                "criticality outside band, core target relaxed"
            );
        }

        let rod_output = self.rods.step(t, shaped.target, core_temperature, Some(criticality));
        let rod_command = actuator(rod_output);
        components.insert("rods".to_string(), self.rods.components());

        let mut commands = BTreeMap::new();
        if mode.drives_rods() {
            commands.insert(names.rod_command.clone(), ActuatorCommand::Level(rod_command));
        }

        let level_target = self.config.targets.secondary_level;
        for (index, ((pid, loop_names), level)) in self
            .secondary
            .iter_mut()
            .zip(&names.secondary_loops)
            .zip(levels)
            .enumerate()
        {
            let speed = actuator(pid.step(t, level_target, level, None));
            components.insert(format!("secondary_{index}"), pid.components());
            commands.insert(loop_names.pump_command.clone(), ActuatorCommand::Level(speed));
        }

        let mut condenser_speed = actuator(self.condenser.step(
            t,
            self.config.targets.condenser_temperature,
            condenser_temperature,
            None,
        ));
        components.insert("condenser".to_string(), self.condenser.components());
        if mode == Mode::Normal {
            condenser_speed = condenser_speed.max(self.config.condenser_min_speed);
        }
        commands.insert(
            names.condenser_pump_command.clone(),
            ActuatorCommand::Level(condenser_speed),
        );

        let fill_before = self.fill.state();
        if let Some(fill) = self.fill.update(inventory) {
            if fill_before != Some(fill) {
                tracing::info!(inventory, on = fill, "condenser fill pump switched");
            }
            commands.insert(names.condenser_fill.clone(), ActuatorCommand::Switch(fill));
        }

        for (variable, command) in &commands {
            match *command {
                ActuatorCommand::Level(value) => self.plant.write_real(variable, value)?,
                ActuatorCommand::Switch(on) => self.plant.write_flag(variable, on)?,
            }
        }

        let snapshot = self.plant.read_snapshot_fresh(&self.config.observed)?;
        let deltas = self.deltas.tick(snapshot)?;
        self.ticks += 1;
        tracing::debug!(rods = %self.rods, condenser = %self.condenser, "controller state");
        tracing::debug!(tick = self.ticks, timestamp = t, ?deltas, "tick deltas");

        Ok(TickReport {
            tick: self.ticks,
            timestamp: t,
            mode,
            transition,
            core_temperature,
            criticality,
            nominal_target,
            core_target: shaped.target,
            limited: shaped.limited,
            commands,
            components,
            deltas,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        self.plant.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.plant.link_mut()
    }

    /// Mode of the last tick, `None` before the first.
    pub fn mode(&self) -> Option<Mode> {
        self.modes.last()
    }

    pub fn rods(&self) -> &PIDController {
        &self.rods
    }

    pub fn secondary(&self) -> &[PIDController] {
        &self.secondary
    }

    pub fn condenser(&self) -> &PIDController {
        &self.condenser
    }

    /// Ticks completed in this session.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn actuator(value: f64) -> f64 {
    value.clamp(ACTUATOR_MIN, ACTUATOR_MAX)
}
