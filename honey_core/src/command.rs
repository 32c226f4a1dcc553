//! Operator commands and their textual form.
use std::str::FromStr;

use crate::error::SettingsError;
use crate::viscosity::ViscosityProfile;

/// Inbound command, drained at the start of every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Tare,
    Calibrate,
    Set(Parameter),
}

/// A single settings change, already parsed but not yet range-checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter {
    TargetAmount(f32),
    Viscosity(ViscosityProfile),
    ActuatorMin(f32),
    ActuatorMax(f32),
    StopHysteresis(f32),
    MinGlassWeight(f32),
    CalReferenceWeight(f32),
    AutoMode(bool),
    Kp(f32),
    Ti(f32),
    Kd(f32),
}

fn number(name: &'static str, value: &str) -> Result<f32, SettingsError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SettingsError::InvalidValue {
            name,
            value: value.to_string(),
        })
}

fn flag(name: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

impl Parameter {
    /// Parse `name` / `value` as typed on the command line.
    pub fn parse(name: &str, value: &str) -> Result<Self, SettingsError> {
        let key = name.trim().to_ascii_lowercase();
        let key = key.strip_suffix("_g").unwrap_or(&key);
        let value = value.trim();
        Ok(match key {
            "target_amount" | "target" => Self::TargetAmount(number("target_amount", value)?),
            "viscosity" => Self::Viscosity(value.parse().map_err(|()| {
                SettingsError::InvalidValue {
                    name: "viscosity",
                    value: value.to_string(),
                }
            })?),
            "actuator_min" => Self::ActuatorMin(number("actuator_min", value)?),
            "actuator_max" => Self::ActuatorMax(number("actuator_max", value)?),
            "stop_hysteresis" => Self::StopHysteresis(number("stop_hysteresis", value)?),
            "min_glass_weight" => Self::MinGlassWeight(number("min_glass_weight", value)?),
            "cal_reference_weight" => {
                Self::CalReferenceWeight(number("cal_reference_weight", value)?)
            }
            "auto_mode" => Self::AutoMode(flag("auto_mode", value)?),
            "kp" => Self::Kp(number("kp", value)?),
            "ti" => Self::Ti(number("ti", value)?),
            "kd" => Self::Kd(number("kd", value)?),
            _ => return Err(SettingsError::UnknownParameter(name.trim().to_string())),
        })
    }
}

impl FromStr for Command {
    type Err = SettingsError;

    /// `start`, `stop`, `tare`, `calibrate`, or `set <name> <value>`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        match verb.as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "tare" => Ok(Command::Tare),
            "calibrate" | "cal" => Ok(Command::Calibrate),
            "set" => {
                let name = parts
                    .next()
                    .ok_or_else(|| SettingsError::MissingValue("set".into()))?;
                let value = parts
                    .next()
                    .ok_or_else(|| SettingsError::MissingValue(name.to_string()))?;
                Ok(Command::Set(Parameter::parse(name, value)?))
            }
            _ => Err(SettingsError::UnknownCommand(line.trim().to_string())),
        }
    }
}
