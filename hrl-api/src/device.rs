use candle_core::{Device, Result};
use std::{fmt, str::FromStr};

/// Where the networks should live. Resolved to a concrete device only when a model is built or
/// loaded, so a model trained on a GPU machine can be evaluated on a laptop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    #[default]
    Cpu,
    /// The first CUDA device when the crate is built with CUDA support and one is present,
    /// the CPU otherwise.
    AcceleratorPreferred,
}

impl DevicePreference {
    pub fn resolve(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::AcceleratorPreferred => Device::cuda_if_available(0),
        }
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "auto" | "cuda" | "gpu" => Ok(Self::AcceleratorPreferred),
            other => Err(format!("unknown device `{other}`, expected `cpu` or `auto`")),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::AcceleratorPreferred => write!(f, "auto"),
        }
    }
}
