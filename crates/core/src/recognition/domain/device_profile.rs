use std::str::FromStr;

/// Where inference runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Gpu,
    Cpu,
}

/// Numeric precision of the loaded weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    Float16,
    Int8,
}

/// Execution environment for one engine: decided once per process and
/// supplied to the core as configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceProfile {
    pub device: DeviceClass,
    pub precision: Precision,
}

impl DeviceProfile {
    /// GPUs run half precision; CPUs run 8-bit quantized weights.
    pub fn for_device(device: DeviceClass) -> Self {
        let precision = match device {
            DeviceClass::Gpu => Precision::Float16,
            DeviceClass::Cpu => Precision::Int8,
        };
        Self { device, precision }
    }

    /// GPU when the binary was built with a GPU backend, CPU otherwise.
    pub fn detect() -> Self {
        if cfg!(any(feature = "cuda", feature = "metal")) {
            Self::for_device(DeviceClass::Gpu)
        } else {
            Self::for_device(DeviceClass::Cpu)
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let device = match self.device {
            DeviceClass::Gpu => "GPU",
            DeviceClass::Cpu => "CPU",
        };
        let precision = match self.precision {
            Precision::Float16 => "float16",
            Precision::Int8 => "int8",
        };
        write!(f, "{device} ({precision})")
    }
}

/// User-facing device choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl DeviceChoice {
    pub fn resolve(self) -> DeviceProfile {
        match self {
            DeviceChoice::Auto => DeviceProfile::detect(),
            DeviceChoice::Cpu => DeviceProfile::for_device(DeviceClass::Cpu),
            DeviceChoice::Gpu => DeviceProfile::for_device(DeviceClass::Gpu),
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceChoice::Auto),
            "cpu" => Ok(DeviceChoice::Cpu),
            "gpu" | "cuda" | "metal" => Ok(DeviceChoice::Gpu),
            other => Err(format!("Device must be one of: auto, cpu, gpu, got '{other}'")),
        }
    }
}
