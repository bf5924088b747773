//! Linux hardware sources
//!
//! The rotation sensor is a GPIO input read through the sysfs GPIO class.
//! The configured pin is a line offset on the SoC pin controller; sysfs
//! numbers lines globally, so the controller's `base` is added before export.
//! The temperature sensor is exposed by the kernel IIO driver as a single
//! attribute holding millidegrees Celsius; a failed sensor transaction shows
//! up as an I/O error when the attribute is read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::{RotationSource, SensorError, TemperatureSource};

/// Root of the sysfs GPIO class
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Label prefix of SoC pin controllers (`pinctrl-bcm2711`, `pinctrl-rp1`)
const PINCTRL_LABEL_PREFIX: &str = "pinctrl-";

/// A `gpiochipN` entry of the sysfs GPIO class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioChip {
    /// Global number of the chip's first line
    pub base: u32,
    /// Number of lines
    pub ngpio: u32,
    /// Driver label
    pub label: String,
}

impl GpioChip {
    fn read(dir: &Path) -> Result<Self, SensorError> {
        let attr = |name: &str| -> Result<String, SensorError> {
            Ok(fs::read_to_string(dir.join(name))?.trim().to_string())
        };
        let number = |name: &str| -> Result<u32, SensorError> {
            let raw = attr(name)?;
            raw.parse().map_err(|_| {
                SensorError::Fault(format!("{}/{name}: unexpected value {raw:?}", dir.display()))
            })
        };
        Ok(Self {
            base: number("base")?,
            ngpio: number("ngpio")?,
            label: attr("label").unwrap_or_default(),
        })
    }

    /// Global sysfs number of `offset`, if the chip has that line
    pub fn global(&self, offset: u32) -> Option<u32> {
        (offset < self.ngpio).then(|| self.base + offset)
    }
}

/// Find the SoC pin controller under `root`
///
/// Prefers a `pinctrl-*` chip, else the chip with the lowest base. `None`
/// when the kernel exposes no chips (legacy numbering, base 0).
pub fn find_pin_controller(root: &Path) -> Result<Option<GpioChip>, SensorError> {
    let mut chips = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with("gpiochip") {
            chips.push(GpioChip::read(&entry.path())?);
        }
    }
    chips.sort_by_key(|chip| chip.base);

    let pinctrl = chips
        .iter()
        .position(|chip| chip.label.starts_with(PINCTRL_LABEL_PREFIX));
    Ok(match pinctrl {
        Some(i) => Some(chips.swap_remove(i)),
        None => chips.into_iter().next(),
    })
}

/// GPIO input read through sysfs
#[derive(Debug)]
pub struct SysfsGpio {
    value_path: PathBuf,
}

impl SysfsGpio {
    /// Export line `offset` of the pin controller as an input under the
    /// standard sysfs root
    pub fn open(offset: u32) -> Result<Self, SensorError> {
        Self::open_in(Path::new(SYSFS_GPIO_ROOT), offset)
    }

    /// Export line `offset` of the pin controller as an input under `root`
    pub fn open_in(root: &Path, offset: u32) -> Result<Self, SensorError> {
        let number = match find_pin_controller(root)? {
            Some(chip) => chip.global(offset).ok_or_else(|| {
                SensorError::Unavailable(format!(
                    "{} has {} lines, no line {offset}",
                    chip.label, chip.ngpio
                ))
            })?,
            None => offset,
        };

        let pin_dir = root.join(format!("gpio{number}"));
        if !pin_dir.exists() {
            debug!("Exporting GPIO {} (line {})", number, offset);
            fs::write(root.join("export"), number.to_string())?;
            // udev needs a moment to fix up permissions on the new node
            thread::sleep(Duration::from_millis(100));
        }
        fs::write(pin_dir.join("direction"), "in")?;

        info!("GPIO line {} (sysfs gpio{}) configured as input", offset, number);
        Ok(Self::from_value_file(pin_dir.join("value")))
    }

    /// Read an already configured `value` attribute
    pub fn from_value_file(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
        }
    }
}

impl RotationSource for SysfsGpio {
    fn read_level(&mut self) -> Result<bool, SensorError> {
        let raw = fs::read_to_string(&self.value_path)?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(SensorError::Fault(format!("unexpected GPIO value {other:?}"))),
        }
    }
}

/// Temperature from an IIO `in_temp_input` attribute
#[derive(Debug)]
pub struct IioTemperature {
    path: PathBuf,
}

impl IioTemperature {
    /// Read from `path`; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Attribute path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSource for IioTemperature {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SensorError::Unavailable(self.path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let millidegrees: i64 = raw
            .trim()
            .parse()
            .map_err(|_| SensorError::Fault(format!("unexpected temperature value {:?}", raw.trim())))?;
        Ok(millidegrees as f64 / 1000.0)
    }
}
