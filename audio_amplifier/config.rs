// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Module configuration. Built-in values match the Ether board; any of them
//! can be overridden by an INI file:
//!
//! ```ini
//! [vendor]
//! library = libFIHNxp.so
//! status_policy = ignore
//!
//! [mixer]
//! card = 0
//! clock_control = PRI_MI2S Clock
//!
//! [calibration]
//! device = 1
//! timeout_ms = 5000
//! ```

use crate::error::{Error, Result};
use crate::pcm::PcmConfig;
use crate::vendor::VendorSymbols;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Location of the optional configuration file on device
pub const DEFAULT_CONFIG_PATH: &str = "/vendor/etc/audio_amplifier.conf";

const VENDOR_LIBRARY: &str = "libFIHNxp.so";
const CLOCK_CONTROL: &str = "PRI_MI2S Clock";
const INTERFACE_CONTROL: &str = "PRI_MI2S_RX Audio Mixer MultiMedia2";
const CARD: u32 = 0;
const DEVICE: u32 = 1;
const CALIBRATION_TIMEOUT_MS: u64 = 5000;

/// How status codes returned by the vendor library are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VendorStatusPolicy {
    /// Statuses are discarded
    #[default]
    Ignore,
    /// Failures are logged
    Log,
    /// Failures are logged, and a failed calibration fails the open
    Strict,
}

impl VendorStatusPolicy {
    /// Handle the status of a call made on behalf of the watcher.
    pub(crate) fn report(self, op: &'static str, status: i32) {
        if self != VendorStatusPolicy::Ignore && status != 0 {
            log::error!("vendor {} returned {}", op, status);
        }
    }

    /// Handle the status of a call whose failure can be surfaced.
    pub(crate) fn check(self, op: &'static str, status: i32) -> Result<()> {
        self.report(op, status);
        match self {
            VendorStatusPolicy::Strict if status != 0 => Err(Error::VendorStatus { op, status }),
            _ => Ok(()),
        }
    }
}

impl FromStr for VendorStatusPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(VendorStatusPolicy::Ignore),
            "log" => Ok(VendorStatusPolicy::Log),
            "strict" => Ok(VendorStatusPolicy::Strict),
            other => Err(Error::Config(format!("unknown vendor status policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// File name or path of the vendor library
    pub vendor_library: String,
    pub symbols: VendorSymbols,
    pub status_policy: VendorStatusPolicy,

    /// Sound card holding the amplifier controls and the dummy stream device
    pub card: u32,
    /// Enumerated control following the I2S clock of the amplifier
    pub clock_control: String,
    /// Boolean control routing the dummy stream to the amplifier interface
    pub interface_control: String,

    /// Playback device of the dummy stream
    pub pcm_device: u32,
    pub pcm: PcmConfig,
    /// Deadline for the first dummy buffer write
    pub calibration_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_library: VENDOR_LIBRARY.to_string(),
            symbols: Default::default(),
            status_policy: Default::default(),
            card: CARD,
            clock_control: CLOCK_CONTROL.to_string(),
            interface_control: INTERFACE_CONTROL.to_string(),
            pcm_device: DEVICE,
            pcm: Default::default(),
            calibration_timeout: Duration::from_millis(CALIBRATION_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Load the configuration from `path`. A missing file gives the built-in
    /// configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("{} not found, using built-in configuration", path.display());
            return Ok(Default::default());
        }

        let mut ini = Ini::new();
        ini.load(path).map_err(Error::Config)?;
        Self::from_ini(&ini)
    }

    /// Parse a configuration held in a string.
    pub fn parse(content: &str) -> Result<Self> {
        let mut ini = Ini::new();
        ini.read(content.to_string()).map_err(Error::Config)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut config = Config::default();

        if let Some(v) = ini.get("vendor", "library") {
            config.vendor_library = v;
        }
        for (key, symbol) in [
            ("calibrate", &mut config.symbols.calibrate),
            ("speaker_on", &mut config.symbols.speaker_on),
            ("speaker_off", &mut config.symbols.speaker_off),
            ("switch_parameter", &mut config.symbols.switch_parameter),
        ] {
            if let Some(v) = ini.get("vendor", key) {
                *symbol = v;
            }
        }
        if let Some(v) = ini.get("vendor", "status_policy") {
            config.status_policy = v.parse()?;
        }

        if let Some(v) = get_uint(ini, "mixer", "card")? {
            config.card = v;
        }
        if let Some(v) = ini.get("mixer", "clock_control") {
            config.clock_control = v;
        }
        if let Some(v) = ini.get("mixer", "interface_control") {
            config.interface_control = v;
        }

        if let Some(v) = get_uint(ini, "calibration", "device")? {
            config.pcm_device = v;
        }
        if let Some(v) = get_uint(ini, "calibration", "channels")? {
            config.pcm.channels = v;
        }
        if let Some(v) = get_uint(ini, "calibration", "rate")? {
            config.pcm.rate = v;
        }
        let period_size = get_uint(ini, "calibration", "period_size")?;
        let period_count = get_uint(ini, "calibration", "period_count")?;
        config.pcm = PcmConfig::deep_buffer(
            config.pcm.channels,
            config.pcm.rate,
            period_size.unwrap_or(config.pcm.period_size),
            period_count.unwrap_or(config.pcm.period_count),
        );
        if let Some(v) = get_uint(ini, "calibration", "timeout_ms")? {
            config.calibration_timeout = Duration::from_millis(v.into());
        }

        if config.pcm.channels == 0 || config.pcm.period_size == 0 || config.pcm.period_count == 0 {
            return Err(Error::Config("empty dummy stream configuration".to_string()));
        }

        Ok(config)
    }
}

fn get_uint(ini: &Ini, section: &str, key: &str) -> Result<Option<u32>> {
    let value = ini.getuint(section, key).map_err(Error::Config)?;
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| Error::Config(format!("[{}] {} out of range: {}", section, key, v)))
        })
        .transpose()
}
