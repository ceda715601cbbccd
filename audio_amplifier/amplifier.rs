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

use crate::calibration;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hardware::Hardware;
use crate::state::{AudioMode, Shared};
use crate::watcher::Watcher;
use std::sync::Arc;

/// Interface name requested by the host when opening the module
pub const AMPLIFIER_HARDWARE_INTERFACE: &str = "audio_amplifier_hw";

/// Opened amplifier device.
///
/// The speaker follows the I2S clock of the sound card for the lifetime of
/// the value. Dropping it stops the clock watcher, then releases the vendor
/// library once no thread uses it anymore.
pub struct Amplifier {
    watcher: Option<Watcher>,
    shared: Arc<Shared>,
}

impl Amplifier {
    /// Open the device: load the vendor library, calibrate the amplifier,
    /// and start following the clock control. Every resource acquired is
    /// released again when a later step fails.
    pub fn open(name: &str, config: &Config, hardware: Arc<dyn Hardware>) -> Result<Self> {
        if name != AMPLIFIER_HARDWARE_INTERFACE {
            log::error!("{} does not match amplifier hardware interface name", name);
            return Err(Error::InterfaceMismatch(name.to_string()));
        }

        let vendor = hardware.load_vendor(&config.vendor_library, &config.symbols)?;
        let shared = Arc::new(Shared::new(vendor, config.status_policy));

        calibration::run(&shared, &hardware, config)?;
        let watcher = Watcher::start(shared.clone(), &*hardware, config)?;

        let amplifier = Self { watcher: Some(watcher), shared };
        amplifier.set_mode(AudioMode::Normal);

        log::info!("amplifier opened");
        Ok(amplifier)
    }

    /// Select the tuning preset for `mode`, applied on the next speaker
    /// power on.
    pub fn set_mode(&self, mode: AudioMode) {
        self.shared.set_mode(mode);
    }

    pub fn enable_output_devices(&self, devices: u32, enable: bool) {
        log::debug!("enable_output_devices: devices={:#x} enable={}", devices, enable);
        self.shared.set_output_devices(devices);
    }

    pub fn close(self) {}

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Drop for Amplifier {
    fn drop(&mut self) {
        self.watcher.take();
        log::info!("amplifier closed");
    }
}
