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

use crate::config::VendorStatusPolicy;
use crate::vendor::Vendor;
use num_derive::FromPrimitive;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Amplifier tuning profile, identified by the value handed to the vendor
/// `switch_parameter` entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum Preset {
    Ringtone = 1,
    Bypass = 2,
    Playback = 3,
    Alarm = 4,
}

/// Audio mode of the host audio stack (`audio_mode_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum AudioMode {
    Invalid = -2,
    Current = -1,
    Normal = 0,
    Ringtone = 1,
    InCall = 2,
    InCommunication = 3,
    CallScreen = 4,
}

impl Preset {
    pub fn id(self) -> i32 {
        self as i32
    }
}

impl From<AudioMode> for Preset {
    // There is no audio mode selecting `Preset::Alarm`.
    fn from(mode: AudioMode) -> Self {
        match mode {
            AudioMode::Normal => Preset::Playback,
            AudioMode::Ringtone => Preset::Ringtone,
            _ => Preset::Bypass,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AmplifierState {
    /// The calibration runner is in progress, the dummy stream keeps writing
    pub(crate) calibrating: bool,

    /// Latch set by the dummy stream after each write attempt
    pub(crate) writing: bool,

    /// The dummy stream thread has returned
    pub(crate) writer_exited: bool,

    /// The speaker has been powered by the watcher
    pub(crate) power_on: bool,

    /// Preset selected by the last `set_mode()`, `None` until the first one
    pub(crate) preset: Option<Preset>,

    /// `preset` not yet applied to the amplifier
    pub(crate) preset_changed: bool,

    /// Output devices given by the last `enable_output_devices()`
    pub(crate) output_devices: u32,
}

impl Default for AmplifierState {
    fn default() -> Self {
        Self {
            calibrating: false,
            writing: false,
            writer_exited: false,
            power_on: false,
            preset: None,
            preset_changed: false,
            output_devices: u32::MAX,
        }
    }
}

/// State shared by the device handle, the calibration threads and the watcher.
pub(crate) struct Shared {
    state: Mutex<AmplifierState>,
    written: Condvar,
    vendor: Arc<dyn Vendor>,
    policy: VendorStatusPolicy,
}

impl Shared {
    pub(crate) fn new(vendor: Arc<dyn Vendor>, policy: VendorStatusPolicy) -> Self {
        Self { state: Mutex::new(Default::default()), written: Condvar::new(), vendor, policy }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, AmplifierState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn written(&self) -> &Condvar {
        &self.written
    }

    pub(crate) fn vendor(&self) -> &dyn Vendor {
        &*self.vendor
    }

    pub(crate) fn policy(&self) -> VendorStatusPolicy {
        self.policy
    }

    /// Select the preset matching `mode`. The amplifier is updated by the
    /// watcher, on the next clock enable.
    pub(crate) fn set_mode(&self, mode: AudioMode) {
        let preset = Preset::from(mode);
        let mut state = self.lock();

        log::debug!(
            "set_mode: mode={:?} old preset={:?} new preset={:?}",
            mode,
            state.preset,
            preset
        );
        if state.preset == Some(preset) {
            return;
        }

        state.preset = Some(preset);
        state.preset_changed = true;
    }

    pub(crate) fn set_output_devices(&self, devices: u32) {
        self.lock().output_devices = devices;
    }

    /// Apply a new value of the I2S clock control.
    pub(crate) fn clock_changed(&self, enabled: bool) {
        let mut state = self.lock();

        if enabled {
            self.policy.report("speaker_on", self.vendor.speaker_on());
            state.power_on = true;

            if state.preset_changed {
                if let Some(preset) = state.preset {
                    self.policy
                        .report("switch_parameter", self.vendor.switch_parameter(preset));
                }
                state.preset_changed = false;
            }
        } else if state.power_on {
            self.policy.report("speaker_off", self.vendor.speaker_off());
            state.power_on = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> AmplifierState {
        self.lock().clone()
    }
}
