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

//! TFA9887 smart amplifier HAL module
//!
//! The module calibrates the amplifier once at open, then follows the
//! I2S clock control of the sound card to power the speaker on and off,
//! applying the tuning preset selected by the audio stack:
//!
//! ```text
//!        open()                      set_mode()       hw_device_t
//!          |                             |                 ^
//!       ___v_________                 ___v______________   |
//!      | calibration |--- spawn ---> |  state (mutex)   |--'
//!      |   runner    |<-- cond ----- |__________________|
//!      |_____________|   dummy         ^          |
//!          |           stream          | clock    | vendor
//!          |          (PCM out)        | events   | calls
//!          v                        ___|__________v___
//!     vendor calibrate()           |     watcher      |
//!                                  |  (control dev)   |
//!                                  |__________________|
//! ```

mod amplifier;
mod calibration;
mod config;
mod dummy_stream;
mod error;
mod ffi;
mod hardware;
mod mixer;
mod pcm;
mod state;
mod sys;
mod vendor;
mod watcher;

#[cfg(test)]
mod tests;

pub use amplifier::{Amplifier, AMPLIFIER_HARDWARE_INTERFACE};
pub use config::{Config, VendorStatusPolicy, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
pub use hardware::{Hardware, Interrupt, Mixer, SystemHardware};
pub use mixer::{ControlInfo, ElemType};
pub use pcm::{PcmConfig, PcmSink};
pub use state::{AudioMode, Preset};
pub use vendor::{Library, Vendor, VendorLibrary, VendorSymbols};

/// Inits logging for Android
#[cfg(target_os = "android")]
pub fn init_logging() {
    android_logger::init_once(android_logger::Config::default().with_tag("audio_amplifier"));
}

/// Inits logging for host
#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    env_logger::Builder::new().parse_default_env().try_init().ok();
}
