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

//! Silence written to the amplifier interface, keeping its I2S clock
//! running while the vendor calibration executes.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hardware::{Hardware, Mixer};
use crate::mixer::ElemType;
use crate::pcm::PcmConfig;
use crate::state::Shared;
use scopeguard::ScopeGuard;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Stream {
    card: u32,
    device: u32,
    interface_control: String,
    pcm: PcmConfig,
}

/// Start the writer thread. It loops until `calibrating` is cleared, and
/// always attempts at least one write when its resources could be opened.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    hardware: Arc<dyn Hardware>,
    config: &Config,
) -> Result<JoinHandle<()>> {
    let stream = Stream {
        card: config.card,
        device: config.pcm_device,
        interface_control: config.interface_control.clone(),
        pcm: config.pcm.clone(),
    };

    thread::Builder::new()
        .name("amp_dummy_stream".to_string())
        .spawn(move || {
            stream.run(&shared, &*hardware);

            let mut state = shared.lock();
            state.writer_exited = true;
            shared.written().notify_all();
        })
        .map_err(|e| {
            log::error!("failed to start dummy stream thread: {}", e);
            Error::NoMemory("dummy stream thread")
        })
}

impl Stream {
    fn run(&self, shared: &Shared, hardware: &dyn Hardware) {
        let Some(_interface) = self.enable_interface(hardware) else {
            log::error!("Failed to enable {}", self.interface_control);
            return;
        };

        let mut pcm = match hardware.open_pcm(self.card, self.device, &self.pcm) {
            Ok(pcm) => pcm,
            Err(e) => {
                log::error!("pcm_open failed: {}", e);
                return;
            }
        };

        let buffer = vec![0u8; self.pcm.silence_bytes()];
        loop {
            if let Err(e) = pcm.write(&buffer) {
                log::error!("pcm_write failed: {}", e);
            } else {
                log::trace!("wrote {} bytes of silence", buffer.len());
            }

            let mut state = shared.lock();
            state.writing = true;
            shared.written().notify_all();
            if !state.calibrating {
                break;
            }
        }

        drop(buffer);
        drop(pcm);
    }

    /// Route the playback device to the amplifier interface. The returned
    /// guard removes the route when dropped.
    fn enable_interface(
        &self,
        hardware: &dyn Hardware,
    ) -> Option<ScopeGuard<(Box<dyn Mixer>, u32), impl FnOnce((Box<dyn Mixer>, u32))>> {
        let name = self.interface_control.as_str();
        let mut mixer = hardware
            .open_mixer(self.card)
            .map_err(|e| log::error!("Error opening mixer {}: {}", self.card, e))
            .ok()?;

        let control = match mixer.find_control(name) {
            Ok(Some(control)) => control,
            Ok(None) => {
                log::error!("Could not find {}", name);
                return None;
            }
            Err(e) => {
                log::error!("Could not look up {}: {}", name, e);
                return None;
            }
        };
        if control.kind != ElemType::Boolean {
            log::error!("{} is not supported", name);
            return None;
        }

        mixer.write_bool(control.numid, true).map_err(|e| log::error!("{}: {}", name, e)).ok()?;
        log::debug!("{} enabled", name);

        let name = name.to_string();
        Some(scopeguard::guard((mixer, control.numid), move |(mut mixer, numid)| {
            match mixer.write_bool(numid, false) {
                Ok(()) => log::debug!("{} disabled", name),
                Err(e) => log::error!("Failed to disable {}: {}", name, e),
            }
        }))
    }
}
