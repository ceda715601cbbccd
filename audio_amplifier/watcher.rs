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

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hardware::{Hardware, Interrupt, Mixer};
use crate::state::Shared;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Thread following the I2S clock control, powering the speaker with it.
/// Dropping the value stops and joins the thread.
pub(crate) struct Watcher {
    interrupt: Arc<dyn Interrupt>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    pub(crate) fn start(
        shared: Arc<Shared>,
        hardware: &dyn Hardware,
        config: &Config,
    ) -> Result<Self> {
        let mut mixer = hardware.open_mixer(config.card).map_err(|e| {
            log::error!("failed to open control device of card {}: {}", config.card, e);
            Error::NoDevice(e)
        })?;

        let clock = mixer
            .find_control(&config.clock_control)
            .map_err(Error::NoDevice)?
            .ok_or_else(|| {
                log::error!("could not find mixer control {}", config.clock_control);
                Error::ControlNotFound(config.clock_control.clone())
            })?;
        log::debug!("{} has numid {}", clock.name, clock.numid);

        mixer.subscribe_events().map_err(|e| {
            log::error!("failed to subscribe to control events: {}", e);
            Error::NoDevice(e)
        })?;

        let interrupt = mixer.interrupter();
        let thread = thread::Builder::new()
            .name("amp_watcher".to_string())
            .spawn(move || Self::thread_loop(shared, mixer, clock.numid))
            .map_err(|e| {
                log::error!("failed to start watcher thread: {}", e);
                Error::NoMemory("watcher thread")
            })?;

        Ok(Self { interrupt, thread: Some(thread) })
    }

    fn thread_loop(shared: Arc<Shared>, mut mixer: Box<dyn Mixer>, clock: u32) {
        loop {
            let numid = match mixer.next_change() {
                Ok(Some(numid)) => numid,
                Ok(None) => break,
                Err(e) => {
                    log::error!("failed to read control event: {}", e);
                    break;
                }
            };
            if numid != clock {
                continue;
            }

            let value = match mixer.read_value(clock) {
                Ok(value) => value,
                Err(e) => {
                    log::error!("failed to read clock control: {}", e);
                    continue;
                }
            };

            log::debug!("clock control changed to {}", value);
            shared.clock_changed(value != 0);
        }
        log::info!("watcher stopped");
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.interrupt.interrupt();
        if let Some(thread) = self.thread.take() {
            thread.join().expect("End of watcher loop");
        }
    }
}
