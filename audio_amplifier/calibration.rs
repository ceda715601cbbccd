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
use crate::dummy_stream;
use crate::error::{Error, Result};
use crate::hardware::Hardware;
use crate::state::Shared;
use std::sync::Arc;

/// Calibrate the amplifier, once the dummy stream is clocking its interface.
///
/// Returns after the dummy stream has been stopped, except on timeout where
/// the writer is left to exit on its own after its current write.
pub(crate) fn run(
    shared: &Arc<Shared>,
    hardware: &Arc<dyn Hardware>,
    config: &Config,
) -> Result<()> {
    log::info!("calibrating amplifier");

    shared.lock().calibrating = true;
    let writer = match dummy_stream::spawn(shared.clone(), hardware.clone(), config) {
        Ok(writer) => writer,
        Err(e) => {
            shared.lock().calibrating = false;
            return Err(e);
        }
    };

    let (mut state, timeout) = shared
        .written()
        .wait_timeout_while(shared.lock(), config.calibration_timeout, |state| {
            !state.writing && !state.writer_exited
        })
        .unwrap();

    if !state.writing {
        state.calibrating = false;
        drop(state);

        if timeout.timed_out() {
            log::error!("no dummy stream write within {:?}", config.calibration_timeout);
            return Err(Error::CalibrationTimeout(config.calibration_timeout));
        }

        writer.join().expect("End of dummy stream");
        log::error!("dummy stream stopped before writing");
        return Err(Error::CalibrationAborted);
    }
    drop(state);

    let status = shared.vendor().calibrate();
    log::debug!("calibrate returned {}", status);

    shared.lock().calibrating = false;
    writer.join().expect("End of dummy stream");

    shared.policy().check("calibrate", status)?;
    log::info!("amplifier calibrated");
    Ok(())
}
