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

//! Collaborators of the amplifier module: vendor library, sound card
//! control device and playback device.

use crate::error::Result;
use crate::mixer::{ControlDevice, ControlInfo};
use crate::pcm::{Pcm, PcmConfig, PcmSink};
use crate::vendor::{Vendor, VendorLibrary, VendorSymbols};
use std::io;
use std::sync::Arc;

/// Interface to the resources used by the amplifier module
pub trait Hardware: Send + Sync {
    /// Load the vendor library and resolve its entry points
    fn load_vendor(&self, path: &str, symbols: &VendorSymbols) -> Result<Arc<dyn Vendor>>;

    /// Open the control device of `card`
    fn open_mixer(&self, card: u32) -> io::Result<Box<dyn Mixer>>;

    /// Open and configure a playback device
    fn open_pcm(&self, card: u32, device: u32, config: &PcmConfig) -> io::Result<Box<dyn PcmSink>>;
}

/// Control device of a sound card
pub trait Mixer: Send {
    /// Look up a control element by name
    fn find_control(&mut self, name: &str) -> io::Result<Option<ControlInfo>>;

    /// Read the first value of an enumerated (or integer) element
    fn read_value(&mut self, numid: u32) -> io::Result<u32>;

    /// Write the first value of a boolean element
    fn write_bool(&mut self, numid: u32, value: bool) -> io::Result<()>;

    /// Start receiving element change notifications
    fn subscribe_events(&mut self) -> io::Result<()>;

    /// Block until an element changes, and return its numeric id.
    /// `None` when the device is gone or the wait has been interrupted.
    fn next_change(&mut self) -> io::Result<Option<u32>>;

    /// Handle stopping any current or future `next_change()` wait
    fn interrupter(&self) -> Arc<dyn Interrupt>;
}

/// Cancellation of a blocking wait
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Kernel sound devices and `dlopen()`
#[derive(Debug, Default)]
pub struct SystemHardware;

impl Hardware for SystemHardware {
    fn load_vendor(&self, path: &str, symbols: &VendorSymbols) -> Result<Arc<dyn Vendor>> {
        Ok(Arc::new(VendorLibrary::open(path, symbols)?))
    }

    fn open_mixer(&self, card: u32) -> io::Result<Box<dyn Mixer>> {
        Ok(Box::new(ControlDevice::open(card)?))
    }

    fn open_pcm(&self, card: u32, device: u32, config: &PcmConfig) -> io::Result<Box<dyn PcmSink>> {
        Ok(Box::new(Pcm::open(card, device, config)?))
    }
}
