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

use nix::errno::Errno;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures of the amplifier module. Only `open` reports them to the host,
/// as the negative errno given by [`Error::status`].
#[derive(Debug, Error)]
pub enum Error {
    /// The host asked for an interface other than the amplifier one
    #[error("{0} does not match amplifier hardware interface name")]
    InterfaceMismatch(String),

    /// The vendor library cannot be loaded
    #[error("unable to open {path}: {reason}")]
    VendorLibrary { path: String, reason: String },

    /// The vendor library does not export a required entry point
    #[error("unable to find required symbol {0}")]
    MissingSymbol(String),

    /// The sound card control device cannot be used
    #[error("control device unavailable: {0}")]
    NoDevice(#[source] io::Error),

    /// No mixer control of that name on the card
    #[error("could not find mixer control {0}")]
    ControlNotFound(String),

    /// The mixer control exists but has an unexpected type
    #[error("mixer control {0} is not supported")]
    InvalidControl(String),

    /// A resource (memory, thread) could not be allocated
    #[error("unable to allocate {0}")]
    NoMemory(&'static str),

    /// No dummy buffer was written within the calibration deadline
    #[error("calibration timed out after {0:?}")]
    CalibrationTimeout(Duration),

    /// The dummy stream stopped before its first write
    #[error("dummy stream aborted before its first write")]
    CalibrationAborted,

    /// A vendor entry point reported a failure
    #[error("vendor {op} returned {status}")]
    VendorStatus { op: &'static str, status: i32 },

    /// Malformed configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Status code returned through the plugin ABI.
    pub fn status(&self) -> i32 {
        let errno = match self {
            Error::InterfaceMismatch(_)
            | Error::VendorLibrary { .. }
            | Error::MissingSymbol(_)
            | Error::NoDevice(_)
            | Error::ControlNotFound(_)
            | Error::InvalidControl(_) => Errno::ENODEV,
            Error::NoMemory(_) => Errno::ENOMEM,
            Error::CalibrationTimeout(_) => Errno::ETIMEDOUT,
            Error::CalibrationAborted | Error::VendorStatus { .. } | Error::Io(_) => Errno::EIO,
            Error::Config(_) => Errno::EINVAL,
        };
        -(errno as i32)
    }
}
