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

use crate::error::{Error, Result};
use crate::state::Preset;
use core::ffi::{c_int, c_void};
use std::ffi::{CStr, CString};

/// Amplifier control entry points provided by the vendor
pub trait Vendor: Send + Sync {
    /// Run the speaker calibration; the I2S interface must be clocked.
    fn calibrate(&self) -> i32;
    fn speaker_on(&self) -> i32;
    fn speaker_off(&self) -> i32;
    fn switch_parameter(&self, preset: Preset) -> i32;
}

/// Symbol lookup in a loaded shared object
pub trait Library: Send + Sync {
    /// Address of the symbol `name`, or null when not exported
    fn symbol(&self, name: &CStr) -> *mut c_void;
}

/// Names of the vendor entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSymbols {
    pub calibrate: String,
    pub speaker_on: String,
    pub speaker_off: String,
    pub switch_parameter: String,
}

impl Default for VendorSymbols {
    fn default() -> Self {
        Self {
            calibrate: "FIH_Tfa9887_init".to_string(),
            speaker_on: "FIH_Tfa9887_power_on".to_string(),
            speaker_off: "FIH_Tfa9887_power_off".to_string(),
            switch_parameter: "FIH_Tfa9887_switch_para".to_string(),
        }
    }
}

type StatusFn = unsafe extern "C" fn() -> c_int;
type SwitchFn = unsafe extern "C" fn(c_int) -> c_int;

/// Vendor entry points resolved from a shared object. The library is
/// unloaded when the value is dropped.
pub struct VendorLibrary {
    calibrate: StatusFn,
    speaker_on: StatusFn,
    speaker_off: StatusFn,
    switch_parameter: SwitchFn,
    _library: Box<dyn Library>,
}

impl VendorLibrary {
    /// Load `path` with the dynamic linker and resolve `symbols` in it.
    pub fn open(path: &str, symbols: &VendorSymbols) -> Result<Self> {
        let library = DlLibrary::open(path)?;
        Self::resolve(Box::new(library), symbols)
    }

    /// Resolve `symbols` in an already loaded library. All of them must be
    /// exported.
    pub fn resolve(library: Box<dyn Library>, symbols: &VendorSymbols) -> Result<Self> {
        let calibrate = lookup(&*library, &symbols.calibrate)?;
        let speaker_on = lookup(&*library, &symbols.speaker_on)?;
        let speaker_off = lookup(&*library, &symbols.speaker_off)?;
        let switch_parameter = lookup(&*library, &symbols.switch_parameter)?;

        // SAFETY: The vendor library exports these symbols as C functions with
        //         the signatures `int f(void)` and `int f(int)`.
        unsafe {
            Ok(Self {
                calibrate: std::mem::transmute::<*mut c_void, StatusFn>(calibrate),
                speaker_on: std::mem::transmute::<*mut c_void, StatusFn>(speaker_on),
                speaker_off: std::mem::transmute::<*mut c_void, StatusFn>(speaker_off),
                switch_parameter: std::mem::transmute::<*mut c_void, SwitchFn>(switch_parameter),
                _library: library,
            })
        }
    }
}

fn lookup(library: &dyn Library, name: &str) -> Result<*mut c_void> {
    let cname = CString::new(name).map_err(|_| Error::MissingSymbol(name.to_string()))?;
    let ptr = library.symbol(&cname);
    if ptr.is_null() {
        log::error!("Unable to find required symbol {}", name);
        return Err(Error::MissingSymbol(name.to_string()));
    }
    Ok(ptr)
}

impl Vendor for VendorLibrary {
    fn calibrate(&self) -> i32 {
        // SAFETY: The function pointer was resolved from the library held by
        //         `self`, which stays loaded for the lifetime of `self`.
        unsafe { (self.calibrate)() }
    }

    fn speaker_on(&self) -> i32 {
        // SAFETY: See `calibrate()`.
        unsafe { (self.speaker_on)() }
    }

    fn speaker_off(&self) -> i32 {
        // SAFETY: See `calibrate()`.
        unsafe { (self.speaker_off)() }
    }

    fn switch_parameter(&self, preset: Preset) -> i32 {
        // SAFETY: See `calibrate()`.
        unsafe { (self.switch_parameter)(preset.id()) }
    }
}

/// Shared object opened with `dlopen()`
struct DlLibrary {
    handle: *mut c_void,
}

//SAFETY: The handle returned by `dlopen()` is not tied to the opening thread;
//        `dlsym()` and `dlclose()` are thread-safe.
unsafe impl Send for DlLibrary {}
unsafe impl Sync for DlLibrary {}

impl DlLibrary {
    fn open(path: &str) -> Result<Self> {
        let vendor_error = |reason: String| Error::VendorLibrary { path: path.to_string(), reason };
        let cpath = CString::new(path).map_err(|e| vendor_error(e.to_string()))?;

        // SAFETY: `cpath` is a valid NUL terminated string.
        let handle = unsafe { libc::dlopen(cpath.as_ptr(), libc::RTLD_NOW) };
        if handle.is_null() {
            let reason = dl_error().unwrap_or_else(|| "unknown error".to_string());
            log::error!("Unable to open {}: {}", path, reason);
            return Err(vendor_error(reason));
        }

        Ok(Self { handle })
    }
}

impl Library for DlLibrary {
    fn symbol(&self, name: &CStr) -> *mut c_void {
        // SAFETY: `handle` comes from a successful `dlopen()` not yet closed,
        //         and `name` is NUL terminated.
        unsafe { libc::dlsym(self.handle, name.as_ptr()) }
    }
}

impl Drop for DlLibrary {
    fn drop(&mut self) {
        // SAFETY: `handle` comes from a successful `dlopen()`, and is closed once.
        if unsafe { libc::dlclose(self.handle) } != 0 {
            log::warn!("dlclose failed: {}", dl_error().unwrap_or_default());
        }
    }
}

fn dl_error() -> Option<String> {
    // SAFETY: `dlerror()` returns null or a NUL terminated string valid until
    //         the next `dl*()` call on this thread; it is copied right away.
    unsafe {
        let err = libc::dlerror();
        (!err.is_null()).then(|| CStr::from_ptr(err).to_string_lossy().into_owned())
    }
}
