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

//! Hardware module interface (`hardware/hardware.h`, `hardware/amplifier.h`)

use crate::amplifier::Amplifier;
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::hardware::SystemHardware;
use crate::state::AudioMode;
use core::ffi::{c_char, c_int, c_void};
use num_traits::FromPrimitive;
use std::ffi::CStr;
use std::ptr;
use std::sync::Arc;

const fn make_tag(tag: &[u8; 4]) -> u32 {
    (tag[0] as u32) << 24 | (tag[1] as u32) << 16 | (tag[2] as u32) << 8 | tag[3] as u32
}

const HARDWARE_MODULE_TAG: u32 = make_tag(b"HWMT");
const HARDWARE_DEVICE_TAG: u32 = make_tag(b"HWDT");

const AMPLIFIER_MODULE_API_VERSION_0_1: u16 = 0x0001;
const HARDWARE_HAL_API_VERSION: u16 = 0x0100;
const AMPLIFIER_DEVICE_API_VERSION_2_0: u32 = 0x0200;

#[repr(C)]
#[allow(dead_code)]
pub struct HwModuleMethods {
    open: Option<
        unsafe extern "C" fn(
            module: *const HwModule,
            id: *const c_char,
            device: *mut *mut HwDevice,
        ) -> c_int,
    >,
}

#[repr(C)]
#[allow(dead_code)]
pub struct HwModule {
    tag: u32,
    module_api_version: u16,
    hal_api_version: u16,
    id: *const c_char,
    name: *const c_char,
    author: *const c_char,
    methods: *const HwModuleMethods,
    dso: *mut c_void,
    reserved: [usize; 32 - 7],
}

#[repr(C)]
#[allow(dead_code)]
pub struct HwDevice {
    tag: u32,
    version: u32,
    module: *const HwModule,
    reserved: [usize; 12],
    close: Option<unsafe extern "C" fn(device: *mut HwDevice) -> c_int>,
}

type DevicesFn = unsafe extern "C" fn(*mut AmplifierDevice, u32) -> c_int;
type EnableDevicesFn = unsafe extern "C" fn(*mut AmplifierDevice, u32, bool) -> c_int;
type StreamFn = unsafe extern "C" fn(*mut AmplifierDevice, *mut c_void) -> c_int;
type OutputStreamFn = unsafe extern "C" fn(*mut AmplifierDevice, *mut c_void, bool) -> c_int;

/// Callbacks left NULL are not implemented by this amplifier.
#[repr(C)]
#[allow(dead_code)]
pub struct AmplifierDevice {
    common: HwDevice,
    set_input_devices: Option<DevicesFn>,
    set_output_devices: Option<DevicesFn>,
    enable_input_devices: Option<EnableDevicesFn>,
    enable_output_devices: Option<EnableDevicesFn>,
    set_mode: Option<unsafe extern "C" fn(*mut AmplifierDevice, c_int) -> c_int>,
    output_stream_start: Option<OutputStreamFn>,
    input_stream_start: Option<StreamFn>,
    output_stream_standby: Option<StreamFn>,
    input_stream_standby: Option<StreamFn>,
    set_parameters: Option<StreamFn>,
}

#[repr(C)]
#[allow(dead_code)]
pub struct AmplifierModule {
    common: HwModule,
}

/// Module descriptor, exported for the HAL loader
#[repr(transparent)]
#[allow(dead_code)]
pub struct ModuleInfo(AmplifierModule);

//SAFETY: The descriptor is immutable, and only points to static strings
//        and functions.
unsafe impl Sync for ModuleInfo {}

static METHODS: HwModuleMethods = HwModuleMethods { open: Some(amp_module_open) };

#[no_mangle]
pub static HMI: ModuleInfo = ModuleInfo(AmplifierModule {
    common: HwModule {
        tag: HARDWARE_MODULE_TAG,
        module_api_version: AMPLIFIER_MODULE_API_VERSION_0_1,
        hal_api_version: HARDWARE_HAL_API_VERSION,
        id: b"audio_amplifier\0".as_ptr() as *const c_char,
        name: b"Ether Amplifier HAL\0".as_ptr() as *const c_char,
        author: b"The CyanogenMod Project\0".as_ptr() as *const c_char,
        methods: &METHODS,
        dso: ptr::null_mut(),
        reserved: [0; 32 - 7],
    },
});

/// Device handed to the host, `amp` first so that the `hw_device_t` pointer
/// is the pointer to the whole device.
#[repr(C)]
struct Device {
    amp: AmplifierDevice,
    amplifier: Amplifier,
}

/// # Safety
///
/// `id` must be a NUL terminated string and `device` a valid pointer to
/// store the opened device.
unsafe extern "C" fn amp_module_open(
    module: *const HwModule,
    id: *const c_char,
    device: *mut *mut HwDevice,
) -> c_int {
    crate::init_logging();

    if id.is_null() || device.is_null() {
        return -(nix::errno::Errno::EINVAL as c_int);
    }
    // SAFETY: `id` is a NUL terminated string, as required by the caller.
    let name = unsafe { CStr::from_ptr(id) }.to_string_lossy();

    let amplifier = Config::load(DEFAULT_CONFIG_PATH)
        .and_then(|config| Amplifier::open(&name, &config, Arc::new(SystemHardware)));
    let amplifier = match amplifier {
        Ok(amplifier) => amplifier,
        Err(e) => {
            log::error!("amplifier open failed: {}", e);
            return e.status();
        }
    };

    let dev = Box::into_raw(Box::new(Device {
        amp: AmplifierDevice {
            common: HwDevice {
                tag: HARDWARE_DEVICE_TAG,
                version: AMPLIFIER_DEVICE_API_VERSION_2_0,
                module,
                reserved: [0; 12],
                close: Some(amp_dev_close),
            },
            set_input_devices: None,
            set_output_devices: None,
            enable_input_devices: None,
            enable_output_devices: Some(amp_enable_output_devices),
            set_mode: Some(amp_set_mode),
            output_stream_start: None,
            input_stream_start: None,
            output_stream_standby: None,
            input_stream_standby: None,
            set_parameters: None,
        },
        amplifier,
    }));

    // SAFETY: `device` is valid for writes, as required by the caller.
    //         `dev` is a valid allocation whose first field is the `HwDevice`.
    unsafe { *device = ptr::addr_of_mut!((*dev).amp.common) };
    0
}

/// # Safety
///
/// `device` must be null, or a device returned by `amp_module_open()` not
/// yet closed.
unsafe extern "C" fn amp_dev_close(device: *mut HwDevice) -> c_int {
    if !device.is_null() {
        // SAFETY: `device` was allocated as a `Device` by `amp_module_open()`,
        //         and ownership comes back to us.
        drop(unsafe { Box::from_raw(device as *mut Device) });
    }
    0
}

/// # Safety
///
/// `device` must be a device returned by `amp_module_open()` not yet closed.
unsafe fn with_device<F: FnOnce(&Amplifier)>(device: *mut AmplifierDevice, f: F) -> c_int {
    if device.is_null() {
        return -(nix::errno::Errno::EINVAL as c_int);
    }
    // SAFETY: `device` is the first field of a live `Device`.
    f(unsafe { &(*(device as *const Device)).amplifier });
    0
}

unsafe extern "C" fn amp_set_mode(device: *mut AmplifierDevice, mode: c_int) -> c_int {
    let mode = AudioMode::from_i32(mode).unwrap_or(AudioMode::Invalid);
    // SAFETY: The host passes back the device it opened.
    unsafe { with_device(device, |amplifier| amplifier.set_mode(mode)) }
}

unsafe extern "C" fn amp_enable_output_devices(
    device: *mut AmplifierDevice,
    devices: u32,
    enable: bool,
) -> c_int {
    // SAFETY: The host passes back the device it opened.
    unsafe { with_device(device, |amplifier| amplifier.enable_output_devices(devices, enable)) }
}
