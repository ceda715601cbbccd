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

//! Kernel sound interface, as defined in `include/uapi/sound/asound.h`

#![allow(dead_code)]

use core::ffi::{c_int, c_long, c_uint, c_ulong, c_void};

/// Kernel structures for which all-zero bytes is a valid value.
///
/// # Safety
///
/// Implementors must only contain integers, arrays, raw pointers, and unions
/// of those.
pub(crate) unsafe trait Zeroable: Sized {
    fn zeroed() -> Self {
        // SAFETY: Guaranteed by the implementor.
        unsafe { core::mem::zeroed() }
    }
}

// Control interface

pub(crate) const ELEM_ID_NAME_MAXLEN: usize = 44;

pub(crate) const CTL_EVENT_ELEM: c_int = 0;
pub(crate) const CTL_EVENT_MASK_REMOVE: c_uint = !0;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ElemId {
    pub numid: c_uint,
    pub iface: c_int,
    pub device: c_uint,
    pub subdevice: c_uint,
    pub name: [u8; ELEM_ID_NAME_MAXLEN],
    pub index: c_uint,
}

#[repr(C)]
pub struct ElemList {
    pub offset: c_uint,
    pub space: c_uint,
    pub used: c_uint,
    pub count: c_uint,
    pub pids: *mut ElemId,
    pub reserved: [u8; 50],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct EnumeratedInfo {
    pub items: c_uint,
    pub item: c_uint,
    pub name: [u8; 64],
    pub names_ptr: u64,
    pub names_length: c_uint,
}

#[repr(C)]
pub union InfoValue {
    pub integer: [c_long; 3],
    pub integer64: [i64; 3],
    pub enumerated: EnumeratedInfo,
    pub reserved: [u8; 128],
}

#[repr(C)]
pub struct ElemInfo {
    pub id: ElemId,
    pub kind: c_int,
    pub access: c_uint,
    pub count: c_uint,
    pub owner: libc::pid_t,
    pub value: InfoValue,
    pub reserved: [u8; 64],
}

#[repr(C)]
pub union ValueData {
    pub integer: [c_long; 128],
    pub integer64: [i64; 64],
    pub enumerated: [c_uint; 128],
    pub bytes: [u8; 512],
}

#[repr(C)]
pub struct ElemValue {
    pub id: ElemId,
    pub indirect: c_uint,
    pub value: ValueData,
    pub reserved: [u8; 128],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct EventElem {
    pub mask: c_uint,
    pub id: ElemId,
}

#[repr(C)]
pub union EventData {
    pub elem: EventElem,
    pub data8: [u8; 60],
}

#[repr(C)]
pub struct Event {
    pub kind: c_int,
    pub data: EventData,
}

// SAFETY: Plain kernel structures, made of integers, pointers and unions of those.
unsafe impl Zeroable for ElemId {}
unsafe impl Zeroable for ElemList {}
unsafe impl Zeroable for ElemInfo {}
unsafe impl Zeroable for ElemValue {}
unsafe impl Zeroable for Event {}

nix::ioctl_readwrite!(ctl_elem_list, b'U', 0x10, ElemList);
nix::ioctl_readwrite!(ctl_elem_info, b'U', 0x11, ElemInfo);
nix::ioctl_readwrite!(ctl_elem_read, b'U', 0x12, ElemValue);
nix::ioctl_readwrite!(ctl_elem_write, b'U', 0x13, ElemValue);
nix::ioctl_readwrite!(ctl_subscribe_events, b'U', 0x16, c_int);

// PCM interface

pub(crate) const PCM_ACCESS_RW_INTERLEAVED: usize = 3;
pub(crate) const PCM_FORMAT_S16_LE: usize = 2;
pub(crate) const PCM_SUBFORMAT_STD: usize = 0;
pub(crate) const PCM_TSTAMP_ENABLE: c_int = 1;
pub(crate) const PCM_TSTAMP_TYPE_MONOTONIC: c_int = 1;

pub(crate) const HW_PARAM_ACCESS: usize = 0;
pub(crate) const HW_PARAM_FORMAT: usize = 1;
pub(crate) const HW_PARAM_SUBFORMAT: usize = 2;
pub(crate) const HW_PARAM_SAMPLE_BITS: usize = 8;
pub(crate) const HW_PARAM_FRAME_BITS: usize = 9;
pub(crate) const HW_PARAM_CHANNELS: usize = 10;
pub(crate) const HW_PARAM_RATE: usize = 11;
pub(crate) const HW_PARAM_PERIOD_SIZE: usize = 13;
pub(crate) const HW_PARAM_PERIODS: usize = 15;

const HW_PARAM_FIRST_MASK: usize = HW_PARAM_ACCESS;
const HW_PARAM_LAST_MASK: usize = HW_PARAM_SUBFORMAT;
const HW_PARAM_FIRST_INTERVAL: usize = HW_PARAM_SAMPLE_BITS;
const HW_PARAM_LAST_INTERVAL: usize = 19;

const INTERVAL_INTEGER: c_uint = 1 << 2;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Mask {
    pub bits: [u32; 8],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Interval {
    pub min: c_uint,
    pub max: c_uint,
    /// `openmin:1`, `openmax:1`, `integer:1`, `empty:1`
    pub flags: c_uint,
}

#[repr(C)]
pub struct HwParams {
    pub flags: c_uint,
    pub masks: [Mask; HW_PARAM_LAST_MASK - HW_PARAM_FIRST_MASK + 1],
    pub mres: [Mask; 5],
    pub intervals: [Interval; HW_PARAM_LAST_INTERVAL - HW_PARAM_FIRST_INTERVAL + 1],
    pub ires: [Interval; 9],
    pub rmask: c_uint,
    pub cmask: c_uint,
    pub info: c_uint,
    pub msbits: c_uint,
    pub rate_num: c_uint,
    pub rate_den: c_uint,
    pub fifo_size: c_ulong,
    pub reserved: [u8; 64],
}

#[repr(C)]
pub struct SwParams {
    pub tstamp_mode: c_int,
    pub period_step: c_uint,
    pub sleep_min: c_uint,
    pub avail_min: c_ulong,
    pub xfer_align: c_ulong,
    pub start_threshold: c_ulong,
    pub stop_threshold: c_ulong,
    pub silence_threshold: c_ulong,
    pub silence_size: c_ulong,
    pub boundary: c_ulong,
    pub proto: c_uint,
    pub tstamp_type: c_uint,
    pub reserved: [u8; 56],
}

#[repr(C)]
pub struct XferI {
    pub result: c_long,
    pub buf: *mut c_void,
    pub frames: c_ulong,
}

// SAFETY: Plain kernel structures, made of integers and pointers.
unsafe impl Zeroable for HwParams {}
unsafe impl Zeroable for SwParams {}

impl HwParams {
    /// Parameters space with every value allowed, as a starting point for
    /// refinement.
    pub(crate) fn any() -> Self {
        let mut params = Self::zeroed();
        for mask in params.masks.iter_mut() {
            mask.bits = [!0; 8];
        }
        for interval in params.intervals.iter_mut() {
            interval.min = 0;
            interval.max = !0;
        }
        params.rmask = !0;
        params.cmask = 0;
        params.info = !0;
        params
    }

    pub(crate) fn set_mask(&mut self, param: usize, bit: usize) {
        let mask = &mut self.masks[param - HW_PARAM_FIRST_MASK];
        mask.bits = [0; 8];
        mask.bits[bit >> 5] |= 1 << (bit & 31);
    }

    pub(crate) fn set_min(&mut self, param: usize, value: c_uint) {
        self.intervals[param - HW_PARAM_FIRST_INTERVAL].min = value;
    }

    pub(crate) fn set_int(&mut self, param: usize, value: c_uint) {
        let interval = &mut self.intervals[param - HW_PARAM_FIRST_INTERVAL];
        interval.min = value;
        interval.max = value;
        interval.flags |= INTERVAL_INTEGER;
    }

    /// Refined value of an integer parameter
    pub(crate) fn get_int(&self, param: usize) -> c_uint {
        let interval = &self.intervals[param - HW_PARAM_FIRST_INTERVAL];
        if interval.flags & INTERVAL_INTEGER != 0 {
            interval.max
        } else {
            0
        }
    }
}

nix::ioctl_write_ptr!(pcm_ttstamp, b'A', 0x03, c_int);
nix::ioctl_readwrite!(pcm_hw_params, b'A', 0x11, HwParams);
nix::ioctl_readwrite!(pcm_sw_params, b'A', 0x13, SwParams);
nix::ioctl_none!(pcm_prepare, b'A', 0x40);
nix::ioctl_none!(pcm_drop, b'A', 0x43);
nix::ioctl_write_ptr!(pcm_writei_frames, b'A', 0x50, XferI);

/// Bytes up to the first NUL of a fixed size kernel string
pub(crate) fn c_name(name: &[u8]) -> &[u8] {
    let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
    &name[..len]
}
