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

use crate::sys::{self, HwParams, SwParams, XferI, Zeroable};
use core::ffi::{c_int, c_ulong, c_void};
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;

const DEFAULT_OUTPUT_SAMPLING_RATE: u32 = 48000;
const DEEP_BUFFER_OUTPUT_PERIOD_SIZE: u32 = 960;
const DEEP_BUFFER_OUTPUT_PERIOD_COUNT: u32 = 8;

/// Interleaved S16_LE playback configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmConfig {
    pub channels: u32,
    pub rate: u32,
    /// Frames per period
    pub period_size: u32,
    pub period_count: u32,
    /// Frames queued before the stream starts, 0 for half the buffer
    pub start_threshold: u32,
    /// Frames of underrun tolerated before the stream stops, 0 for the buffer size
    pub stop_threshold: u32,
    /// Frames available for a write to return, 0 for one period
    pub avail_min: u32,
    /// Timestamps taken from the monotonic clock
    pub monotonic: bool,
}

impl PcmConfig {
    /// Deep buffer playback thresholds for the given geometry
    pub fn deep_buffer(channels: u32, rate: u32, period_size: u32, period_count: u32) -> Self {
        Self {
            channels,
            rate,
            period_size,
            period_count,
            start_threshold: period_count / 4,
            stop_threshold: i32::MAX as u32,
            avail_min: period_size / 4,
            monotonic: true,
        }
    }

    /// Size in bytes of one interleaved frame
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * 2
    }

    /// Size in bytes of the silence buffer written while calibrating
    pub fn silence_bytes(&self) -> usize {
        self.period_size as usize * 8
    }
}

impl Default for PcmConfig {
    fn default() -> Self {
        Self::deep_buffer(
            2,
            DEFAULT_OUTPUT_SAMPLING_RATE,
            DEEP_BUFFER_OUTPUT_PERIOD_SIZE,
            DEEP_BUFFER_OUTPUT_PERIOD_COUNT,
        )
    }
}

/// Playback stream. The device is closed on drop.
pub trait PcmSink: Send {
    /// Write interleaved frames, blocking until the device accepts them
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Playback device `/dev/snd/pcmC<card>D<device>p`
pub(crate) struct Pcm {
    file: File,
    frame_bytes: usize,
    running: bool,
}

impl Pcm {
    pub(crate) fn open(card: u32, device: u32, config: &PcmConfig) -> io::Result<Self> {
        let path = format!("/dev/snd/pcmC{}D{}p", card, device);
        let file = OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            log::error!("cannot open device {}: {}", path, e);
            e
        })?;
        let fd = file.as_raw_fd();

        let mut params = HwParams::any();
        params.set_mask(sys::HW_PARAM_ACCESS, sys::PCM_ACCESS_RW_INTERLEAVED);
        params.set_mask(sys::HW_PARAM_FORMAT, sys::PCM_FORMAT_S16_LE);
        params.set_mask(sys::HW_PARAM_SUBFORMAT, sys::PCM_SUBFORMAT_STD);
        params.set_min(sys::HW_PARAM_PERIOD_SIZE, config.period_size);
        params.set_int(sys::HW_PARAM_SAMPLE_BITS, 16);
        params.set_int(sys::HW_PARAM_FRAME_BITS, 16 * config.channels);
        params.set_int(sys::HW_PARAM_CHANNELS, config.channels);
        params.set_int(sys::HW_PARAM_PERIODS, config.period_count);
        params.set_int(sys::HW_PARAM_RATE, config.rate);

        // SAFETY: `params` is a valid `snd_pcm_hw_params`.
        unsafe { sys::pcm_hw_params(fd, &mut params) }.map_err(|e| {
            log::error!("cannot set hw params on {}: {}", path, e);
            e
        })?;

        let period_size = params.get_int(sys::HW_PARAM_PERIOD_SIZE) as c_ulong;
        let period_count = params.get_int(sys::HW_PARAM_PERIODS) as c_ulong;
        let buffer_size = period_size * period_count;
        if buffer_size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty PCM buffer"));
        }

        let mut sw_params = SwParams::zeroed();
        sw_params.tstamp_mode = sys::PCM_TSTAMP_ENABLE;
        sw_params.period_step = 1;
        sw_params.avail_min = match config.avail_min {
            0 => period_size,
            n => n.into(),
        };
        sw_params.start_threshold = match config.start_threshold {
            0 => buffer_size / 2,
            n => n.into(),
        };
        sw_params.stop_threshold = match config.stop_threshold {
            0 => buffer_size,
            n => n.into(),
        };
        sw_params.xfer_align = period_size / 2;
        sw_params.boundary = buffer_size;
        while sw_params.boundary * 2 <= i32::MAX as c_ulong - buffer_size {
            sw_params.boundary *= 2;
        }

        // SAFETY: `sw_params` is a valid `snd_pcm_sw_params`.
        unsafe { sys::pcm_sw_params(fd, &mut sw_params) }.map_err(|e| {
            log::error!("cannot set sw params on {}: {}", path, e);
            e
        })?;

        if config.monotonic {
            let tstamp_type: c_int = sys::PCM_TSTAMP_TYPE_MONOTONIC;
            // SAFETY: The ioctl argument is an `int`.
            if let Err(e) = unsafe { sys::pcm_ttstamp(fd, &tstamp_type) } {
                log::warn!("cannot set monotonic timestamps on {}: {}", path, e);
            }
        }

        Ok(Self { file, frame_bytes: config.frame_bytes(), running: false })
    }

    fn prepare(&mut self) -> io::Result<()> {
        // SAFETY: The ioctl takes no argument.
        unsafe { sys::pcm_prepare(self.file.as_raw_fd()) }?;
        Ok(())
    }
}

impl PcmSink for Pcm {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut xfer = XferI {
            result: 0,
            buf: data.as_ptr() as *mut c_void,
            frames: (data.len() / self.frame_bytes) as c_ulong,
        };

        let mut underrun = false;
        loop {
            if !self.running {
                self.prepare()?;
            }

            // SAFETY: `xfer.buf` points to `xfer.frames` frames, kept alive by `data`.
            //         The kernel only reads from the buffer.
            match unsafe { sys::pcm_writei_frames(self.file.as_raw_fd(), &mut xfer) } {
                Ok(_) => {
                    self.running = true;
                    return Ok(());
                }
                Err(Errno::EPIPE) if !underrun => {
                    log::warn!("underrun, restarting the stream");
                    self.running = false;
                    underrun = true;
                }
                Err(e) => {
                    self.running = false;
                    return Err(e.into());
                }
            }
        }
    }
}

impl Drop for Pcm {
    fn drop(&mut self) {
        if self.running {
            // SAFETY: The ioctl takes no argument.
            let _ = unsafe { sys::pcm_drop(self.file.as_raw_fd()) };
        }
    }
}
