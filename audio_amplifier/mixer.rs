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

use crate::hardware::{Interrupt, Mixer};
use crate::sys::{self, ElemId, ElemInfo, ElemList, ElemValue, Event, Zeroable};
use core::ffi::{c_int, c_long};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::{mem, slice};

/// Value type of a control element
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ElemType {
    None = 0,
    Boolean = 1,
    Integer = 2,
    Enumerated = 3,
    Bytes = 4,
    Iec958 = 5,
    Integer64 = 6,
}

/// Description of a control element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    pub numid: u32,
    pub name: String,
    pub kind: ElemType,
    pub count: u32,
}

/// Control device of a sound card, `/dev/snd/controlC<card>`
pub(crate) struct ControlDevice {
    file: File,
    wake: UnixStream,
    waker: Arc<Waker>,
}

struct Waker(UnixStream);

impl Interrupt for Waker {
    fn interrupt(&self) {
        // The socket stays readable once written, a full buffer is as good.
        let _ = (&self.0).write(&[1]);
    }
}

impl ControlDevice {
    pub(crate) fn open(card: u32) -> io::Result<Self> {
        let path = format!("/dev/snd/controlC{}", card);
        let file = OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            log::error!("Error opening {}: {}", path, e);
            e
        })?;

        let (wake, notify) = UnixStream::pair()?;
        notify.set_nonblocking(true)?;

        Ok(Self { file, wake, waker: Arc::new(Waker(notify)) })
    }

    fn list(&self) -> io::Result<Vec<ElemId>> {
        let fd = self.file.as_raw_fd();

        let mut list = ElemList::zeroed();
        // SAFETY: `list` is a valid `snd_ctl_elem_list`, with no buffer given.
        unsafe { sys::ctl_elem_list(fd, &mut list) }?;

        let mut ids = vec![ElemId::zeroed(); list.count as usize];
        list.space = list.count;
        list.pids = ids.as_mut_ptr();
        // SAFETY: `pids` points to `space` elements, alive during the call.
        unsafe { sys::ctl_elem_list(fd, &mut list) }?;

        ids.truncate(list.used as usize);
        Ok(ids)
    }

    fn info(&self, numid: u32) -> io::Result<ElemInfo> {
        let mut info = ElemInfo::zeroed();
        info.id.numid = numid;
        // SAFETY: `info` is a valid `snd_ctl_elem_info`.
        unsafe { sys::ctl_elem_info(self.file.as_raw_fd(), &mut info) }?;
        Ok(info)
    }

    fn read_elem(&self, numid: u32) -> io::Result<ElemValue> {
        let mut value = ElemValue::zeroed();
        value.id.numid = numid;
        // SAFETY: `value` is a valid `snd_ctl_elem_value`.
        unsafe { sys::ctl_elem_read(self.file.as_raw_fd(), &mut value) }?;
        Ok(value)
    }

    fn read_event(&self) -> io::Result<Option<Event>> {
        let mut event = Event::zeroed();
        // SAFETY: `Event` is a plain kernel structure, any byte content is valid.
        let buf = unsafe {
            slice::from_raw_parts_mut(&mut event as *mut Event as *mut u8, mem::size_of::<Event>())
        };
        match (&self.file).read(buf)? {
            0 => Ok(None),
            n if n < buf.len() => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short event")),
            _ => Ok(Some(event)),
        }
    }
}

impl Mixer for ControlDevice {
    fn find_control(&mut self, name: &str) -> io::Result<Option<ControlInfo>> {
        for id in self.list()? {
            let info = self.info(id.numid).map_err(|e| {
                log::error!("failed to get alsa control {} info", id.numid);
                e
            })?;

            if sys::c_name(&info.id.name) == name.as_bytes() {
                return Ok(Some(ControlInfo {
                    numid: info.id.numid,
                    name: name.to_string(),
                    kind: ElemType::from_i32(info.kind).unwrap_or(ElemType::None),
                    count: info.count,
                }));
            }
        }
        Ok(None)
    }

    fn read_value(&mut self, numid: u32) -> io::Result<u32> {
        let value = self.read_elem(numid)?;
        // SAFETY: Every member of the value union is a plain integer array.
        Ok(unsafe { value.value.enumerated[0] })
    }

    fn write_bool(&mut self, numid: u32, on: bool) -> io::Result<()> {
        let mut value = self.read_elem(numid)?;

        // SAFETY: Every member of the value union is a plain integer array.
        let mut integer = unsafe { value.value.integer };
        integer[0] = on as c_long;
        value.value.integer = integer;

        // SAFETY: `value` is a valid `snd_ctl_elem_value`.
        unsafe { sys::ctl_elem_write(self.file.as_raw_fd(), &mut value) }?;
        Ok(())
    }

    fn subscribe_events(&mut self) -> io::Result<()> {
        let mut subscribe: c_int = 1;
        // SAFETY: The ioctl argument is an `int`.
        unsafe { sys::ctl_subscribe_events(self.file.as_raw_fd(), &mut subscribe) }?;
        Ok(())
    }

    fn next_change(&mut self) -> io::Result<Option<u32>> {
        loop {
            let mut fds = [
                libc::pollfd { fd: self.file.as_raw_fd(), events: libc::POLLIN, revents: 0 },
                libc::pollfd { fd: self.wake.as_raw_fd(), events: libc::POLLIN, revents: 0 },
            ];

            // SAFETY: `fds` is an array of valid `pollfd`, of the given length.
            let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if ret < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if fds[1].revents != 0 {
                return Ok(None);
            }
            if fds[0].revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                return Ok(None);
            }
            if fds[0].revents & libc::POLLIN == 0 {
                continue;
            }

            let Some(event) = self.read_event()? else {
                return Ok(None);
            };
            if event.kind != sys::CTL_EVENT_ELEM {
                continue;
            }

            // SAFETY: `elem` is the member used by `CTL_EVENT_ELEM` events.
            let elem = unsafe { event.data.elem };
            if elem.mask == sys::CTL_EVENT_MASK_REMOVE {
                continue;
            }
            return Ok(Some(elem.id.numid));
        }
    }

    fn interrupter(&self) -> Arc<dyn Interrupt> {
        self.waker.clone()
    }
}
