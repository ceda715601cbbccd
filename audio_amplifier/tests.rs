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

use crate::config::{Config, VendorStatusPolicy};
use crate::error::{Error, Result};
use crate::hardware::{Hardware, Interrupt, Mixer};
use crate::mixer::{ControlInfo, ElemType};
use crate::pcm::{PcmConfig, PcmSink};
use crate::state::{AudioMode, Preset, Shared};
use crate::vendor::{Library, Vendor, VendorLibrary, VendorSymbols};
use crate::{Amplifier, AMPLIFIER_HARDWARE_INTERFACE};
use core::ffi::{c_int, c_void};
use std::collections::HashMap;
use std::ffi::CStr;
use std::io::{self, Write};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);

const CLOCK_NUMID: u32 = 5;
const INTERFACE_NUMID: u32 = 7;
const OTHER_NUMID: u32 = 9;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Calibrate,
    SpeakerOn,
    SpeakerOff,
    Switch(Preset),
    MixerOpen,
    Interface(bool),
    PcmOpen,
    PcmWrite,
    PcmClose,
}

impl Call {
    fn is_vendor(&self) -> bool {
        matches!(self, Call::Calibrate | Call::SpeakerOn | Call::SpeakerOff | Call::Switch(_))
    }
}

enum MixerEvent {
    /// Element `numid` changed, its value becomes unreadable with `None`
    Change(u32, Option<u32>),
    Interrupt,
}

struct Inner {
    log: Mutex<Vec<Call>>,
    calibrate_status: i32,
    /// Symbols exported by the vendor library, all of them when `None`
    exported: Option<Vec<&'static str>>,
    pcm_fails: bool,
    write_gate: Mutex<Option<mpsc::Receiver<()>>>,
    values: Mutex<HashMap<u32, u32>>,
    events_tx: Mutex<mpsc::Sender<MixerEvent>>,
    events_rx: Mutex<Option<mpsc::Receiver<MixerEvent>>>,
    idle_tx: Mutex<mpsc::Sender<()>>,
}

impl Inner {
    fn push(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

struct FakeHardware(Arc<Inner>);

struct FakeVendor(Arc<Inner>);

struct FakeMixer {
    inner: Arc<Inner>,
    events: Option<mpsc::Receiver<MixerEvent>>,
}

struct FakeInterrupt(Mutex<mpsc::Sender<MixerEvent>>);

struct FakePcm(Arc<Inner>);

struct FakeLibrary(Vec<&'static str>);

impl Hardware for FakeHardware {
    fn load_vendor(&self, _path: &str, symbols: &VendorSymbols) -> Result<Arc<dyn Vendor>> {
        match &self.0.exported {
            Some(exported) => {
                let library = FakeLibrary(exported.clone());
                let library = VendorLibrary::resolve(Box::new(library), symbols)?;
                Ok(Arc::new(library))
            }
            None => Ok(Arc::new(FakeVendor(self.0.clone()))),
        }
    }

    fn open_mixer(&self, _card: u32) -> io::Result<Box<dyn Mixer>> {
        self.0.push(Call::MixerOpen);
        Ok(Box::new(FakeMixer { inner: self.0.clone(), events: None }))
    }

    fn open_pcm(
        &self,
        _card: u32,
        _device: u32,
        _config: &PcmConfig,
    ) -> io::Result<Box<dyn PcmSink>> {
        if self.0.pcm_fails {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        self.0.push(Call::PcmOpen);
        Ok(Box::new(FakePcm(self.0.clone())))
    }
}

impl Vendor for FakeVendor {
    fn calibrate(&self) -> i32 {
        self.0.push(Call::Calibrate);
        self.0.calibrate_status
    }
    fn speaker_on(&self) -> i32 {
        self.0.push(Call::SpeakerOn);
        0
    }
    fn speaker_off(&self) -> i32 {
        self.0.push(Call::SpeakerOff);
        0
    }
    fn switch_parameter(&self, preset: Preset) -> i32 {
        self.0.push(Call::Switch(preset));
        0
    }
}

impl Mixer for FakeMixer {
    fn find_control(&mut self, name: &str) -> io::Result<Option<ControlInfo>> {
        let (numid, kind) = match name {
            "PRI_MI2S Clock" => (CLOCK_NUMID, ElemType::Enumerated),
            "PRI_MI2S_RX Audio Mixer MultiMedia2" => (INTERFACE_NUMID, ElemType::Boolean),
            "Other" => (OTHER_NUMID, ElemType::Integer),
            _ => return Ok(None),
        };
        Ok(Some(ControlInfo { numid, name: name.to_string(), kind, count: 1 }))
    }

    fn read_value(&mut self, numid: u32) -> io::Result<u32> {
        self.inner
            .values
            .lock()
            .unwrap()
            .get(&numid)
            .copied()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EIO))
    }

    fn write_bool(&mut self, numid: u32, value: bool) -> io::Result<()> {
        assert_eq!(numid, INTERFACE_NUMID);
        self.inner.push(Call::Interface(value));
        Ok(())
    }

    fn subscribe_events(&mut self) -> io::Result<()> {
        self.events = self.inner.events_rx.lock().unwrap().take();
        assert!(self.events.is_some());
        Ok(())
    }

    fn next_change(&mut self) -> io::Result<Option<u32>> {
        let events = self.events.as_ref().expect("Subscribed to events");
        let _ = self.inner.idle_tx.lock().unwrap().send(());
        match events.recv() {
            Ok(MixerEvent::Change(numid, value)) => {
                let mut values = self.inner.values.lock().unwrap();
                match value {
                    Some(value) => values.insert(numid, value),
                    None => values.remove(&numid),
                };
                Ok(Some(numid))
            }
            Ok(MixerEvent::Interrupt) | Err(_) => Ok(None),
        }
    }

    fn interrupter(&self) -> Arc<dyn Interrupt> {
        Arc::new(FakeInterrupt(Mutex::new(self.inner.events_tx.lock().unwrap().clone())))
    }
}

impl Interrupt for FakeInterrupt {
    fn interrupt(&self) {
        let _ = self.0.lock().unwrap().send(MixerEvent::Interrupt);
    }
}

impl PcmSink for FakePcm {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        assert!(data.iter().all(|&b| b == 0));
        if let Some(gate) = &*self.0.write_gate.lock().unwrap() {
            let _ = gate.recv();
        }
        self.0.push(Call::PcmWrite);
        thread::sleep(Duration::from_millis(1));
        Ok(())
    }
}

impl Drop for FakePcm {
    fn drop(&mut self) {
        self.0.push(Call::PcmClose);
    }
}

extern "C" fn fake_status() -> c_int {
    7
}

extern "C" fn fake_switch(preset: c_int) -> c_int {
    preset * 10
}

impl Library for FakeLibrary {
    fn symbol(&self, name: &CStr) -> *mut c_void {
        let name = name.to_str().unwrap();
        if !self.0.contains(&name) {
            std::ptr::null_mut()
        } else if name.ends_with("switch_para") {
            fake_switch as *const () as *mut c_void
        } else {
            fake_status as *const () as *mut c_void
        }
    }
}

struct Fixture {
    inner: Arc<Inner>,
    events: mpsc::Sender<MixerEvent>,
    idle: mpsc::Receiver<()>,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        Self::with(|_| {})
    }

    fn with(setup: impl FnOnce(&mut Inner)) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let (idle_tx, idle_rx) = mpsc::channel();
        let mut inner = Inner {
            log: Default::default(),
            calibrate_status: 0,
            exported: None,
            pcm_fails: false,
            write_gate: Mutex::new(None),
            values: Default::default(),
            events_tx: Mutex::new(events_tx.clone()),
            events_rx: Mutex::new(Some(events_rx)),
            idle_tx: Mutex::new(idle_tx),
        };
        setup(&mut inner);

        Self {
            inner: Arc::new(inner),
            events: events_tx,
            idle: idle_rx,
            config: Default::default(),
        }
    }

    fn open(&self) -> Result<Amplifier> {
        Amplifier::open(
            AMPLIFIER_HARDWARE_INTERFACE,
            &self.config,
            Arc::new(FakeHardware(self.inner.clone())),
        )
    }

    /// Open the device, and wait for the watcher to be ready for events.
    fn open_ready(&self) -> Amplifier {
        let amplifier = self.open().expect("Opening amplifier");
        self.wait_idle();
        amplifier
    }

    fn wait_idle(&self) {
        self.idle.recv_timeout(TIMEOUT).expect("Watcher waiting for events");
    }

    /// Send a control change, and wait for the watcher to process it.
    fn change(&self, numid: u32, value: Option<u32>) {
        self.events.send(MixerEvent::Change(numid, value)).expect("Sending event");
        self.wait_idle();
    }

    fn calls(&self) -> Vec<Call> {
        self.inner.log.lock().unwrap().clone()
    }

    /// Vendor calls made by the watcher
    fn speaker_calls(&self) -> Vec<Call> {
        let calls = self.calls();
        let calibrated = calls.iter().position(|c| *c == Call::Calibrate).expect("Calibrated");
        calls[calibrated + 1..].iter().filter(|c| c.is_vendor()).cloned().collect()
    }

    fn wait_for(&self, call: Call) {
        let deadline = Instant::now() + TIMEOUT;
        while !self.calls().contains(&call) {
            assert!(Instant::now() < deadline, "Waiting for {:?}", call);
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn shared(fixture: &Fixture) -> Shared {
    Shared::new(Arc::new(FakeVendor(fixture.inner.clone())), VendorStatusPolicy::Ignore)
}

#[test]
fn set_mode_presets() {
    let fixture = Fixture::new();
    let shared = shared(&fixture);

    let state = shared.snapshot();
    assert_eq!(state.preset, None);
    assert!(!state.preset_changed);
    assert!(!state.power_on);

    shared.set_mode(AudioMode::Normal);
    let state = shared.snapshot();
    assert_eq!(state.preset, Some(Preset::Playback));
    assert!(state.preset_changed);

    shared.clock_changed(true);
    assert!(!shared.snapshot().preset_changed);

    shared.set_mode(AudioMode::Normal);
    assert!(!shared.snapshot().preset_changed);

    shared.set_mode(AudioMode::InCall);
    let state = shared.snapshot();
    assert_eq!(state.preset, Some(Preset::Bypass));
    assert!(state.preset_changed);

    shared.clock_changed(true);
    shared.set_mode(AudioMode::InCommunication);
    assert!(!shared.snapshot().preset_changed);

    shared.set_mode(AudioMode::Ringtone);
    assert_eq!(shared.snapshot().preset, Some(Preset::Ringtone));

    shared.set_mode(AudioMode::Invalid);
    assert_eq!(shared.snapshot().preset, Some(Preset::Bypass));
}

#[test]
fn preset_switched_after_power_on() {
    let fixture = Fixture::new();
    let shared = shared(&fixture);

    shared.set_mode(AudioMode::Ringtone);
    assert!(fixture.calls().is_empty());

    shared.clock_changed(true);
    assert_eq!(fixture.calls(), vec![Call::SpeakerOn, Call::Switch(Preset::Ringtone)]);
    let state = shared.snapshot();
    assert!(state.power_on);
    assert!(!state.preset_changed);

    shared.clock_changed(false);
    shared.clock_changed(false);
    assert_eq!(
        fixture.calls(),
        vec![Call::SpeakerOn, Call::Switch(Preset::Ringtone), Call::SpeakerOff]
    );
    assert!(!shared.snapshot().power_on);
}

#[test]
fn power_on_without_preset() {
    let fixture = Fixture::new();
    let shared = shared(&fixture);

    shared.clock_changed(true);
    assert_eq!(fixture.calls(), vec![Call::SpeakerOn]);
}

#[test]
fn output_devices_recorded() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();
    assert_eq!(amplifier.shared().snapshot().output_devices, u32::MAX);

    amplifier.enable_output_devices(0x2, true);
    assert_eq!(amplifier.shared().snapshot().output_devices, 0x2);

    amplifier.enable_output_devices(0x6, false);
    assert_eq!(amplifier.shared().snapshot().output_devices, 0x6);
}

#[test]
fn open_selects_playback() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();

    let state = amplifier.shared().snapshot();
    assert_eq!(state.preset, Some(Preset::Playback));
    assert!(state.preset_changed);
    assert!(!state.calibrating);
    assert!(state.writing);
    assert!(!state.power_on);
}

#[test]
fn calibrate_after_first_write() {
    let fixture = Fixture::new();
    let _amplifier = fixture.open_ready();

    let calls = fixture.calls();
    let position = |call: Call| calls.iter().position(|c| *c == call).unwrap();
    assert_eq!(calls.iter().filter(|c| **c == Call::Calibrate).count(), 1);
    assert!(position(Call::Interface(true)) < position(Call::PcmOpen));
    assert!(position(Call::PcmOpen) < position(Call::PcmWrite));
    assert!(position(Call::PcmWrite) < position(Call::Calibrate));
}

#[test]
fn dummy_stream_teardown_order() {
    let fixture = Fixture::new();
    let _amplifier = fixture.open_ready();

    let calls: Vec<Call> = fixture
        .calls()
        .into_iter()
        .filter(|c| *c != Call::PcmWrite && *c != Call::MixerOpen)
        .collect();
    assert_eq!(
        calls,
        vec![
            Call::Interface(true),
            Call::PcmOpen,
            Call::Calibrate,
            Call::PcmClose,
            Call::Interface(false),
        ]
    );
}

#[test]
fn speaker_follows_clock() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();

    fixture.change(CLOCK_NUMID, Some(1));
    assert!(amplifier.shared().snapshot().power_on);
    fixture.change(CLOCK_NUMID, Some(0));
    assert!(!amplifier.shared().snapshot().power_on);

    amplifier.set_mode(AudioMode::Ringtone);
    fixture.change(CLOCK_NUMID, Some(1));

    assert_eq!(
        fixture.speaker_calls(),
        vec![
            Call::SpeakerOn,
            Call::Switch(Preset::Playback),
            Call::SpeakerOff,
            Call::SpeakerOn,
            Call::Switch(Preset::Ringtone),
        ]
    );
}

#[test]
fn clock_off_while_off() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();

    fixture.change(CLOCK_NUMID, Some(0));
    assert!(fixture.speaker_calls().is_empty());
    assert!(amplifier.shared().snapshot().preset_changed);
}

#[test]
fn clock_on_while_on() {
    let fixture = Fixture::new();
    let _amplifier = fixture.open_ready();

    fixture.change(CLOCK_NUMID, Some(1));
    fixture.change(CLOCK_NUMID, Some(1));
    assert_eq!(
        fixture.speaker_calls(),
        vec![Call::SpeakerOn, Call::Switch(Preset::Playback), Call::SpeakerOn]
    );
}

#[test]
fn other_controls_ignored() {
    let fixture = Fixture::new();
    let _amplifier = fixture.open_ready();

    fixture.change(OTHER_NUMID, Some(1));
    fixture.change(INTERFACE_NUMID, Some(1));
    assert!(fixture.speaker_calls().is_empty());
}

#[test]
fn unreadable_clock_skipped() {
    let fixture = Fixture::new();
    let _amplifier = fixture.open_ready();

    fixture.change(CLOCK_NUMID, None);
    assert!(fixture.speaker_calls().is_empty());

    fixture.change(CLOCK_NUMID, Some(2));
    assert_eq!(fixture.speaker_calls(), vec![Call::SpeakerOn, Call::Switch(Preset::Playback)]);
}

#[test]
fn close_without_events() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        amplifier.close();
        done_tx.send(()).unwrap();
    });
    done_rx.recv_timeout(TIMEOUT).expect("Close returning");
    assert!(fixture.speaker_calls().is_empty());
}

#[test]
fn close_releases_vendor() {
    let fixture = Fixture::new();
    let amplifier = fixture.open_ready();
    assert!(Arc::strong_count(&fixture.inner) > 1);

    drop(amplifier);
    assert_eq!(Arc::strong_count(&fixture.inner), 1);
}

#[test]
fn open_other_interface() {
    let fixture = Fixture::new();
    let hardware = Arc::new(FakeHardware(fixture.inner.clone()));

    let err = Amplifier::open("audio_hw", &fixture.config, hardware).err().unwrap();
    assert!(matches!(err, Error::InterfaceMismatch(_)));
    assert_eq!(err.status(), -libc::ENODEV);
    assert!(fixture.calls().is_empty());
}

#[test]
fn open_missing_symbol() {
    let fixture = Fixture::with(|inner| {
        inner.exported =
            Some(vec!["FIH_Tfa9887_init", "FIH_Tfa9887_power_on", "FIH_Tfa9887_power_off"]);
    });

    let err = fixture.open().err().unwrap();
    assert!(matches!(&err, Error::MissingSymbol(name) if name == "FIH_Tfa9887_switch_para"));
    assert_eq!(err.status(), -libc::ENODEV);
    assert!(fixture.calls().is_empty());
}

#[test]
fn open_missing_clock_control() {
    let mut fixture = Fixture::new();
    fixture.config.clock_control = "Unknown Clock".to_string();

    let err = fixture.open().err().unwrap();
    assert!(matches!(err, Error::ControlNotFound(_)));
    assert_eq!(err.status(), -libc::ENODEV);
    assert_eq!(Arc::strong_count(&fixture.inner), 1);
}

#[test]
fn calibration_timeout() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let mut fixture = Fixture::with(|inner| inner.write_gate = Mutex::new(Some(gate_rx)));
    fixture.config.calibration_timeout = Duration::from_millis(50);

    let err = fixture.open().err().unwrap();
    assert!(matches!(err, Error::CalibrationTimeout(_)));
    assert_eq!(err.status(), -libc::ETIMEDOUT);
    assert!(!fixture.calls().contains(&Call::Calibrate));

    drop(gate_tx);
    fixture.wait_for(Call::Interface(false));
    assert!(!fixture.calls().contains(&Call::Calibrate));
    assert!(!fixture.calls().contains(&Call::SpeakerOn));
}

#[test]
fn calibration_aborted() {
    let fixture = Fixture::with(|inner| inner.pcm_fails = true);

    let started = Instant::now();
    let err = fixture.open().err().unwrap();
    assert!(matches!(err, Error::CalibrationAborted));
    assert_eq!(err.status(), -libc::EIO);
    assert!(started.elapsed() < fixture.config.calibration_timeout);
    assert_eq!(
        fixture.calls(),
        vec![Call::MixerOpen, Call::Interface(true), Call::Interface(false)]
    );
}

#[test]
fn calibrate_status_policy() {
    let fixture = |policy| {
        let mut fixture = Fixture::with(|inner| inner.calibrate_status = -5);
        fixture.config.status_policy = policy;
        fixture
    };

    assert!(fixture(VendorStatusPolicy::Ignore).open().is_ok());
    assert!(fixture(VendorStatusPolicy::Log).open().is_ok());

    let err = fixture(VendorStatusPolicy::Strict).open().err().unwrap();
    assert!(matches!(err, Error::VendorStatus { op: "calibrate", status: -5 }));
    assert_eq!(err.status(), -libc::EIO);
}

#[test]
fn vendor_library_entry_points() {
    let library = FakeLibrary(vec![
        "FIH_Tfa9887_init",
        "FIH_Tfa9887_power_on",
        "FIH_Tfa9887_power_off",
        "FIH_Tfa9887_switch_para",
    ]);
    let vendor = VendorLibrary::resolve(Box::new(library), &Default::default()).unwrap();

    assert_eq!(vendor.calibrate(), 7);
    assert_eq!(vendor.speaker_on(), 7);
    assert_eq!(vendor.speaker_off(), 7);
    assert_eq!(vendor.switch_parameter(Preset::Playback), 30);
    assert_eq!(vendor.switch_parameter(Preset::Alarm), 40);
}

#[test]
fn vendor_library_renamed_symbols() {
    let library = FakeLibrary(vec!["init", "on", "off", "tfa_switch_para"]);
    let symbols = VendorSymbols {
        calibrate: "init".to_string(),
        speaker_on: "on".to_string(),
        speaker_off: "off".to_string(),
        switch_parameter: "tfa_switch_para".to_string(),
    };
    let vendor = VendorLibrary::resolve(Box::new(library), &symbols).unwrap();
    assert_eq!(vendor.switch_parameter(Preset::Bypass), 20);

    let library = FakeLibrary(vec!["init", "on", "off", "tfa_switch_para"]);
    let err = VendorLibrary::resolve(Box::new(library), &Default::default()).err().unwrap();
    assert!(matches!(&err, Error::MissingSymbol(name) if name == "FIH_Tfa9887_init"));
}

#[test]
fn vendor_library_not_found() {
    let err = VendorLibrary::open("libdoes_not_exist_amplifier.so", &Default::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::VendorLibrary { .. }));
    assert_eq!(err.status(), -libc::ENODEV);
}

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.vendor_library, "libFIHNxp.so");
    assert_eq!(config.symbols.calibrate, "FIH_Tfa9887_init");
    assert_eq!(config.symbols.switch_parameter, "FIH_Tfa9887_switch_para");
    assert_eq!(config.status_policy, VendorStatusPolicy::Ignore);
    assert_eq!(config.card, 0);
    assert_eq!(config.pcm_device, 1);
    assert_eq!(config.clock_control, "PRI_MI2S Clock");
    assert_eq!(config.interface_control, "PRI_MI2S_RX Audio Mixer MultiMedia2");
    assert_eq!(config.calibration_timeout, Duration::from_secs(5));

    let pcm = &config.pcm;
    assert_eq!((pcm.channels, pcm.rate), (2, 48000));
    assert_eq!((pcm.period_size, pcm.period_count), (960, 8));
    assert_eq!(pcm.start_threshold, 2);
    assert_eq!(pcm.stop_threshold, i32::MAX as u32);
    assert_eq!(pcm.avail_min, 240);
    assert!(pcm.monotonic);
    assert_eq!(pcm.frame_bytes(), 4);
    assert_eq!(pcm.silence_bytes(), 7680);
}

#[test]
fn config_parse() {
    let config = Config::parse(
        "[vendor]\n\
         library = /vendor/lib/libtfa.so\n\
         switch_parameter = tfa_switch\n\
         status_policy = Strict\n\
         [mixer]\n\
         card = 1\n\
         clock_control = SEC_MI2S Clock\n\
         [calibration]\n\
         device = 3\n\
         period_size = 480\n\
         timeout_ms = 250\n",
    )
    .unwrap();

    assert_eq!(config.vendor_library, "/vendor/lib/libtfa.so");
    assert_eq!(config.symbols.switch_parameter, "tfa_switch");
    assert_eq!(config.symbols.speaker_on, "FIH_Tfa9887_power_on");
    assert_eq!(config.status_policy, VendorStatusPolicy::Strict);
    assert_eq!(config.card, 1);
    assert_eq!(config.clock_control, "SEC_MI2S Clock");
    assert_eq!(config.interface_control, "PRI_MI2S_RX Audio Mixer MultiMedia2");
    assert_eq!(config.pcm_device, 3);
    assert_eq!(config.pcm, PcmConfig::deep_buffer(2, 48000, 480, 8));
    assert_eq!(config.calibration_timeout, Duration::from_millis(250));
}

#[test]
fn config_invalid() {
    assert!(matches!(
        Config::parse("[vendor]\nstatus_policy = sometimes\n"),
        Err(Error::Config(_))
    ));
    assert!(matches!(Config::parse("[mixer]\ncard = zero\n"), Err(Error::Config(_))));
    assert!(matches!(Config::parse("[calibration]\nperiod_count = 0\n"), Err(Error::Config(_))));
    let err = Config::parse("[calibration]\nchannels = 0\n").err().unwrap();
    assert_eq!(err.status(), -libc::EINVAL);
}

#[test]
fn config_load() {
    let dir = tempfile::tempdir().unwrap();

    let missing = Config::load(dir.path().join("audio_amplifier.conf")).unwrap();
    assert_eq!(missing.vendor_library, "libFIHNxp.so");

    let path = dir.path().join("audio_amplifier.conf");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[vendor]\nstatus_policy = log\n[calibration]\nrate = 44100").unwrap();
    drop(file);

    let config = Config::load(&path).unwrap();
    assert_eq!(config.status_policy, VendorStatusPolicy::Log);
    assert_eq!(config.pcm.rate, 44100);
    assert_eq!(config.pcm.period_size, 960);
}

#[test]
fn status_policy() {
    assert!(VendorStatusPolicy::Ignore.check("calibrate", -1).is_ok());
    assert!(VendorStatusPolicy::Log.check("calibrate", -1).is_ok());
    assert!(VendorStatusPolicy::Strict.check("calibrate", 0).is_ok());
    assert!(VendorStatusPolicy::Strict.check("calibrate", 1).is_err());
}

#[test]
fn errno_mapping() {
    assert_eq!(Error::NoDevice(io::Error::from_raw_os_error(libc::ENOENT)).status(), -libc::ENODEV);
    assert_eq!(Error::InvalidControl("x".to_string()).status(), -libc::ENODEV);
    assert_eq!(Error::NoMemory("thread").status(), -libc::ENOMEM);
    assert_eq!(Error::CalibrationTimeout(Duration::from_secs(5)).status(), -libc::ETIMEDOUT);
    assert_eq!(Error::CalibrationAborted.status(), -libc::EIO);
    assert_eq!(Error::Io(io::Error::from_raw_os_error(libc::EPIPE)).status(), -libc::EIO);
    assert_eq!(Error::Config("x".to_string()).status(), -libc::EINVAL);
}

#[test]
fn hw_params_refinement() {
    use crate::sys::{self, HwParams};

    let mut params = HwParams::any();
    assert_eq!(params.get_int(sys::HW_PARAM_RATE), 0);

    params.set_int(sys::HW_PARAM_RATE, 48000);
    assert_eq!(params.get_int(sys::HW_PARAM_RATE), 48000);

    params.set_mask(sys::HW_PARAM_FORMAT, sys::PCM_FORMAT_S16_LE);
    assert_eq!(params.masks[sys::HW_PARAM_FORMAT].bits, [1 << 2, 0, 0, 0, 0, 0, 0, 0]);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn kernel_struct_sizes() {
    use crate::sys::*;
    use std::mem::size_of;

    assert_eq!(size_of::<ElemId>(), 64);
    assert_eq!(size_of::<ElemList>(), 80);
    assert_eq!(size_of::<ElemInfo>(), 272);
    assert_eq!(size_of::<ElemValue>(), 1224);
    assert_eq!(size_of::<Event>(), 72);
    assert_eq!(size_of::<HwParams>(), 608);
    assert_eq!(size_of::<SwParams>(), 136);
    assert_eq!(size_of::<XferI>(), 24);
}
