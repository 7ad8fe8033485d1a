//! Device doubles.
//!
//! Each fake hands out a probe sharing its counters, so a test can keep
//! observing the device after moving it into a session.

use live_session::devices::{CaptureDevice, Player};
use live_session::errors::LiveError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared view of a [`FakeCaptureDevice`].
#[derive(Clone, Default)]
pub struct CaptureProbe {
    attached: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl CaptureProbe {
    pub fn attach_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct FakeCaptureDevice {
    probe: CaptureProbe,
    fail_attach: bool,
}

impl FakeCaptureDevice {
    pub fn new() -> (Self, CaptureProbe) {
        let probe = CaptureProbe::default();
        (
            Self {
                probe: probe.clone(),
                fail_attach: false,
            },
            probe,
        )
    }

    /// A device whose preview never comes up.
    pub fn failing() -> (Self, CaptureProbe) {
        let (mut device, probe) = Self::new();
        device.fail_attach = true;
        (device, probe)
    }
}

impl CaptureDevice for FakeCaptureDevice {
    fn attach_preview(&mut self) -> Result<(), LiveError> {
        if self.fail_attach {
            return Err(LiveError::Device("camera unavailable".to_string()));
        }
        self.probe.attached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared view of a [`FakePlayer`].
#[derive(Clone, Default)]
pub struct PlayerProbe {
    attached: Arc<Mutex<Vec<String>>>,
    resets: Arc<AtomicUsize>,
    fail_attach: Arc<AtomicBool>,
}

impl PlayerProbe {
    /// Manifest URLs the player was attached to, in order.
    pub fn attached_urls(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn attach_count(&self) -> usize {
        self.attached.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Make subsequent attach calls fail.
    pub fn fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }
}

pub struct FakePlayer {
    probe: PlayerProbe,
}

impl FakePlayer {
    pub fn new() -> (Self, PlayerProbe) {
        let probe = PlayerProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl Player for FakePlayer {
    fn attach(&mut self, manifest_url: &str) -> Result<(), LiveError> {
        if self.probe.fail_attach.load(Ordering::SeqCst) {
            return Err(LiveError::Device("playback not supported".to_string()));
        }
        self.probe
            .attached
            .lock()
            .unwrap()
            .push(manifest_url.to_string());
        Ok(())
    }

    fn reset(&mut self) {
        self.probe.resets.fetch_add(1, Ordering::SeqCst);
    }
}
