//! Fakes for driving the tracker on the host.

extern crate std;

use core::future::pending;
use std::{collections::VecDeque, vec::Vec};

use embassy_time::{Duration, Instant};

use crate::{
    clock::Clock,
    config::{Credentials, DEFAULT_APP_EUI, DEFAULT_APP_KEY, DEFAULT_DEV_EUI},
    error::Error,
    fix::{FixSource, GeoFix},
    signal::{Color, Indicator},
    uplink::LoraWanRadio,
};

pub fn otaa() -> Credentials {
    Credentials::otaa_from_hex(DEFAULT_DEV_EUI, DEFAULT_APP_EUI, DEFAULT_APP_KEY).unwrap()
}

/// Virtual time. Sleeping returns at once and moves the clock forward.
pub struct FakeClock {
    origin: Instant,
    now: Instant,
    pub sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        let origin = Instant::from_secs(1_000);
        Self {
            origin,
            now: origin,
            sleeps: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.now - self.origin
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.now
    }

    async fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        self.now += duration;
    }
}

#[derive(Default)]
pub struct FakeIndicator {
    pub colors: Vec<Color>,
    fail: bool,
}

impl FakeIndicator {
    pub fn failing() -> Self {
        Self {
            colors: Vec::new(),
            fail: true,
        }
    }
}

impl Indicator for FakeIndicator {
    fn set_color(&mut self, color: Color) -> crate::Result<()> {
        self.colors.push(color);
        if self.fail {
            Err(Error::Indicator)
        } else {
            Ok(())
        }
    }
}

/// Scripted LoRaWAN MAC that records what it is asked to send.
pub struct FakeRadio {
    polls_before_join: usize,
    pub join_calls: usize,
    pub polls: usize,
    pub sent: Vec<(Vec<u8>, u8)>,
    /// Returned in order, one per receive. Empty means the receive never completes.
    pub downlinks: VecDeque<Vec<u8>>,
    pub fail_send: bool,
}

impl FakeRadio {
    pub fn joining_after(polls_before_join: usize) -> Self {
        Self {
            polls_before_join,
            join_calls: 0,
            polls: 0,
            sent: Vec::new(),
            downlinks: VecDeque::new(),
            fail_send: false,
        }
    }
}

impl LoraWanRadio for FakeRadio {
    async fn join(&mut self, _credentials: &Credentials) -> crate::Result<()> {
        self.join_calls += 1;
        Ok(())
    }

    async fn has_joined(&mut self) -> crate::Result<bool> {
        self.polls += 1;
        Ok(self.polls > self.polls_before_join)
    }

    async fn send(&mut self, payload: &[u8], data_rate: u8) -> crate::Result<()> {
        if self.fail_send {
            return Err(Error::Radio);
        }
        self.sent.push((payload.to_vec(), data_rate));
        Ok(())
    }

    async fn receive(&mut self, buffer: &mut [u8]) -> crate::Result<usize> {
        match self.downlinks.pop_front() {
            Some(bytes) => {
                buffer[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            None => pending().await,
        }
    }
}

pub struct FakeFixes {
    fixes: VecDeque<GeoFix>,
}

impl FakeFixes {
    pub fn new(fixes: Vec<GeoFix>) -> Self {
        Self {
            fixes: fixes.into(),
        }
    }
}

impl FixSource for FakeFixes {
    async fn latest_fix(&mut self, _now: Instant) -> GeoFix {
        self.fixes.pop_front().expect("ran out of scripted fixes")
    }
}
