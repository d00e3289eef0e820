use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Instant;

use crate::fix::{FixSource, GeoFix};

/// Last position reported by the GPS
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixState {
    pub lt: f32,                   // latitude, degrees
    pub ln: f32,                   // longitude, degrees
    pub ga: f32,                   // GPS reported altitude, meters
    pub fixed_at: Option<Instant>, // when the last valid GGA arrived
}

/// Shared between the GPS sampler task, which writes, and the tracker cycle, which reads.
pub struct LastFix {
    state: Mutex<CriticalSectionRawMutex, FixState>,
}

pub static LAST_FIX: LastFix = LastFix::new();

impl LastFix {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(FixState {
                lt: 0.0,
                ln: 0.0,
                ga: 0.0,
                fixed_at: None,
            }),
        }
    }

    pub async fn record(&self, latitude: f32, longitude: f32, altitude: f32, at: Instant) {
        let mut state = self.state.lock().await;
        state.lt = latitude;
        state.ln = longitude;
        state.ga = altitude;
        state.fixed_at = Some(at);
    }

    pub async fn state(&self) -> FixState {
        *self.state.lock().await
    }

    /// Snapshot with the age measured against `now`; `-1` if there was never a fix.
    pub async fn snapshot(&self, now: Instant) -> GeoFix {
        let state = self.state().await;
        let age_ms = match state.fixed_at {
            Some(at) => now.saturating_duration_since(at).as_millis() as i64,
            None => -1,
        };
        GeoFix {
            latitude: state.lt,
            longitude: state.ln,
            altitude: state.ga,
            age_ms,
        }
    }
}

impl Default for LastFix {
    fn default() -> Self {
        Self::new()
    }
}

impl FixSource for &LastFix {
    async fn latest_fix(&mut self, now: Instant) -> GeoFix {
        self.snapshot(now).await
    }
}
