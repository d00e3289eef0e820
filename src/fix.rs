use embassy_time::Instant;

/// Read-only snapshot of the receiver's last known position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeoFix {
    /// Degrees, -90..=90
    pub latitude: f32,
    /// Degrees, -180..=180
    pub longitude: f32,
    /// Meters
    pub altitude: f32,
    /// Milliseconds since the last valid fix. Zero or negative means there is none.
    pub age_ms: i64,
}

/// Anything that can hand the tracker cycle the latest fix.
pub trait FixSource {
    async fn latest_fix(&mut self, now: Instant) -> GeoFix;
}

/// Decides whether a fix is worth sending this cycle.
pub struct FixGate;

impl FixGate {
    pub fn is_usable(age_ms: i64) -> bool {
        age_ms > 0
    }

    pub fn check(fix: &GeoFix) -> bool {
        Self::is_usable(fix.age_ms)
    }
}
