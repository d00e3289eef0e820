//! The tracker's main loop.
//!
//! One cycle: settle, read the fix, and if it is usable encode it, send it,
//! show success, then sleep whatever is left of the period. When the fix is
//! unusable the cycle ends right after the read and the next one starts at
//! once, skipping the post-send delay and the period sleep (fast skip).

use core::convert::Infallible;

#[cfg(feature = "defmt")]
use defmt::info;
use embassy_time::Duration;
#[cfg(not(feature = "defmt"))]
use log::info;

use crate::{
    clock::Clock,
    config::{Credentials, TrackerConfig},
    encoder::EncodedPosition,
    fix::{FixGate, FixSource, GeoFix},
    signal::{CyclePhase, Indicator, PhaseSignal},
    uplink::{Downlink, LoraWanRadio, UplinkSession},
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// No usable fix; the next cycle starts immediately.
    FastSkip { fix: GeoFix },
    Sent {
        payload: EncodedPosition,
        downlink: Option<Downlink>,
        sleep: Duration,
    },
}

/// Sleep that brings the cycle up to `period`, never shorter than `floor`.
pub fn sleep_budget(elapsed: Duration, period: Duration, floor: Duration) -> Duration {
    match period.checked_sub(elapsed) {
        Some(remaining) if remaining > Duration::from_ticks(0) => remaining,
        _ => floor,
    }
}

pub struct CycleScheduler<F, R, I, C>
where
    F: FixSource,
    R: LoraWanRadio,
    I: Indicator,
    C: Clock,
{
    fixes: F,
    session: UplinkSession<R>,
    signal: PhaseSignal<I>,
    clock: C,
    config: TrackerConfig,
}

impl<F, R, I, C> CycleScheduler<F, R, I, C>
where
    F: FixSource,
    R: LoraWanRadio,
    I: Indicator,
    C: Clock,
{
    pub fn new(fixes: F, radio: R, indicator: I, clock: C, config: TrackerConfig) -> Self {
        Self {
            fixes,
            session: UplinkSession::new(radio, &config),
            signal: PhaseSignal::new(indicator),
            clock,
            config,
        }
    }

    /// Joins the network, then runs cycles until something fails.
    pub async fn run(&mut self, credentials: &Credentials) -> crate::Result<Infallible> {
        self.join(credentials).await?;
        loop {
            self.run_cycle().await?;
        }
    }

    pub async fn join(&mut self, credentials: &Credentials) -> crate::Result<()> {
        self.session
            .join(credentials, &mut self.clock, &mut self.signal, &self.config)
            .await?;
        self.signal.set_phase(CyclePhase::Joined);
        self.clock.sleep(self.config.joined_hold).await;
        Ok(())
    }

    pub async fn run_cycle(&mut self) -> crate::Result<CycleOutcome> {
        let start = self.clock.now();
        self.signal.set_phase(CyclePhase::WaitingForFix);
        self.clock.sleep(self.config.settle_delay).await;

        let fix = self.fixes.latest_fix(self.clock.now()).await;
        info!(
            "Latitude = {}, Longitude = {}, Altitude = {}",
            fix.latitude, fix.longitude, fix.altitude
        );
        info!("time since last fix: {}", fix.age_ms);

        if !FixGate::check(&fix) {
            return Ok(CycleOutcome::FastSkip { fix });
        }

        self.signal.set_phase(CyclePhase::Sending);
        let payload = EncodedPosition::encode(fix.latitude, fix.longitude, fix.altitude);

        info!("Sending GPS position via LoRa");
        let downlink = self
            .session
            .send_and_await_ack(&payload, &mut self.clock)
            .await?;
        if let Some(bytes) = &downlink {
            info!("Downlink: {:?}", bytes.as_slice());
        }
        self.signal.set_phase(CyclePhase::Sent);

        self.clock.sleep(self.config.post_send_delay).await;
        self.signal.set_phase(CyclePhase::Idle);

        let elapsed = self.clock.now().saturating_duration_since(start);
        let sleep = sleep_budget(elapsed, self.config.period, self.config.min_sleep);
        info!("start sleep ...{}msec", sleep.as_millis());
        self.clock.sleep(sleep).await;

        Ok(CycleOutcome::Sent {
            payload,
            downlink,
            sleep,
        })
    }

    pub fn session(&self) -> &UplinkSession<R> {
        &self.session
    }

    pub fn signal(&self) -> &PhaseSignal<I> {
        &self.signal
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
