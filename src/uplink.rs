#[cfg(feature = "defmt")]
use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_time::Duration;
use heapless::Vec;
#[cfg(not(feature = "defmt"))]
use log::{debug, info};

use crate::{
    clock::Clock,
    config::{Credentials, TrackerConfig},
    encoder::EncodedPosition,
    signal::{CyclePhase, Indicator, PhaseSignal},
};

/// Largest downlink we keep.
pub const MAX_DOWNLINK: usize = 64;

pub type Downlink = Vec<u8, MAX_DOWNLINK>;

/// LoRaWAN MAC as seen by the tracker.
pub trait LoraWanRadio {
    /// Starts joining the network with `credentials`.
    async fn join(&mut self, credentials: &Credentials) -> crate::Result<()>;

    /// Polls the join. Radios that join synchronously may retry here.
    async fn has_joined(&mut self) -> crate::Result<bool>;

    /// Sends `payload` unconfirmed at `data_rate` without waiting for a reply.
    async fn send(&mut self, payload: &[u8], data_rate: u8) -> crate::Result<()>;

    /// Waits for a downlink, copying it into `buffer` and returning its length.
    ///
    /// Never resolving is fine, the caller bounds the wait.
    async fn receive(&mut self, buffer: &mut [u8]) -> crate::Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Disconnected,
    Joining,
    /// Terminal, there is no rejoin.
    Joined,
}

pub struct UplinkSession<R: LoraWanRadio> {
    radio: R,
    state: SessionState,
    data_rate: u8,
    recv_timeout: Duration,
}

impl<R: LoraWanRadio> UplinkSession<R> {
    pub fn new(radio: R, config: &TrackerConfig) -> Self {
        Self {
            radio,
            state: SessionState::Disconnected,
            data_rate: config.data_rate,
            recv_timeout: config.recv_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Joins the network, waiting for as long as it takes.
    ///
    /// Each poll flashes the join colour, then holds the joining colour for
    /// `poll_interval`.
    pub async fn join<C: Clock, I: Indicator>(
        &mut self,
        credentials: &Credentials,
        clock: &mut C,
        signal: &mut PhaseSignal<I>,
        config: &TrackerConfig,
    ) -> crate::Result<()> {
        if self.state == SessionState::Joined {
            return Ok(());
        }

        signal.set_phase(CyclePhase::Joining);
        self.radio.join(credentials).await?;
        self.state = SessionState::Joining;

        while !self.radio.has_joined().await? {
            info!("Not joined yet...");
            signal.set_phase(CyclePhase::JoinPoll);
            clock.sleep(config.join_flash).await;
            signal.set_phase(CyclePhase::Joining);
            clock.sleep(config.join_poll_interval).await;
        }

        info!("Joined");
        self.state = SessionState::Joined;
        Ok(())
    }

    /// Sends one uplink and listens for a downlink for the receive timeout.
    ///
    /// `Ok(None)` means nothing arrived in time, which is the usual case.
    pub async fn send_and_await_ack<C: Clock>(
        &mut self,
        payload: &EncodedPosition,
        clock: &mut C,
    ) -> crate::Result<Option<Downlink>> {
        self.radio.send(payload.as_bytes(), self.data_rate).await?;

        let mut buffer = [0u8; MAX_DOWNLINK];
        let outcome = select(
            self.radio.receive(&mut buffer),
            clock.sleep(self.recv_timeout),
        )
        .await;

        match outcome {
            Either::First(received) => {
                let len = received?.min(MAX_DOWNLINK);
                debug!("Downlink of {} bytes", len);
                // len is bounded by the buffer, so this always fits
                Ok(Vec::from_slice(&buffer[..len]).ok())
            }
            Either::Second(()) => {
                info!("No packet received");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{
        signal::Color,
        testing::{otaa, FakeClock, FakeIndicator, FakeRadio},
    };
    use embassy_futures::block_on;

    #[test]
    fn join_polls_until_accepted() {
        let config = TrackerConfig::default();
        let mut session = UplinkSession::new(FakeRadio::joining_after(2), &config);
        let mut clock = FakeClock::new();
        let mut signal = PhaseSignal::new(FakeIndicator::default());

        assert_eq!(session.state(), SessionState::Disconnected);
        block_on(session.join(&otaa(), &mut clock, &mut signal, &config)).unwrap();

        assert_eq!(session.state(), SessionState::Joined);
        assert_eq!(session.radio().join_calls, 1);
        assert_eq!(session.radio().polls, 3);
        assert_eq!(
            signal.indicator().colors,
            [
                Color::Red,
                Color::Yellow,
                Color::Red,
                Color::Yellow,
                Color::Red
            ]
        );
        let ms: std::vec::Vec<u64> = clock.sleeps.iter().map(|d| d.as_millis()).collect();
        assert_eq!(ms, [100, 2_000, 100, 2_000]);
    }

    #[test]
    fn join_is_skipped_once_joined() {
        let config = TrackerConfig::default();
        let mut session = UplinkSession::new(FakeRadio::joining_after(0), &config);
        let mut clock = FakeClock::new();
        let mut signal = PhaseSignal::new(FakeIndicator::default());

        block_on(session.join(&otaa(), &mut clock, &mut signal, &config)).unwrap();
        block_on(session.join(&otaa(), &mut clock, &mut signal, &config)).unwrap();

        assert_eq!(session.radio().join_calls, 1);
        assert!(clock.sleeps.is_empty());
    }

    #[test]
    fn timeout_is_not_an_error() {
        let config = TrackerConfig::default();
        let mut session = UplinkSession::new(FakeRadio::joining_after(0), &config);
        let mut clock = FakeClock::new();
        let payload = EncodedPosition::encode(45.1234, 7.5678, 250.0);

        let downlink = block_on(session.send_and_await_ack(&payload, &mut clock)).unwrap();

        assert_eq!(downlink, None);
        assert_eq!(session.radio().sent.len(), 1);
        assert_eq!(&session.radio().sent[0].0, payload.as_bytes());
        assert_eq!(session.radio().sent[0].1, 5);
        assert_eq!(clock.sleeps, [Duration::from_secs(3)]);
    }

    #[test]
    fn returns_downlink_bytes() {
        let config = TrackerConfig::default();
        let mut radio = FakeRadio::joining_after(0);
        radio.downlinks.push_back(std::vec![0xAB, 0xCD]);
        let mut session = UplinkSession::new(radio, &config);
        let mut clock = FakeClock::new();
        let payload = EncodedPosition::encode(1.0, 2.0, 3.0);

        let downlink = block_on(session.send_and_await_ack(&payload, &mut clock)).unwrap();

        assert_eq!(downlink.as_deref(), Some(&[0xAB, 0xCD][..]));
    }

    #[test]
    fn send_failure_propagates() {
        let config = TrackerConfig::default();
        let mut radio = FakeRadio::joining_after(0);
        radio.fail_send = true;
        let mut session = UplinkSession::new(radio, &config);
        let mut clock = FakeClock::new();
        let payload = EncodedPosition::encode(1.0, 2.0, 3.0);

        let result = block_on(session.send_and_await_ack(&payload, &mut clock));
        assert_eq!(result, Err(crate::error::Error::Radio));
    }
}
