use embassy_time::Duration;

use crate::error::Error;

/// Placeholder OTAA identity, used when no keys are provided at build time.
pub const DEFAULT_DEV_EUI: &str = "70B3D5499A1C2E0F";
pub const DEFAULT_APP_EUI: &str = "70B3D57ED001825F";
pub const DEFAULT_APP_KEY: &str = "0F422B11DCFE3853380083B1F41D4895";

/// Timing and radio settings of the tracker cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerConfig {
    /// Target length of one full cycle.
    pub period: Duration,
    /// Wait at the start of every cycle so the GPS data settles.
    pub settle_delay: Duration,
    /// How long the success colour stays on after a send.
    pub post_send_delay: Duration,
    /// Sleep floor used when a cycle overruns `period`.
    pub min_sleep: Duration,
    pub join_poll_interval: Duration,
    pub join_flash: Duration,
    /// How long the joined colour is shown before the first cycle.
    pub joined_hold: Duration,
    /// LoRaWAN data rate index, DR0..DR5 in EU868.
    pub data_rate: u8,
    pub recv_timeout: Duration,
    pub fport: u8,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20_000),
            settle_delay: Duration::from_secs(5),
            post_send_delay: Duration::from_secs(1),
            min_sleep: Duration::from_millis(500),
            join_poll_interval: Duration::from_secs(2),
            join_flash: Duration::from_millis(100),
            joined_hold: Duration::from_secs(5),
            data_rate: 5,
            recv_timeout: Duration::from_secs(3),
            fport: 1,
        }
    }
}

/// Network identity of the device. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Credentials {
    /// Over-the-air activation.
    Otaa {
        dev_eui: [u8; 8],
        app_eui: [u8; 8],
        app_key: [u8; 16],
    },
    /// Activation by personalisation, session keys are provisioned up front.
    Abp {
        dev_addr: u32,
        nwk_skey: [u8; 16],
        app_skey: [u8; 16],
    },
}

impl Credentials {
    pub fn otaa_from_hex(dev_eui: &str, app_eui: &str, app_key: &str) -> crate::Result<Self> {
        Ok(Self::Otaa {
            dev_eui: parse_hex(dev_eui)?,
            app_eui: parse_hex(app_eui)?,
            app_key: parse_hex(app_key)?,
        })
    }

    pub fn abp_from_hex(dev_addr: &str, nwk_skey: &str, app_skey: &str) -> crate::Result<Self> {
        let dev_addr: [u8; 4] = parse_hex(dev_addr)?;
        Ok(Self::Abp {
            dev_addr: u32::from_be_bytes(dev_addr),
            nwk_skey: parse_hex(nwk_skey)?,
            app_skey: parse_hex(app_skey)?,
        })
    }
}

/// Decodes a big-endian hex string, as printed by network consoles, into `N` bytes.
pub fn parse_hex<const N: usize>(hex: &str) -> crate::Result<[u8; N]> {
    if hex.len() != 2 * N {
        return Err(Error::InvalidKeyLength);
    }
    let mut out = [0u8; N];
    for (byte, chunk) in out.iter_mut().zip(hex.as_bytes().chunks(2)) {
        // from_str_radix would accept a leading sign
        if !chunk.iter().all(u8::is_ascii_hexdigit) {
            return Err(Error::InvalidHex);
        }
        let digits = core::str::from_utf8(chunk).map_err(|_| Error::InvalidHex)?;
        *byte = u8::from_str_radix(digits, 16).map_err(|_| Error::InvalidHex)?;
    }
    Ok(out)
}
