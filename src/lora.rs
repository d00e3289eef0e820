use defmt::{info, warn, Debug2Format};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;
use esp_hal::{
    gpio::{Input, Output},
    rng::Rng,
    spi::master::SpiDmaBus,
    Async,
};
use lora_phy::{
    iv::GenericSx127xInterfaceVariant,
    lorawan_radio::LorawanRadio,
    sx127x::{self, Sx1276, Sx127x},
    LoRa,
};
use lorawan_device::{
    async_device::{
        region::{self, DR},
        Device, EmbassyTimer, JoinMode, JoinResponse, SendResponse,
    },
    default_crypto::DefaultFactory as Crypto,
    AppEui, AppKey, AppSKey, DevAddr, DevEui, NewSKey,
};

use crate::{config::Credentials, error::Error, uplink::LoraWanRadio};

const LORAWAN_REGION: region::Region = region::Region::EU868;
const MAX_TX_POWER: u8 = 14;

type LoraSpi = SpiDevice<'static, NoopRawMutex, SpiDmaBus<'static, Async>, Output<'static>>;
type LoraIv = GenericSx127xInterfaceVariant<Output<'static>, Input<'static>>;
type Radio = LorawanRadio<Sx127x<LoraSpi, LoraIv, Sx1276>, Delay, MAX_TX_POWER>;
type Mac = Device<Radio, Crypto, EmbassyTimer, Rng>;

/// SX1276 driven through the lorawan-device MAC.
pub struct TrackerRadio {
    device: Mac,
    credentials: Option<Credentials>,
    joined: bool,
    fport: u8,
}

impl TrackerRadio {
    pub async fn new(
        spi: LoraSpi,
        lora_irq: Input<'static>,
        lora_rst: Output<'static>,
        rng: Rng,
        fport: u8,
    ) -> crate::Result<Self> {
        let config = sx127x::Config {
            chip: Sx1276,
            tcxo_used: false,
            rx_boost: true,
            tx_boost: true,
        };

        let interface_variant = GenericSx127xInterfaceVariant::new(lora_rst, lora_irq, None, None)
            .map_err(|err| {
                warn!("LoRa interface setup: {:?}", Debug2Format(&err));
                Error::Radio
            })?;

        // Public network sync word, this is real LoRaWAN
        let lora = LoRa::new(Sx127x::new(spi, interface_variant, config), true, Delay)
            .await
            .map_err(|err| {
                warn!("LoRa init: {:?}", Debug2Format(&err));
                Error::Radio
            })?;

        let radio: Radio = lora.into();
        let region = region::Configuration::new(LORAWAN_REGION);
        let device = Device::new(region, radio, EmbassyTimer::new(), rng);

        Ok(Self {
            device,
            credentials: None,
            joined: false,
            fport,
        })
    }

    fn join_mode(credentials: &Credentials) -> JoinMode {
        match *credentials {
            Credentials::Otaa {
                dev_eui,
                app_eui,
                app_key,
            } => JoinMode::OTAA {
                deveui: DevEui::from(dev_eui),
                appeui: AppEui::from(app_eui),
                appkey: AppKey::from(app_key),
            },
            Credentials::Abp {
                dev_addr,
                nwk_skey,
                app_skey,
            } => JoinMode::ABP {
                newskey: NewSKey::from(nwk_skey),
                appskey: AppSKey::from(app_skey),
                devaddr: DevAddr::from(dev_addr),
            },
        }
    }

    fn data_rate(index: u8) -> DR {
        match index {
            0 => DR::_0,
            1 => DR::_1,
            2 => DR::_2,
            3 => DR::_3,
            4 => DR::_4,
            _ => DR::_5,
        }
    }
}

impl LoraWanRadio for TrackerRadio {
    async fn join(&mut self, credentials: &Credentials) -> crate::Result<()> {
        self.credentials = Some(*credentials);
        Ok(())
    }

    /// Each poll is one full join attempt, including both receive windows.
    async fn has_joined(&mut self) -> crate::Result<bool> {
        if self.joined {
            return Ok(true);
        }
        let Some(credentials) = self.credentials else {
            return Ok(false);
        };

        match self.device.join(&Self::join_mode(&credentials)).await {
            Ok(JoinResponse::JoinSuccess) => self.joined = true,
            Ok(JoinResponse::NoJoinAccept) => info!("No join accept"),
            Err(err) => warn!("Join error: {:?}", Debug2Format(&err)),
        }
        Ok(self.joined)
    }

    async fn send(&mut self, payload: &[u8], data_rate: u8) -> crate::Result<()> {
        self.device.set_datarate(Self::data_rate(data_rate));

        match self.device.send(payload, self.fport, false).await {
            Ok(SendResponse::DownlinkReceived(fcnt_down)) => {
                info!("TX DONE, downlink fcnt {}", fcnt_down);
                Ok(())
            }
            Ok(_) => {
                info!("TX DONE");
                Ok(())
            }
            Err(err) => {
                warn!("TX error: {:?}", Debug2Format(&err));
                Err(Error::Radio)
            }
        }
    }

    /// The MAC already listened in both RX windows during `send`; anything it
    /// caught is handed out here. Otherwise this never completes.
    async fn receive(&mut self, buffer: &mut [u8]) -> crate::Result<usize> {
        match self.device.take_downlink() {
            Some(downlink) => {
                let len = downlink.data.len().min(buffer.len());
                buffer[..len].copy_from_slice(&downlink.data[..len]);
                Ok(len)
            }
            None => core::future::pending().await,
        }
    }
}
