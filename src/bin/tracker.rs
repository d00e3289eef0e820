#![deny(unsafe_code)]
#![no_main]
#![no_std]

use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_executor::Spawner;

use esp_hal::{
    gpio::{Input, Level, Output, Pull},
    peripherals::Peripherals,
    rng::Rng,
    timer::timg::TimerGroup,
    uart::{Config, Uart, UartRx},
    Async,
};

use defmt::info;
use esp_backtrace as _;
use esp_println as _;

use lora_tracker::{
    clock::EmbassyClock,
    config::{Credentials, TrackerConfig, DEFAULT_APP_EUI, DEFAULT_APP_KEY, DEFAULT_DEV_EUI},
    gps,
    lora::TrackerRadio,
    pins,
    scheduler::CycleScheduler,
    signal::RgbLed,
    spi,
    state::LAST_FIX,
};

#[embassy_executor::task]
async fn sample_gps(rx: UartRx<'static, Async>) {
    // Only returns on a UART failure
    if let Err(err) = gps::sample(rx, &LAST_FIX).await {
        panic!("GPS UART failed: {:?}", err);
    }
}

fn credentials() -> Credentials {
    let dev_eui = option_env!("TRACKER_DEV_EUI").unwrap_or(DEFAULT_DEV_EUI);
    let app_eui = option_env!("TRACKER_APP_EUI").unwrap_or(DEFAULT_APP_EUI);
    let app_key = option_env!("TRACKER_APP_KEY").unwrap_or(DEFAULT_APP_KEY);

    match Credentials::otaa_from_hex(dev_eui, app_eui, app_key) {
        Ok(credentials) => credentials,
        Err(err) => panic!("Bad TRACKER_* key: {}", err),
    }
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) -> ! {
    info!("Initializing");

    let peripherals: Peripherals = esp_hal::init(esp_hal::Config::default());

    let pins = pins::get_tracker_pins_v004_bread(peripherals);

    let timg0 = TimerGroup::new(pins.timg);

    esp_hal_embassy::init(timg0.timer0);

    info!("Initializing compete");

    let config = TrackerConfig::default();

    let led = RgbLed::new(
        Output::new(pins.led_red, Level::High),
        Output::new(pins.led_green, Level::Low),
        Output::new(pins.led_blue, Level::Low),
    );

    // Setup UART for GPS
    let uart_config = Config::default().baudrate(9600);
    let uart = Uart::new_with_config(pins.uart, uart_config, pins.uart_rx, pins.uart_tx)
        .unwrap()
        .into_async();

    let (rx, _) = uart.split();

    // Note that this task now owns the UART RX line completely
    // UART is a 1:1 interface, so this is fine
    spawner.spawn(sample_gps(rx)).unwrap();

    // Setup SPI bus
    let spi_bus = spi::init(
        pins.dma,
        pins.spi,
        pins.lora_clk,
        pins.lora_mosi,
        pins.lora_miso,
    );

    let lora_spi_csb = Output::new(pins.lora_nss, Level::High);
    let lora_spi = SpiDevice::new(spi_bus, lora_spi_csb);

    let lora_rst = Output::new(pins.lora_rst, Level::High);
    let lora_irq = Input::new(pins.lora_irq, Pull::Up);

    let radio = match TrackerRadio::new(
        lora_spi,
        lora_irq,
        lora_rst,
        Rng::new(pins.rng),
        config.fport,
    )
    .await
    {
        Ok(radio) => radio,
        Err(err) => panic!("LoRa setup: {}", err),
    };

    info!("setting up LoRa");

    let mut tracker = CycleScheduler::new(&LAST_FIX, radio, led, EmbassyClock, config);

    match tracker.run(&credentials()).await {
        Ok(never) => match never {},
        Err(err) => panic!("Tracker stopped: {}", err),
    }
}
