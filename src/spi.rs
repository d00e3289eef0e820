use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use fugit::RateExtU32;
use static_cell::StaticCell;

use esp_hal::{
    dma::{Dma, DmaPriority, DmaRxBuf, DmaTxBuf},
    dma_buffers,
    gpio::AnyPin,
    peripherals::{DMA, SPI2},
    spi::{
        master::{Config, Spi, SpiDmaBus},
        SpiMode,
    },
    Async,
};

static SPI_BUS: StaticCell<Mutex<NoopRawMutex, SpiDmaBus<'static, Async>>> = StaticCell::new();

/// Brings up SPI2 with DMA for the LoRa transceiver.
pub fn init(
    dma: DMA,
    spi: SPI2,
    sck: AnyPin,
    mosi: AnyPin,
    miso: AnyPin,
) -> &'static mut Mutex<NoopRawMutex, SpiDmaBus<'static, Async>> {
    let dma = Dma::new(dma);
    let dma_channel = dma.channel0;

    // LoRaWAN frames are at most 256 bytes, leave room for register traffic
    let (rx_buffer, rx_descriptors, tx_buffer, tx_descriptors) = dma_buffers!(512);
    let dma_rx_buf = match DmaRxBuf::new(rx_descriptors, rx_buffer) {
        Ok(buf) => buf,
        Err(err) => panic!("DMA RX buffer: {:?}", err),
    };
    let dma_tx_buf = match DmaTxBuf::new(tx_descriptors, tx_buffer) {
        Ok(buf) => buf,
        Err(err) => panic!("DMA TX buffer: {:?}", err),
    };

    let spi_config = Config {
        frequency: 200.kHz(),
        mode: SpiMode::Mode0,
        ..Config::default()
    };

    // Max bitrate of the SX1276 is well above this, 200 kHz keeps breadboard wiring happy
    let spi = Spi::new_with_config(spi, spi_config)
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso)
        .with_dma(dma_channel.configure(false, DmaPriority::Priority0))
        .with_buffers(dma_rx_buf, dma_tx_buf)
        .into_async();

    SPI_BUS.init(Mutex::new(spi))
}
