use esp_hal::{
    gpio::{AnyPin, Pin},
    peripherals::{Peripherals, DMA, RNG, SPI2, TIMG0, UART0},
};

pub struct TrackerPins {
    pub uart_rx: AnyPin,
    pub uart_tx: AnyPin,

    pub lora_rst: AnyPin,
    pub lora_irq: AnyPin,

    pub lora_nss: AnyPin,
    pub lora_mosi: AnyPin,
    pub lora_miso: AnyPin,
    pub lora_clk: AnyPin,

    pub led_red: AnyPin,
    pub led_green: AnyPin,
    pub led_blue: AnyPin,

    pub timg: TIMG0,
    pub uart: UART0,
    pub dma: DMA,
    pub spi: SPI2,
    pub rng: RNG,
}

pub fn get_tracker_pins_v004_bread(p: Peripherals) -> TrackerPins {
    TrackerPins {
        uart_rx: p.GPIO4.degrade(),
        uart_tx: p.GPIO5.degrade(),

        lora_rst: p.GPIO1.degrade(),
        lora_irq: p.GPIO8.degrade(),

        lora_nss: p.GPIO9.degrade(),
        lora_clk: p.GPIO21.degrade(),
        lora_miso: p.GPIO20.degrade(),
        lora_mosi: p.GPIO10.degrade(),

        led_red: p.GPIO3.degrade(),
        led_green: p.GPIO6.degrade(),
        led_blue: p.GPIO7.degrade(),

        timg: p.TIMG0,
        uart: p.UART0,
        dma: p.DMA,
        spi: p.SPI2,
        rng: p.RNG,
    }
}
