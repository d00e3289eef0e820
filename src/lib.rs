#![deny(unsafe_code)]
#![no_std]
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fix;
pub mod gps;
pub mod scheduler;
pub mod signal;
pub mod state;
pub mod uplink;

#[cfg(feature = "esp32c3")]
pub mod lora;
#[cfg(feature = "esp32c3")]
pub mod pins;
#[cfg(feature = "esp32c3")]
pub mod spi;

#[cfg(test)]
mod testing;

pub type Result<T> = core::result::Result<T, error::Error>;
