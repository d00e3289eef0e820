use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("LoRaWAN radio failure")]
    Radio,
    #[error("Indicator pin failure")]
    Indicator,
    #[error("Invalid hex digit in key")]
    InvalidHex,
    #[error("Key has the wrong length")]
    InvalidKeyLength,
    #[error("Position does not fit the payload fields")]
    OutOfRange,
}
