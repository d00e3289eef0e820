use core::convert::Infallible;

#[cfg(feature = "defmt")]
use defmt::{debug, warn};
use embassy_time::Instant;
use embedded_io_async::{Read, ReadExactError};
#[cfg(not(feature = "defmt"))]
use log::{debug, warn};
use nmea0183::{ParseResult, Parser, Sentence, GGA};

use crate::state::LastFix;

// Apparently NMEA sentences are always 79 bytes long
const NMEA_BUFFER_SIZE: usize = 79;

/// Reads NMEA from the receiver forever, recording every GGA fix into `last_fix`.
///
/// Returns only when the UART fails.
pub async fn sample<R: Read>(
    mut rx: R,
    last_fix: &LastFix,
) -> Result<Infallible, ReadExactError<R::Error>> {
    let mut read_buffer = [0u8; NMEA_BUFFER_SIZE];

    // Only GGA carries the altitude next to the position
    let mut parser = Parser::new().sentence_only(Sentence::GGA);

    loop {
        rx.read_exact(&mut read_buffer).await?;

        if !ingest(&mut parser, &read_buffer, last_fix, Instant::now()).await {
            // We missed a byte somewhere, skip to the end of the current line
            // so the next read starts on a fresh sentence
            let mut eol_buff = [0u8; 1];
            while eol_buff[0] != b'\n' {
                rx.read_exact(&mut eol_buff).await?;
            }
            // The parser still holds the head of the sentence we just skipped
            parser = Parser::new().sentence_only(Sentence::GGA);
        }
    }
}

/// Feeds `bytes` to the parser. Returns false if a sentence failed to parse.
pub async fn ingest(parser: &mut Parser, bytes: &[u8], last_fix: &LastFix, now: Instant) -> bool {
    let mut in_sync = true;
    for result in parser.parse_from_bytes(bytes) {
        match result {
            Ok(ParseResult::GGA(Some(gga))) => {
                let (latitude, longitude, altitude) = position(&gga);
                last_fix.record(latitude, longitude, altitude, now).await;
            }
            Ok(ParseResult::GGA(None)) => debug!("GGA without a fix"),
            Ok(_) => {}
            Err(e) => {
                warn!("NMEA Parse Error: {}", e);
                in_sync = false;
            }
        }
    }
    in_sync
}

fn position(gga: &GGA) -> (f32, f32, f32) {
    (
        gga.latitude.as_f64() as f32,
        gga.longitude.as_f64() as f32,
        gga.altitude.meters,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    const GGA_FIX: &[u8] =
        b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76\r\n";
    const GGA_NO_FIX: &[u8] = b"$GPGGA,092750.000,,,,,0,0,,,M,,M,,*41\r\n";

    #[test]
    fn records_gga_fix() {
        let last = LastFix::new();
        let mut parser = Parser::new().sentence_only(Sentence::GGA);
        let now = Instant::from_secs(42);

        assert!(block_on(ingest(&mut parser, GGA_FIX, &last, now)));

        let state = block_on(last.state());
        assert!((state.lt - 53.361337).abs() < 1e-4);
        assert!((state.ln + 6.505620).abs() < 1e-4);
        assert_eq!(state.ga, 61.7);
        assert_eq!(state.fixed_at, Some(now));
    }

    #[test]
    fn sentence_without_fix_keeps_previous() {
        let last = LastFix::new();
        let mut parser = Parser::new().sentence_only(Sentence::GGA);

        block_on(ingest(&mut parser, GGA_FIX, &last, Instant::from_secs(1)));
        block_on(ingest(&mut parser, GGA_NO_FIX, &last, Instant::from_secs(2)));

        let state = block_on(last.state());
        assert_eq!(state.fixed_at, Some(Instant::from_secs(1)));
    }

    #[test]
    fn bad_checksum_is_reported() {
        let last = LastFix::new();
        let mut parser = Parser::new().sentence_only(Sentence::GGA);
        let corrupted =
            b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*00\r\n";

        assert!(!block_on(ingest(&mut parser, corrupted, &last, Instant::from_secs(1))));
        assert_eq!(block_on(last.state()).fixed_at, None);
    }

    #[test]
    fn sampler_recovers_after_corrupted_sentence() {
        extern crate std;
        use std::vec::Vec;

        let mut stream = Vec::new();
        stream.extend_from_slice(
            b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*00\r\n",
        );
        for _ in 0..6 {
            stream.extend_from_slice(GGA_FIX);
        }
        let last = LastFix::new();

        // Runs until the stream is exhausted
        let result = block_on(sample(&stream[..], &last));
        assert!(matches!(result, Err(ReadExactError::UnexpectedEof)));

        let state = block_on(last.state());
        assert!(state.fixed_at.is_some());
        assert!((state.lt - 53.361337).abs() < 1e-4);
        assert_eq!(state.ga, 61.7);
    }
}
