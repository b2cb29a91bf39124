use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const SOH: u8 = 0x01;
const BEGIN: &[u8] = b"8=FIX";
const TRAILER: &[u8] = b"\x0110=";

/// Splits a byte stream into whole FIX messages, from `8=FIX` up to and
/// including the SOH that ends the `10=` checksum field.
#[derive(Debug, Default)]
pub struct FixCodec;

impl Decoder for FixCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(start) = find(src, BEGIN) else {
            // Junk only; keep a tail long enough to hold a split "8=FIX".
            let keep = BEGIN.len() - 1;
            if src.len() > keep {
                src.advance(src.len() - keep);
            }
            return Ok(None);
        };
        src.advance(start);

        let Some(trailer) = find(src, TRAILER) else {
            return Ok(None);
        };
        let checksum_start = trailer + TRAILER.len();
        let Some(end) = src[checksum_start..].iter().position(|&b| b == SOH) else {
            return Ok(None);
        };

        let frame = src.split_to(checksum_start + end + 1);
        Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A truncated frame or junk at close is not a transport error.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for FixCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
