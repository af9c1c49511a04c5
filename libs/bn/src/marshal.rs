//! Binary encoding of decimal numbers
//!
//! ```text
//! byte 0      format version (always 0)
//! byte 1      decimal precision
//! bytes 2..   mantissa, big-endian two's complement
//! ```

use crate::error::{NumberError, Result};
use crate::{DecFixedPointNumber, DecFloatPointNumber};
use num_bigint::BigInt;

pub const FORMAT_VERSION: u8 = 0;

const HEADER_LEN: usize = 2;

fn encode(n: &BigInt, prec: u8) -> Vec<u8> {
    let mantissa = n.to_signed_bytes_be();
    let mut out = Vec::with_capacity(HEADER_LEN + mantissa.len());
    out.push(FORMAT_VERSION);
    out.push(prec);
    out.extend_from_slice(&mantissa);
    out
}

fn decode(data: &[u8]) -> Result<(BigInt, u8)> {
    if data.len() < HEADER_LEN {
        return Err(NumberError::BufferTooShort { len: data.len() });
    }
    if data[0] != FORMAT_VERSION {
        return Err(NumberError::UnsupportedVersion { version: data[0] });
    }
    Ok((BigInt::from_signed_bytes_be(&data[HEADER_LEN..]), data[1]))
}

impl DecFixedPointNumber {
    pub fn marshal_binary(&self) -> Vec<u8> {
        encode(&self.n, self.prec)
    }

    pub fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        let (n, prec) = decode(data)?;
        Ok(Self::from_mantissa(n, prec))
    }
}

impl DecFloatPointNumber {
    pub fn marshal_binary(&self) -> Vec<u8> {
        self.as_dec_fixed().marshal_binary()
    }

    /// Decodes and normalizes (trailing zeros of a fixed-precision encoding are dropped)
    pub fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        DecFixedPointNumber::unmarshal_binary(data).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let x = DecFixedPointNumber::parse("-1.28", 2).unwrap();
        assert_eq!(x.marshal_binary(), vec![0, 2, 0x80]);
        let y = DecFixedPointNumber::parse("1.28", 2).unwrap();
        assert_eq!(y.marshal_binary(), vec![0, 2, 0x00, 0x80]);
    }

    #[test]
    fn test_roundtrip_keeps_mantissa_and_precision() {
        let x = DecFixedPointNumber::parse("123456789.000000000000000001", 18).unwrap();
        let decoded = DecFixedPointNumber::unmarshal_binary(&x.marshal_binary()).unwrap();
        assert_eq!(decoded.precision(), 18);
        assert_eq!(decoded.mantissa(), x.mantissa());

        let y: DecFloatPointNumber = "-0.0042".parse().unwrap();
        let decoded = DecFloatPointNumber::unmarshal_binary(&y.marshal_binary()).unwrap();
        assert_eq!(decoded.precision(), y.precision());
        assert_eq!(decoded, y);
    }

    #[test]
    fn test_zero_with_empty_mantissa() {
        let decoded = DecFixedPointNumber::unmarshal_binary(&[0, 5]).unwrap();
        assert!(decoded.is_zero());
        assert_eq!(decoded.precision(), 5);
    }

    #[test]
    fn test_rejects_short_buffers_and_unknown_versions() {
        assert_eq!(
            DecFixedPointNumber::unmarshal_binary(&[0]),
            Err(NumberError::BufferTooShort { len: 1 })
        );
        assert_eq!(
            DecFloatPointNumber::unmarshal_binary(&[1, 0, 1]),
            Err(NumberError::UnsupportedVersion { version: 1 })
        );
    }
}
