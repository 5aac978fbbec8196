//! Geohash decoding (base-32, interleaved longitude/latitude bits).

use super::GeoPoint;
use crate::{Result, SortError};

const BASE_32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

fn base32_ord(c: u8) -> Option<u32> {
    BASE_32.iter().position(|&b| b == c).map(|pos| pos as u32)
}

/// Decodes a geohash into the center point of its cell.
///
/// Even bits (starting with the very first bit) narrow the longitude
/// interval, odd bits the latitude interval.
pub(crate) fn decode_geohash(hash: &str) -> Result<GeoPoint> {
    if hash.is_empty() {
        return Err(SortError::Validation(
            "cannot decode empty geohash".to_string(),
        ));
    }
    let mut lat_range = (-90.0f64, 90.0f64);
    let mut lon_range = (-180.0f64, 180.0f64);
    let mut is_lon_bit = true;
    for c in hash.bytes() {
        let ord = base32_ord(c.to_ascii_lowercase()).ok_or_else(|| {
            SortError::Validation(format!("invalid geohash character [{}]", c as char))
        })?;
        for bit_pos in (0..5).rev() {
            let bit = (ord >> bit_pos) & 1;
            let range = if is_lon_bit {
                &mut lon_range
            } else {
                &mut lat_range
            };
            let mid = (range.0 + range.1) / 2.0;
            if bit == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            is_lon_bit = !is_lon_bit;
        }
    }
    Ok(GeoPoint::new(
        (lat_range.0 + lat_range.1) / 2.0,
        (lon_range.0 + lon_range.1) / 2.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::decode_geohash;

    #[test]
    fn test_decode_known_cells() {
        let point = decode_geohash("ezs42").unwrap();
        assert!((point.lat - 42.60498046875).abs() < 1e-6);
        assert!((point.lon - -5.60302734375).abs() < 1e-6);

        let point = decode_geohash("u4pruydqqvj").unwrap();
        assert!((point.lat - 57.64911).abs() < 1e-4);
        assert!((point.lon - 10.40744).abs() < 1e-4);
    }

    #[test]
    fn test_decode_rejects_invalid_characters() {
        // 'a', 'i', 'l' and 'o' are not part of the geohash alphabet.
        assert!(decode_geohash("ezsa2").is_err());
        assert!(decode_geohash("").is_err());
    }
}
