//! Map curve database decoding
//!
//! The map is a stream of 16-bit words: each curve record is `(npts, value)`
//! followed by `npts` (dx, dy, dz) triples, cumulative from the curve start
//! in 1/30000 fixed point; a record with `npts == 0` terminates the stream.
//! Decoding happens once at load time; the scan-converter only ever sees
//! [`Curve`] values and never the wire encoding.

use thiserror::Error;

use crate::math3d::Vec3;

/// Fixed-point denominator of the encoded curve deltas
const MAP_DATA_SCALE: f64 = 30000.0;

/// Errors from decoding a curve database
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapDataError {
    #[error("curve {index}: record truncated ({missing} words missing)")]
    Truncated { index: usize, missing: usize },

    #[error("curve {index}: negative point count {count}")]
    NegativePointCount { index: usize, count: i16 },

    #[error("missing zero-length terminator record")]
    MissingTerminator,

    #[error("byte stream length {len} is not a whole number of 16-bit words")]
    OddByteLength { len: usize },
}

/// One closed map curve: a weight value and its points on the unit sphere
///
/// Decoded points are unit-ish vectors; the fixed-point encoding leaves a
/// magnitude error that is negligible for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub value: i32,
    pub points: Vec<Vec3>,
}

/// The decoded curve database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapData {
    pub curves: Vec<Curve>,
}

impl MapData {
    /// An empty database; rendering it shows the bare globe
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode from a host-order word stream
    pub fn from_words(words: &[i16]) -> Result<Self, MapDataError> {
        let mut curves = Vec::new();
        let mut pos = 0usize;

        loop {
            let index = curves.len();
            let Some(&npts) = words.get(pos) else {
                return Err(MapDataError::MissingTerminator);
            };
            if npts == 0 {
                break;
            }
            if npts < 0 {
                return Err(MapDataError::NegativePointCount { index, count: npts });
            }

            let npts = npts as usize;
            let end = pos + 2 + 3 * npts;
            if end > words.len() {
                return Err(MapDataError::Truncated {
                    index,
                    missing: end - words.len(),
                });
            }
            let value = i32::from(words[pos + 1]);

            let mut points = Vec::with_capacity(npts);
            let (mut x, mut y, mut z) = (0i32, 0i32, 0i32);
            for triple in words[pos + 2..end].chunks_exact(3) {
                x += i32::from(triple[0]);
                y += i32::from(triple[1]);
                z += i32::from(triple[2]);
                points.push(Vec3::new(
                    f64::from(x) / MAP_DATA_SCALE,
                    f64::from(y) / MAP_DATA_SCALE,
                    f64::from(z) / MAP_DATA_SCALE,
                ));
            }

            curves.push(Curve { value, points });
            pos = end;
        }

        Ok(Self { curves })
    }

    /// Decode from little-endian bytes, the on-disk form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MapDataError> {
        if bytes.len() % 2 != 0 {
            return Err(MapDataError::OddByteLength { len: bytes.len() });
        }
        let words: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        Self::from_words(&words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_curve() {
        // One 2-point curve, value 100: deltas accumulate from the start
        let words = [2, 100, 30000, 0, 0, -30000, 30000, 0, 0];
        let map = MapData::from_words(&words).unwrap();
        assert_eq!(map.curves.len(), 1);

        let curve = &map.curves[0];
        assert_eq!(curve.value, 100);
        assert_eq!(curve.points.len(), 2);
        assert_eq!(curve.points[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(curve.points[1], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_decode_multiple_curves() {
        let words = [
            1, 64, 0, 0, 30000, // curve 0: single point at +z
            2, 100, 0, 30000, 0, 0, -30000, 0, // curve 1: pole and back
            0, // terminator
        ];
        let map = MapData::from_words(&words).unwrap();
        assert_eq!(map.curves.len(), 2);
        assert_eq!(map.curves[0].value, 64);
        assert_eq!(map.curves[1].points[1], Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_stream_needs_terminator() {
        assert_eq!(
            MapData::from_words(&[]),
            Err(MapDataError::MissingTerminator)
        );
        assert!(MapData::from_words(&[0]).unwrap().curves.is_empty());
    }

    #[test]
    fn test_truncated_record() {
        let words = [3, 50, 1, 2, 3]; // promises 3 points, delivers 1
        assert_eq!(
            MapData::from_words(&words),
            Err(MapDataError::Truncated {
                index: 0,
                missing: 6
            })
        );
    }

    #[test]
    fn test_negative_point_count() {
        assert_eq!(
            MapData::from_words(&[-4, 10, 0]),
            Err(MapDataError::NegativePointCount {
                index: 0,
                count: -4
            })
        );
    }

    #[test]
    fn test_from_bytes_little_endian() {
        let words: [i16; 6] = [1, 64, 30000, 0, 0, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let map = MapData::from_bytes(&bytes).unwrap();
        assert_eq!(map.curves.len(), 1);
        assert_eq!(map.curves[0].points[0], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_odd_byte_length() {
        assert_eq!(
            MapData::from_bytes(&[0, 0, 0]),
            Err(MapDataError::OddByteLength { len: 3 })
        );
    }
}
