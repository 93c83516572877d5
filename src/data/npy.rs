//! Reader and writer for the NumPy `.npy` array format.
//!
//! Only 2-D numeric arrays are accepted: rows are windows, columns are features.

use super::Dataset;
use crate::utils::error::{AutoencoderError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use regex::Regex;
use std::io::{Cursor, Write};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    F4,
    F8,
    I4,
    I8,
}

impl Kind {
    fn size(self) -> usize {
        match self {
            Kind::F4 | Kind::I4 => 4,
            Kind::F8 | Kind::I8 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    kind: Kind,
    endian: Endian,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn capture<'a>(pattern: &str, header: &'a str, key: &str) -> Result<&'a str> {
    let re = Regex::new(pattern).map_err(|e| AutoencoderError::data_format(e.to_string()))?;
    re.captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| AutoencoderError::data_format(format!("npy header is missing '{}'", key)))
}

fn parse_descr(descr: &str) -> Result<(Kind, Endian)> {
    let mut chars = descr.chars();
    let endian = match chars.next() {
        Some('<') => Endian::Little,
        Some('>') => Endian::Big,
        Some('=') if cfg!(target_endian = "big") => Endian::Big,
        Some('=') => Endian::Little,
        _ => {
            return Err(AutoencoderError::data_format(format!(
                "unsupported npy dtype '{}'",
                descr
            )))
        }
    };

    let kind = match chars.as_str() {
        "f4" => Kind::F4,
        "f8" => Kind::F8,
        "i4" => Kind::I4,
        "i8" => Kind::I8,
        _ => {
            return Err(AutoencoderError::data_format(format!(
                "unsupported npy dtype '{}', expected a 4 or 8 byte float/int",
                descr
            )))
        }
    };

    Ok((kind, endian))
}

fn parse_header(header: &str) -> Result<Header> {
    let descr = capture(r"'descr'\s*:\s*'([^']*)'", header, "descr")?;
    let fortran = capture(r"'fortran_order'\s*:\s*(True|False)", header, "fortran_order")?;
    let shape = capture(r"'shape'\s*:\s*\(([^)]*)\)", header, "shape")?;

    let (kind, endian) = parse_descr(descr)?;

    let shape = shape
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| {
                AutoencoderError::data_format(format!("invalid npy shape entry '{}'", s))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        kind,
        endian,
        fortran_order: fortran == "True",
        shape,
    })
}

fn read_value<E: ByteOrder>(cursor: &mut Cursor<&[u8]>, kind: Kind) -> std::io::Result<f32> {
    Ok(match kind {
        Kind::F4 => cursor.read_f32::<E>()?,
        Kind::F8 => cursor.read_f64::<E>()? as f32,
        Kind::I4 => cursor.read_i32::<E>()? as f32,
        Kind::I8 => cursor.read_i64::<E>()? as f32,
    })
}

/// Decode a `.npy` buffer into a [`Dataset`].
pub fn decode(bytes: &[u8]) -> Result<Dataset> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(AutoencoderError::data_format("not a .npy file (bad magic)"));
    }

    let major = bytes[6];
    let mut cursor = Cursor::new(&bytes[8..]);
    let header_len = match major {
        1 => cursor.read_u16::<LittleEndian>().map(usize::from),
        2 | 3 => cursor.read_u32::<LittleEndian>().map(|v| v as usize),
        v => {
            return Err(AutoencoderError::data_format(format!(
                "unsupported .npy format version {}",
                v
            )))
        }
    }
    .map_err(|_| AutoencoderError::data_format("truncated .npy header"))?;

    let header_start = 8 + cursor.position() as usize;
    let header_end = header_start + header_len;
    if bytes.len() < header_end {
        return Err(AutoencoderError::data_format("truncated .npy header"));
    }

    let header_text = std::str::from_utf8(&bytes[header_start..header_end])
        .map_err(|_| AutoencoderError::data_format(".npy header is not valid text"))?;
    let header = parse_header(header_text)?;

    let (rows, dim) = match header.shape.as_slice() {
        [rows, dim] => (*rows, *dim),
        other => {
            return Err(AutoencoderError::shape(
                "2-D array (windows, features)",
                format!("{:?}", other),
            ))
        }
    };

    let count = rows
        .checked_mul(dim)
        .ok_or_else(|| AutoencoderError::data_format("npy shape is too large"))?;
    let needed = count
        .checked_mul(header.kind.size())
        .ok_or_else(|| AutoencoderError::data_format("npy shape is too large"))?;
    let payload = &bytes[header_end..];
    if payload.len() < needed {
        return Err(AutoencoderError::data_format(format!(
            "truncated .npy payload: expected {} bytes, found {}",
            needed,
            payload.len()
        )));
    }

    let mut cursor = Cursor::new(&payload[..needed]);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match header.endian {
            Endian::Little => read_value::<LittleEndian>(&mut cursor, header.kind)?,
            Endian::Big => read_value::<BigEndian>(&mut cursor, header.kind)?,
        };
        values.push(value);
    }

    if header.fortran_order {
        // 欄優先轉列優先
        let column_major = values;
        values = vec![0.0; count];
        for r in 0..rows {
            for c in 0..dim {
                values[r * dim + c] = column_major[c * rows + r];
            }
        }
    }

    Dataset::new(rows, dim, values)
}

/// Encode a [`Dataset`] as a version 1.0, little-endian `f4`, C-order `.npy` buffer.
pub fn encode(dataset: &Dataset) -> Result<Vec<u8>> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        dataset.rows(),
        dataset.dim()
    );
    // magic(6) + version(2) + header_len(2) + dict + '\n'
    let unpadded = 10 + dict.len() + 1;
    let total = unpadded.div_ceil(HEADER_ALIGNMENT) * HEADER_ALIGNMENT;
    let header_len = u16::try_from(total - 10)
        .map_err(|_| AutoencoderError::data_format("npy header too long"))?;

    let mut out = Vec::with_capacity(total + dataset.values().len() * 4);
    out.write_all(MAGIC)?;
    out.write_all(&[1, 0])?;
    out.write_u16::<LittleEndian>(header_len)?;
    out.write_all(dict.as_bytes())?;
    out.write_all(&vec![b' '; total - unpadded])?;
    out.write_all(b"\n")?;

    for &value in dataset.values() {
        out.write_f32::<LittleEndian>(value)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_npy(descr: &str, fortran: bool, shape: &str, payload: &[u8]) -> Vec<u8> {
        let dict = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}\n",
            descr,
            if fortran { "True" } else { "False" },
            shape
        );
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_encoded_header_is_aligned() {
        let data = Dataset::new(3, 2, vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]).unwrap();
        let bytes = encode(&data).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % HEADER_ALIGNMENT, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_decode_f8_big_endian() {
        let mut payload = Vec::new();
        for v in [1.0f64, -2.0, 3.5, 4.25] {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        let bytes = raw_npy(">f8", false, "(2, 2)", &payload);
        let data = decode(&bytes).unwrap();
        assert_eq!(data.values(), &[1.0, -2.0, 3.5, 4.25]);
    }

    #[test]
    fn test_decode_fortran_order_transposes() {
        // column-major for [[1, 2, 3], [4, 5, 6]]
        let mut payload = Vec::new();
        for v in [1.0f32, 4.0, 2.0, 5.0, 3.0, 6.0] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let bytes = raw_npy("<f4", true, "(2, 3)", &payload);
        let data = decode(&bytes).unwrap();
        assert_eq!(data.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(data.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_decode_int_dtype() {
        let mut payload = Vec::new();
        for v in [7i32, -1] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let bytes = raw_npy("<i4", false, "(1, 2)", &payload);
        assert_eq!(decode(&bytes).unwrap().values(), &[7.0, -1.0]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode(b"not numpy at all").is_err());

        let one_d = raw_npy("<f4", false, "(2,)", &[0u8; 8]);
        assert!(matches!(
            decode(&one_d),
            Err(AutoencoderError::ShapeError { .. })
        ));

        let truncated = raw_npy("<f4", false, "(2, 2)", &[0u8; 12]);
        assert!(matches!(
            decode(&truncated),
            Err(AutoencoderError::DataFormatError { .. })
        ));

        let bool_dtype = raw_npy("|b1", false, "(1, 1)", &[1]);
        assert!(decode(&bool_dtype).is_err());
    }
}
