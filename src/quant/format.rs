//! Binary layout of the quantized edge artifact (little-endian).
//!
//! ```text
//! magic "AEQ8" | version u16 | input_dim u32 | has_threshold u8 [threshold f32]
//! input scale f32 | input zero_point i32 | layer_count u32
//! per layer:
//!   in_dim u32 | out_dim u32 | activation u8 | output scale f32 | output zero_point i32
//!   per output channel: weight_scale f32 | multiplier i32 | shift i32 | bias i32
//!   weights i8 * (in_dim * out_dim), row-major [in][out]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use super::runtime::{QuantizedAutoencoder, QuantizedLayer};
use super::QuantParams;
use crate::model::Activation;
use crate::utils::error::{AutoencoderError, Result};

pub const MAGIC: &[u8; 4] = b"AEQ8";
pub const FORMAT_VERSION: u16 = 1;

const CHANNEL_BYTES: usize = 16;
const LAYER_HEADER_BYTES: usize = 17;

fn activation_code(activation: Activation) -> u8 {
    match activation {
        Activation::Linear => 0,
        Activation::Relu => 1,
    }
}

fn activation_from_code(code: u8) -> Result<Activation> {
    match code {
        0 => Ok(Activation::Linear),
        1 => Ok(Activation::Relu),
        other => Err(AutoencoderError::artifact(format!(
            "unknown activation code {}",
            other
        ))),
    }
}

fn write_u32(out: &mut Vec<u8>, value: usize, what: &str) -> Result<()> {
    let value = u32::try_from(value)
        .map_err(|_| AutoencoderError::artifact(format!("{} does not fit in u32", what)))?;
    out.write_u32::<LittleEndian>(value)?;
    Ok(())
}

pub fn encode(model: &QuantizedAutoencoder) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_all(MAGIC)?;
    out.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    write_u32(&mut out, model.input_dim(), "input_dim")?;

    match model.anomaly_threshold() {
        Some(threshold) => {
            out.write_u8(1)?;
            out.write_f32::<LittleEndian>(threshold)?;
        }
        None => out.write_u8(0)?,
    }

    let input = model.input_params();
    out.write_f32::<LittleEndian>(input.scale)?;
    out.write_i32::<LittleEndian>(input.zero_point)?;
    write_u32(&mut out, model.layers().len(), "layer count")?;

    for layer in model.layers() {
        write_u32(&mut out, layer.in_dim, "in_dim")?;
        write_u32(&mut out, layer.out_dim, "out_dim")?;
        out.write_u8(activation_code(layer.activation))?;
        out.write_f32::<LittleEndian>(layer.output.scale)?;
        out.write_i32::<LittleEndian>(layer.output.zero_point)?;

        for o in 0..layer.out_dim {
            out.write_f32::<LittleEndian>(layer.weight_scales[o])?;
            out.write_i32::<LittleEndian>(layer.multipliers[o])?;
            out.write_i32::<LittleEndian>(layer.shifts[o])?;
            out.write_i32::<LittleEndian>(layer.bias[o])?;
        }
        for &w in &layer.weights {
            out.write_i8(w)?;
        }
    }

    Ok(out)
}

struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.remaining() < needed {
            return Err(AutoencoderError::artifact(format!(
                "truncated artifact while reading {}",
                what
            )));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.ensure(1, what)?;
        Ok(self.cursor.read_u8()?)
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.ensure(2, what)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    fn u32(&mut self, what: &str) -> Result<usize> {
        self.ensure(4, what)?;
        Ok(self.cursor.read_u32::<LittleEndian>()? as usize)
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        self.ensure(4, what)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    fn f32(&mut self, what: &str) -> Result<f32> {
        self.ensure(4, what)?;
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    fn params(&mut self, what: &str) -> Result<QuantParams> {
        Ok(QuantParams {
            scale: self.f32(what)?,
            zero_point: self.i32(what)?,
        })
    }

    fn layer(&mut self, index: usize) -> Result<QuantizedLayer> {
        self.ensure(LAYER_HEADER_BYTES, "layer header")?;
        let in_dim = self.u32("in_dim")?;
        let out_dim = self.u32("out_dim")?;
        let activation = activation_from_code(self.u8("activation")?)?;
        let output = self.params("output params")?;

        let weight_count = in_dim
            .checked_mul(out_dim)
            .ok_or_else(|| AutoencoderError::artifact(format!("layer {} is too large", index)))?;
        let needed = out_dim
            .checked_mul(CHANNEL_BYTES)
            .and_then(|n| n.checked_add(weight_count))
            .ok_or_else(|| AutoencoderError::artifact(format!("layer {} is too large", index)))?;
        self.ensure(needed, "layer parameters")?;

        let mut weight_scales = Vec::with_capacity(out_dim);
        let mut multipliers = Vec::with_capacity(out_dim);
        let mut shifts = Vec::with_capacity(out_dim);
        let mut bias = Vec::with_capacity(out_dim);
        for _ in 0..out_dim {
            weight_scales.push(self.f32("weight scale")?);
            multipliers.push(self.i32("multiplier")?);
            shifts.push(self.i32("shift")?);
            bias.push(self.i32("bias")?);
        }

        let mut raw = vec![0u8; weight_count];
        self.cursor.read_exact(&mut raw)?;
        let weights = raw.into_iter().map(|b| b as i8).collect();

        Ok(QuantizedLayer {
            in_dim,
            out_dim,
            activation,
            output,
            weight_scales,
            multipliers,
            shifts,
            bias,
            weights,
        })
    }
}

pub fn decode(bytes: &[u8]) -> Result<QuantizedAutoencoder> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(AutoencoderError::artifact("not a quantized autoencoder (bad magic)"));
    }

    let mut reader = Reader {
        cursor: Cursor::new(bytes),
    };
    reader.cursor.set_position(MAGIC.len() as u64);

    let version = reader.u16("version")?;
    if version != FORMAT_VERSION {
        return Err(AutoencoderError::artifact(format!(
            "unsupported artifact version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let input_dim = reader.u32("input_dim")?;
    let anomaly_threshold = match reader.u8("threshold flag")? {
        0 => None,
        1 => Some(reader.f32("threshold")?),
        other => {
            return Err(AutoencoderError::artifact(format!(
                "invalid threshold flag {}",
                other
            )))
        }
    };
    let input = reader.params("input params")?;

    let layer_count = reader.u32("layer count")?;
    // 每層至少需要 header 大小的位元組
    if layer_count == 0 || layer_count > reader.remaining() / LAYER_HEADER_BYTES {
        return Err(AutoencoderError::artifact(format!(
            "invalid layer count {}",
            layer_count
        )));
    }

    let layers = (0..layer_count)
        .map(|i| reader.layer(i))
        .collect::<Result<Vec<_>>>()?;

    if reader.remaining() != 0 {
        return Err(AutoencoderError::artifact(format!(
            "{} trailing bytes after last layer",
            reader.remaining()
        )));
    }
    if layers[0].in_dim != input_dim {
        return Err(AutoencoderError::artifact(format!(
            "header input_dim {} does not match first layer ({})",
            input_dim, layers[0].in_dim
        )));
    }

    QuantizedAutoencoder::new(input, layers, anomaly_threshold)
}
