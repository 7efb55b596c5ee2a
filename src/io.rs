//! File glue for the command-line tool.
//!
//! Reader: a recording stored as safetensors with
//!   `data`     [C, T] F32 or F64
//!   `sfreq`    scalar (F32, F64 or I32)
//!   `ch_names` optional U8 blob, newline-separated
//!
//! The analysis core never touches files; it only sees [`Recording`].
use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

use crate::report::MicrostateReport;

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    let end = 8usize.checked_add(n).filter(|&e| e <= bytes.len()).context("header length exceeds file size")?;
    let header: Header = serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    Ok((header, end))
}

/// Byte slice, dtype and shape of one tensor.
fn tensor<'a>(bytes: &'a [u8], data_start: usize, header: &'a Header, name: &str) -> Result<(&'a [u8], &'a str, Vec<usize>)> {
    let entry = header.get(name).with_context(|| format!("missing '{name}' tensor"))?;
    let offsets = entry["data_offsets"].as_array().with_context(|| format!("'{name}': no data_offsets"))?;
    let (s, e) = match offsets.as_slice() {
        [s, e] => (
            s.as_u64().context("bad offset")? as usize,
            e.as_u64().context("bad offset")? as usize,
        ),
        _ => bail!("'{name}': data_offsets must have two entries"),
    };
    let range = data_start
        .checked_add(s)
        .zip(data_start.checked_add(e))
        .with_context(|| format!("'{name}': data offsets overflow"))?;
    let raw = bytes
        .get(range.0..range.1)
        .with_context(|| format!("'{name}': data out of bounds"))?;
    let dtype = entry["dtype"].as_str().with_context(|| format!("'{name}': no dtype"))?;
    let shape = entry["shape"]
        .as_array()
        .with_context(|| format!("'{name}': no shape"))?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("bad shape entry"))
        .collect::<Result<Vec<_>>>()?;
    Ok((raw, dtype, shape))
}

fn to_f64(raw: &[u8], dtype: &str) -> Result<Vec<f64>> {
    Ok(match dtype {
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "I32" => raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        other => bail!("unsupported dtype {other}"),
    })
}

/// A continuous multichannel recording, `[N, C]` (one row per sample).
#[derive(Debug, Clone)]
pub struct Recording {
    pub data: Array2<f64>,
    /// Channel labels in column order (may be empty).
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: u32,
}

impl Recording {
    pub fn new(data: Array2<f64>, ch_names: Vec<String>, sfreq: u32) -> Self {
        Self { data, ch_names, sfreq }
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_channels(&self) -> usize {
        self.data.ncols()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let (raw, dtype, shape) = tensor(&bytes, data_start, &header, "data")?;
        let &[n_ch, n_t] = shape.as_slice() else {
            bail!("'data' must be 2-D [C, T], got shape {shape:?}");
        };
        let values = to_f64(raw, dtype)?;
        // Stored channel-major; the core wants one row per sample.
        let data = Array2::from_shape_vec((n_ch, n_t), values)?.reversed_axes().as_standard_layout().into_owned();

        let (raw, dtype, _) = tensor(&bytes, data_start, &header, "sfreq")?;
        let sfreq = *to_f64(raw, dtype)?.first().context("'sfreq' is empty")?;
        if !(sfreq >= 1.0) {
            bail!("invalid sampling rate {sfreq}");
        }

        let ch_names = if header.contains_key("ch_names") {
            let (raw, _, _) = tensor(&bytes, data_start, &header, "ch_names")?;
            std::str::from_utf8(raw)?
                .split('\n')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        } else {
            vec![]
        };

        Ok(Recording::new(data, ch_names, sfreq.round() as u32))
    }
}

/// Write `reports` as a pretty-printed JSON array.
pub fn write_json_reports(path: &Path, reports: &[MicrostateReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal safetensors writer: (name, dtype, shape, bytes).
    fn write_st(path: &Path, tensors: &[(&str, &str, Vec<usize>, Vec<u8>)]) {
        let mut header = serde_json::Map::new();
        let mut offset = 0;
        for (name, dtype, shape, data) in tensors {
            header.insert(name.to_string(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr = serde_json::to_vec(&header).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&(hdr.len() as u64).to_le_bytes()).unwrap();
        f.write_all(&hdr).unwrap();
        for (_, _, _, data) in tensors {
            f.write_all(data).unwrap();
        }
    }

    #[test]
    fn loads_channel_major_data_as_sample_rows() {
        // [C=2, T=3]: ch0 = 1 2 3, ch1 = 4 5 6
        let data: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let path = std::env::temp_dir().join(format!("microstates_io_{}.safetensors", std::process::id()));
        write_st(&path, &[
            ("data", "F32", vec![2, 3], data),
            ("sfreq", "F64", vec![1], 250.0f64.to_le_bytes().to_vec()),
            ("ch_names", "U8", vec![6], b"Fz\nCz\n".to_vec()),
        ]);
        let rec = Recording::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rec.data.dim(), (3, 2));
        assert_eq!(rec.data[[0, 1]], 4.0);
        assert_eq!(rec.data[[2, 0]], 3.0);
        assert_eq!(rec.sfreq, 250);
        assert_eq!(rec.ch_names, vec!["Fz".to_string(), "Cz".to_string()]);
    }

    #[test]
    fn truncated_file_is_an_error() {
        assert!(parse_header(&[1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn huge_data_offsets_are_an_error() {
        let mut header = Header::new();
        header.insert(
            "data".into(),
            serde_json::json!({
                "dtype": "F32",
                "shape": [1],
                "data_offsets": [u64::MAX - 1, u64::MAX],
            }),
        );
        let bytes = [0u8; 16];
        let err = tensor(&bytes, 8, &header, "data").unwrap_err();
        assert!(err.to_string().contains("data"));
    }
}
