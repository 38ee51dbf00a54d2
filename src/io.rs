//! Safetensors recording reader.
//!
//! Expected layout:
//!
//! | key | dtype | shape | content |
//! |---|---|---|---|
//! | `data` | F32 | `[C, T]` | samples |
//! | `sfreq` | F32 | `[1]` | sampling rate in Hz |
//! | `ch_names` | U8 | `[n]` | newline-separated labels, optional |
//!
//! `__metadata__` may carry `unit` (`V`, `mV` or `uV`, default `uV`),
//! `meas_date`, `subject_id` and `age_years`.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use serde_json::Value;

use crate::recording::{Recording, SubjectInfo};

struct Header {
    tensors: HashMap<String, Value>,
    metadata: HashMap<String, String>,
    data_start: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    ensure!(bytes.len() >= 8, "safetensors file too small");
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    let end = 8usize.checked_add(n).filter(|&e| e <= bytes.len());
    let Some(end) = end else { bail!("header length {n} exceeds file size") };

    let mut tensors: HashMap<String, Value> =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    let metadata = match tensors.remove("__metadata__") {
        Some(m) => serde_json::from_value(m).context("__metadata__ is not a string map")?,
        None => HashMap::new(),
    };
    Ok(Header { tensors, metadata, data_start: end })
}

fn tensor_bytes<'a>(bytes: &'a [u8], header: &Header, key: &str) -> Result<&'a [u8]> {
    let entry = header.tensors.get(key).with_context(|| format!("missing '{key}' tensor"))?;
    let offsets = entry["data_offsets"]
        .as_array()
        .filter(|o| o.len() == 2)
        .with_context(|| format!("'{key}' has no data_offsets"))?;
    let offset = |i: usize| -> Result<usize> {
        let v = offsets[i].as_u64().with_context(|| format!("bad offset in '{key}'"))?;
        Ok(header.data_start + v as usize)
    };
    let (s, e) = (offset(0)?, offset(1)?);
    ensure!(s <= e && e <= bytes.len(), "'{key}' offsets {s}..{e} out of bounds");
    Ok(&bytes[s..e])
}

fn f32_tensor(bytes: &[u8], header: &Header, key: &str) -> Result<(Vec<f32>, Vec<usize>)> {
    let entry = header.tensors.get(key).with_context(|| format!("missing '{key}' tensor"))?;
    let dtype = entry["dtype"].as_str().unwrap_or_default();
    ensure!(dtype == "F32", "'{key}' has dtype {dtype:?}, expected F32");
    let shape = entry["shape"]
        .as_array()
        .with_context(|| format!("'{key}' has no shape"))?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect::<Result<Vec<_>>>()?;
    let raw = tensor_bytes(bytes, header, key)?;
    let values: Vec<f32> = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    ensure!(
        values.len() == shape.iter().product::<usize>(),
        "'{key}' holds {} values for shape {shape:?}",
        values.len()
    );
    Ok((values, shape))
}

/// Multiplier that converts the file's unit to microvolts.
fn unit_scale(unit: Option<&str>) -> Result<f32> {
    Ok(match unit.map(str::trim) {
        None | Some("uV") | Some("µV") => 1.0,
        Some("mV") => 1e3,
        Some("V") => 1e6,
        Some(other) => bail!("unsupported sample unit {other:?}"),
    })
}

/// Load a recording from a safetensors file.
///
/// Missing channel names default to `ch0`, `ch1`, ...
pub fn load_recording(path: &Path) -> Result<Recording> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let header = parse_header(&bytes)?;

    let (samples, shape) = f32_tensor(&bytes, &header, "data")?;
    ensure!(shape.len() == 2, "'data' must be 2-D, got shape {shape:?}");
    let scale = unit_scale(header.metadata.get("unit").map(String::as_str))?;
    let data = Array2::from_shape_vec((shape[0], shape[1]), samples)?.mapv(|v| v * scale);

    let (sfreq, _) = f32_tensor(&bytes, &header, "sfreq")?;
    let sfreq = *sfreq.first().context("'sfreq' is empty")?;

    let labels: Vec<String> = if header.tensors.contains_key("ch_names") {
        let raw = tensor_bytes(&bytes, &header, "ch_names")?;
        std::str::from_utf8(raw)
            .context("'ch_names' is not UTF-8")?
            .split('\n')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    } else {
        (0..data.nrows()).map(|i| format!("ch{i}")).collect()
    };

    let mut recording = Recording::new(data, labels, sfreq)
        .with_context(|| format!("invalid recording in {}", path.display()))?;
    if let Some(date) = header.metadata.get("meas_date") {
        recording = recording.with_meas_date(date.clone());
    }
    let id = header.metadata.get("subject_id").cloned();
    let age_years = header.metadata.get("age_years").and_then(|a| a.parse().ok());
    if id.is_some() || age_years.is_some() {
        recording = recording.with_subject(SubjectInfo { id, age_years });
    }
    tracing::info!(
        path = %path.display(),
        n_channels = recording.n_channels(),
        n_times = recording.n_times(),
        sfreq = recording.sfreq(),
        "recording loaded"
    );
    Ok(recording)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(
        name: &str,
        data: &[f32],
        shape: [usize; 2],
        sfreq: f32,
        names: &str,
        metadata: &[(&str, &str)],
    ) -> std::path::PathBuf {
        let data_bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        let sfreq_bytes = sfreq.to_le_bytes();
        let a = data_bytes.len();
        let b = a + 4;
        let c = b + names.len();
        let meta: HashMap<&str, &str> = metadata.iter().copied().collect();
        let header = serde_json::json!({
            "__metadata__": meta,
            "data": {"dtype": "F32", "shape": shape, "data_offsets": [0, a]},
            "sfreq": {"dtype": "F32", "shape": [1], "data_offsets": [a, b]},
            "ch_names": {"dtype": "U8", "shape": [names.len()], "data_offsets": [b, c]},
        });
        let header = serde_json::to_vec(&header).unwrap();

        let path = std::env::temp_dir().join(format!("epochrank-{}-{name}.safetensors", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&(header.len() as u64).to_le_bytes()).unwrap();
        f.write_all(&header).unwrap();
        f.write_all(&data_bytes).unwrap();
        f.write_all(&sfreq_bytes).unwrap();
        f.write_all(names.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_samples_labels_and_metadata() {
        let path = write_file(
            "meta",
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [2, 3],
            256.0,
            "Fp1\nECG\n",
            &[("unit", "mV"), ("meas_date", "2024-03-01T10:00:00"), ("age_years", "41")],
        );
        let rec = load_recording(&path).unwrap();
        assert_eq!(rec.labels(), &["Fp1".to_string(), "ECG".to_string()]);
        assert_eq!(rec.sfreq(), 256.0);
        assert_eq!(rec.data()[[1, 2]], 6000.0);
        assert_eq!(rec.meas_date.as_deref(), Some("2024-03-01T10:00:00"));
        assert_eq!(rec.subject.as_ref().and_then(|s| s.age_years), Some(41.0));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn label_count_mismatch_is_reported() {
        let path = write_file("mismatch", &[0.0; 4], [2, 2], 128.0, "Cz\n", &[]);
        let err = load_recording(&path).unwrap_err();
        assert!(format!("{err:#}").contains("1 labels for 2 channels"), "{err:#}");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn truncated_file_rejected() {
        assert!(parse_header(&[1, 2, 3]).is_err());
        let mut bytes = 1000u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn unknown_unit_rejected() {
        assert!(unit_scale(Some("furlong")).is_err());
        assert_eq!(unit_scale(None).unwrap(), 1.0);
    }
}
