//! Length-prefixed little-endian binary encoding of the voting model.
//!
//! Layout, in order: bounding-box dimension entries, variance entries, the
//! per-class global feature store, and an optional classifier reference.
//! Every collection is prefixed with a `u32` count; strings and descriptors
//! are prefixed with their element count.

use super::VotingModel;
use crate::error::VotingError;
use crate::global::GlobalFeature;
use crate::stats::DimPair;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Upper bound on any single length prefix; larger values indicate a
/// corrupt or truncated stream rather than real data.
const MAX_LEN: u32 = 16_777_216;

pub fn save<W: Write>(model: &VotingModel, mut w: W) -> Result<(), VotingError> {
    write_u32(&mut w, model.dimensions.len() as u32)?;
    for (&class_id, dims) in &model.dimensions {
        write_u32(&mut w, class_id)?;
        write_f32(&mut w, dims.first)?;
        write_f32(&mut w, dims.second)?;
    }

    write_u32(&mut w, model.variances.len() as u32)?;
    for (&class_id, vars) in &model.variances {
        write_u32(&mut w, class_id)?;
        write_f32(&mut w, vars.first)?;
        write_f32(&mut w, vars.second)?;
    }

    write_u32(&mut w, model.global_features.len() as u32)?;
    for (&class_id, features) in &model.global_features {
        write_u32(&mut w, class_id)?;
        write_u32(&mut w, features.len() as u32)?;
        for feature in features {
            for &v in &feature.reference_frame {
                write_f32(&mut w, v)?;
            }
            write_u32(&mut w, feature.descriptor.len() as u32)?;
            for &v in &feature.descriptor {
                write_f32(&mut w, v)?;
            }
            write_f32(&mut w, feature.radius)?;
        }
    }

    match &model.svm_path {
        Some(path) => {
            let bytes = path.to_string_lossy();
            let bytes = bytes.as_bytes();
            write_u32(&mut w, 1)?;
            write_u32(&mut w, bytes.len() as u32)?;
            w.write_all(bytes)?;
        }
        None => write_u32(&mut w, 0)?,
    }
    Ok(())
}

pub fn load<R: Read>(mut r: R, require_global: bool) -> Result<VotingModel, VotingError> {
    let mut model = VotingModel::default();

    let dim_count = read_len(&mut r, "bounding box dimensions")?;
    for _ in 0..dim_count {
        let class_id = read_u32(&mut r)?;
        let first = read_f32(&mut r)?;
        let second = read_f32(&mut r)?;
        model.dimensions.insert(class_id, DimPair { first, second });
    }

    let var_count = read_len(&mut r, "bounding box variances")?;
    for _ in 0..var_count {
        let class_id = read_u32(&mut r)?;
        let first = read_f32(&mut r)?;
        let second = read_f32(&mut r)?;
        model.variances.insert(class_id, DimPair { first, second });
    }

    let class_count = read_len(&mut r, "global feature classes")?;
    for _ in 0..class_count {
        let class_id = read_u32(&mut r)?;
        let feat_count = read_len(&mut r, "global features")?;
        let mut features = Vec::with_capacity(feat_count as usize);
        for _ in 0..feat_count {
            let mut reference_frame = [0.0f32; 9];
            for v in &mut reference_frame {
                *v = read_f32(&mut r)?;
            }
            let desc_len = read_len(&mut r, "descriptor")?;
            let mut descriptor = Vec::with_capacity(desc_len as usize);
            for _ in 0..desc_len {
                descriptor.push(read_f32(&mut r)?);
            }
            let radius = read_f32(&mut r)?;
            features.push(GlobalFeature {
                class_id,
                descriptor,
                reference_frame,
                radius,
            });
        }
        model.global_features.insert(class_id, features);
    }

    if read_u32(&mut r)? != 0 {
        let len = read_len(&mut r, "classifier path")?;
        let mut bytes = vec![0u8; len as usize];
        r.read_exact(&mut bytes)?;
        let path = String::from_utf8(bytes)
            .map_err(|_| VotingError::Format("classifier path is not valid utf-8".into()))?;
        model.svm_path = Some(PathBuf::from(path));
    }

    if require_global && !model.has_global_features() {
        return Err(VotingError::GlobalFeaturesMissing);
    }
    Ok(model)
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_f32<W: Write>(w: &mut W, v: f32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> std::io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_len<R: Read>(r: &mut R, what: &str) -> Result<u32, VotingError> {
    let len = read_u32(r)?;
    if len > MAX_LEN {
        return Err(VotingError::Format(format!(
            "implausible {what} count: {len}"
        )));
    }
    Ok(len)
}
