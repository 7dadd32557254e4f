//! Pipeline artifact serialization
//!
//! An artifact is a bincode-encoded envelope holding magic bytes, a format
//! version, an FNV-1a checksum and the bincode payload of the pipeline.

use crate::error::{RiskError, Result};
use crate::training::RiskPipeline;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// On-disk envelope around the serialized pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedArtifact {
    magic: [u8; 4],
    format_version: u32,
    checksum: u64,
    payload: Vec<u8>,
}

impl SerializedArtifact {
    const MAGIC: [u8; 4] = *b"LRSK";
    const VERSION: u32 = 1;

    fn new(payload: Vec<u8>) -> Self {
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            checksum: fnv1a(&payload),
            payload,
        }
    }

    fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(RiskError::SerializationError(
                "not a lifestyle-risk model artifact".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(RiskError::SerializationError(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if fnv1a(&self.payload) != self.checksum {
            return Err(RiskError::SerializationError(
                "checksum verification failed - file may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

/// FNV-1a 64-bit hash
fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Encode a fitted pipeline as artifact bytes
pub fn pipeline_to_bytes(pipeline: &RiskPipeline) -> Result<Vec<u8>> {
    if !pipeline.is_fitted() {
        return Err(RiskError::ModelNotFitted);
    }
    let payload = bincode::serialize(pipeline)?;
    Ok(bincode::serialize(&SerializedArtifact::new(payload))?)
}

/// Decode artifact bytes, checking magic, version and checksum
pub fn pipeline_from_bytes(bytes: &[u8]) -> Result<RiskPipeline> {
    if bytes.len() < 4 || bytes[..4] != SerializedArtifact::MAGIC {
        return Err(RiskError::SerializationError(
            "not a lifestyle-risk model artifact".to_string(),
        ));
    }
    let artifact: SerializedArtifact = bincode::deserialize(bytes)?;
    artifact.verify()?;
    Ok(bincode::deserialize(&artifact.payload)?)
}

/// Write the artifact, creating parent directories
pub fn save_pipeline(pipeline: &RiskPipeline, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = pipeline_to_bytes(pipeline)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved model artifact");
    Ok(())
}

/// Read an artifact; a missing file is [`RiskError::ModelNotFoundError`]
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<RiskPipeline> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(RiskError::ModelNotFoundError(path.to_path_buf()));
    }
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    let pipeline = pipeline_from_bytes(&bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Loaded model artifact");
    Ok(pipeline)
}
