//! Payload encoding for the Redis store.
//!
//! Every stored payload starts with one tag byte naming the algorithm,
//! followed by the (possibly compressed) bytes. LZ4 blocks carry their
//! uncompressed size so they decode without external bookkeeping.

use outcache_config::RedisConfig;
use outcache_core::{OutcacheError, OutcacheResult};

/// Supported compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// No compression
    None,
    /// LZ4 block compression
    Lz4,
}

impl CompressionAlgorithm {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lz4 => 1,
        }
    }

    fn from_tag(tag: u8) -> OutcacheResult<Self> {
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Lz4),
            other => Err(OutcacheError::Compression {
                algorithm: "unknown".into(),
                reason: format!("unknown payload tag {}", other),
            }),
        }
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Encodes and decodes stored payloads.
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    enabled: bool,
    level: i32,
    min_size: usize,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 4,
            min_size: 256,
        }
    }
}

impl PayloadCodec {
    #[must_use]
    pub fn new(enabled: bool, level: i32, min_size: usize) -> Self {
        Self {
            enabled,
            level,
            min_size,
        }
    }

    #[must_use]
    pub fn from_config(config: &RedisConfig) -> Self {
        Self::new(
            config.compression_enabled,
            config.compression_level,
            config.compression_min_size,
        )
    }

    /// Codec that never compresses.
    #[must_use]
    pub fn uncompressed() -> Self {
        Self::new(false, 0, 0)
    }

    /// Encodes a payload, compressing it when that makes it smaller.
    ///
    /// Falls back to the raw form if compression fails or does not pay off.
    #[must_use]
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        if self.enabled && data.len() >= self.min_size && !data.is_empty() {
            match self.compress(data) {
                Ok(compressed) if compressed.len() < data.len() => {
                    return tagged(CompressionAlgorithm::Lz4, &compressed);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Compression failed, storing raw payload: {}", e),
            }
        }
        tagged(CompressionAlgorithm::None, data)
    }

    /// Decodes a payload produced by [`encode`](Self::encode).
    pub fn decode(&self, encoded: &[u8]) -> OutcacheResult<Vec<u8>> {
        let (tag, body) = encoded.split_first().ok_or_else(|| OutcacheError::Compression {
            algorithm: "unknown".into(),
            reason: "empty payload".into(),
        })?;

        match CompressionAlgorithm::from_tag(*tag)? {
            CompressionAlgorithm::None => Ok(body.to_vec()),
            CompressionAlgorithm::Lz4 => {
                lz4::block::decompress(body, None).map_err(|e| OutcacheError::Compression {
                    algorithm: "LZ4".into(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn compress(&self, data: &[u8]) -> OutcacheResult<Vec<u8>> {
        lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        )
        .map_err(|e| OutcacheError::Compression {
            algorithm: "LZ4".into(),
            reason: e.to_string(),
        })
    }
}

fn tagged(algorithm: CompressionAlgorithm, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(algorithm.tag());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressible() -> Vec<u8> {
        br#"{"id":1,"name":"widget","tags":["a","b","c"]}"#.repeat(64)
    }

    #[test]
    fn test_large_payload_is_compressed() {
        let codec = PayloadCodec::default();
        let data = compressible();
        let encoded = codec.encode(&data);
        assert_eq!(encoded[0], 1);
        assert!(encoded.len() < data.len());
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_small_payload_stays_raw() {
        let codec = PayloadCodec::default();
        let encoded = codec.encode(b"tiny");
        assert_eq!(encoded, b"\0tiny".to_vec());
        assert_eq!(codec.decode(&encoded).unwrap(), b"tiny".to_vec());
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let codec = PayloadCodec::new(true, 4, 0);
        let encoded = codec.encode(b"");
        assert_eq!(encoded, vec![0]);
        assert!(codec.decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_disabled_codec_never_compresses() {
        let codec = PayloadCodec::uncompressed();
        let data = compressible();
        let encoded = codec.encode(&data);
        assert_eq!(encoded[0], 0);
        assert_eq!(&encoded[1..], data.as_slice());
    }

    #[test]
    fn test_decoding_other_codec_output() {
        let encoded = PayloadCodec::default().encode(&compressible());
        assert_eq!(
            PayloadCodec::uncompressed().decode(&encoded).unwrap(),
            compressible()
        );
    }

    #[test]
    fn test_corrupt_payloads_fail() {
        let codec = PayloadCodec::default();
        assert!(matches!(
            codec.decode(&[]),
            Err(OutcacheError::Compression { .. })
        ));
        assert!(codec.decode(&[9, 1, 2]).is_err());
        assert!(codec.decode(&[1, 5, 0]).is_err());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(CompressionAlgorithm::Lz4.to_string(), "lz4");
        assert_eq!(CompressionAlgorithm::None.name(), "none");
    }
}
