//! Lookup of coding algorithms by identity or name.

use crate::audio::pcm;
use crate::info::{CodecInfo, Direction};
use crate::traits::{Algorithm, Decoder, Encoder};
use crate::video::raw;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use transcode_core::{CodecId, Error, Result};

type Factory = Arc<dyn Fn() -> Algorithm + Send + Sync>;

struct RegisteredCodec {
    info: &'static CodecInfo,
    factory: Factory,
}

/// Table of available decoders and encoders.
///
/// Later registrations take precedence over earlier ones with the same
/// identity or name, so applications can override built-ins.
pub struct CodecRegistry {
    codecs: RwLock<Vec<RegisteredCodec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry holding the built-in algorithms.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.insert(
            &raw::DECODER_INFO,
            Arc::new(|| Algorithm::Decoder(Box::new(raw::RawVideoDecoder::new()))),
        );
        registry.insert(
            &raw::ENCODER_INFO,
            Arc::new(|| Algorithm::Encoder(Box::new(raw::RawVideoEncoder::new()))),
        );
        for wire in pcm::PcmWire::ALL {
            let wire = *wire;
            registry.insert(
                wire.decoder_info(),
                Arc::new(move || Algorithm::Decoder(Box::new(pcm::PcmDecoder::new(wire)))),
            );
            registry.insert(
                wire.encoder_info(),
                Arc::new(move || Algorithm::Encoder(Box::new(pcm::PcmEncoder::new(wire)))),
            );
        }
        debug!(codecs = registry.len(), "built-in codecs registered");
        registry
    }

    /// The process-wide registry used by [`Coder::decoder`](crate::Coder::decoder)
    /// and friends.
    pub fn global() -> &'static CodecRegistry {
        static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CodecRegistry::with_builtins)
    }

    fn insert(&self, info: &'static CodecInfo, factory: Factory) {
        self.codecs.write().insert(0, RegisteredCodec { info, factory });
    }

    /// Register a decoder factory.
    pub fn register_decoder<F>(&self, info: &'static CodecInfo, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        if info.direction != Direction::Decode {
            return Err(Error::invalid_param(format!("'{}' is not a decoder", info.name)));
        }
        self.insert(info, Arc::new(move || Algorithm::Decoder(factory())));
        info!(codec = info.name, id = ?info.id, "decoder registered");
        Ok(())
    }

    /// Register an encoder factory.
    pub fn register_encoder<F>(&self, info: &'static CodecInfo, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Encoder> + Send + Sync + 'static,
    {
        if info.direction != Direction::Encode {
            return Err(Error::invalid_param(format!("'{}' is not an encoder", info.name)));
        }
        self.insert(info, Arc::new(move || Algorithm::Encoder(factory())));
        info!(codec = info.name, id = ?info.id, "encoder registered");
        Ok(())
    }

    /// Find an algorithm by identity.
    pub fn find(&self, id: CodecId, direction: Direction) -> Option<&'static CodecInfo> {
        self.codecs
            .read()
            .iter()
            .find(|c| c.info.id == id && c.info.direction == direction)
            .map(|c| c.info)
    }

    /// Find an algorithm by name.
    pub fn find_by_name(&self, name: &str, direction: Direction) -> Option<&'static CodecInfo> {
        self.codecs
            .read()
            .iter()
            .find(|c| c.info.name == name && c.info.direction == direction)
            .map(|c| c.info)
    }

    /// Instantiate an algorithm by identity.
    pub fn create(&self, id: CodecId, direction: Direction) -> Result<Algorithm> {
        let factory = self
            .codecs
            .read()
            .iter()
            .find(|c| c.info.id == id && c.info.direction == direction)
            .map(|c| Arc::clone(&c.factory))
            .ok_or_else(|| Error::unsupported(format!("no {direction} for {}", id.name())))?;
        Ok(factory())
    }

    /// Instantiate an algorithm by name.
    pub fn create_by_name(&self, name: &str, direction: Direction) -> Result<Algorithm> {
        let factory = self
            .codecs
            .read()
            .iter()
            .find(|c| c.info.name == name && c.info.direction == direction)
            .map(|c| Arc::clone(&c.factory))
            .ok_or_else(|| Error::unsupported(format!("no {direction} named '{name}'")))?;
        Ok(factory())
    }

    /// Every registered algorithm, most recently registered first.
    pub fn list(&self) -> Vec<&'static CodecInfo> {
        self.codecs.read().iter().map(|c| c.info).collect()
    }

    /// Number of registered algorithms.
    pub fn len(&self) -> usize {
        self.codecs.read().len()
    }

    /// Check whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.read().is_empty()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.list().iter().map(|i| i.name)).finish()
    }
}
