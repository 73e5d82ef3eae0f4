//! On-disk format of a trained model.
//!
//! An artifact is a magic tag, the bincode encoded format version, the bincode encoded
//! [`ArtifactHeader`] and finally the safetensors encoding of every network variable. The header
//! carries everything needed to rebuild the networks before the weights are poured in.

use bincode::{
    Decode, Encode,
    config::Config,
    error::{DecodeError, EncodeError},
};
use candle_core::Device;
use candle_nn::VarMap;
use hrl_agents::{a2c::A2CParams, ppo::PPOParams};
use std::{
    fmt,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const FORMAT_VERSION: u32 = 1;
pub const ARTIFACT_EXTENSION: &str = "hrl";
const MAGIC: &[u8; 4] = b"HRL\0";
const DECODE_LIMIT: usize = 1 << 30;
/// Upper bound on any layer width a header may ask for.
const MAX_LAYER_SIZE: usize = 1 << 16;

fn bincode_config() -> impl Config {
    bincode::config::standard().with_limit::<DECODE_LIMIT>()
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(
        "model not found at {}: train one with `train_lunar_lander` or copy an existing artifact to this path",
        .path.display()
    )]
    Missing { path: PathBuf },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode model artifact: {0}")]
    Encode(String),
    #[error("corrupt or foreign model artifact: {0}")]
    Decode(String),
    #[error("artifact format version {found} is not supported, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("artifact has no weights for `{0}`")]
    MissingTensor(String),
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
    #[error("artifact does not describe a buildable network: {0}")]
    Network(anyhow::Error),
}

impl From<EncodeError> for ArtifactError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<DecodeError> for ArtifactError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    Ppo,
    A2c,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ppo => write!(f, "PPO"),
            Self::A2c => write!(f, "A2C"),
        }
    }
}

/// The full hyperparameter set. The variant doubles as the algorithm tag.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Hyperparameters {
    Ppo(PPOParams),
    A2c(A2CParams),
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Architecture {
    /// Separate actor and critic MLPs with the same hidden layers.
    MlpPolicy { hidden_layers: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ArtifactHeader {
    pub architecture: Architecture,
    pub observation_size: usize,
    pub action_size: usize,
    pub hyperparameters: Hyperparameters,
}

impl ArtifactHeader {
    /// Rejects layer widths no network could be built with.
    fn validate(&self) -> Result<(), ArtifactError> {
        let Architecture::MlpPolicy { hidden_layers } = &self.architecture;
        let sizes = [
            ("observation size", self.observation_size),
            ("action size", self.action_size),
        ];
        let hidden = hidden_layers.iter().map(|&size| ("hidden layer size", size));
        for (what, size) in sizes.into_iter().chain(hidden) {
            if size == 0 || size > MAX_LAYER_SIZE {
                return Err(ArtifactError::Decode(format!(
                    "{what} {size} is outside 1..={MAX_LAYER_SIZE}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub header: ArtifactHeader,
    /// safetensors encoded network variables
    pub weights: Vec<u8>,
}

fn lock_error() -> ArtifactError {
    ArtifactError::Tensor(candle_core::Error::Msg(
        "variable store lock is poisoned".into(),
    ))
}

/// Encodes every variable of `varmap` with safetensors. Tensors are moved to the CPU first.
pub fn serialize_weights(varmap: &VarMap) -> Result<Vec<u8>, ArtifactError> {
    let data = varmap.data().lock().map_err(|_| lock_error())?;
    let tensors = data
        .iter()
        .map(|(name, var)| Ok((name.clone(), var.as_tensor().to_device(&Device::Cpu)?)))
        .collect::<candle_core::Result<Vec<_>>>()?;
    safetensors::serialize(tensors, None).map_err(|err| ArtifactError::Encode(err.to_string()))
}

/// Overwrites every variable of `varmap` with its stored value, loaded onto `device`.
pub fn load_weights(varmap: &VarMap, weights: &[u8], device: &Device) -> Result<(), ArtifactError> {
    let tensors = candle_core::safetensors::load_buffer(weights, device)
        .map_err(|err| ArtifactError::Decode(err.to_string()))?;
    let data = varmap.data().lock().map_err(|_| lock_error())?;
    for (name, var) in data.iter() {
        let tensor = tensors
            .get(name)
            .ok_or_else(|| ArtifactError::MissingTensor(name.clone()))?;
        var.set(tensor)?;
    }
    Ok(())
}

/// Writes the artifact next to its destination and renames it into place, creating missing
/// parent directories.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<(), ArtifactError> {
    let config = bincode_config();
    let mut bytes = MAGIC.to_vec();
    bincode::encode_into_std_write(FORMAT_VERSION, &mut bytes, config)?;
    bincode::encode_into_std_write(&artifact.header, &mut bytes, config)?;
    bincode::encode_into_std_write(&artifact.weights, &mut bytes, config)?;

    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| ArtifactError::Io(err.error))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Artifact, ArtifactError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    let Some(rest) = bytes.strip_prefix(MAGIC) else {
        return Err(ArtifactError::Decode(format!(
            "{} is not a model artifact",
            path.display()
        )));
    };
    let config = bincode_config();
    let (found, read): (u32, usize) = bincode::decode_from_slice(rest, config)?;
    if found != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            found,
            expected: FORMAT_VERSION,
        });
    }
    let rest = &rest[read..];
    let (header, read): (ArtifactHeader, usize) = bincode::decode_from_slice(rest, config)?;
    header.validate()?;
    let (weights, _): (Vec<u8>, usize) = bincode::decode_from_slice(&rest[read..], config)?;
    Ok(Artifact { header, weights })
}
