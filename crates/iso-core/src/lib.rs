#![deny(missing_docs)]
#![doc = "Core traits and data types for the isoform quantification engine."]

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod rng;

pub use errors::{ErrorInfo, QuantError};
pub use rng::{derive_substream_seed, RngHandle};

/// Identifier for a transcript within a [`TranscriptSet`].
///
/// Transcript identifiers are sequential and double as column indices
/// into the shared quantification matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TranscriptId(u32);

impl TranscriptId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the identifier as a matrix column index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a transcription group (a cluster of transcripts
/// sharing a transcription start site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TgroupId(u32);

impl TgroupId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the identifier as a group index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A transcript narrowed to what the sampling core consumes: its
/// sequential identifier and the transcription group it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Sequential identifier, unique within the containing set.
    pub id: TranscriptId,
    /// Transcription group this transcript belongs to.
    pub tgroup: TgroupId,
}

/// An immutable catalog of transcripts and their group assignments.
///
/// Annotation parsing lives outside the core; callers construct the set
/// from per-transcript group indices in transcript-id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSet {
    transcripts: Vec<Transcript>,
    num_tgroups: usize,
}

impl TranscriptSet {
    /// Builds a catalog from per-transcript group indices.
    ///
    /// `tgroups[i]` is the group of the transcript with id `i`. Group
    /// indices must be dense: every value in `0..max+1` is a valid group.
    pub fn from_tgroups(tgroups: &[u32]) -> Result<Self, QuantError> {
        if tgroups.is_empty() {
            return Err(QuantError::Config(ErrorInfo::new(
                "empty-catalog",
                "a transcript catalog requires at least one transcript",
            )));
        }
        let num_tgroups = tgroups.iter().copied().max().unwrap_or(0) as usize + 1;
        let transcripts = tgroups
            .iter()
            .enumerate()
            .map(|(id, &tgroup)| Transcript {
                id: TranscriptId::from_raw(id as u32),
                tgroup: TgroupId::from_raw(tgroup),
            })
            .collect();
        Ok(Self {
            transcripts,
            num_tgroups,
        })
    }

    /// Number of transcripts held in the set.
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    /// Returns true when the set holds no transcripts.
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    /// Number of distinct transcription groups.
    pub fn num_tgroups(&self) -> usize {
        self.num_tgroups
    }

    /// Iterates over the transcripts in id order.
    pub fn transcripts(&self) -> impl ExactSizeIterator<Item = &Transcript> {
        self.transcripts.iter()
    }

    /// Returns the transcription group of the given transcript.
    pub fn tgroup_of(&self, id: TranscriptId) -> Option<TgroupId> {
        self.transcripts.get(id.index()).map(|t| t.tgroup)
    }
}

/// Hyperparameters pushed into every per-sample sampler before each
/// `transition` call.
///
/// The vectors are indexed by transcription group and resized by the
/// engine to the catalog's group count before the first round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// Per-sample expression scale factor.
    pub scale: f64,
    /// Degrees of freedom shared by all transcription groups.
    pub tgroup_nu: f64,
    /// Per-group location parameter.
    pub tgroup_mu: Vec<f64>,
    /// Per-group scale parameter.
    pub tgroup_sigma: Vec<f64>,
}

impl HyperParams {
    /// Creates hyperparameters sized for `num_tgroups` groups.
    pub fn sized(num_tgroups: usize) -> Self {
        Self {
            scale: 1.0,
            tgroup_nu: 0.0,
            tgroup_mu: vec![0.0; num_tgroups],
            tgroup_sigma: vec![0.0; num_tgroups],
        }
    }

    /// Resizes the per-group vectors to hold `num_tgroups` entries.
    pub fn ensure_tgroups(&mut self, num_tgroups: usize) {
        self.tgroup_mu.resize(num_tgroups, 0.0);
        self.tgroup_sigma.resize(num_tgroups, 0.0);
    }
}

/// Describes one registered sequencing sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSpec {
    /// Experimental condition this sample was drawn from.
    pub condition: String,
    /// Path to the sample's alignment file.
    pub path: PathBuf,
}

/// Capability exposed by one per-sample quantification sampler.
///
/// An implementation owns all per-sample state, including its fragment
/// model, and advances one Gibbs/slice step per `transition` call. The
/// engine guarantees that `transition` is never invoked concurrently
/// with hyperparameter updates or with another `transition` on the same
/// instance.
pub trait QuantSampler: Send {
    /// Advances the sampler by one step.
    fn transition(&mut self) -> Result<(), QuantError>;

    /// Current state vector, one value per transcript.
    fn state(&self) -> &[f64];

    /// Mutable access to the hyperparameters read by the next transition.
    fn hyperparams_mut(&mut self) -> &mut HyperParams;
}

/// Constructs per-sample samplers during engine setup.
///
/// `load` is a blocking call (fragment model estimation reads the whole
/// alignment file); the engine fans construction out across its worker
/// pool, so implementations must be shareable across threads.
pub trait SampleLoader: Send + Sync {
    /// Builds the sampler for sample `index`, seeded deterministically.
    fn load(
        &self,
        index: usize,
        seed: u64,
        spec: &SampleSpec,
    ) -> Result<Box<dyn QuantSampler>, QuantError>;
}
