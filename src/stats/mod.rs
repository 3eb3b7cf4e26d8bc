// mod.rs - Column statistics module

pub mod conservation;
pub mod consistency;
pub mod gaps;
pub mod series;

pub use conservation::{identity_matrix, ConservationProfile, GapCutoff, DEFAULT_GAP_CUTOFF};
pub use consistency::ConsistencyProfile;
pub use gaps::{GapBin, GapProfile};
pub use series::{percentile_of, ScoredSeries, SeriesKind};

use crate::data::{AlignmentMatrix, SubstitutionMatrix};
use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Half-window sizes requested for each series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSizes {
    pub gaps: usize,
    pub similarity: usize,
    pub consistency: usize,
}

impl WindowSizes {
    /// Same half window for every series
    pub fn uniform(half_window: usize) -> Self {
        Self {
            gaps: half_window,
            similarity: half_window,
            consistency: half_window,
        }
    }
}

/// Profiles of one alignment, computed on first use.
///
/// The holder does not own the alignment; callers pass the matrix the
/// profiles belong to. [`Statistics::derive_for`] decides what a trimmed
/// derivative may keep.
#[derive(Debug, Clone)]
pub struct Statistics {
    gaps: Option<GapProfile>,
    conservation: Option<ConservationProfile>,
    consistency: Option<ConsistencyProfile>,
    matrix: Option<Arc<SubstitutionMatrix>>,
    windows: WindowSizes,
    gap_cutoff: f32,
}

impl Statistics {
    pub fn new(matrix: Option<Arc<SubstitutionMatrix>>, windows: WindowSizes) -> Self {
        Self {
            gaps: None,
            conservation: None,
            consistency: None,
            matrix,
            windows,
            gap_cutoff: DEFAULT_GAP_CUTOFF,
        }
    }

    /// Gap fraction above which conservation is not evaluated
    pub fn with_gap_cutoff(mut self, fraction: f32) -> Self {
        self.gap_cutoff = fraction;
        self
    }

    pub fn windows(&self) -> WindowSizes {
        self.windows
    }

    pub fn substitution_matrix(&self) -> Option<&Arc<SubstitutionMatrix>> {
        self.matrix.as_ref()
    }

    pub fn set_substitution_matrix(&mut self, matrix: Arc<SubstitutionMatrix>) {
        self.matrix = Some(matrix);
        self.conservation = None;
    }

    pub fn gaps(&mut self, alignment: &AlignmentMatrix) -> Result<&GapProfile> {
        let profile = match self.gaps.take() {
            Some(profile) => profile,
            None => {
                let mut profile = GapProfile::compute(alignment);
                profile.apply_window(self.windows.gaps)?;
                profile
            }
        };
        Ok(self.gaps.insert(profile))
    }

    pub fn conservation(&mut self, alignment: &AlignmentMatrix) -> Result<&ConservationProfile> {
        let profile = match self.conservation.take() {
            Some(profile) => profile,
            None => {
                self.gaps(alignment)?;
                let cutoff = self.gaps.as_ref().map(|gaps| GapCutoff {
                    gaps,
                    fraction: self.gap_cutoff,
                });
                let mut profile =
                    ConservationProfile::compute(alignment, self.matrix.as_deref(), cutoff)?;
                profile.apply_window(self.windows.similarity)?;
                profile
            }
        };
        Ok(self.conservation.insert(profile))
    }

    pub fn consistency(&self) -> Option<&ConsistencyProfile> {
        self.consistency.as_ref()
    }

    /// Attach scores from a compareset, smoothing them with the configured window
    pub fn set_consistency(&mut self, mut profile: ConsistencyProfile) -> Result<()> {
        profile.apply_window(self.windows.consistency)?;
        self.consistency = Some(profile);
        Ok(())
    }

    /// Already computed profiles, without triggering any computation
    pub fn computed_gaps(&self) -> Option<&GapProfile> {
        self.gaps.as_ref()
    }

    pub fn computed_conservation(&self) -> Option<&ConservationProfile> {
        self.conservation.as_ref()
    }

    /// Statistics for `child`, a trimmed copy of `parent`.
    ///
    /// Raw gap and conservation buffers carry over only when both keep the
    /// same sequences; windows and histograms are rebuilt for the child's
    /// columns on next use. Consistency scores depend on the compareset
    /// alone and always carry over.
    pub fn derive_for(&self, parent: &AlignmentMatrix, child: &AlignmentMatrix) -> Statistics {
        let mut derived = Statistics {
            gaps: None,
            conservation: None,
            consistency: self.consistency.clone(),
            matrix: self.matrix.clone(),
            windows: self.windows,
            gap_cutoff: self.gap_cutoff,
        };
        if !parent.same_sequences(child) {
            debug!("sequence set changed, profiles will be recomputed");
            return derived;
        }
        let columns = child.kept_columns().kept_indices();
        derived.gaps = self.gaps.as_ref().and_then(|gaps| {
            let mut restricted = gaps.restricted(columns.clone());
            match restricted.apply_window(self.windows.gaps) {
                Ok(()) => Some(restricted),
                Err(e) => {
                    debug!("gap profile not carried over: {}", e);
                    None
                }
            }
        });
        derived.conservation = self.conservation.as_ref().and_then(|profile| {
            let mut restricted = profile.restricted(columns.clone());
            match restricted.apply_window(self.windows.similarity) {
                Ok(()) => Some(restricted),
                Err(e) => {
                    debug!("conservation profile not carried over: {}", e);
                    None
                }
            }
        });
        derived
    }
}
