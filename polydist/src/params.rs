use clap::Parser;
use pd_types::{Error, Result};
use serde::{Deserialize, Serialize};

fn default_blocklen() -> usize {
    128
}
fn default_deg() -> usize {
    3
}
fn default_top_comb() -> usize {
    2
}
fn default_zscore_thresh() -> f64 {
    1.96
}
fn default_true() -> bool {
    true
}

/// Analysis arguments.
#[derive(Parser, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[clap(next_help_heading = "Analysis")]
#[serde(deny_unknown_fields)]
pub struct AnalysisParams {
    /// Block size in bits.
    #[clap(long = "block", default_value_t = 128)]
    #[serde(default = "default_blocklen")]
    pub blocklen: usize,

    /// Maximum degree of the evaluated terms.
    #[clap(long = "degree", default_value_t = 3)]
    #[serde(default = "default_deg")]
    pub deg: usize,

    /// Number of top terms per degree fed into the combination search.
    ///
    /// When absent, no combinations are searched.
    #[clap(long = "top")]
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Maximum arity of the combination search; arities 1..=top_comb are
    /// visited.
    #[clap(long = "combine-deg", default_value_t = 2)]
    #[serde(default = "default_top_comb")]
    pub top_comb: usize,

    /// Number of extra terms sampled uniformly from each pooled degree and
    /// injected into the combination pool.
    #[clap(long = "comb-rand", default_value_t = 0)]
    #[serde(default)]
    pub comb_random: usize,

    /// Z-score above which a result is marked as failing.
    #[clap(long = "conf", default_value_t = 1.96)]
    #[serde(default = "default_zscore_thresh")]
    pub zscore_thresh: f64,

    /// Pool top terms from every degree, not only the highest.
    #[clap(long = "alldeg")]
    #[serde(default)]
    pub combine_all_deg: bool,

    /// Disable XOR combinations.
    #[clap(long)]
    #[serde(default)]
    pub no_comb_xor: bool,

    /// Disable AND combinations.
    #[clap(long)]
    #[serde(default)]
    pub no_comb_and: bool,

    /// Seed for the sampling of random pool terms, so runs reproduce.
    #[clap(long, default_value_t = 0)]
    #[serde(default)]
    pub seed: u64,

    /// Evaluate the full degree ladder. Cleared by the host when only
    /// user-supplied polynomials are of interest.
    #[clap(skip = true)]
    #[serde(default = "default_true")]
    pub all_deg_compute: bool,

    /// Whether a reference stream accompanies the data. Set by the host.
    #[clap(skip)]
    #[serde(default)]
    pub do_ref: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            blocklen: 128,
            deg: 3,
            top_k: None,
            top_comb: 2,
            comb_random: 0,
            zscore_thresh: 1.96,
            combine_all_deg: false,
            no_comb_xor: false,
            no_comb_and: false,
            seed: 0,
            all_deg_compute: true,
            do_ref: false,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        if self.blocklen == 0 {
            return Err(Error::Config("block length must be positive".into()));
        }
        if self.deg == 0 || self.deg > self.blocklen {
            return Err(Error::Config(format!(
                "degree must be in 1..={}",
                self.blocklen
            )));
        }
        if self.top_comb == 0 {
            return Err(Error::Config("combination arity must be positive".into()));
        }
        if !(self.zscore_thresh > 0.0) {
            return Err(Error::Config("z-score threshold must be positive".into()));
        }
        Ok(())
    }
}
