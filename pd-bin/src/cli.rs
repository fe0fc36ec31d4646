use std::path::PathBuf;

use clap::Parser;
use polydist::AnalysisParams;

use crate::poly::OutOfRange;

/// Searches a bitstream for algebraic biases: evaluates all AND-terms up to
/// a degree bound over fixed-size blocks, ranks them by z-score against the
/// uniform-bit expectation, and combines the best into XOR/AND
/// distinguishers.
#[derive(Parser)]
#[clap(author, about)]
pub struct Cli {
    /// Files to process. Reads stdin when none are given.
    pub files: Vec<PathBuf>,

    /// Read the candidate stream from stdin.
    #[clap(long, conflicts_with = "files")]
    pub stdin: bool,

    /// Reference file with known-random data, read in lockstep with the data.
    #[clap(long = "ref", value_name = "FILE")]
    pub reffile: Option<PathBuf>,

    /// Size of one test vector, e.g. `1M` or `256Ki`.
    #[clap(long = "tv", default_value = "256Ki")]
    pub tvsize: String,

    /// Maximal number of chunks to process per input.
    #[clap(short, long)]
    pub rounds: Option<u64>,

    /// JSON polynomial to evaluate instead of the degree ladder: a flat
    /// array of variables, or an array of such arrays. Repeatable.
    #[clap(long = "poly")]
    pub polynomials: Vec<String>,

    /// File with one JSON polynomial per line; blank, `#`, and `//` lines
    /// are skipped.
    #[clap(long)]
    pub poly_file: Vec<PathBuf>,

    /// How to resolve polynomial variables outside the block.
    #[clap(long, value_enum, default_value = "fail")]
    pub poly_policy: OutOfRange,

    #[clap(flatten)]
    pub analysis: AnalysisParams,
}
