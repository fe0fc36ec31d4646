//! Boolean-polynomial randomness distinguisher.
//!
//! A candidate bitstream is cut into blocks of `blocklen` bits. Every
//! monomial (AND of block bits) up to a degree bound is evaluated over all
//! blocks of a chunk and its Hamming weight compared against the uniform-bit
//! expectation by z-score. The most deviant monomials are then combined by
//! XOR and AND into candidate distinguisher polynomials whose deviations are
//! re-measured. An optional reference stream of known-random data subtracts
//! baseline drift.

mod analysis;
mod eval;
mod params;
mod report;
mod termmap;

pub use analysis::{HWAnalysis, InputPolys};
pub use eval::{expp_poly, expp_term_deg, TermEval};
pub use params::AnalysisParams;
pub use report::{ChunkReport, DegreeStats, Reporter, TOP_COMBINED, TOP_LISTED};
pub use termmap::TermMap;

#[cfg(test)]
mod tests;
