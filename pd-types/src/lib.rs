//! Shared vocabulary types for the polydist crates: terms, polynomials,
//! result records, and the error enum.

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

/// The type used for all bitvector words.
pub type B = u64;
/// The number of bits per word.
pub const W: usize = B::BITS as usize;

/// A variable index within a block, in `0..blocklen`.
pub type Var = u32;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("reference chunk is {got} bytes, data chunk is {expected} bytes")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("invalid polynomial: {0}")]
    Polynomial(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A monomial: the AND of a set of block bits.
///
/// Variables are kept sorted and deduplicated, so equal sets compare equal
/// and enumeration order is the lexicographic order on the variable tuples.
/// The empty term is the constant 1.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    vars: Vec<Var>,
}

impl Term {
    pub fn new(mut vars: Vec<Var>) -> Self {
        vars.sort_unstable();
        vars.dedup();
        Term { vars }
    }

    /// The constant-1 term (empty variable set).
    pub fn one() -> Self {
        Term { vars: Vec::new() }
    }

    #[inline]
    pub fn deg(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// The AND of two monomials: the union of their variable sets.
    pub fn and(&self, other: &Term) -> Term {
        Term {
            vars: self
                .vars
                .iter()
                .merge(other.vars.iter())
                .dedup()
                .copied()
                .collect(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.vars.iter().join(", "))
    }
}

/// A polynomial: the XOR of a non-empty sequence of monomials.
///
/// Duplicate monomials are allowed and XOR-cancel on evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Poly {
    terms: Vec<Term>,
}

impl Poly {
    pub fn new(terms: Vec<Term>) -> Self {
        assert!(!terms.is_empty());
        Poly { terms }
    }

    pub fn from_term(term: Term) -> Self {
        Poly { terms: vec![term] }
    }

    #[inline]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The degree of the polynomial: the maximum over its monomials.
    pub fn deg(&self) -> usize {
        self.terms.iter().map(|t| t.deg()).max().unwrap()
    }

    /// All distinct variables occurring in the polynomial, sorted.
    pub fn vars_union(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = self
            .terms
            .iter()
            .flat_map(|t| t.vars().iter().copied())
            .collect();
        vars.sort_unstable();
        vars.dedup();
        vars
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.terms.iter().join(", "))
    }
}

/// A ranked candidate distinguisher.
#[derive(Clone, Debug)]
pub struct Combined {
    pub poly: Poly,
    /// Expected probability of the polynomial evaluating to 1 on a uniform block.
    pub expp: f64,
    /// `num_evals * expp`.
    pub exp_cnt: f64,
    /// Number of blocks on which the polynomial evaluated to 1.
    pub obs_cnt: u64,
    /// Z-score of `obs_cnt`; the data-minus-reference difference when a
    /// reference stream is used in the combination search.
    pub zscore: f64,
    /// Z-score of the same term on the reference stream, for listings.
    pub zscore_ref: Option<f64>,
    /// Index within its degree when this is a single enumerated term, or the
    /// input-polynomial index for user-supplied polynomials.
    pub idx: Option<usize>,
}
