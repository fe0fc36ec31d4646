use pd_stats::Subsets;
use pd_types::{Term, Var};

/// For every degree `d <= deg`, all degree-`d` monomials over `blocklen`
/// variables, in lexicographic order of their sorted variable tuples.
///
/// Built once, immutable. `term(d, i)` inverts the index that
/// `TermEval::eval_all_terms` assigns to each Hamming weight.
pub struct TermMap {
    maps: Vec<Vec<Term>>,
}

impl TermMap {
    pub fn build(blocklen: usize, deg: usize) -> Self {
        assert!(deg <= blocklen);
        let maps = (0..=deg)
            .map(|d| {
                Subsets::new(d, blocklen)
                    .map(|s| Term::new(s.into_iter().map(|v| v as Var).collect()))
                    .collect()
            })
            .collect();
        TermMap { maps }
    }

    pub fn max_deg(&self) -> usize {
        self.maps.len() - 1
    }

    #[inline]
    pub fn terms(&self, deg: usize) -> &[Term] {
        &self.maps[deg]
    }

    #[inline]
    pub fn term(&self, deg: usize, idx: usize) -> &Term {
        &self.maps[deg][idx]
    }

    pub fn count(&self, deg: usize) -> usize {
        self.maps[deg].len()
    }
}
