use pd_bitpacking::{BitBuf, BlockBuffer};
use pd_stats::comb;
use pd_types::{Poly, Result, Term, Var};

/// Above this many distinct variables, `expp_poly` switches from exact
/// truth-table enumeration to the piling-up approximation.
const EXPP_EXACT_MAX_VARS: usize = 20;

/// Evaluates monomials and polynomials over a loaded chunk.
///
/// One evaluator per stream: the analyser keeps one for the candidate data
/// and one for the reference.
pub struct TermEval {
    buf: BlockBuffer,
}

impl TermEval {
    pub fn new(blocklen: usize) -> Self {
        TermEval {
            buf: BlockBuffer::new(blocklen),
        }
    }

    #[inline]
    pub fn blocklen(&self) -> usize {
        self.buf.blocklen()
    }

    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.load(bytes)
    }

    /// Number of blocks (trials) in the loaded chunk.
    #[inline]
    pub fn cur_evals(&self) -> u64 {
        self.buf.n_blocks() as u64
    }

    /// A scratch buffer sized for the loaded chunk.
    pub fn new_buffer(&self) -> BitBuf {
        BitBuf::zeroed(self.buf.n_blocks())
    }

    /// Hamming weights of all monomials of degree `1..=deg`, plus the
    /// constant-1 weight at degree 0.
    ///
    /// `hws[d][i]` is the number of blocks on which the `i`-th degree-`d`
    /// monomial (lexicographic order, matching `TermMap`) evaluates to 1.
    /// The depth-first walk reuses the degree-`d-1` partial AND when
    /// extending to degree `d`, so each monomial costs one plane-AND and one
    /// popcount.
    pub fn eval_all_terms(&self, deg: usize) -> Vec<Vec<u64>> {
        let n = self.buf.n_blocks();
        let blocklen = self.buf.blocklen() as u64;
        let mut hws: Vec<Vec<u64>> = (0..=deg)
            .map(|d| Vec::with_capacity(comb(blocklen, d as u64) as usize))
            .collect();
        hws[0].push(n as u64);
        if deg > 0 {
            let mut scratch: Vec<BitBuf> = (0..deg).map(|_| BitBuf::zeroed(n)).collect();
            self.eval_terms_rec(None, 0, &mut scratch, &mut hws[1..]);
        }
        hws
    }

    fn eval_terms_rec(
        &self,
        prev: Option<&BitBuf>,
        first: usize,
        scratch: &mut [BitBuf],
        hws: &mut [Vec<u64>],
    ) {
        let (cur, scratch_rest) = scratch.split_first_mut().unwrap();
        let (h, hws_rest) = hws.split_first_mut().unwrap();
        for v in first..self.buf.blocklen() {
            match prev {
                None => cur.copy_from(self.buf.plane(v as Var)),
                Some(p) => {
                    cur.copy_from(p);
                    *cur &= self.buf.plane(v as Var);
                }
            }
            h.push(cur.count_ones());
            if !scratch_rest.is_empty() {
                self.eval_terms_rec(Some(&*cur), v + 1, scratch_rest, hws_rest);
            }
        }
    }

    /// ANDs the planes of `term` into `out`. The constant-1 term sets all bits.
    pub fn eval_term_into(&self, term: &Term, out: &mut BitBuf) {
        match term.vars().split_first() {
            None => out.set_all(),
            Some((&v0, rest)) => {
                out.copy_from(self.buf.plane(v0));
                for &v in rest {
                    *out &= self.buf.plane(v);
                }
            }
        }
    }

    /// Evaluates `poly` on every block: for each monomial, AND its planes
    /// into `subres` and XOR that into `res`. Duplicate monomials cancel.
    pub fn eval_poly_into(&self, poly: &Poly, res: &mut BitBuf, subres: &mut BitBuf) {
        res.clear();
        for term in poly.terms() {
            self.eval_term_into(term, subres);
            *res ^= &*subres;
        }
    }
}

/// Probability that a uniform-random block satisfies a degree-`deg` monomial.
#[inline]
pub fn expp_term_deg(deg: usize) -> f64 {
    0.5f64.powi(deg as i32)
}

/// Probability that a uniform-random block satisfies `poly`.
///
/// Exact (by enumerating all assignments of the variables the terms share)
/// when the terms span at most 20 distinct variables; beyond that the terms
/// are treated as independent and the piling-up product is used. Both paths
/// agree when the terms are pairwise disjoint.
pub fn expp_poly(poly: &Poly) -> f64 {
    let vars = poly.vars_union();
    if vars.len() <= EXPP_EXACT_MAX_VARS {
        let masks: Vec<u32> = poly
            .terms()
            .iter()
            .map(|t| {
                t.vars()
                    .iter()
                    .fold(0u32, |m, v| m | 1 << vars.binary_search(v).unwrap())
            })
            .collect();
        let mut ones = 0u64;
        for assignment in 0u32..1 << vars.len() {
            let mut x = false;
            for &mask in &masks {
                x ^= assignment & mask == mask;
            }
            ones += x as u64;
        }
        ones as f64 / (1u64 << vars.len()) as f64
    } else {
        let prod: f64 = poly
            .terms()
            .iter()
            .map(|t| 1.0 - 2.0 * expp_term_deg(t.deg()))
            .product();
        (1.0 - prod) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(terms: &[&[Var]]) -> Poly {
        Poly::new(terms.iter().map(|t| Term::new(t.to_vec())).collect())
    }

    #[test]
    fn expp_term() {
        assert_eq!(expp_term_deg(0), 1.0);
        assert_eq!(expp_term_deg(1), 0.5);
        assert_eq!(expp_term_deg(3), 0.125);
    }

    #[test]
    fn expp_poly_exact() {
        // Single monomials.
        assert_eq!(expp_poly(&poly(&[&[0]])), 0.5);
        assert_eq!(expp_poly(&poly(&[&[0, 1, 2]])), 0.125);
        // Disjoint XOR: piling-up is exact here too.
        assert_eq!(expp_poly(&poly(&[&[0], &[1]])), 0.5);
        // Shared variables: x0x1 ^ x0 is 1 iff x0=1, x1=0.
        assert_eq!(expp_poly(&poly(&[&[0, 1], &[0]])), 0.25);
        // x0 ^ x0 cancels.
        assert_eq!(expp_poly(&poly(&[&[0], &[0]])), 0.0);
        // Constant term flips.
        assert_eq!(expp_poly(&poly(&[&[], &[0]])), 0.5);
        assert_eq!(expp_poly(&poly(&[&[]])), 1.0);
    }

    #[test]
    fn expp_poly_approximation_matches_exact_on_disjoint_terms() {
        // 11 disjoint degree-2 terms span 22 > 20 variables, forcing the
        // piling-up path; on disjoint terms it equals the exact value.
        let terms: Vec<&[Var]> = vec![
            &[0, 1],
            &[2, 3],
            &[4, 5],
            &[6, 7],
            &[8, 9],
            &[10, 11],
            &[12, 13],
            &[14, 15],
            &[16, 17],
            &[18, 19],
            &[20, 21],
        ];
        let p = poly(&terms);
        let expect = (1.0 - (1.0 - 2.0 * 0.25f64).powi(11)) / 2.0;
        assert!((expp_poly(&p) - expect).abs() < 1e-15);
    }

    #[test]
    fn eval_all_terms_on_known_blocks() {
        // Two 4-bit blocks: 0b1100 and 0b1010 (MSB-first).
        let mut te = TermEval::new(4);
        te.load(&[0b1100_1010]).unwrap();
        assert_eq!(te.cur_evals(), 2);
        let hws = te.eval_all_terms(2);
        assert_eq!(hws[0], vec![2]);
        // Per-variable weights: v0 in both, v1 in block 0, v2 in block 1.
        assert_eq!(hws[1], vec![2, 1, 1, 0]);
        // Pairs in lex order: 01, 02, 03, 12, 13, 23.
        assert_eq!(hws[2], vec![1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn eval_poly_is_xor_linear() {
        let mut te = TermEval::new(8);
        let data: Vec<u8> = (0..=255u8).collect();
        te.load(&data).unwrap();
        let mut res = te.new_buffer();
        let mut subres = te.new_buffer();

        let a = poly(&[&[0, 3], &[5]]);
        let b = poly(&[&[1], &[2, 6]]);
        let ab = poly(&[&[0, 3], &[5], &[1], &[2, 6]]);

        te.eval_poly_into(&a, &mut res, &mut subres);
        let mut va = res.clone();
        te.eval_poly_into(&b, &mut res, &mut subres);
        va ^= &res;
        te.eval_poly_into(&ab, &mut res, &mut subres);
        assert_eq!(va, res);

        // A xor A == 0.
        let aa = poly(&[&[0, 3], &[5], &[0, 3], &[5]]);
        te.eval_poly_into(&aa, &mut res, &mut subres);
        assert_eq!(res.count_ones(), 0);
    }

    #[test]
    fn eval_term_matches_per_block_and() {
        let mut te = TermEval::new(8);
        let data: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37)).collect();
        te.load(&data).unwrap();
        let mut out = te.new_buffer();
        let t = Term::new(vec![1, 4, 6]);
        te.eval_term_into(&t, &mut out);
        for (b, &byte) in data.iter().enumerate() {
            let expect = t.vars().iter().all(|&v| byte >> (7 - v) & 1 == 1);
            assert_eq!(out.get(b), expect, "block {b}");
        }
        // Constant 1 covers every block.
        te.eval_term_into(&Term::one(), &mut out);
        assert_eq!(out.count_ones(), 64);
    }
}
