use log::{debug, info};
use pd_bitpacking::BitBuf;
use pd_stats::{comb, zscore, Subsets};
use pd_types::{Combined, Error, Poly, Result, Term};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::eval::{expp_poly, expp_term_deg, TermEval};
use crate::report::{ChunkReport, DegreeStats, TOP_COMBINED, TOP_LISTED};
use crate::{AnalysisParams, TermMap};

/// User-supplied polynomials with precomputed expectations and running
/// totals, evaluated independently on every chunk.
pub struct InputPolys {
    polys: Vec<Poly>,
    expp: Vec<f64>,
    total_hws: Vec<u64>,
}

impl InputPolys {
    pub fn new(polys: Vec<Poly>) -> Self {
        let expp = polys.iter().map(expp_poly).collect();
        let total_hws = vec![0; polys.len()];
        InputPolys {
            polys,
            expp,
            total_hws,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    pub fn polys(&self) -> &[Poly] {
        &self.polys
    }

    /// Cumulative observed counts, indexed like `polys`.
    pub fn totals(&self) -> &[u64] {
        &self.total_hws
    }

    fn eval_chunk(&mut self, te: &TermEval) -> Vec<u64> {
        let mut res = te.new_buffer();
        let mut subres = te.new_buffer();
        let mut hws = Vec::with_capacity(self.polys.len());
        for i in 0..self.polys.len() {
            te.eval_poly_into(&self.polys[i], &mut res, &mut subres);
            let obs = res.count_ones();
            self.total_hws[i] += obs;
            hws.push(obs);
        }
        hws
    }

    fn results(&self, num_evals: u64, hws: &[u64]) -> Vec<Combined> {
        let n = num_evals as f64;
        let mut results: Vec<Combined> = self
            .polys
            .iter()
            .enumerate()
            .map(|(i, poly)| {
                let exp_cnt = n * self.expp[i];
                Combined {
                    poly: poly.clone(),
                    expp: self.expp[i],
                    exp_cnt,
                    obs_cnt: hws[i],
                    zscore: zscore(hws[i] as f64, exp_cnt, n),
                    zscore_ref: None,
                    idx: Some(i),
                }
            })
            .collect();
        sort_by_zscore(&mut results);
        results
    }
}

/// The analyser: accumulates Hamming-weight tables over chunks, ranks
/// monomials by z-score, and searches XOR/AND combinations of the best.
pub struct HWAnalysis {
    params: AnalysisParams,
    term_map: TermMap,
    term_eval: TermEval,
    ref_term_eval: Option<TermEval>,
    input_polys: InputPolys,

    /// `total_hws[d][i]`: cumulative weight of the `i`-th degree-`d` term.
    total_hws: Vec<Vec<u64>>,
    ref_total_hws: Vec<Vec<u64>>,
    total_n: u64,

    rng: ChaCha8Rng,
}

impl HWAnalysis {
    pub fn new(params: AnalysisParams, input_polys: Vec<Poly>) -> Result<Self> {
        params.validate()?;
        for poly in &input_polys {
            if let Some(&v) = poly.vars_union().last() {
                if v as usize >= params.blocklen {
                    return Err(Error::Polynomial(format!(
                        "variable {v} out of range for block length {}",
                        params.blocklen
                    )));
                }
            }
        }
        info!(
            "precomputing term map, blocklen {}, degree {}",
            params.blocklen, params.deg
        );
        let term_map = TermMap::build(params.blocklen, params.deg);
        let totals = || {
            (0..=params.deg)
                .map(|d| vec![0; comb(params.blocklen as u64, d as u64) as usize])
                .collect()
        };
        Ok(HWAnalysis {
            term_eval: TermEval::new(params.blocklen),
            ref_term_eval: params.do_ref.then(|| TermEval::new(params.blocklen)),
            input_polys: InputPolys::new(input_polys),
            total_hws: totals(),
            ref_total_hws: totals(),
            total_n: 0,
            rng: ChaCha8Rng::seed_from_u64(params.seed),
            term_map,
            params,
        })
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn total_n(&self) -> u64 {
        self.total_n
    }

    pub fn total_hws(&self) -> &[Vec<u64>] {
        &self.total_hws
    }

    pub fn input_polys(&self) -> &InputPolys {
        &self.input_polys
    }

    /// Analyses one chunk of the candidate stream, with an optional
    /// same-sized chunk of the reference stream.
    pub fn process_chunk(&mut self, bits: &[u8], ref_bits: Option<&[u8]>) -> Result<ChunkReport> {
        self.term_eval.load(bits)?;
        let num_evals = self.term_eval.cur_evals();
        info!("evaluating chunk: {} bytes, {} blocks", bits.len(), num_evals);

        let hws = if self.params.all_deg_compute {
            let hws = self.term_eval.eval_all_terms(self.params.deg);
            debug!("term counts per degree: {:?}", hws.iter().map(Vec::len).collect::<Vec<_>>());
            accumulate(&mut self.total_hws, &hws);
            Some(hws)
        } else {
            None
        };

        let hws_input =
            (!self.input_polys.is_empty()).then(|| self.input_polys.eval_chunk(&self.term_eval));

        self.total_n += num_evals;

        let ref_hws = match ref_bits {
            None => None,
            Some(ref_bits) => {
                if ref_bits.len() != bits.len() {
                    return Err(Error::ShapeMismatch {
                        expected: bits.len(),
                        got: ref_bits.len(),
                    });
                }
                let blocklen = self.params.blocklen;
                let rte = self
                    .ref_term_eval
                    .get_or_insert_with(|| TermEval::new(blocklen));
                rte.load(ref_bits)?;
                if self.params.all_deg_compute {
                    let ref_hws = rte.eval_all_terms(self.params.deg);
                    accumulate(&mut self.ref_total_hws, &ref_hws);
                    Some(ref_hws)
                } else {
                    None
                }
            }
        };

        Ok(self.analyse(
            num_evals,
            hws.as_deref(),
            hws_input.as_deref(),
            ref_hws.as_deref(),
            true,
        ))
    }

    /// The final report over all processed chunks. Rankings use the
    /// cumulative tables; the combination search is per-chunk only and is
    /// not repeated here.
    pub fn finished(&mut self) -> ChunkReport {
        info!("final analysis over {} blocks", self.total_n);
        let hws = self.params.all_deg_compute.then(|| self.total_hws.clone());
        let hws_input =
            (!self.input_polys.is_empty()).then(|| self.input_polys.totals().to_vec());
        let ref_hws = (self.params.do_ref && self.params.all_deg_compute)
            .then(|| self.ref_total_hws.clone());
        self.analyse(
            self.total_n,
            hws.as_deref(),
            hws_input.as_deref(),
            ref_hws.as_deref(),
            false,
        )
    }

    fn analyse(
        &mut self,
        num_evals: u64,
        hws: Option<&[Vec<u64>]>,
        hws_input: Option<&[u64]>,
        ref_hws: Option<&[Vec<u64>]>,
        combine: bool,
    ) -> ChunkReport {
        let n = num_evals as f64;
        let mut report = ChunkReport {
            num_evals,
            input_results: Vec::new(),
            degrees: Vec::new(),
            combined: Vec::new(),
        };

        if let Some(hws_input) = hws_input {
            report.input_results = self.input_polys.results(num_evals, hws_input);
        }

        let Some(hws) = hws else {
            return report;
        };

        // Rank every degree, list the best, and pool the top-k terms for the
        // combination search.
        let mut top_terms: Vec<Term> = Vec::new();
        for deg in 1..=self.params.deg {
            let expp = expp_term_deg(deg);
            let exp_cnt = n * expp;
            let obs = &hws[deg];
            let mut zs: Vec<(f64, usize)> = obs
                .iter()
                .enumerate()
                .map(|(i, &o)| (zscore(o as f64, exp_cnt, n), i))
                .collect();
            let mean_zscore = zs.iter().map(|x| x.0).sum::<f64>() / zs.len() as f64;
            let fails = zs
                .iter()
                .filter(|x| x.0.abs() > self.params.zscore_thresh)
                .count();
            // |z| descending, ties by ascending index: stable across runs.
            zs.sort_unstable_by(|a, b| b.0.abs().total_cmp(&a.0.abs()).then(a.1.cmp(&b.1)));

            let ref_zs: Option<Vec<f64>> = ref_hws.map(|r| {
                r[deg]
                    .iter()
                    .map(|&o| zscore(o as f64, exp_cnt, n))
                    .collect()
            });
            let best = zs
                .iter()
                .take(TOP_LISTED)
                .map(|&(z, i)| Combined {
                    poly: Poly::from_term(self.term_map.term(deg, i).clone()),
                    expp,
                    exp_cnt,
                    obs_cnt: obs[i],
                    zscore: z,
                    zscore_ref: ref_zs.as_ref().map(|r| r[i]),
                    idx: Some(i),
                })
                .collect();
            report.degrees.push(DegreeStats {
                deg,
                best,
                mean_zscore,
                fails,
                terms: zs.len(),
            });

            if let Some(top_k) = self.params.top_k {
                if self.params.combine_all_deg || deg == self.params.deg {
                    top_terms.extend(
                        zs.iter()
                            .take(top_k)
                            .map(|&(_, i)| self.term_map.term(deg, i).clone()),
                    );
                    if self.params.comb_random > 0 {
                        let cnt = self.params.comb_random.min(obs.len());
                        let sampled = rand::seq::index::sample(&mut self.rng, obs.len(), cnt);
                        top_terms
                            .extend(sampled.iter().map(|i| self.term_map.term(deg, i).clone()));
                    }
                }
            }
        }

        if !combine || self.params.top_k.is_none() {
            return report;
        }

        info!(
            "combining {} terms up to arity {}",
            top_terms.len(),
            self.params.top_comb
        );
        let mut res = self.term_eval.new_buffer();
        let mut subres = self.term_eval.new_buffer();
        let ref_te = if ref_hws.is_some() {
            self.ref_term_eval.as_ref()
        } else {
            None
        };
        let mut pool: Vec<Combined> = Vec::new();
        for arity in 1..=self.params.top_comb {
            if !self.params.no_comb_xor {
                for subset in Subsets::new(arity, top_terms.len()) {
                    let poly =
                        Poly::new(subset.iter().map(|&i| top_terms[i].clone()).collect());
                    pool.extend(combine_poly(
                        &self.term_eval,
                        ref_te,
                        &mut res,
                        &mut subres,
                        poly,
                        num_evals,
                    ));
                }
            }
            if !self.params.no_comb_and {
                for subset in Subsets::new(arity, top_terms.len()) {
                    let merged = subset
                        .iter()
                        .fold(Term::one(), |acc, &i| acc.and(&top_terms[i]));
                    pool.extend(combine_poly(
                        &self.term_eval,
                        ref_te,
                        &mut res,
                        &mut subres,
                        Poly::from_term(merged),
                        num_evals,
                    ));
                }
            }
        }
        sort_by_zscore(&mut pool);
        pool.truncate(TOP_COMBINED);
        report.combined = pool;
        report
    }
}

/// Evaluates one candidate polynomial; `None` when its expected count is 0
/// (nothing to distinguish against). With a reference evaluator the z-score
/// is the data-minus-reference difference.
fn combine_poly(
    te: &TermEval,
    ref_te: Option<&TermEval>,
    res: &mut BitBuf,
    subres: &mut BitBuf,
    poly: Poly,
    num_evals: u64,
) -> Option<Combined> {
    let expp = expp_poly(&poly);
    let n = num_evals as f64;
    let exp_cnt = n * expp;
    if exp_cnt == 0.0 {
        return None;
    }
    te.eval_poly_into(&poly, res, subres);
    let obs_cnt = res.count_ones();
    let mut z = zscore(obs_cnt as f64, exp_cnt, n);
    let mut zscore_ref = None;
    if let Some(ref_te) = ref_te {
        ref_te.eval_poly_into(&poly, res, subres);
        let ref_z = zscore(res.count_ones() as f64, exp_cnt, n);
        zscore_ref = Some(ref_z);
        z -= ref_z;
    }
    Some(Combined {
        poly,
        expp,
        exp_cnt,
        obs_cnt,
        zscore: z,
        zscore_ref,
        idx: None,
    })
}

fn accumulate(totals: &mut [Vec<u64>], hws: &[Vec<u64>]) {
    for (total, cur) in totals.iter_mut().zip(hws) {
        for (t, &c) in total.iter_mut().zip(cur) {
            *t += c;
        }
    }
}

/// |z| descending; the sort is stable, so equal scores keep generation
/// order, and indexed results tie-break by ascending index.
fn sort_by_zscore(results: &mut [Combined]) {
    results.sort_by(|a, b| {
        b.zscore
            .abs()
            .total_cmp(&a.zscore.abs())
            .then(a.idx.cmp(&b.idx))
    });
}
