use std::io::{self, Write};

use pd_types::Combined;

/// Terms listed per degree in each chunk report.
pub const TOP_LISTED: usize = 15;
/// Combined results kept after the combination search.
pub const TOP_COMBINED: usize = 30;

/// Per-degree ranking summary for one analysed chunk.
#[derive(Clone, Debug)]
pub struct DegreeStats {
    pub deg: usize,
    /// Top terms by |z|, best first.
    pub best: Vec<Combined>,
    pub mean_zscore: f64,
    /// Terms with |z| above the threshold.
    pub fails: usize,
    /// Total terms of this degree.
    pub terms: usize,
}

/// Everything the analyser found in one chunk (or cumulatively, for the
/// final report): user-polynomial results, per-degree rankings, and the
/// combination-search pool.
#[derive(Clone, Debug)]
pub struct ChunkReport {
    /// Number of blocks the counts refer to.
    pub num_evals: u64,
    pub input_results: Vec<Combined>,
    pub degrees: Vec<DegreeStats>,
    pub combined: Vec<Combined>,
}

/// Renders ranked listings, one line per term or polynomial.
///
/// The analysis core never prints; the host binds a writer and decides
/// where the listing goes.
pub struct Reporter {
    pub zscore_thresh: f64,
}

impl Reporter {
    pub fn new(zscore_thresh: f64) -> Self {
        Reporter { zscore_thresh }
    }

    fn mark(&self, z: f64) -> char {
        if z.abs() > self.zscore_thresh {
            'x'
        } else {
            ' '
        }
    }

    pub fn write_chunk(&self, w: &mut impl Write, rep: &ChunkReport) -> io::Result<()> {
        self.write_input(w, rep)?;
        for d in &rep.degrees {
            self.write_degree(w, d)?;
        }
        self.write_combined(w, rep)
    }

    /// The cumulative report after all chunks. Combination search needs the
    /// per-chunk bit data, so only rankings and totals appear here.
    pub fn write_final(&self, w: &mut impl Write, rep: &ChunkReport) -> io::Result<()> {
        writeln!(w, "Cumulative results, {} blocks:", rep.num_evals)?;
        self.write_chunk(w, rep)
    }

    fn write_input(&self, w: &mut impl Write, rep: &ChunkReport) -> io::Result<()> {
        for r in &rep.input_results {
            let idx = r.idx.unwrap_or(0);
            writeln!(
                w,
                " - zscore[idx{:02}]: {:+09.5}, observed: {:08}, expected: {:08.0} {} idx: {:6}, poly: {}",
                idx,
                r.zscore,
                r.obs_cnt,
                r.exp_cnt,
                self.mark(r.zscore),
                idx,
                r.poly,
            )?;
        }
        Ok(())
    }

    fn write_degree(&self, w: &mut impl Write, d: &DegreeStats) -> io::Result<()> {
        for r in &d.best {
            match r.zscore_ref {
                Some(zr) => writeln!(
                    w,
                    " - zscore[deg={}]: {:+09.5}, ref: {:+09.5}, observed: {:08}, expected: {:08.0} {} idx: {:6}, term: {}",
                    d.deg,
                    r.zscore,
                    zr,
                    r.obs_cnt,
                    r.exp_cnt,
                    self.mark(r.zscore),
                    r.idx.unwrap_or(0),
                    r.poly.terms()[0],
                )?,
                None => writeln!(
                    w,
                    " - zscore[deg={}]: {:+09.5}, observed: {:08}, expected: {:08.0} {} idx: {:6}, term: {}",
                    d.deg,
                    r.zscore,
                    r.obs_cnt,
                    r.exp_cnt,
                    self.mark(r.zscore),
                    r.idx.unwrap_or(0),
                    r.poly.terms()[0],
                )?,
            }
        }
        writeln!(w, "Mean zscore[deg={}]: {:.5}", d.deg, d.mean_zscore)?;
        writeln!(
            w,
            "Num of fails[deg={}]: {} = {:.5}%",
            d.deg,
            d.fails,
            100.0 * d.fails as f64 / d.terms as f64
        )
    }

    fn write_combined(&self, w: &mut impl Write, rep: &ChunkReport) -> io::Result<()> {
        for c in &rep.combined {
            writeln!(
                w,
                " - best poly zscore {:9.5}, expp: {:.4}, exp: {:4.0}, obs: {}, diff: {:.6} %, poly: {}",
                c.zscore,
                c.expp,
                c.exp_cnt,
                c.obs_cnt,
                100.0 * (c.exp_cnt - c.obs_cnt as f64) / c.exp_cnt,
                c.poly,
            )?;
        }
        Ok(())
    }
}
