use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use clap::Parser;
use log::info;
use pd_types::{Error, Poly, Result};
use polydist::{AnalysisParams, HWAnalysis, Reporter};

mod cli;
mod poly;
mod size;

use cli::Cli;
use size::parse_size;

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let tvsize = parse_size(&cli.tvsize)? as usize;
    if tvsize == 0 {
        return Err(Error::Config("test vector size must be positive".into()));
    }

    let mut params = cli.analysis.clone();
    params.validate()?;
    params.do_ref = cli.reffile.is_some();

    let mut polys = Vec::new();
    for s in &cli.polynomials {
        if let Some(p) = poly::parse_poly(s, params.blocklen, cli.poly_policy)? {
            polys.push(p);
        }
    }
    for f in &cli.poly_file {
        polys.extend(poly::load_poly_file(f, params.blocklen, cli.poly_policy)?);
    }
    // The degree ladder is only computed when no explicit polynomials are
    // given; otherwise just the given ones are tracked.
    params.all_deg_compute = polys.is_empty();

    info!(
        "settings: blocklen {}, degree {}, tv size {}, polynomials {}",
        params.blocklen,
        params.deg,
        tvsize,
        polys.len()
    );

    if cli.files.is_empty() || cli.stdin {
        let ref_reader = open_ref(cli.reffile.as_deref())?;
        return run_stream(
            &params,
            polys,
            io::stdin().lock(),
            ref_reader,
            tvsize,
            cli.rounds,
        );
    }

    for file in &cli.files {
        let size = std::fs::metadata(file)?.len() as usize;
        info!("testing file {}: {} kB", file.display(), size / 1024);
        // A file smaller than the test vector shrinks the vector.
        let tv = tvsize.min(size.max(1));
        let reader = BufReader::new(File::open(file)?);
        let ref_reader = open_ref(cli.reffile.as_deref())?;
        run_stream(&params, polys.clone(), reader, ref_reader, tv, cli.rounds)?;
    }
    Ok(())
}

fn open_ref(path: Option<&Path>) -> Result<Option<BufReader<File>>> {
    Ok(match path {
        Some(p) => Some(BufReader::new(File::open(p)?)),
        None => None,
    })
}

/// Drives one analyser over a stream, chunk by chunk, reporting after every
/// chunk and cumulatively at the end.
fn run_stream<R: Read, S: Read>(
    params: &AnalysisParams,
    polys: Vec<Poly>,
    mut reader: R,
    mut ref_reader: Option<S>,
    tvsize: usize,
    rounds: Option<u64>,
) -> Result<()> {
    let mut analysis = HWAnalysis::new(params.clone(), polys)?;
    let reporter = Reporter::new(params.zscore_thresh);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut buf = vec![0u8; tvsize];
    let mut ref_buf = vec![0u8; tvsize];
    let mut round = 0;
    loop {
        if rounds.is_some_and(|r| round >= r) {
            break;
        }
        let n = read_fill(&mut reader, &mut buf)?;
        if n == 0 {
            info!("input read completely");
            break;
        }
        let ref_chunk = match &mut ref_reader {
            Some(r) => {
                let m = read_fill(r, &mut ref_buf[..n])?;
                Some(&ref_buf[..m])
            }
            None => None,
        };
        info!("round {round}: {n} bytes");
        let report = analysis.process_chunk(&buf[..n], ref_chunk)?;
        reporter.write_chunk(&mut out, &report)?;
        round += 1;
    }

    let report = analysis.finished();
    reporter.write_final(&mut out, &report)?;
    out.flush()?;
    Ok(())
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn read_fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
