use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use clap::ValueEnum;
use log::debug;
use pd_types::{Error, Poly, Result, Term, Var};
use serde_json::Value;

/// How to resolve polynomial variables outside `0..blocklen`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutOfRange {
    /// Drop the whole polynomial.
    Ignore,
    /// Reduce the variable modulo the block length.
    Mod,
    /// Reject the input.
    #[default]
    Fail,
}

/// Parses one JSON polynomial.
///
/// A flat array of variables is promoted to a one-monomial polynomial;
/// otherwise every element must itself be an array of variables. Terms are
/// canonicalised (sorted, duplicates absorbed by AND). Returns `None` when
/// the `Ignore` policy drops the polynomial.
pub fn parse_poly(s: &str, blocklen: usize, policy: OutOfRange) -> Result<Option<Poly>> {
    let value: Value = serde_json::from_str(s).map_err(|e| Error::Polynomial(e.to_string()))?;
    fix_poly(&value, blocklen, policy)
}

fn fix_poly(value: &Value, blocklen: usize, policy: OutOfRange) -> Result<Option<Poly>> {
    let Value::Array(items) = value else {
        return Err(Error::Polynomial(format!("expected an array, got {value}")));
    };
    if items.is_empty() {
        return Err(Error::Polynomial("empty polynomial".into()));
    }
    let term_values: Vec<&Value> = match items[0] {
        Value::Array(_) => items.iter().collect(),
        _ => vec![value],
    };
    let mut terms = Vec::with_capacity(term_values.len());
    for term in term_values {
        let Value::Array(vars) = term else {
            return Err(Error::Polynomial(format!("term {term} is not an array")));
        };
        let mut term_vars = Vec::with_capacity(vars.len());
        for var in vars {
            let Some(v) = var.as_u64() else {
                return Err(Error::Polynomial(format!(
                    "variable {var} is not a non-negative integer"
                )));
            };
            let v = if (v as usize) < blocklen {
                v
            } else {
                match policy {
                    OutOfRange::Ignore => return Ok(None),
                    OutOfRange::Mod => v % blocklen as u64,
                    OutOfRange::Fail => {
                        return Err(Error::Polynomial(format!(
                            "variable {v} out of range for block length {blocklen}"
                        )))
                    }
                }
            };
            term_vars.push(v as Var);
        }
        terms.push(Term::new(term_vars));
    }
    Ok(Some(Poly::new(terms)))
}

/// Loads a polynomial file: one JSON polynomial per line, blank lines and
/// `#`/`//` comments skipped.
pub fn load_poly_file(path: &Path, blocklen: usize, policy: OutOfRange) -> Result<Vec<Poly>> {
    let file = BufReader::new(File::open(path)?);
    let mut polys = Vec::new();
    for line in file.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if let Some(poly) = parse_poly(line, blocklen, policy)? {
            polys.push(poly);
        }
    }
    debug!("loaded {} polynomials from {}", polys.len(), path.display());
    Ok(polys)
}
