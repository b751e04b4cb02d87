//! Matrix-Market coordinate file parser
//!
//! Supports the subset the benchmark corpus uses: `matrix coordinate`
//! objects with `real`, `integer`, or `pattern` fields and `general` or
//! `symmetric` symmetry. Indices are corrected from 1-based to 0-based,
//! symmetric matrices are expanded to explicit mirrored triples (diagonal
//! entries are not duplicated), and pattern entries default to 1.0.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::dtype::SemiringElement;
use crate::error::{Error, Result};
use crate::matrix::CooMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

/// Load a Matrix-Market file into a COO matrix.
pub(crate) fn load<T: SemiringElement>(path: &Path) -> Result<CooMatrix<T>> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::load(&display, e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mut banner = String::new();
    reader
        .read_line(&mut banner)
        .map_err(|e| Error::load(&display, e.to_string()))?;
    let (field, symmetry) = parse_banner(&display, &banner)?;

    let mut lines = reader.lines();

    // skip comments, then the size line
    let size_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line.map_err(|e| Error::load(&display, e.to_string()))?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('%') {
                    continue;
                }
                break line;
            }
            None => return Err(Error::load(&display, "missing size line")),
        }
    };

    let dims: Vec<usize> = size_line
        .split_whitespace()
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|_| Error::load(&display, format!("bad size token '{tok}'")))
        })
        .collect::<Result<_>>()?;
    let [rows, cols, nonzeros] = dims[..] else {
        return Err(Error::load(
            &display,
            format!("size line has {} fields, expected 3", dims.len()),
        ));
    };

    let mut triples: Vec<(usize, usize, T)> = Vec::with_capacity(match symmetry {
        Symmetry::General => nonzeros,
        Symmetry::Symmetric => nonzeros * 2,
    });

    let mut read = 0usize;
    for line in lines {
        let line = line.map_err(|e| Error::load(&display, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let mut toks = trimmed.split_whitespace();
        let i = parse_index(&display, toks.next(), rows)?;
        let j = parse_index(&display, toks.next(), cols)?;
        let value = match field {
            Field::Pattern => 1.0,
            Field::Real | Field::Integer => {
                let tok = toks
                    .next()
                    .ok_or_else(|| Error::load(&display, "entry missing value field"))?;
                tok.parse::<f64>()
                    .map_err(|_| Error::load(&display, format!("bad value '{tok}'")))?
            }
        };
        let v = T::from_f64(value);
        triples.push((i, j, v));
        if symmetry == Symmetry::Symmetric && i != j {
            triples.push((j, i, v));
        }
        read += 1;
        if read == nonzeros {
            break;
        }
    }

    if read != nonzeros {
        return Err(Error::load(
            &display,
            format!("expected {nonzeros} entries, file contained {read}"),
        ));
    }

    Ok(CooMatrix::from_market_parts(triples, rows, cols, nonzeros))
}

fn parse_banner(path: &str, banner: &str) -> Result<(Field, Symmetry)> {
    let toks: Vec<&str> = banner.split_whitespace().collect();
    let [magic, object, format, field, symmetry] = toks[..] else {
        return Err(Error::load(path, "malformed Matrix-Market banner"));
    };
    if magic != "%%MatrixMarket" || object != "matrix" || format != "coordinate" {
        return Err(Error::load(
            path,
            format!("unsupported banner '{}'", banner.trim()),
        ));
    }
    let field = match field {
        "real" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        other => {
            return Err(Error::load(path, format!("unsupported field type '{other}'")));
        }
    };
    let symmetry = match symmetry {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        other => {
            return Err(Error::load(path, format!("unsupported symmetry '{other}'")));
        }
    };
    Ok((field, symmetry))
}

fn parse_index(path: &str, tok: Option<&str>, bound: usize) -> Result<usize> {
    let tok = tok.ok_or_else(|| Error::load(path, "entry missing index field"))?;
    let one_based = tok
        .parse::<usize>()
        .map_err(|_| Error::load(path, format!("bad index '{tok}'")))?;
    if one_based == 0 || one_based > bound {
        return Err(Error::load(
            path,
            format!("index {one_based} out of range 1..={bound}"),
        ));
    }
    Ok(one_based - 1)
}
