use crate::discretization::cloud::{NodeKind, PointCloud};
use crate::error::{GfdError, Result};
use glam::DVec2;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Split a CSV line into numbers. Blank lines give `None`.
fn parse_numbers(line: &str, lineno: usize) -> Result<Option<Vec<f64>>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    line.split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|e| GfdError::Parse {
                line: lineno,
                message: format!("'{}': {e}", field.trim()),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Interpret a float written by a numeric tool (`3.0`) as an index.
fn as_index(v: f64, lineno: usize) -> Result<i64> {
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(GfdError::Parse {
            line: lineno,
            message: format!("{v} is not an integer"),
        });
    }
    Ok(v as i64)
}

/// Parse `x,y,flag` rows (flag 0 interior, 1 boundary, k >= 2 hole k - 2).
pub fn parse_points(reader: impl BufRead) -> Result<PointCloud> {
    let mut points = Vec::new();
    for (k, line) in reader.lines().enumerate() {
        let lineno = k + 1;
        let Some(values) = parse_numbers(&line?, lineno)? else {
            continue;
        };
        if values.len() != 3 {
            return Err(GfdError::Parse {
                line: lineno,
                message: format!("expected x,y,flag but found {} columns", values.len()),
            });
        }
        let flag = as_index(values[2], lineno)?;
        let kind = NodeKind::from_flag(flag).ok_or_else(|| GfdError::Parse {
            line: lineno,
            message: format!("unknown node flag {flag}"),
        })?;
        points.push((DVec2::new(values[0], values[1]), kind));
    }
    Ok(PointCloud::new(points))
}

/// Parse `a,b,c` rows of 0-based node indices.
pub fn parse_triangles(reader: impl BufRead) -> Result<Vec<[usize; 3]>> {
    let mut triangles = Vec::new();
    for (k, line) in reader.lines().enumerate() {
        let lineno = k + 1;
        let Some(values) = parse_numbers(&line?, lineno)? else {
            continue;
        };
        if values.len() != 3 {
            return Err(GfdError::Parse {
                line: lineno,
                message: format!("expected 3 vertex indices but found {}", values.len()),
            });
        }
        let mut tri = [0usize; 3];
        for (slot, &v) in tri.iter_mut().zip(&values) {
            let idx = as_index(v, lineno)?;
            *slot = usize::try_from(idx).map_err(|_| GfdError::Parse {
                line: lineno,
                message: format!("negative vertex index {idx}"),
            })?;
        }
        triangles.push(tri);
    }
    Ok(triangles)
}

pub fn read_points<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let cloud = parse_points(BufReader::new(File::open(path)?))?;
    info!(
        "read {} nodes ({} boundary, {} holes) from {}",
        cloud.len(),
        cloud.num_boundary(),
        cloud.holes.len(),
        path.display()
    );
    Ok(cloud)
}

pub fn read_triangles<P: AsRef<Path>>(path: P) -> Result<Vec<[usize; 3]>> {
    parse_triangles(BufReader::new(File::open(path)?))
}
