//! Text input and output for the command line.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use cvm_model::{Properties, QueryPoint};
use cvm_vs30::{TickAddr, Vs30Payload};
use serde::Serialize;

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `lon lat depth vp vs rho qp qs` per line.
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
struct Record<'a> {
    #[serde(flatten)]
    point: &'a QueryPoint,
    #[serde(flatten)]
    properties: &'a Properties,
}

/// Split a line into numeric fields, skipping blanks and `#` comments.
fn fields<const N: usize>(line: &str, number: usize) -> Result<Option<[f64; N]>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let values = line
        .split_whitespace()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("line {}: cannot parse '{}'", number, line))?;
    match <[f64; N]>::try_from(values) {
        Ok(values) => Ok(Some(values)),
        Err(values) => bail!(
            "line {}: expected {} values, found {}",
            number,
            N,
            values.len()
        ),
    }
}

/// Read `lon lat depth` points.
pub fn read_points<R: BufRead>(reader: R) -> Result<Vec<QueryPoint>> {
    let mut points = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("reading points")?;
        if let Some([lon, lat, depth]) = fields::<3>(&line, i + 1)? {
            points.push(QueryPoint::new(lon, lat, depth));
        }
    }
    Ok(points)
}

/// Read `x_tick y_tick surface vs30` samples.
pub fn read_ticks<R: BufRead>(reader: R) -> Result<Vec<(TickAddr, Vs30Payload)>> {
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("reading samples")?;
        let Some([x, y, surface, vs30]) = fields::<4>(&line, i + 1)? else {
            continue;
        };
        let tick = |v: f64| -> Result<u32> {
            if v.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&v) {
                bail!("line {}: '{}' is not a tick coordinate", i + 1, v);
            }
            Ok(v as u32)
        };
        samples.push((
            TickAddr::surface(tick(x)?, tick(y)?),
            Vs30Payload {
                surface: surface as f32,
                vs30: vs30 as f32,
            },
        ));
    }
    Ok(samples)
}

/// Write one result line per point.
pub fn write_results<W: Write>(
    mut out: W,
    format: OutputFormat,
    points: &[QueryPoint],
    results: &[Properties],
) -> Result<()> {
    for (point, props) in points.iter().zip(results) {
        match format {
            OutputFormat::Text => writeln!(
                out,
                "{:.6} {:.6} {:.2} {:.4} {:.4} {:.4} {:.4} {:.4}",
                point.longitude,
                point.latitude,
                point.depth,
                props.vp,
                props.vs,
                props.rho,
                props.qp,
                props.qs
            )?,
            OutputFormat::Json => {
                serde_json::to_writer(
                    &mut out,
                    &Record {
                        point,
                        properties: props,
                    },
                )?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
