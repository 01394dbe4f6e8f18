//! Command implementations behind the `matchspec` binary
//!
//! Each command writes its output to the given writer so it can be driven
//! from tests without a process boundary.
//!
//! # Modules
//!
//! - [`catalog`]: reading repodata documents and record arrays
//! - [`logging`]: `tracing` subscriber installation

pub mod catalog;
pub mod logging;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::filter::{ParallelFilter, filter_candidates};
use crate::matcher::match_against_matchspec;
use crate::spec::{MatchSpec, parse_spec_list};

/// Print the canonical form of every spec, one per line
pub fn parse<W: Write>(specs: &[String], out: &mut W) -> anyhow::Result<()> {
    for raw in specs {
        let spec = MatchSpec::parse(raw).with_context(|| format!("invalid spec '{}'", raw))?;
        writeln!(out, "{}", spec)?;
    }
    Ok(())
}

/// Print `true` or `false` depending on whether `name` at `version`
/// satisfies `spec`
pub fn check<W: Write>(spec: &str, name: &str, version: &str, out: &mut W) -> anyhow::Result<bool> {
    let matched = match_against_matchspec(spec, name, version)
        .with_context(|| format!("invalid spec '{}'", spec))?;
    writeln!(out, "{}", matched)?;
    Ok(matched)
}

/// Print the catalog records matching every spec as a JSON array
///
/// Runs on `pool` when given, on the calling thread otherwise.
pub fn filter<W: Write>(
    catalog_path: &Path,
    specs: &[String],
    pool: Option<&ParallelFilter>,
    out: &mut W,
) -> anyhow::Result<usize> {
    let specs = parse_spec_list(specs).context("invalid spec")?;
    let records = catalog::load(catalog_path)?;

    let matched = match pool {
        Some(pool) => pool.filter(&specs, &records),
        None => filter_candidates(&specs, &records),
    };
    info!(
        "{} of {} records matched {} spec(s)",
        matched.len(),
        records.len(),
        specs.len()
    );

    serde_json::to_writer_pretty(&mut *out, &matched)?;
    writeln!(out)?;
    Ok(matched.len())
}
