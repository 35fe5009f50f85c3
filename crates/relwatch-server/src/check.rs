//! `relwatch check`: one-shot batch check printed as JSON lines.

use anyhow::{bail, Context, Result};
use relwatch_core::models::PackageSpec;
use relwatch_core::UpdateService;
use std::io::Write;
use tracing::info;

/// Parse a comma-separated `--packages` value.
pub fn parse_packages(packages: &str) -> Result<Vec<PackageSpec>> {
    let specs = packages
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<PackageSpec>().with_context(|| format!("invalid package '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    if specs.is_empty() {
        bail!("Specify the packages to check with --packages");
    }
    Ok(specs)
}

/// Check `specs` and write one JSON object per package to `out`.
///
/// Returns how many packages have an update available.
pub async fn run_check<W: Write>(
    service: &UpdateService,
    specs: &[PackageSpec],
    out: &mut W,
) -> Result<usize> {
    info!("Checking {} package(s)", specs.len());

    let checks = service.check_for_updates(specs).await;
    for check in &checks {
        serde_json::to_writer(&mut *out, check)?;
        writeln!(out)?;
    }
    out.flush()?;

    let updates = checks.iter().filter(|c| c.has_update).count();
    info!("Check complete: {} update(s) available", updates);
    Ok(updates)
}
