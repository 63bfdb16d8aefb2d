//! `geocoding-stats`: coordinate quality across all companies

use super::{heading, percent, print_json, rest_client, rule};
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use routehub_common::geocoding::GeocodingStats;
use routehub_common::models::StatusFilter;
use routehub_common::store::ParentQuery;
use std::fmt::Write;
use std::process::ExitCode;

pub async fn run(config: &AdminConfig, json: bool) -> Result<ExitCode> {
    let client = rest_client(config)?;

    let companies = client
        .list_parents(StatusFilter::Any)
        .await
        .context("Failed to fetch companies")?;
    let stats = GeocodingStats::compute(&companies);

    if json {
        print_json(&stats)?;
    } else {
        print!("{}", heading("GEOCODING STATISTICS"));
        print!("{}", render(&stats));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render(stats: &GeocodingStats) -> String {
    let total = stats.total as f64;
    let pct = |n: usize| percent(n as f64, total);
    let mut out = String::new();

    // fmt::Write into a String cannot fail
    let _ = writeln!(out, "\nTotal companies: {}", stats.total);
    let _ = writeln!(
        out,
        "\nCompanies with coordinates: {} ({})",
        stats.with_coordinates(),
        pct(stats.with_coordinates())
    );
    let _ = writeln!(out, "   - Exact locations: {} ({})", stats.exact, pct(stats.exact));
    let _ = writeln!(
        out,
        "   - City centers (Tbilisi): {} ({})",
        stats.default_city_center,
        pct(stats.default_city_center)
    );
    let _ = writeln!(
        out,
        "   - City centers (Other): {} ({})",
        stats.other_city_center,
        pct(stats.other_city_center)
    );
    let _ = writeln!(
        out,
        "\nCompanies without coordinates: {} ({})",
        stats.missing,
        pct(stats.missing)
    );
    let _ = writeln!(out, "\n{}", rule('='));
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "   Successfully geocoded (exact): {} companies", stats.exact);
    let _ = writeln!(
        out,
        "   Need better geocoding (at city centers): {} companies",
        stats.city_centers()
    );
    let _ = writeln!(out, "   Failed completely (null): {} companies", stats.missing);
    let _ = writeln!(
        out,
        "\nPotential for improvement: {} companies ({})",
        stats.improvable(),
        pct(stats.improvable())
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_class() {
        let stats = GeocodingStats {
            total: 10,
            exact: 6,
            default_city_center: 2,
            other_city_center: 1,
            missing: 1,
        };

        let text = render(&stats);
        assert!(text.contains("Companies with coordinates: 9 (90.0%)"));
        assert!(text.contains("City centers (Tbilisi): 2 (20.0%)"));
        assert!(text.contains("Need better geocoding (at city centers): 3 companies"));
        assert!(text.contains("Potential for improvement: 4 companies (40.0%)"));
    }

    #[test]
    fn test_render_empty_table() {
        let text = render(&GeocodingStats::default());
        assert!(text.contains("Total companies: 0"));
        assert!(text.contains("(0.0%)"));
    }
}
