//! Markdown and JSON report generation.
//!
//! This module renders a library [`Report`] as a Markdown document or
//! pretty-printed JSON.

use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{LibrarySummary, Playlist, Report, ReportMetadata, Track};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# trackdex Library Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.summary, &report.playlists));
    output.push_str(&generate_playlists_section(&report.playlists));
    output.push_str(&generate_tracks_section(&report.tracks, options));
    output.push_str(&generate_footer());

    output
}

/// Escape a value for use inside a Markdown table cell.
fn escape_cell(value: &str) -> String {
    value
        .replace('|', "\\|")
        .replace(['\r', '\n'], " ")
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **User:** {} (`{}`)\n",
        metadata.user.display_name, metadata.user.id
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Playlists Scanned:** {}\n",
        metadata.playlists_scanned
    ));
    section.push_str(&format!(
        "- **Playlist Entries:** {}\n",
        metadata.total_entries
    ));
    section.push_str(&format!("- **Unique Tracks:** {}\n", metadata.unique_tracks));
    section.push_str(&format!(
        "- **Selected Tracks:** {}\n",
        metadata.selected_tracks
    ));
    section.push_str(&format!("- **Query:** {}\n", metadata.query));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Playlists](#playlists)\n");
    toc.push_str(&format!("- [Tracks](#tracks) ({})\n", report.tracks.len()));
    toc.push('\n');

    toc
}

/// Sort a count table by count descending, then key ascending.
fn sorted_counts(counts: &HashMap<String, usize>) -> Vec<(&String, &usize)> {
    let mut rows: Vec<_> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

/// Generate the summary section.
fn generate_summary_section(summary: &LibrarySummary, playlists: &[Playlist]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    section.push_str("| Unique Tracks | In Several Playlists | Liked Only | Avg. Popularity |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {:.1} |\n\n",
        summary.unique_tracks,
        summary.in_multiple_playlists,
        summary.liked_only,
        summary.average_popularity
    ));

    if !summary.by_decade.is_empty() {
        section.push_str("### Tracks by Decade\n\n");
        section.push_str("| Decade | Tracks |\n");
        section.push_str("|:---|:---:|\n");

        let mut decades: Vec<_> = summary.by_decade.iter().collect();
        decades.sort();

        for (decade, count) in decades {
            section.push_str(&format!("| {} | {} |\n", decade, count));
        }
        section.push('\n');
    }

    if !summary.by_playlist.is_empty() {
        section.push_str("### Tracks by Playlist\n\n");
        section.push_str("| Playlist | Id | Tracks |\n");
        section.push_str("|:---|:---|:---:|\n");

        let names: HashMap<&str, &str> = playlists
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        for (id, count) in sorted_counts(&summary.by_playlist) {
            let name = names.get(id.as_str()).copied().unwrap_or(id.as_str());
            section.push_str(&format!(
                "| {} | `{}` | {} |\n",
                escape_cell(name),
                id,
                count
            ));
        }
        section.push('\n');
    }

    if !summary.most_shared.is_empty() {
        section.push_str("### Most Shared Tracks\n\n");
        section.push_str("| Track | Artists | Playlists |\n");
        section.push_str("|:---|:---|:---:|\n");

        for track in &summary.most_shared {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&track.name),
                escape_cell(&track.artists),
                track.playlists
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the playlists section.
fn generate_playlists_section(playlists: &[Playlist]) -> String {
    let mut section = String::new();

    section.push_str("## Playlists\n\n");

    if playlists.is_empty() {
        section.push_str("No playlists were scanned.\n\n");
        return section;
    }

    section.push_str("| Playlist | Id | Owner | Tracks |\n");
    section.push_str("|:---|:---|:---|:---:|\n");

    for playlist in playlists {
        section.push_str(&format!(
            "| [{}]({}) | `{}` | {} | {} |\n",
            escape_cell(&playlist.name),
            playlist.link,
            playlist.id,
            escape_cell(&playlist.owner.display_name),
            playlist.num_tracks
        ));
    }
    section.push('\n');

    section
}

/// Generate the tracks section.
fn generate_tracks_section(tracks: &[Track], options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Tracks\n\n");

    if tracks.is_empty() {
        section.push_str("No tracks matched the query.\n\n");
        return section;
    }

    let shown = if options.max_tracks == 0 {
        tracks.len()
    } else {
        options.max_tracks.min(tracks.len())
    };

    if options.include_memberships {
        section.push_str("| # | Track | Artists | Album | Year | Length | Popularity | Playlists |\n");
        section.push_str("|---:|:---|:---|:---|:---:|:---:|:---:|:---|\n");
    } else {
        section.push_str("| # | Track | Artists | Album | Year | Length | Popularity |\n");
        section.push_str("|---:|:---|:---|:---|:---:|:---:|:---:|\n");
    }

    for (i, track) in tracks.iter().take(shown).enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            escape_cell(&track.name),
            escape_cell(&track.artist_line()),
            escape_cell(&track.album),
            track.release_year,
            track.duration_display(),
            track.popularity
        ));
        if options.include_memberships {
            section.push_str(&format!(" {} |", escape_cell(&track.playlist_names())));
        }
        section.push('\n');
    }
    section.push('\n');

    if shown < tracks.len() {
        section.push_str(&format!(
            "*{} more tracks not shown.*\n\n",
            tracks.len() - shown
        ));
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by trackdex v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in `format` and write it to `path`.
pub fn write_report(
    report: &Report,
    format: OutputFormat,
    options: &ReportConfig,
    path: &Path,
) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Markdown => generate_markdown_report(report, options),
    };

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
