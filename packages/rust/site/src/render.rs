//! Static site renderer.
//!
//! Rebuilds the whole site from archive history:
//! - `index.html` — the latest day
//! - `archive/index.html` — listing with per-stream badges
//! - `archive/YYYY-MM-DD.html` — one page per day
//! - `style.css`
//!
//! Narrative text passes through a small Markdown subset (headings, bold,
//! emphasis, horizontal rules); everything else is escaped.

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{info, warn};

use daybrief_shared::{DailyRecord, DaybriefError, Result, StreamConfig};

static HEADING_3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").unwrap());
static HEADING_2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static HEADING_1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").unwrap());
static HRULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^---+\s*$").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());

/// Render the full site from history. Returns the number of day pages written.
pub fn render_site(
    history: &[DailyRecord],
    streams: &[StreamConfig],
    site_dir: &Path,
) -> Result<usize> {
    let archive_dir = site_dir.join("archive");
    std::fs::create_dir_all(&archive_dir).map_err(|e| DaybriefError::io(&archive_dir, e))?;

    write_file(&site_dir.join("style.css"), STYLE_CSS)?;

    if history.is_empty() {
        warn!("no archive history, rendering empty site");
        let page = page_shell("Daybrief", "style.css", "<p class=\"quiet\">Nothing published yet.</p>");
        write_file(&site_dir.join("index.html"), &page)?;
        write_file(
            &archive_dir.join("index.html"),
            &page_shell("Archive — Daybrief", "../style.css", "<p class=\"quiet\">Nothing published yet.</p>"),
        )?;
        return Ok(0);
    }

    for record in history {
        let body = day_body(record, streams);
        let page = page_shell(
            &format!("{} — Daybrief", format_date(record.date)),
            "../style.css",
            &body,
        );
        write_file(&archive_dir.join(format!("{}.html", record.date)), &page)?;
    }

    // Latest day doubles as the front page
    let latest = &history[0];
    let index_page = page_shell("Daybrief", "style.css", &day_body(latest, streams));
    write_file(&site_dir.join("index.html"), &index_page)?;

    let archive_page = page_shell("Archive — Daybrief", "../style.css", &archive_body(history));
    write_file(&archive_dir.join("index.html"), &archive_page)?;

    info!(days = history.len(), ?site_dir, "site rendered");
    Ok(history.len())
}

// ---------------------------------------------------------------------------
// Page assembly
// ---------------------------------------------------------------------------

/// Wrap body HTML in the common page shell.
fn page_shell(title: &str, css_path: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="{css_path}">
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Body HTML for one day: each configured stream gets its section or a
/// quiet-day note.
fn day_body(record: &DailyRecord, streams: &[StreamConfig]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<h1 class=\"date\">{}</h1>\n",
        escape_html(&format_date(record.date))
    ));

    for stream in streams {
        match record.section(&stream.id) {
            Some(section) => {
                out.push_str(&format!(
                    "<section class=\"stream\">\n<h2>{}</h2>\n{}\n",
                    escape_html(&section.title),
                    md_to_html(&section.narrative)
                ));
                if !section.source_links.is_empty() {
                    out.push_str("<h3 class=\"sources-label\">Sources</h3>\n<ul class=\"sources\">\n");
                    for link in &section.source_links {
                        out.push_str(&format!(
                            "<li><a href=\"{}\">{}</a></li>\n",
                            escape_html(&link.url),
                            escape_html(&link.title)
                        ));
                    }
                    out.push_str("</ul>\n");
                }
                out.push_str("</section>\n");
            }
            None => {
                out.push_str(&format!(
                    "<section class=\"stream\">\n<h2>{}</h2>\n<p class=\"quiet\">Quiet day — nothing new.</p>\n</section>\n",
                    escape_html(&stream.title)
                ));
            }
        }
    }

    out.push_str("<p class=\"nav\"><a href=\"archive/index.html\">Archive</a></p>\n");
    out
}

/// Archive listing with per-stream badges.
fn archive_body(history: &[DailyRecord]) -> String {
    let mut out = String::from("<h1>Archive</h1>\n<ul class=\"archive-list\">\n");
    for record in history {
        let badges: String = record
            .sections
            .iter()
            .map(|s| format!("<span class=\"badge\">{}</span>", escape_html(&s.title)))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "<li><a href=\"{date}.html\">{pretty}</a> {badges}</li>\n",
            date = record.date,
            pretty = escape_html(&format_date(record.date)),
        ));
    }
    out.push_str("</ul>\n<p class=\"nav\"><a href=\"../index.html\">Latest</a></p>\n");
    out
}

/// `2026-08-25` → `August 25, 2026`.
fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

// ---------------------------------------------------------------------------
// Markdown subset
// ---------------------------------------------------------------------------

/// Convert the narrative Markdown subset to HTML, escaping everything else.
fn md_to_html(md: &str) -> String {
    let escaped = escape_html(md);
    let html = HRULE.replace_all(&escaped, "<hr>");
    let html = HEADING_3.replace_all(&html, "<h3>$1</h3>");
    let html = HEADING_2.replace_all(&html, "<h2>$1</h2>");
    let html = HEADING_1.replace_all(&html, "<h1>$1</h1>");
    let html = BOLD.replace_all(&html, "<strong>$1</strong>");
    let html = EMPHASIS.replace_all(&html, "<em>$1</em>");

    // Paragraph-wrap plain runs; block elements pass through untouched
    html.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with("<h") || p.starts_with("<hr") {
                p.to_string()
            } else {
                format!("<p>{}</p>", p.replace('\n', "<br>"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape HTML-significant characters. Quotes included, since the output
/// also lands inside attribute values.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| DaybriefError::io(path, e))
}

const STYLE_CSS: &str = r#"
:root { --fg: #1c1c1c; --muted: #777; --accent: #b32626; --bg: #faf9f6; }
* { box-sizing: border-box; }
body { margin: 0; background: var(--bg); color: var(--fg);
       font: 17px/1.65 Georgia, 'Times New Roman', serif; }
main { max-width: 44rem; margin: 0 auto; padding: 2.5rem 1.25rem; }
h1.date { font-size: 1.4rem; color: var(--muted); font-weight: normal;
          border-bottom: 1px solid #ddd; padding-bottom: 0.75rem; }
section.stream { margin: 2.5rem 0; }
section.stream h2 { color: var(--accent); font-size: 1.25rem; }
.quiet { color: var(--muted); font-style: italic; }
.sources-label { font-size: 0.9rem; text-transform: uppercase;
                 letter-spacing: 0.05em; color: var(--muted); }
ul.sources { font-size: 0.9rem; }
ul.archive-list { list-style: none; padding: 0; }
ul.archive-list li { margin: 0.6rem 0; }
.badge { font-size: 0.75rem; background: #eee; border-radius: 3px;
         padding: 0.1rem 0.4rem; color: var(--muted); }
.nav { margin-top: 3rem; font-size: 0.9rem; }
a { color: var(--accent); }
hr { border: none; border-top: 1px solid #ddd; margin: 2rem 0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use daybrief_shared::{CURRENT_SCHEMA_VERSION, DaySection, SourceLink, StoreBackend};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn streams() -> Vec<StreamConfig> {
        ["pure-signal", "maranello"]
            .iter()
            .map(|id| StreamConfig {
                id: (*id).into(),
                title: format!("Title {id}"),
                backend: StoreBackend::Json,
                persona: None,
                sources: vec![],
            })
            .collect()
    }

    fn record(date: &str, stream_ids: &[&str]) -> DailyRecord {
        DailyRecord {
            schema_version: CURRENT_SCHEMA_VERSION,
            date: date.parse().unwrap(),
            sections: stream_ids
                .iter()
                .map(|id| DaySection {
                    stream_id: (*id).into(),
                    title: format!("Title {id}"),
                    narrative: "**Bold** start.\n\nSecond paragraph.".into(),
                    source_links: vec![SourceLink {
                        title: "An article".into(),
                        url: "https://example.com/a".into(),
                    }],
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn temp_site() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("db_site_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn renders_all_pages() {
        let dir = temp_site();
        let history = vec![
            record("2026-08-25", &["pure-signal"]),
            record("2026-08-24", &["pure-signal", "maranello"]),
        ];

        let days = render_site(&history, &streams(), &dir).expect("render");
        assert_eq!(days, 2);
        assert!(dir.join("index.html").exists());
        assert!(dir.join("style.css").exists());
        assert!(dir.join("archive/index.html").exists());
        assert!(dir.join("archive/2026-08-25.html").exists());
        assert!(dir.join("archive/2026-08-24.html").exists());
    }

    #[test]
    fn index_is_latest_day_with_quiet_note() {
        let dir = temp_site();
        let history = vec![record("2026-08-25", &["pure-signal"])];
        render_site(&history, &streams(), &dir).expect("render");

        let index = std::fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(index.contains("Title pure-signal"));
        // Stream without a section still appears, quiet
        assert!(index.contains("Title maranello"));
        assert!(index.contains("Quiet day"));
        assert!(index.contains("August 25, 2026"));
    }

    #[test]
    fn empty_history_still_renders() {
        let dir = temp_site();
        let days = render_site(&[], &streams(), &dir).expect("render");
        assert_eq!(days, 0);
        let index = std::fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(index.contains("Nothing published yet"));
    }

    #[test]
    fn markdown_subset_converts() {
        let html = md_to_html("## Theme\n\n**Bold** and *subtle* words.\n\n---\n\nClose.");
        assert!(html.contains("<h2>Theme</h2>"));
        assert!(html.contains("<strong>Bold</strong>"));
        assert!(html.contains("<em>subtle</em>"));
        assert!(html.contains("<hr>"));
        assert!(html.contains("<p>Close.</p>"));
    }

    #[test]
    fn narrative_html_is_escaped() {
        let html = md_to_html("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn escape_covers_attribute_contexts() {
        assert_eq!(
            escape_html(r#"a"b'c<d>&"#),
            "a&quot;b&#39;c&lt;d&gt;&amp;"
        );
    }

    #[test]
    fn link_url_quotes_cannot_break_out_of_href() {
        let dir = temp_site();
        let mut rec = record("2026-08-25", &["pure-signal"]);
        rec.sections[0].source_links = vec![SourceLink {
            title: "Quoted".into(),
            url: r#"https://example.com/a?q="><script>"#.into(),
        }];
        render_site(&[rec], &streams(), &dir).expect("render");

        let page = std::fs::read_to_string(dir.join("archive/2026-08-25.html")).unwrap();
        assert!(!page.contains(r#""><script>"#));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn source_links_rendered_in_order() {
        let dir = temp_site();
        let history = vec![record("2026-08-25", &["pure-signal"])];
        render_site(&history, &streams(), &dir).expect("render");
        let page = std::fs::read_to_string(dir.join("archive/2026-08-25.html")).unwrap();
        assert!(page.contains("https://example.com/a"));
        assert!(page.contains("An article"));
    }
}
