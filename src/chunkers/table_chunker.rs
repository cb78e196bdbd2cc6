//! Table isolation for markdown and delimited tables.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::base::TokenCounter;
use crate::types::{ChunkCandidate, ChunkFlags, ChunkKind, ChunkingConfig, Segment, TableFormat};

lazy_static! {
    /// A markdown separator cell such as `---`, `:--`, `:-:`.
    static ref SEPARATOR_CELL: Regex = Regex::new(r"^:?-+:?$").unwrap();
}

/// A parsed table grid: header row, data rows and the free-text lines
/// (captions, unit notes) around it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TableGrid {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    leading: Vec<String>,
    trailing: Vec<String>,
}

impl TableGrid {
    fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Turns a table segment into exactly one self-contained chunk.
///
/// Tables are never split mid-row and never merged with prose. A table that
/// exceeds `max_tokens` is emitted whole and flagged oversized.
#[derive(Clone)]
pub struct TableIsolator {
    counter: Arc<dyn TokenCounter>,
}

impl TableIsolator {
    /// Create a new table isolator.
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    /// Isolate a table segment; whitespace-only tables yield nothing.
    pub fn isolate(&self, segment: &Segment, config: &ChunkingConfig) -> Option<ChunkCandidate> {
        if segment.is_blank() {
            debug!(segment = segment.order, "Skipping blank table segment");
            return None;
        }

        let content = self.serialize(&segment.content, config.table_format);
        let token_count = self.counter.count_tokens(&content);
        let oversized = token_count > config.max_tokens;
        if oversized {
            debug!(
                segment = segment.order,
                token_count,
                max_tokens = config.max_tokens,
                "Table exceeds token ceiling, emitting whole"
            );
        }

        Some(ChunkCandidate {
            kind: ChunkKind::Table,
            content,
            token_count,
            heading_path: segment.heading_path.clone(),
            page: segment.page,
            flags: ChunkFlags {
                oversized,
                segmentation_degraded: false,
            },
            overlap_sentences: 0,
            sentence_count: 1,
            source_order: segment.order,
        })
    }

    /// Serialize raw table content in the requested format.
    ///
    /// Content that does not parse as a table passes through trimmed.
    pub fn serialize(&self, content: &str, format: TableFormat) -> String {
        let Some(grid) = parse_table(content) else {
            return content.trim().to_string();
        };

        match format {
            TableFormat::Markdown => render_markdown(&grid),
            TableFormat::RowSentences => {
                let rendered = render_row_sentences(&grid);
                if rendered.is_empty() {
                    render_markdown(&grid)
                } else {
                    rendered
                }
            }
        }
    }
}

/// Parse markdown (`| a | b |`), tab-separated or comma-separated content.
fn parse_table(content: &str) -> Option<TableGrid> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let first = lines.first()?;

    if lines.iter().any(|l| l.starts_with('|')) {
        parse_markdown(&lines)
    } else if first.contains('\t') {
        grid(lines.iter().map(|l| split_delimited(l, '\t')).collect())
    } else if lines.len() >= 2 && lines.iter().all(|l| l.contains(',')) {
        parse_csv(&lines)
    } else {
        None
    }
}

/// Markdown rows may omit the outer pipes. Lines without any pipe are kept
/// as captions before or after the grid.
fn parse_markdown(lines: &[&str]) -> Option<TableGrid> {
    let mut leading = Vec::new();
    let mut trailing = Vec::new();
    let mut rows = Vec::new();

    for line in lines {
        if line.contains('|') {
            let cells = split_markdown_row(line);
            if !is_separator_row(&cells) {
                rows.push(cells);
            }
        } else if rows.is_empty() {
            leading.push(line.to_string());
        } else {
            trailing.push(line.to_string());
        }
    }

    let mut table = grid(rows)?;
    table.leading = leading;
    table.trailing = trailing;
    Some(table)
}

/// Every CSV row must have as many cells as the header.
fn parse_csv(lines: &[&str]) -> Option<TableGrid> {
    let rows: Vec<Vec<String>> = lines.iter().map(|l| split_csv_row(l)).collect::<Option<_>>()?;
    let width = rows.first()?.len();
    if width < 2 || rows.iter().any(|r| r.len() != width) {
        return None;
    }
    grid(rows)
}

fn grid(mut rows: Vec<Vec<String>>) -> Option<TableGrid> {
    if rows.is_empty() {
        return None;
    }
    let header = rows.remove(0);
    Some(TableGrid {
        header,
        rows,
        ..Default::default()
    })
}

fn split_markdown_row(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|c| c.trim().to_string()).collect()
}

/// Split one CSV line, honouring double quotes and `""` escapes.
///
/// Returns `None` for an unterminated quote.
fn split_csv_row(line: &str) -> Option<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
            }
            ',' if !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            c => cell.push(c),
        }
    }
    if quoted {
        return None;
    }
    cells.push(cell.trim().to_string());
    Some(cells)
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| SEPARATOR_CELL.is_match(c))
}

fn render_markdown(grid: &TableGrid) -> String {
    let width = grid.width().max(1);
    let render_row = |cells: &[String]| {
        let padded: Vec<String> = (0..width)
            .map(|i| cells.get(i).map(|c| c.replace('|', "\\|")).unwrap_or_default())
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = grid.leading.clone();
    lines.push(render_row(grid.header.as_slice()));
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(grid.rows.iter().map(|r| render_row(r.as_slice())));
    lines.extend(grid.trailing.iter().cloned());
    lines.join("\n")
}

/// Empty when no row has a labelled cell.
fn render_row_sentences(grid: &TableGrid) -> String {
    let sentences: Vec<String> = grid
        .rows
        .iter()
        .filter_map(|row| {
            let parts: Vec<String> = grid
                .header
                .iter()
                .zip(row.iter())
                .filter(|(h, c)| !h.is_empty() && !c.is_empty())
                .map(|(h, c)| format!("{}: {}", h, c))
                .collect();
            (!parts.is_empty()).then(|| format!("{}.", parts.join(", ")))
        })
        .collect();
    if sentences.is_empty() {
        return String::new();
    }

    grid.leading
        .iter()
        .chain(&sentences)
        .chain(&grid.trailing)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chunkers::WhitespaceCounter;
    use crate::types::HeadingPath;

    fn isolator() -> TableIsolator {
        TableIsolator::new(Arc::new(WhitespaceCounter))
    }

    #[test]
    fn test_markdown_table_is_normalized() {
        let content = "|구분|2023|2024|\n|---|---|---|\n|세입|100|120|\n|세출|90|\n";
        let rendered = isolator().serialize(content, TableFormat::Markdown);
        assert_eq!(
            rendered,
            "| 구분 | 2023 | 2024 |\n| --- | --- | --- |\n| 세입 | 100 | 120 |\n| 세출 | 90 |  |"
        );
    }

    #[test]
    fn test_csv_is_converted() {
        let rendered = isolator().serialize("name,age\nalice,30\nbob,25", TableFormat::Markdown);
        assert_eq!(rendered, "| name | age |\n| --- | --- |\n| alice | 30 |\n| bob | 25 |");
    }

    #[test]
    fn test_rows_without_outer_pipes_and_captions_are_kept() {
        let content = "|구분|금액|\n|---|---|\n|국세|300|\n지방세 | 110\n(단위: 조원)";
        let rendered = isolator().serialize(content, TableFormat::Markdown);
        assert_eq!(
            rendered,
            "| 구분 | 금액 |\n| --- | --- |\n| 국세 | 300 |\n| 지방세 | 110 |\n(단위: 조원)"
        );
    }

    #[test]
    fn test_leading_caption_is_kept() {
        let content = "<표 1> 세수 현황\n| 구분 | 금액 |\n|---|---|\n| 국세 | 300 |";
        let rendered = isolator().serialize(content, TableFormat::RowSentences);
        assert_eq!(rendered, "<표 1> 세수 현황\n구분: 국세, 금액: 300.");
    }

    #[test]
    fn test_quoted_csv_fields() {
        let content = "구분,금액\n\"국세\",\"1,234\"\n\"지방세 \"\"특별\"\"\",567";
        let rendered = isolator().serialize(content, TableFormat::Markdown);
        assert_eq!(
            rendered,
            "| 구분 | 금액 |\n| --- | --- |\n| 국세 | 1,234 |\n| 지방세 \"특별\" | 567 |"
        );
    }

    #[test]
    fn test_ragged_csv_passes_through() {
        let content = "참고로, 세입은 늘었다\n다만, 세출도 1,200억 늘었다\n";
        let rendered = isolator().serialize(content, TableFormat::Markdown);
        assert_eq!(rendered, content.trim());
    }

    #[test]
    fn test_row_sentences() {
        let content = "| 항목 | 금액 |\n|---|---|\n| 국세 | 300조 |\n| 지방세 | 110조 |";
        let rendered = isolator().serialize(content, TableFormat::RowSentences);
        assert_eq!(rendered, "항목: 국세, 금액: 300조.\n항목: 지방세, 금액: 110조.");
    }

    #[test]
    fn test_unparseable_content_passes_through() {
        let rendered = isolator().serialize("  표 없음  ", TableFormat::Markdown);
        assert_eq!(rendered, "표 없음");
    }

    #[test]
    fn test_oversized_table_is_flagged_not_split() {
        let rows: String = (0..40).map(|i| format!("| 행{} | 값{} |\n", i, i)).collect();
        let content = format!("| 키 | 값 |\n|---|---|\n{}", rows);
        let segment = Segment::table(4, content, HeadingPath::new(["부록"])).on_page(9);
        let config = ChunkingConfig::with_tokens(10, 50, 5);

        let candidate = isolator().isolate(&segment, &config).unwrap();
        assert_eq!(candidate.kind, ChunkKind::Table);
        assert!(candidate.flags.oversized);
        assert!(candidate.token_count > 50);
        assert_eq!(candidate.content.lines().count(), 42);
        assert_eq!(candidate.page, Some(9));
        assert_eq!(candidate.heading_path, HeadingPath::new(["부록"]));
    }

    #[test]
    fn test_blank_table_yields_nothing() {
        let segment = Segment::table(0, "   \n", HeadingPath::root());
        assert!(isolator().isolate(&segment, &ChunkingConfig::default()).is_none());
    }
}
