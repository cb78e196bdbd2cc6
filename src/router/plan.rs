//! Strategy-specific planning of structural units.
//!
//! Every strategy answers the same question: given a document's segments,
//! which spans of prose are windowed together and where do tables sit. The
//! answer is an ordered list of [`Block`]s in document order.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{ChunkingStrategy, HeadingPath, Segment, SegmentKind};

lazy_static! {
    /// Bracketed section markers used in Korean court rulings, e.g. `【주문】`, `【이유】`.
    pub(crate) static ref LEGAL_MARKER: Regex = Regex::new(r"【([^】\n]{1,30})】").unwrap();
}

/// A slice of prose that belongs to one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPiece<'a> {
    pub text: &'a str,
    pub order: u64,
    pub page: Option<u32>,
    /// Heading path chunks cut from this piece inherit
    pub heading_path: HeadingPath,
}

/// A contiguous span of prose windowed as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralUnit<'a> {
    pub pieces: Vec<TextPiece<'a>>,
}

/// One step of the plan: a prose unit or an isolated table.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Unit(StructuralUnit<'a>),
    Table(&'a Segment),
}

/// Splits a document's segments into structural units and isolated tables.
pub trait UnitPlanner {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>>;
}

/// Accumulates pieces into the current unit and emits blocks in order.
#[derive(Default)]
struct PlanBuilder<'a> {
    blocks: Vec<Block<'a>>,
    current: StructuralUnit<'a>,
}

impl<'a> PlanBuilder<'a> {
    fn push_piece(&mut self, piece: TextPiece<'a>) {
        if !piece.text.trim().is_empty() {
            self.current.pieces.push(piece);
        }
    }

    fn break_unit(&mut self) {
        if !self.current.pieces.is_empty() {
            let unit = std::mem::take(&mut self.current);
            self.blocks.push(Block::Unit(unit));
        }
    }

    fn push_table(&mut self, segment: &'a Segment) {
        self.break_unit();
        self.blocks.push(Block::Table(segment));
    }

    fn last_path(&self) -> Option<&HeadingPath> {
        self.current.pieces.last().map(|p| &p.heading_path)
    }

    fn finish(mut self) -> Vec<Block<'a>> {
        self.break_unit();
        self.blocks
    }
}

fn whole_piece(segment: &Segment) -> TextPiece<'_> {
    TextPiece {
        text: &segment.content,
        order: segment.order,
        page: segment.page,
        heading_path: segment.heading_path.clone(),
    }
}

/// Units begin at each `【…】` marker; the marker label extends the heading path.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegalPlanner;

impl UnitPlanner for LegalPlanner {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>> {
        let mut builder = PlanBuilder::default();
        // Path of the open marker section; carried across segments until the next marker.
        let mut section_path: Option<HeadingPath> = None;

        for segment in segments {
            if segment.kind == SegmentKind::Table {
                builder.push_table(segment);
                continue;
            }

            let text = segment.content.as_str();
            let mut cuts: Vec<(usize, Option<&str>)> = vec![(0, None)];
            for caps in LEGAL_MARKER.captures_iter(text) {
                if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                    cuts.push((whole.start(), Some(label.as_str().trim())));
                }
            }

            for (i, &(start, label)) in cuts.iter().enumerate() {
                let end = cuts.get(i + 1).map_or(text.len(), |&(next, _)| next);
                if let Some(label) = label {
                    builder.break_unit();
                    section_path = Some(segment.heading_path.child(label));
                }
                let heading_path = section_path
                    .clone()
                    .unwrap_or_else(|| segment.heading_path.clone());
                builder.push_piece(TextPiece {
                    text: &text[start..end],
                    order: segment.order,
                    page: segment.page,
                    heading_path,
                });
            }
        }

        builder.finish()
    }
}

/// Every text segment is its own unit; tables are isolated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularPlanner;

impl UnitPlanner for TabularPlanner {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>> {
        let mut builder = PlanBuilder::default();
        for segment in segments {
            if segment.kind == SegmentKind::Table {
                builder.push_table(segment);
            } else {
                builder.break_unit();
                builder.push_piece(whole_piece(segment));
            }
        }
        builder.finish()
    }
}

/// A unit spans consecutive segments that share one heading path.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalPlanner;

impl UnitPlanner for HierarchicalPlanner {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>> {
        let mut builder = PlanBuilder::default();
        for segment in segments {
            if segment.kind == SegmentKind::Table {
                builder.push_table(segment);
                continue;
            }
            if builder.last_path().is_some_and(|p| *p != segment.heading_path) {
                builder.break_unit();
            }
            builder.push_piece(whole_piece(segment));
        }
        builder.finish()
    }
}

/// One unit for all prose between tables; headings are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPlanner;

impl UnitPlanner for FallbackPlanner {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>> {
        let mut builder = PlanBuilder::default();
        for segment in segments {
            if segment.kind == SegmentKind::Table {
                builder.push_table(segment);
            } else {
                builder.push_piece(whole_piece(segment));
            }
        }
        builder.finish()
    }
}

impl UnitPlanner for ChunkingStrategy {
    fn plan<'a>(&self, segments: &'a [Segment]) -> Vec<Block<'a>> {
        match self {
            ChunkingStrategy::Legal => LegalPlanner.plan(segments),
            ChunkingStrategy::Tabular => TabularPlanner.plan(segments),
            ChunkingStrategy::Hierarchical => HierarchicalPlanner.plan(segments),
            ChunkingStrategy::Fallback => FallbackPlanner.plan(segments),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn path(headings: &[&str]) -> HeadingPath {
        HeadingPath::new(headings.iter().copied())
    }

    /// Summarise blocks as `T` for tables and the unit's piece texts otherwise.
    fn shape(blocks: &[Block<'_>]) -> Vec<Vec<String>> {
        blocks
            .iter()
            .map(|b| match b {
                Block::Table(_) => vec!["T".to_string()],
                Block::Unit(u) => u.pieces.iter().map(|p| p.text.trim().to_string()).collect(),
            })
            .collect()
    }

    fn sample() -> Vec<Segment> {
        vec![
            Segment::text(0, "a", path(&["1장", "개요"])),
            Segment::text(1, "b", path(&["1장", "개요"])),
            Segment::image(2, "c", path(&["1장", "배경"])),
            Segment::table(3, "|x|\n|-|\n|1|", path(&["1장", "배경"])),
            Segment::text(4, "d", path(&["2장"])),
            Segment::text(5, "   ", path(&["2장"])),
        ]
    }

    #[test]
    fn test_hierarchical_breaks_on_heading_change() {
        let segments = sample();
        let blocks = ChunkingStrategy::Hierarchical.plan(&segments);
        assert_eq!(shape(&blocks), vec![vec!["a", "b"], vec!["c"], vec!["T"], vec!["d"]]);
    }

    #[test]
    fn test_fallback_ignores_headings() {
        let segments = sample();
        let blocks = ChunkingStrategy::Fallback.plan(&segments);
        assert_eq!(shape(&blocks), vec![vec!["a", "b", "c"], vec!["T"], vec!["d"]]);
    }

    #[test]
    fn test_tabular_unit_per_segment() {
        let segments = sample();
        let blocks = ChunkingStrategy::Tabular.plan(&segments);
        assert_eq!(
            shape(&blocks),
            vec![vec!["a"], vec!["b"], vec!["c"], vec!["T"], vec!["d"]]
        );
    }

    #[test]
    fn test_legal_splits_at_markers() {
        let segments = vec![
            Segment::text(0, "대법원 판결 사건 2023다1234", path(&["판결"])),
            Segment::text(1, "【주문】 상고를 기각한다. 【이유】 상고이유를 판단한다.", path(&["판결"])),
            Segment::text(2, "원심의 판단은 정당하다.", path(&["판결"])),
        ];
        let blocks = ChunkingStrategy::Legal.plan(&segments);

        assert_eq!(
            shape(&blocks),
            vec![
                vec!["대법원 판결 사건 2023다1234"],
                vec!["【주문】 상고를 기각한다."],
                vec!["【이유】 상고이유를 판단한다.", "원심의 판단은 정당하다."],
            ]
        );
        let Block::Unit(reasons) = &blocks[2] else { panic!("expected unit") };
        assert_eq!(reasons.pieces[0].heading_path, path(&["판결", "이유"]));
        assert_eq!(reasons.pieces[1].heading_path, path(&["판결", "이유"]));
        let Block::Unit(preamble) = &blocks[0] else { panic!("expected unit") };
        assert_eq!(preamble.pieces[0].heading_path, path(&["판결"]));
    }
}
