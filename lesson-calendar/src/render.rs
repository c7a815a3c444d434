use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lesson_grid::{Align, CalendarGrid, Cell, Color, Effect, StyleDirective, VAlign, LEADING_COLUMNS};
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::font::{encode_win_ansi, BodyFont, EmbeddedFont, NOTDEF};

const CM: f32 = 28.346_457;

// A4 portrait
const PAGE_WIDTH: f32 = 595.275_6;
const PAGE_HEIGHT: f32 = 841.889_8;
const MARGIN: f32 = CM;

const TITLE_SIZE: f32 = 14.0;
const TITLE_LEADING: f32 = 22.0;
const TITLE_SPACE_AFTER: f32 = 6.0;
const TITLE_TABLE_GAP: f32 = -0.3 * CM;

const WEEK_COLUMN_WIDTH: f32 = 1.2 * CM;
const DATE_COLUMN_WIDTH: f32 = 1.5 * CM;
const SLOT_COLUMN_WIDTH: f32 = 1.5 * CM;
const ROW_HEIGHT: f32 = 0.8 * CM;

const CELL_PADDING: f32 = 6.0;
const DEFAULT_FONT_SIZE: f32 = 10.0;

const BODY_FONT: &str = "F1";
const TITLE_FONT: &str = "F2";

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellStyle {
    font_size: f32,
    leading: Option<f32>,
    align: Align,
    valign: VAlign,
    background: Option<Color>,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            leading: None,
            align: Align::Left,
            valign: VAlign::Bottom,
            background: None,
        }
    }
}

impl CellStyle {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Background(color) => self.background = Some(color),
            Effect::Leading(leading) => self.leading = Some(leading),
            Effect::FontSize(size) => self.font_size = size,
            Effect::Align(align) => self.align = align,
            Effect::VAlign(valign) => self.valign = valign,
            Effect::Span | Effect::InnerGrid { .. } | Effect::Box { .. } => {}
        }
    }

    fn leading(&self) -> f32 {
        self.leading.unwrap_or(self.font_size * 1.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// The grid's directives resolved per cell and positioned on the page.
struct TableLayout<'a> {
    grid: &'a CalendarGrid,
    styles: Vec<Vec<CellStyle>>,
    /// Bottom-right cell of the area each cell draws, `None` for cells hidden by a span.
    extents: Vec<Vec<Option<Cell>>>,
    column_edges: Vec<f32>,
    left: f32,
    top: f32,
    inner_grid: Option<(f32, Color)>,
    outer_box: Option<(f32, Color)>,
}

impl<'a> TableLayout<'a> {
    fn new(grid: &'a CalendarGrid, top: f32) -> Self {
        let rows = grid.rows().len();
        let cols = grid.column_count();

        let mut styles = vec![vec![CellStyle::default(); cols]; rows];
        let mut extents = (0..rows)
            .map(|row| (0..cols).map(|col| Some(Cell::new(col, row))).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let mut inner_grid = None;
        let mut outer_box = None;

        for directive in grid.styles() {
            let Some((from, to)) = clamp(directive, cols, rows) else {
                continue;
            };

            match directive.effect {
                Effect::Span => {
                    dissolve_overlapping_spans(&mut extents, from, to);
                    for row in &mut extents[from.row..=to.row] {
                        row[from.col..=to.col].fill(None);
                    }
                    extents[from.row][from.col] = Some(to);
                }
                Effect::InnerGrid { width, color } => inner_grid = Some((width, color)),
                Effect::Box { width, color } => outer_box = Some((width, color)),
                effect => {
                    for row in &mut styles[from.row..=to.row] {
                        for style in &mut row[from.col..=to.col] {
                            style.apply(effect);
                        }
                    }
                }
            }
        }

        let widths = [WEEK_COLUMN_WIDTH, DATE_COLUMN_WIDTH]
            .into_iter()
            .chain(std::iter::repeat(SLOT_COLUMN_WIDTH).take(cols - LEADING_COLUMNS));

        let mut column_edges = vec![0.0];
        for width in widths {
            column_edges.push(column_edges[column_edges.len() - 1] + width);
        }

        let table_width = column_edges[column_edges.len() - 1];

        Self {
            grid,
            styles,
            extents,
            column_edges,
            left: (PAGE_WIDTH - table_width) / 2.0,
            top,
            inner_grid,
            outer_box,
        }
    }

    fn table_rect(&self) -> Rect {
        let rows = self.grid.rows().len();
        let cols = self.grid.column_count();
        self.area(Cell::new(0, 0), Cell::new(cols - 1, rows - 1))
    }

    fn area(&self, from: Cell, to: Cell) -> Rect {
        let height = (to.row - from.row + 1) as f32 * ROW_HEIGHT;
        Rect {
            x: self.left + self.column_edges[from.col],
            y: self.top - from.row as f32 * ROW_HEIGHT - height,
            width: self.column_edges[to.col + 1] - self.column_edges[from.col],
            height,
        }
    }

    /// Every drawn cell with the rectangle it covers.
    fn visible_cells(&self) -> impl Iterator<Item = (Cell, Rect)> + '_ {
        self.extents.iter().enumerate().flat_map(move |(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, extent)| {
                let from = Cell::new(col, row);
                extent.map(|to| (from, self.area(from, to)))
            })
        })
    }

    fn operations(&self, font: &BodyFont) -> Vec<Operation> {
        let mut ops = Vec::new();

        for (cell, rect) in self.visible_cells() {
            if let Some(color) = self.styles[cell.row][cell.col].background {
                ops.push(fill_color(color));
                ops.push(rectangle(rect));
                ops.push(Operation::new("f", vec![]));
            }
        }

        if let Some((width, color)) = self.inner_grid {
            ops.extend(stroke_style(width, color));
            for (_, rect) in self.visible_cells() {
                ops.push(rectangle(rect));
            }
            ops.push(Operation::new("S", vec![]));
        }

        if let Some((width, color)) = self.outer_box {
            ops.extend(stroke_style(width, color));
            ops.push(rectangle(self.table_rect()));
            ops.push(Operation::new("S", vec![]));
        }

        ops.push(fill_color(Color::Black));
        for (cell, rect) in self.visible_cells() {
            let text = &self.grid.rows()[cell.row][cell.col];
            if !text.is_empty() {
                ops.extend(cell_text(text, rect, self.styles[cell.row][cell.col], font));
            }
        }

        ops
    }
}

/// Splits every earlier span overlapping `from..=to` back into single cells,
/// so a later span never leaves part of an older one hidden.
fn dissolve_overlapping_spans(extents: &mut [Vec<Option<Cell>>], from: Cell, to: Cell) {
    let overlapping = extents
        .iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, extent)| {
                let origin = Cell::new(col, row);
                extent
                    .filter(|end| {
                        *end != origin
                            && origin.col <= to.col
                            && end.col >= from.col
                            && origin.row <= to.row
                            && end.row >= from.row
                    })
                    .map(|end| (origin, end))
            })
        })
        .collect::<Vec<_>>();

    for (origin, end) in overlapping {
        for row in origin.row..=end.row {
            for col in origin.col..=end.col {
                extents[row][col] = Some(Cell::new(col, row));
            }
        }
    }
}

fn clamp(directive: &StyleDirective, cols: usize, rows: usize) -> Option<(Cell, Cell)> {
    let (from, to) = (directive.from, directive.to);
    if from.col >= cols || from.row >= rows || from.col > to.col || from.row > to.row {
        return None;
    }

    Some((from, Cell::new(to.col.min(cols - 1), to.row.min(rows - 1))))
}

fn fill_color(color: Color) -> Operation {
    let (r, g, b) = color.rgb();
    Operation::new("rg", vec![real(r), real(g), real(b)])
}

fn stroke_style(width: f32, color: Color) -> [Operation; 2] {
    let (r, g, b) = color.rgb();
    [
        Operation::new("RG", vec![real(r), real(g), real(b)]),
        Operation::new("w", vec![real(width)]),
    ]
}

fn rectangle(rect: Rect) -> Operation {
    Operation::new(
        "re",
        vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
    )
}

fn text_line(font_name: &str, size: f32, x: f32, y: f32, text: Object) -> [Operation; 5] {
    [
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font_name.into(), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new("Tj", vec![text]),
        Operation::new("ET", vec![]),
    ]
}

/// Glyph id strings are written as hex so no byte is read as a line end.
fn body_string(font: &BodyFont, text: &str) -> Object {
    match font {
        BodyFont::Embedded(_) => Object::String(font.encode(text), StringFormat::Hexadecimal),
        BodyFont::Helvetica => Object::string_literal(font.encode(text)),
    }
}

/// Lays out the lines of `text` inside `rect` according to `style`.
fn cell_text(text: &str, rect: Rect, style: CellStyle, font: &BodyFont) -> Vec<Operation> {
    let lines = text.split('\n').collect::<Vec<_>>();
    let leading = style.leading();
    let block_height = lines.len() as f32 * leading;

    let block_top = match style.valign {
        VAlign::Top => rect.y + rect.height - CELL_PADDING / 2.0,
        VAlign::Middle => rect.y + (rect.height + block_height) / 2.0,
        VAlign::Bottom => rect.y + CELL_PADDING / 2.0 + block_height,
    };

    let mut ops = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let width = font.text_width(line, style.font_size);
        let x = match style.align {
            Align::Left => rect.x + CELL_PADDING,
            Align::Center => rect.x + (rect.width - width) / 2.0,
            Align::Right => rect.x + rect.width - CELL_PADDING - width,
        };
        let y = block_top - style.font_size - idx as f32 * leading;

        ops.extend(text_line(
            BODY_FONT,
            style.font_size,
            x,
            y,
            body_string(font, line),
        ));
    }

    ops
}

fn page_operations(grid: &CalendarGrid, font: &BodyFont) -> Vec<Operation> {
    let title = grid.title();
    let title_width = BodyFont::Helvetica.text_width(&title, TITLE_SIZE);

    let mut ops = vec![fill_color(Color::Black)];
    ops.extend(text_line(
        TITLE_FONT,
        TITLE_SIZE,
        (PAGE_WIDTH - title_width) / 2.0,
        PAGE_HEIGHT - MARGIN - TITLE_SIZE,
        Object::string_literal(encode_win_ansi(&title)),
    ));

    let table_top = PAGE_HEIGHT - MARGIN - TITLE_LEADING - TITLE_SPACE_AFTER - TITLE_TABLE_GAP;
    ops.extend(TableLayout::new(grid, table_top).operations(font));

    ops
}

fn add_type1_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Every glyph the grid's text uses, with the character it shows.
fn used_glyphs(grid: &CalendarGrid, font: &EmbeddedFont) -> BTreeMap<u16, char> {
    let mut glyphs = BTreeMap::new();

    for line in grid.rows().iter().flatten().flat_map(|text| text.split('\n')) {
        for (ch, glyph) in line.chars().zip(font.glyph_ids(line)) {
            if glyph != NOTDEF {
                glyphs.entry(glyph).or_insert(ch);
            }
        }
    }

    glyphs
}

/// A CMap mapping glyph ids back to Unicode, so the text can be searched
/// and copied.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(concat!(
        "/CIDInit /ProcSet findresource begin\n",
        "12 dict begin\n",
        "begincmap\n",
        "/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n",
        "/CMapName /Adobe-Identity-UCS def\n",
        "/CMapType 2 def\n",
        "1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    ));

    let entries = glyphs.iter().collect::<Vec<_>>();
    // At most 100 entries per bfchar block
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (glyph, ch) in chunk {
            let mut units = [0; 2];
            let unicode = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect::<String>();
            cmap.push_str(&format!("<{glyph:04X}> <{unicode}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(concat!(
        "endcmap\n",
        "CMapName currentdict /CMap defineresource pop\n",
        "end\n",
        "end\n",
    ));

    cmap
}

fn add_type0_font(
    doc: &mut Document,
    font: &EmbeddedFont,
    glyphs: &BTreeMap<u16, char>,
) -> ObjectId {
    let file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => Object::Integer(font.data.len() as i64) },
        font.data.clone(),
    ));

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.name.as_str(),
        // Symbolic
        "Flags" => Object::Integer(4),
        "FontBBox" => font.bbox.iter().map(|&v| Object::Integer(v.into())).collect::<Vec<_>>(),
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Integer(font.ascent.into()),
        "Descent" => Object::Integer(font.descent.into()),
        "CapHeight" => Object::Integer(font.cap_height.into()),
        "StemV" => Object::Integer(80),
        "FontFile2" => file_id,
    });

    let widths = glyphs
        .keys()
        .flat_map(|&glyph| {
            [
                Object::Integer(glyph.into()),
                Object::Array(vec![Object::Integer(font.glyph_width(glyph).into())]),
            ]
        })
        .collect::<Vec<_>>();

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => font.name.as_str(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => descriptor_id,
        "DW" => Object::Integer(font.glyph_width(NOTDEF).into()),
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(glyphs).into_bytes(),
    ));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => font.name.as_str(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

/// Renders `grid` as a single-page PDF.
pub fn render_pdf(grid: &CalendarGrid, font: &BodyFont) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font_id = match font {
        BodyFont::Embedded(font) => {
            let glyphs = used_glyphs(grid, font);
            add_type0_font(&mut doc, font, &glyphs)
        }
        BodyFont::Helvetica => add_type1_font(&mut doc, "Helvetica"),
    };
    let title_font_id = add_type1_font(&mut doc, "Helvetica-Bold");

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            BODY_FONT => body_font_id,
            TITLE_FONT => title_font_id,
        },
    });

    let content = Content {
        operations: page_operations(grid, font),
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().context("Failed to encode page content")?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => Object::Integer(1),
        "Resources" => resources_id,
        "MediaBox" => vec![real(0.0), real(0.0), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).context("Failed to serialize PDF")?;

    Ok(bytes)
}

pub fn write_pdf(grid: &CalendarGrid, font: &BodyFont, path: &Path) -> Result<()> {
    let bytes = render_pdf(grid, font)?;
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
