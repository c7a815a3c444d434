use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use ttf_parser::{Face, GlyphId};

/// Helvetica advance widths for codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_FALLBACK_WIDTH: u16 = 556;

/// Glyph shown for characters missing from a face.
pub const NOTDEF: u16 = 0;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] io::Error),

    #[error("font collections cannot be embedded")]
    Collection,

    #[error("not a TrueType font: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
}

/// A TrueType face embedded as a CID font, addressed by glyph id, with
/// metrics scaled to 1/1000 em.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    pub name: String,
    pub data: Vec<u8>,
    /// Advance width of every glyph, indexed by glyph id.
    advances: Vec<u16>,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    pub bbox: [i16; 4],
}

impl EmbeddedFont {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = fs::read(path)?;
        Self::from_data(font_name(path), data)
    }

    fn from_data(name: String, data: Vec<u8>) -> Result<Self, FontError> {
        if ttf_parser::fonts_in_collection(&data).is_some() {
            return Err(FontError::Collection);
        }

        let face = Face::parse(&data, 0)?;
        let scale = 1000.0 / f32::from(face.units_per_em());
        let to_em = |value: i16| (f32::from(value) * scale).round() as i16;

        let advances = (0..face.number_of_glyphs())
            .map(|id| {
                face.glyph_hor_advance(GlyphId(id))
                    .map_or(0, |advance| (f32::from(advance) * scale).round() as u16)
            })
            .collect();

        let bbox = face.global_bounding_box();
        let ascent = to_em(face.ascender());
        let descent = to_em(face.descender());
        let cap_height = face.capital_height().map_or(ascent, to_em);
        let bbox = [
            to_em(bbox.x_min),
            to_em(bbox.y_min),
            to_em(bbox.x_max),
            to_em(bbox.y_max),
        ];

        Ok(Self {
            name,
            data,
            advances,
            ascent,
            descent,
            cap_height,
            bbox,
        })
    }

    /// Glyph ids for the characters of `text`, `NOTDEF` where the face has
    /// no glyph.
    #[must_use]
    pub fn glyph_ids(&self, text: &str) -> Vec<u16> {
        let face = Face::parse(&self.data, 0).ok();

        text.chars()
            .map(|ch| {
                face.as_ref()
                    .and_then(|face| face.glyph_index(ch))
                    .map_or(NOTDEF, |glyph| glyph.0)
            })
            .collect()
    }

    #[must_use]
    pub fn glyph_width(&self, glyph: u16) -> u16 {
        self.advances
            .get(usize::from(glyph))
            .copied()
            .unwrap_or(0)
    }
}

/// PDF name for an embedded font, taken from the file stem.
fn font_name(path: &Path) -> String {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .unwrap_or_default();

    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

/// The font used for table text.
#[derive(Debug, Clone)]
pub enum BodyFont {
    Embedded(EmbeddedFont),
    Helvetica,
}

impl BodyFont {
    /// Tries each path in order and falls back to Helvetica when none of
    /// them can be embedded.
    pub fn load(paths: &[PathBuf]) -> Self {
        for path in paths {
            match EmbeddedFont::load(path) {
                Ok(font) => {
                    info!("Using font {}", path.display());
                    return BodyFont::Embedded(font);
                }
                Err(err) => warn!("Could not load font {}: {err}", path.display()),
            }
        }

        info!("No font file could be loaded, using Helvetica");
        BodyFont::Helvetica
    }

    /// Bytes of a text string showing `text`: big-endian glyph ids for an
    /// embedded face, WinAnsi codes for Helvetica.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            BodyFont::Embedded(font) => font
                .glyph_ids(text)
                .into_iter()
                .flat_map(u16::to_be_bytes)
                .collect(),
            BodyFont::Helvetica => encode_win_ansi(text),
        }
    }

    /// Width of `text` set at `size` points.
    #[must_use]
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units = match self {
            BodyFont::Embedded(font) => font
                .glyph_ids(text)
                .into_iter()
                .map(|glyph| f32::from(font.glyph_width(glyph)))
                .sum::<f32>(),
            BodyFont::Helvetica => encode_win_ansi(text)
                .into_iter()
                .map(|code| f32::from(helvetica_width(code)))
                .sum::<f32>(),
        };

        units * size / 1000.0
    }
}

fn helvetica_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_WIDTHS[usize::from(code - 32)],
        _ => HELVETICA_FALLBACK_WIDTH,
    }
}

/// Encodes `text` for a WinAnsi font; characters it cannot show become `?`.
#[must_use]
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(code @ (32..=126 | 160..=255)) => code,
            _ => b'?',
        })
        .collect()
}

/// Builds a minimal TrueType face with one glyph per character of `chars`.
/// Glyph ids follow code point order starting at 1; characters above
/// U+2000 are full width, the rest 0.6 em.
#[cfg(test)]
pub(crate) fn test_face(chars: &str) -> Vec<u8> {
    const UNITS_PER_EM: u16 = 2000;

    let mut chars = chars.chars().collect::<Vec<_>>();
    chars.sort_unstable();
    chars.dedup();
    let glyph_count = u16::try_from(chars.len() + 1).unwrap();
    let groups = u32::try_from(chars.len()).unwrap();

    // Windows Unicode full repertoire, format 12
    let mut cmap = Vec::new();
    for value in [0u16, 1, 3, 10] {
        cmap.extend(value.to_be_bytes());
    }
    cmap.extend(12u32.to_be_bytes());
    cmap.extend(12u16.to_be_bytes());
    cmap.extend(0u16.to_be_bytes());
    for value in [16 + 12 * groups, 0, groups] {
        cmap.extend(value.to_be_bytes());
    }
    for (glyph, ch) in (1u32..).zip(&chars) {
        let code = u32::from(*ch);
        for value in [code, code, glyph] {
            cmap.extend(value.to_be_bytes());
        }
    }

    let mut head = Vec::new();
    for value in [0x0001_0000u32, 0x0001_0000, 0, 0x5F0F_3CF5] {
        head.extend(value.to_be_bytes());
    }
    head.extend(0u16.to_be_bytes());
    head.extend(UNITS_PER_EM.to_be_bytes());
    head.extend([0; 16]);
    for value in [0i16, -400, 2000, 1800, 0, 8, 2, 0, 0] {
        head.extend(value.to_be_bytes());
    }

    let mut hhea = Vec::new();
    hhea.extend(0x0001_0000u32.to_be_bytes());
    for value in [1800i16, -400, 0, 2000, 0, 0, 2000, 1, 0, 0, 0, 0, 0, 0, 0] {
        hhea.extend(value.to_be_bytes());
    }
    hhea.extend(glyph_count.to_be_bytes());

    let mut hmtx = Vec::new();
    hmtx.extend([1000u16, 0].into_iter().flat_map(u16::to_be_bytes));
    for ch in &chars {
        let advance: u16 = if u32::from(*ch) > 0x2000 { 2000 } else { 1200 };
        hmtx.extend(advance.to_be_bytes());
        hmtx.extend(0u16.to_be_bytes());
    }

    let mut maxp = Vec::new();
    maxp.extend(0x0000_5000u32.to_be_bytes());
    maxp.extend(glyph_count.to_be_bytes());

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let header_len = 12 + 16 * tables.len();
    let mut font = Vec::new();
    font.extend(0x0001_0000u32.to_be_bytes());
    font.extend(u16::try_from(tables.len()).unwrap().to_be_bytes());
    font.extend([0; 6]);

    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        font.extend(0u32.to_be_bytes());
        font.extend(u32::try_from(header_len + body.len()).unwrap().to_be_bytes());
        font.extend(u32::try_from(data.len()).unwrap().to_be_bytes());

        body.extend_from_slice(data);
        body.resize(body.len().next_multiple_of(4), 0);
    }
    font.extend(body);

    font
}
