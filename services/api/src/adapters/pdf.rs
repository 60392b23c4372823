//! services/api/src/adapters/pdf.rs
//!
//! PDF export. Latin documents use the standard Helvetica faces; Arabic
//! documents embed a TrueType font as a Type0/Identity-H font and draw text
//! that has been reshaped and reordered into visual order.
//!
//! Layout: A4, 72pt margins, a title page with the table of contents, then one
//! PDF page per paginated page (overflow continues on a new page), then the
//! references.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use research_core::assembly::AssembledDocument;
use research_core::export::block_text;
use research_core::markdown::{parse_blocks, Block};
use research_core::ports::{DocumentRenderer, ExportFormat, PortError, PortResult};
use tracing::info;
use ttf_parser::Face;

use super::arabic;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

fn render_error(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("PDF rendering failed: {}", e))
}

//=========================================================================================
// Renderer
//=========================================================================================

/// TrueType font data used for right-to-left documents.
#[derive(Clone)]
pub struct ArabicFonts {
    regular: Arc<Vec<u8>>,
    bold: Option<Arc<Vec<u8>>>,
}

impl ArabicFonts {
    /// Validates that the data parses as a font before accepting it.
    pub fn new(regular: Vec<u8>, bold: Option<Vec<u8>>) -> PortResult<Self> {
        Face::parse(&regular, 0).map_err(render_error)?;
        if let Some(bold) = &bold {
            Face::parse(bold, 0).map_err(render_error)?;
        }
        Ok(Self {
            regular: Arc::new(regular),
            bold: bold.map(Arc::new),
        })
    }

    pub fn load(regular: &Path, bold: Option<&Path>) -> PortResult<Self> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                PortError::Unexpected(format!("Cannot read font {}: {}", path.display(), e))
            })
        };
        let bold = bold.map(read).transpose()?;
        Self::new(read(regular)?, bold)
    }
}

#[derive(Clone, Default)]
pub struct PdfRenderer {
    arabic: Option<ArabicFonts>,
}

impl PdfRenderer {
    pub fn new(arabic: Option<ArabicFonts>) -> Self {
        Self { arabic }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, document: &AssembledDocument) -> PortResult<Vec<u8>> {
        let rtl = document.language.is_rtl();
        let fonts = if rtl {
            let arabic = self.arabic.as_ref().ok_or_else(|| {
                PortError::Unexpected("Arabic font not configured (ARABIC_FONT_PATH)".to_string())
            })?;
            Fonts::Embedded {
                regular: EmbeddedFace::parse(&arabic.regular, "ArabicRegular")?,
                bold: arabic
                    .bold
                    .as_deref()
                    .map(|data| EmbeddedFace::parse(data, "ArabicBold"))
                    .transpose()?,
            }
        } else {
            Fonts::Standard
        };

        let mut layout = Layout::new(fonts, rtl);
        layout_document(&mut layout, document);
        let bytes = layout.into_pdf()?;
        info!(project_id = %document.project_id, bytes = bytes.len(), "PDF rendered");
        Ok(bytes)
    }
}

//=========================================================================================
// Document structure
//=========================================================================================

fn layout_document(layout: &mut Layout<'_>, document: &AssembledDocument) {
    let labels = document.language.labels();

    layout.gap(120.0);
    layout.paragraph(&document.title, Style::Title, Align::Center);

    if !document.thesis_statement.trim().is_empty() {
        layout.gap(24.0);
        layout.paragraph(labels.thesis_statement, Style::Heading, Align::Start);
        layout.paragraph(document.thesis_statement.trim(), Style::Body, Align::Start);
    }
    if !document.research_questions.is_empty() {
        layout.gap(12.0);
        layout.paragraph(labels.research_questions, Style::Heading, Align::Start);
        for (i, question) in document.research_questions.iter().enumerate() {
            layout.paragraph(&format!("{}. {}", i + 1, question), Style::Body, Align::Start);
        }
    }

    layout.gap(24.0);
    layout.paragraph(labels.table_of_contents, Style::Heading, Align::Start);
    for entry in &document.table_of_contents {
        layout.paragraph(&format!("{}  {}", entry.title, entry.page), Style::Body, Align::Start);
    }

    for page in &document.pages {
        layout.finish_page();
        if page.is_section_start {
            layout.paragraph(&page.section_title, Style::Heading, Align::Start);
            layout.gap(6.0);
        }

        let placeholder = document
            .sections
            .iter()
            .find(|s| s.title == page.section_title && s.is_placeholder);
        if let Some(section) = placeholder {
            layout.paragraph(&section.body, Style::Body, Align::Start);
            continue;
        }
        for block in parse_blocks(&page.content_fragment) {
            draw_block(layout, &block);
        }
    }

    if !document.references.is_empty() {
        layout.finish_page();
        layout.paragraph(labels.references, Style::Heading, Align::Start);
        layout.gap(6.0);
        for citation in &document.references {
            let text = if citation.text.is_empty() { &citation.id } else { &citation.text };
            layout.paragraph(text, Style::Small, Align::Start);
            layout.gap(3.0);
        }
    }
}

fn draw_block(layout: &mut Layout<'_>, block: &Block) {
    match block {
        Block::Heading { .. } => {
            layout.gap(6.0);
            layout.paragraph(&block_text(block), Style::Subheading, Align::Start);
        }
        Block::Paragraph(_) => {
            layout.paragraph(&block_text(block), Style::Body, Align::Start);
            layout.gap(6.0);
        }
        Block::ListItem { .. } => layout.paragraph(&block_text(block), Style::Body, Align::Start),
        Block::Code(_) => {
            for line in block_text(block).lines() {
                layout.paragraph(line, Style::Small, Align::Start);
            }
            layout.gap(6.0);
        }
        Block::Rule => layout.gap(12.0),
    }
}

//=========================================================================================
// Layout engine
//=========================================================================================

#[derive(Clone, Copy)]
enum Style {
    Title,
    Heading,
    Subheading,
    Body,
    Small,
}

impl Style {
    fn size(self) -> f32 {
        match self {
            Style::Title => 20.0,
            Style::Heading => 16.0,
            Style::Subheading => 13.0,
            Style::Body => 11.0,
            Style::Small => 9.0,
        }
    }

    fn bold(self) -> bool {
        matches!(self, Style::Title | Style::Heading | Style::Subheading)
    }
}

#[derive(Clone, Copy)]
enum Align {
    /// Left for left-to-right documents, right otherwise.
    Start,
    Center,
}

struct Layout<'a> {
    fonts: Fonts<'a>,
    rtl: bool,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(fonts: Fonts<'a>, rtl: bool) -> Self {
        Self {
            fonts,
            rtl,
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Closes the current page, if anything was drawn on it.
    fn finish_page(&mut self) {
        if self.ops.is_empty() {
            self.y = PAGE_HEIGHT - MARGIN;
            return;
        }
        let number = self.pages.len() + 1;
        if number > 1 {
            let label = number.to_string();
            let width = self.fonts.width(&label, false, Style::Small.size());
            self.emit(&label, Style::Small, (PAGE_WIDTH - width) / 2.0, MARGIN / 2.0);
        }
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
        if self.y < MARGIN {
            self.finish_page();
        }
    }

    fn paragraph(&mut self, text: &str, style: Style, align: Align) {
        let logical = if self.rtl { arabic::reshape(text) } else { text.to_string() };
        for line in self.wrap(&logical, style) {
            let line = if self.rtl { arabic::visual_line(&line) } else { line };
            self.draw_line(&line, style, align);
        }
    }

    fn wrap(&self, text: &str, style: Style) -> Vec<String> {
        let size = style.size();
        let fits = |line: &str| self.fonts.width(line, style.bold(), size) <= TEXT_WIDTH;
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            // Words wider than a line are broken between characters.
            for c in word.chars() {
                current.push(c);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::replace(&mut current, c.to_string()));
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn draw_line(&mut self, line: &str, style: Style, align: Align) {
        let leading = style.size() * 1.4;
        if self.y - leading < MARGIN {
            self.finish_page();
        }
        self.y -= leading;

        let width = self.fonts.width(line, style.bold(), style.size());
        let x = match align {
            Align::Start if self.rtl => PAGE_WIDTH - MARGIN - width,
            Align::Start => MARGIN,
            Align::Center => (PAGE_WIDTH - width) / 2.0,
        };
        let y = self.y;
        self.emit(line, style, x, y);
    }

    fn emit(&mut self, text: &str, style: Style, x: f32, y: f32) {
        let key = self.fonts.key(style.bold());
        let encoded = self.fonts.encode(text, style.bold());
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(key.to_vec()), Object::Real(style.size())]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new("Tj", vec![encoded]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn into_pdf(mut self) -> PortResult<Vec<u8>> {
        self.finish_page();
        let Layout { fonts, mut pages, .. } = self;
        if pages.is_empty() {
            pages.push(Vec::new());
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_resources = fonts.register(&mut doc);
        let resources_id = doc.add_object(dictionary! { "Font" => font_resources });

        let count = pages.len();
        let mut kids = Vec::with_capacity(count);
        for operations in pages {
            let content = Content { operations }.encode().map_err(render_error)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count as i64),
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(render_error)?;
        Ok(out)
    }
}

//=========================================================================================
// Fonts
//=========================================================================================

enum Fonts<'a> {
    /// Helvetica and Helvetica-Bold with WinAnsi encoding.
    Standard,
    Embedded {
        regular: EmbeddedFace<'a>,
        bold: Option<EmbeddedFace<'a>>,
    },
}

impl<'a> Fonts<'a> {
    fn key(&self, bold: bool) -> &'static [u8] {
        match self {
            Fonts::Standard if bold => b"F2",
            Fonts::Embedded { bold: Some(_), .. } if bold => b"F2",
            _ => b"F1",
        }
    }

    fn width(&self, text: &str, bold: bool, size: f32) -> f32 {
        let units: f32 = match self {
            Fonts::Standard => {
                let scale = if bold { 1.05 } else { 1.0 };
                text.chars().map(|c| helvetica_width(c) * scale).sum()
            }
            Fonts::Embedded { regular, bold: bold_face } => match bold_face {
                Some(face) if bold => face.width(text),
                _ => regular.width(text),
            },
        };
        units * size / 1000.0
    }

    fn encode(&mut self, text: &str, bold: bool) -> Object {
        match self {
            Fonts::Standard => Object::String(win_ansi(text), StringFormat::Literal),
            Fonts::Embedded { regular, bold: bold_face } => {
                let face = match bold_face {
                    Some(face) if bold => face,
                    _ => regular,
                };
                Object::String(face.encode(text), StringFormat::Hexadecimal)
            }
        }
    }

    fn register(&self, doc: &mut Document) -> lopdf::Dictionary {
        match self {
            Fonts::Standard => {
                let regular = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                let bold = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica-Bold",
                    "Encoding" => "WinAnsiEncoding",
                });
                dictionary! { "F1" => regular, "F2" => bold }
            }
            Fonts::Embedded { regular, bold } => {
                let mut fonts = dictionary! { "F1" => regular.register(doc) };
                if let Some(bold) = bold {
                    fonts.set("F2", bold.register(doc));
                }
                fonts
            }
        }
    }
}

struct EmbeddedFace<'a> {
    face: Face<'a>,
    data: &'a [u8],
    name: &'static str,
    /// Glyphs drawn so far with their advance in 1/1000 em.
    used: BTreeMap<u16, i64>,
}

impl<'a> EmbeddedFace<'a> {
    fn parse(data: &'a [u8], name: &'static str) -> PortResult<Self> {
        let face = Face::parse(data, 0).map_err(render_error)?;
        Ok(Self {
            face,
            data,
            name,
            used: BTreeMap::new(),
        })
    }

    fn scale(&self) -> f32 {
        1000.0 / f32::from(self.face.units_per_em().max(1))
    }

    fn glyph(&self, c: char) -> (u16, f32) {
        let gid = self.face.glyph_index(c).map(|g| g.0).unwrap_or(0);
        let advance = self
            .face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .map(f32::from)
            .unwrap_or(0.0);
        (gid, advance * self.scale())
    }

    fn width(&self, text: &str) -> f32 {
        text.chars().map(|c| self.glyph(c).1).sum()
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let (gid, advance) = self.glyph(c);
            self.used.insert(gid, advance.round() as i64);
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    fn register(&self, doc: &mut Document) -> ObjectId {
        let scale = self.scale();
        let scaled = |v: i16| Object::Integer((f32::from(v) * scale).round() as i64);
        let bbox = self.face.global_bounding_box();

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => Object::Integer(self.data.len() as i64) },
            self.data.to_vec(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.name.as_bytes().to_vec()),
            "Flags" => Object::Integer(4),
            "FontBBox" => vec![scaled(bbox.x_min), scaled(bbox.y_min), scaled(bbox.x_max), scaled(bbox.y_max)],
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => scaled(self.face.ascender()),
            "Descent" => scaled(self.face.descender()),
            "CapHeight" => scaled(self.face.capital_height().unwrap_or(self.face.ascender())),
            "StemV" => Object::Integer(80),
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for (gid, advance) in &self.used {
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(*advance)]));
        }
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.name.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => descriptor_id,
            "DW" => Object::Integer(1000),
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.name.as_bytes().to_vec()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        })
    }
}

/// Helvetica advance widths in 1/1000 em for printable ASCII.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn helvetica_width(c: char) -> f32 {
    let code = c as u32;
    if (32..127).contains(&code) {
        f32::from(HELVETICA_ASCII[(code - 32) as usize])
    } else {
        556.0
    }
}

/// Encodes text for the WinAnsi standard fonts; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{20AC}' => 0x80,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use research_core::assembly::AssembledSection;
    use research_core::domain::{Citation, Language};
    use research_core::pagination::{paginate_section, table_of_contents};
    use uuid::Uuid;

    fn document(language: Language, body: &str) -> AssembledDocument {
        let pages = paginate_section("Introduction", body, 250);
        AssembledDocument {
            project_id: Uuid::new_v4(),
            outline_id: Uuid::new_v4(),
            title: "Water Scarcity".into(),
            language,
            citation_style: "APA".into(),
            thesis_statement: "Scarcity is political.".into(),
            research_questions: vec!["Why?".into()],
            sections: vec![AssembledSection {
                title: "Introduction".into(),
                body: body.into(),
                is_placeholder: false,
                blocks: parse_blocks(body),
            }],
            references: vec![Citation {
                id: "c1".into(),
                text: "Smith (2020)".into(),
                source_type: "journal".into(),
            }],
            table_of_contents: table_of_contents(&pages),
            pages,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn latin_documents_render_with_standard_fonts() {
        let body = "## Scope\n\nWater is scarce — and getting scarcer.\n\n- one\n- two";
        let bytes = PdfRenderer::default()
            .render(&document(Language::En, body))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let parsed = Document::load_mem(&bytes).unwrap();
        // title page, one content page, references
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn long_pages_overflow_onto_new_pdf_pages() {
        // One oversized block stays on a single paginated page but needs two PDF pages.
        let body = "word ".repeat(900);
        let bytes = PdfRenderer::default()
            .render(&document(Language::En, &body))
            .unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 4);
    }

    #[test]
    fn arabic_documents_need_a_font() {
        let err = PdfRenderer::default()
            .render(&document(Language::Ar, "نص"))
            .unwrap_err();
        assert!(err.to_string().contains("Arabic font"));
    }

    fn fixture_font() -> ArabicFonts {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf");
        ArabicFonts::load(&path, None).unwrap()
    }

    #[test]
    fn arabic_documents_embed_a_cid_font_and_align_right() {
        let mut doc = document(Language::Ar, "تعاني المنطقة من نقص المياه.");
        doc.title = "ندرة المياه".into();
        let bytes = PdfRenderer::new(Some(fixture_font())).render(&doc).unwrap();

        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 3);

        let dicts: Vec<&lopdf::Dictionary> =
            parsed.objects.values().filter_map(|o| o.as_dict().ok()).collect();
        let name = |d: &lopdf::Dictionary, key: &[u8]| {
            d.get(key).and_then(Object::as_name).map(<[u8]>::to_vec).unwrap_or_default()
        };
        assert!(dicts
            .iter()
            .any(|d| name(d, b"Subtype") == b"Type0" && name(d, b"Encoding") == b"Identity-H"));
        let cid_font = dicts
            .iter()
            .find(|d| name(d, b"Subtype") == b"CIDFontType2")
            .expect("descendant font");
        // Presentation forms resolve to real glyphs, not .notdef.
        let widths = cid_font.get(b"W").and_then(Object::as_array).unwrap();
        assert!(widths
            .iter()
            .step_by(2)
            .any(|gid| gid.as_i64().map_or(false, |g| g > 0)));

        // Short lines on the content page hug the right margin.
        let content_page = pages.get(&2).copied().unwrap();
        let content = Content::decode(&parsed.get_page_content(content_page).unwrap()).unwrap();
        let xs: Vec<f32> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Td")
            .filter_map(|op| op.operands.first().and_then(|x| x.as_float().ok()))
            .collect();
        assert!(xs.iter().any(|&x| x > PAGE_WIDTH / 2.0));
    }

    #[test]
    fn words_wider_than_a_line_are_broken() {
        let layout = Layout::new(Fonts::Standard, false);
        let url = format!("https://example.org/{}", "segment".repeat(40));
        let lines = layout.wrap(&format!("See {} for details", url), Style::Small);

        assert!(lines.len() > 2);
        for line in &lines {
            assert!(layout.fonts.width(line, false, Style::Small.size()) <= TEXT_WIDTH);
        }
        assert_eq!(lines.first().map(String::as_str), Some("See"));
        assert_eq!(lines.concat().replace(' ', ""), format!("See{}fordetails", url));
    }

    #[test]
    fn invalid_font_data_is_rejected() {
        assert!(ArabicFonts::new(b"not a font".to_vec(), None).is_err());
    }

    #[test]
    fn win_ansi_maps_typographic_punctuation() {
        assert_eq!(win_ansi("a–b é €"), vec![b'a', 0x96, b'b', b' ', 0xE9, b' ', 0x80]);
        assert_eq!(win_ansi("ب"), vec![b'?']);
    }
}
