//! Report layout engine
//!
//! A single renderer driven by a [`LayoutDescriptor`]: an ordered list of
//! section specs placed on a fixed A4 grid. Layout is pure. The same
//! [`ReportData`] and descriptor always produce the same [`Document`].

use std::path::PathBuf;

use tracing::debug;

use crate::clinical::{assess, flag_value, to_paragraph};
use crate::models::{PatientDetails, ReportData, VitalKind};

use super::document::{Align, Document, DrawOp, FontStyle, Page, Rgb};
use super::ReportError;

/// Millimetres per typographic point
pub const PT_TO_MM: f64 = 25.4 / 72.0;

/// Smallest size a cell will shrink text to before letting it overflow
const MIN_CELL_FONT: f64 = 6.0;

const HEADER_FILL: Rgb = Rgb(200, 220, 255);

// ============================================================================
// Geometry and banner
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// mm
    pub width: f64,
    pub height: f64,
    /// Left and right content margin
    pub margin: f64,
    /// Distance of the page border from the paper edge
    pub border_inset: f64,
    /// Content may not extend below this y
    pub break_at: f64,
    /// Top of the footer line
    pub footer_y: f64,
    /// Fixed height of table rows and key/value lines
    pub line_height: f64,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 10.0,
            border_inset: 5.0,
            break_at: 277.0,
            footer_y: 277.0,
            line_height: 7.0,
        }
    }

    pub fn printable_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    /// x of the right key/value column
    pub fn right_column_x(&self) -> f64 {
        self.margin + self.printable_width() / 2.0
    }
}

/// Lines drawn at the top of every page
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    /// Drawn only when set; the caller decides whether the file exists
    pub logo: Option<PathBuf>,
    pub institution: String,
    pub device_title: String,
}

impl Default for Banner {
    fn default() -> Self {
        Self {
            logo: None,
            institution: "Indian Institute of Technology Kharagpur".to_string(),
            device_title: "Solar-Powered Mobile Health Measurement Device".to_string(),
        }
    }
}

// ============================================================================
// Layout descriptor
// ============================================================================

/// A labelled value from the patient details
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientField {
    CollectionDate,
    ReportDate,
    Name,
    AgeGender,
    ReferredBy,
    Contact,
    PatientId,
    ReportId,
}

impl PatientField {
    pub fn label(&self) -> &'static str {
        match self {
            PatientField::CollectionDate => "Collection Date",
            PatientField::ReportDate => "Report Date",
            PatientField::Name => "Name",
            PatientField::AgeGender => "Age/Gender",
            PatientField::ReferredBy => "Referred By",
            PatientField::Contact => "Contact",
            PatientField::PatientId => "Patient ID",
            PatientField::ReportId => "Report ID",
        }
    }

    /// Missing values are empty strings
    pub fn value(&self, patient: &PatientDetails) -> String {
        match self {
            PatientField::CollectionDate => patient.collection_date.trim().to_string(),
            PatientField::ReportDate => patient.report_date.trim().to_string(),
            PatientField::Name => patient.patient_name.trim().to_string(),
            PatientField::AgeGender => patient.patient_age_gender.trim().to_string(),
            PatientField::ReferredBy => patient.patient_referee.trim().to_string(),
            PatientField::Contact => patient.patient_phone.trim().to_string(),
            PatientField::PatientId => patient.patient_id.map(|id| id.to_string()).unwrap_or_default(),
            PatientField::ReportId => patient.report_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

/// Cell contents of a vitals table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalField {
    Name,
    Result,
    Flag,
    ReferenceRange,
    Unit,
}

/// Cell contents of a questionnaire table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerField {
    Number,
    Question,
    Response,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column<F> {
    pub field: F,
    pub header: String,
    /// mm
    pub width: f64,
    pub align: Align,
}

impl<F> Column<F> {
    pub fn new(field: F, header: &str, width: f64, align: Align) -> Self {
        Self {
            field,
            header: header.to_string(),
            width,
            align,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionSpec {
    /// Two key/value columns followed by a horizontal rule
    KeyValues {
        left: Vec<PatientField>,
        right: Vec<PatientField>,
    },
    Heading(String),
    VitalsTable(Vec<Column<VitalField>>),
    QuestionnaireTable(Vec<Column<AnswerField>>),
    /// Classifier findings as one paragraph
    Comments { heading: String },
}

/// Everything that decides how a report looks
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDescriptor {
    pub title: String,
    pub geometry: PageGeometry,
    pub banner: Banner,
    pub sections: Vec<SectionSpec>,
}

impl LayoutDescriptor {
    /// The medical report: dates, patient block, vitals, questionnaire, comments
    pub fn standard(banner: Banner) -> Self {
        Self {
            title: "Medical Diagnostic Report".to_string(),
            geometry: PageGeometry::a4(),
            banner,
            sections: vec![
                SectionSpec::KeyValues {
                    left: vec![PatientField::CollectionDate],
                    right: vec![PatientField::ReportDate],
                },
                SectionSpec::KeyValues {
                    left: vec![PatientField::Name, PatientField::AgeGender, PatientField::ReferredBy],
                    right: vec![PatientField::Contact, PatientField::PatientId, PatientField::ReportId],
                },
                SectionSpec::Heading("Body Vitals".to_string()),
                SectionSpec::VitalsTable(vec![
                    Column::new(VitalField::Name, "VITALS", 55.0, Align::Left),
                    Column::new(VitalField::Result, "RESULT", 35.0, Align::Left),
                    Column::new(VitalField::Flag, "FLAG", 30.0, Align::Left),
                    Column::new(VitalField::ReferenceRange, "REF. RANGE", 40.0, Align::Left),
                    Column::new(VitalField::Unit, "UNIT", 30.0, Align::Left),
                ]),
                SectionSpec::Heading("General Health Questions".to_string()),
                SectionSpec::QuestionnaireTable(vec![
                    Column::new(AnswerField::Number, "Sl.No", 20.0, Align::Center),
                    Column::new(AnswerField::Question, "QUESTIONS", 120.0, Align::Left),
                    Column::new(AnswerField::Response, "RESPONSE", 50.0, Align::Left),
                ]),
                SectionSpec::Comments {
                    heading: "Comments:".to_string(),
                },
            ],
        }
    }
}

// ============================================================================
// Text metrics
// ============================================================================

/// Times-Roman advance widths for ASCII 32..=126, in 1/1000 em
const TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 333, 333, 333, 500, 564, 250, 333, 250, 278, // ' '../
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // 0..?
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // @..O
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // P.._
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // `..o
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // p..~
];

/// Approximate rendered width of `text` in mm
pub fn text_width(text: &str, size: f64, style: FontStyle) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' '..='~' => TIMES_WIDTHS[c as usize - 32] as u32,
            _ => 500,
        })
        .sum();
    let width = units as f64 / 1000.0 * size * PT_TO_MM;
    match style {
        FontStyle::Bold => width * 1.05,
        FontStyle::Regular | FontStyle::Italic => width,
    }
}

/// Greedy word wrap to `max_width` mm. An overlong word gets its own line.
pub fn wrap_text(text: &str, size: f64, style: FontStyle, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if current.is_empty() || text_width(&candidate, size, style) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ============================================================================
// Renderer
// ============================================================================

/// Cursor-driven page builder
pub struct ReportRenderer<'a> {
    geometry: &'a PageGeometry,
    banner: &'a Banner,
    pages: Vec<Page>,
    y: f64,
}

impl<'a> ReportRenderer<'a> {
    /// Start a renderer on a fresh first page
    pub fn new(geometry: &'a PageGeometry, banner: &'a Banner) -> Self {
        let mut renderer = Self {
            geometry,
            banner,
            pages: Vec::new(),
            y: 0.0,
        };
        renderer.add_page();
        renderer
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set_y(&mut self, y: f64) {
        self.y = y;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.render_header();
    }

    /// Move to a new page if `height` does not fit below the cursor
    fn ensure_space(&mut self, height: f64) -> bool {
        if self.y + height > self.geometry.break_at {
            debug!(page = self.pages.len() + 1, "page break");
            self.add_page();
            true
        } else {
            false
        }
    }

    /// Border, optional logo and the two centred banner lines
    pub fn render_header(&mut self) {
        let g = self.geometry;
        self.push(DrawOp::Rect {
            x: g.border_inset,
            y: g.border_inset,
            width: g.width - 2.0 * g.border_inset,
            height: g.height - 2.0 * g.border_inset,
            fill: None,
            stroke: true,
        });

        if let Some(logo) = &self.banner.logo {
            self.push(DrawOp::Image {
                path: logo.clone(),
                x: g.margin,
                y: 8.0,
                width: 25.0,
            });
        }

        let institution = self.banner.institution.clone();
        let device_title = self.banner.device_title.clone();
        self.cell(0.0, 10.0, g.width, 10.0, &institution, 16.0, FontStyle::Bold, Align::Center);
        self.cell(0.0, 20.0, g.width, 10.0, &device_title, 14.0, FontStyle::Bold, Align::Center);
        self.y = 38.0;
    }

    /// Footer of one page; identical on every page apart from the numbers
    pub fn render_footer(&mut self, page_index: usize, total: usize) {
        let g = self.geometry;
        let ops = [
            text_op(0.0, g.footer_y, g.width, 10.0, "~ End of Report ~", 10.0, FontStyle::Italic, Align::Center),
            text_op(
                g.margin,
                g.footer_y,
                g.printable_width(),
                10.0,
                &format!("Page {} of {}", page_index + 1, total),
                10.0,
                FontStyle::Italic,
                Align::Right,
            ),
        ];
        if let Some(page) = self.pages.get_mut(page_index) {
            page.ops.extend(ops);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn cell(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, size: f64, style: FontStyle, align: Align) {
        if !text.is_empty() {
            self.push(text_op(x, y, w, h, text, size, style, align));
        }
    }

    /// "Key: Value" lines side by side; returns the lowest y of either column
    pub fn render_two_column_block(&mut self, left: &[(&str, String)], right: &[(&str, String)]) -> f64 {
        let g = self.geometry;
        let column_width = g.printable_width() / 2.0;
        let rows = left.len().max(right.len());
        self.ensure_space(rows as f64 * g.line_height);

        let top = self.y;
        let mut lowest = top;
        for (x, pairs) in [(g.margin, left), (g.right_column_x(), right)] {
            let mut y = top;
            for (key, value) in pairs {
                let line = format!("{}: {}", key, value);
                self.cell(x, y, column_width, g.line_height, &line, 10.0, FontStyle::Regular, Align::Left);
                y += g.line_height;
            }
            lowest = lowest.max(y);
        }
        lowest
    }

    /// Full-width rule at the cursor
    pub fn rule(&mut self) {
        let g = self.geometry;
        self.push(DrawOp::Line {
            from: (g.margin, self.y),
            to: (g.width - g.margin, self.y),
            thickness: 0.2,
        });
    }

    pub fn heading(&mut self, title: &str) {
        let g = self.geometry;
        // keep a heading together with a table header and its first row
        self.ensure_space(12.0 + 2.0 * g.line_height);
        self.cell(g.margin, self.y, g.printable_width(), 8.0, title, 12.0, FontStyle::Bold, Align::Left);
        self.y += 12.0;
    }

    /// Heading on a cell of `height` with no extra gap below
    fn heading_with_height(&mut self, title: &str, height: f64) {
        let g = self.geometry;
        self.ensure_space(height + 6.0);
        self.cell(g.margin, self.y, g.printable_width(), height, title, 12.0, FontStyle::Bold, Align::Left);
        self.y += height;
    }

    /// Bordered grid with a shaded header row. The header repeats after a page break.
    pub fn render_table(
        &mut self,
        rows: &[Vec<String>],
        column_widths: &[f64],
        headers: &[&str],
        aligns: &[Align],
    ) -> Result<(), ReportError> {
        let g = self.geometry;
        if headers.len() != column_widths.len() {
            return Err(ReportError::Layout(format!(
                "{} headers for {} columns",
                headers.len(),
                column_widths.len()
            )));
        }
        if column_widths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ReportError::Layout("column widths must be positive".to_string()));
        }
        let total: f64 = column_widths.iter().sum();
        if total > g.printable_width() + 1e-6 {
            return Err(ReportError::Layout(format!(
                "table is {:.1} mm wide but only {:.1} mm fit between the margins",
                total,
                g.printable_width()
            )));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != column_widths.len()) {
            return Err(ReportError::Layout(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                column_widths.len()
            )));
        }

        let align_at = |i: usize| aligns.get(i).copied().unwrap_or(Align::Left);

        self.ensure_space(2.0 * g.line_height);
        self.table_row(headers, column_widths, Some(HEADER_FILL), 10.0, FontStyle::Bold, |_| Align::Center);

        for row in rows {
            if self.ensure_space(g.line_height) {
                self.table_row(headers, column_widths, Some(HEADER_FILL), 10.0, FontStyle::Bold, |_| Align::Center);
            }
            self.table_row(row, column_widths, None, 9.0, FontStyle::Regular, align_at);
        }
        Ok(())
    }

    fn table_row<S: AsRef<str>>(
        &mut self,
        cells: &[S],
        widths: &[f64],
        fill: Option<Rgb>,
        size: f64,
        style: FontStyle,
        align: impl Fn(usize) -> Align,
    ) {
        let h = self.geometry.line_height;
        let mut x = self.geometry.margin;
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            self.push(DrawOp::Rect {
                x,
                y: self.y,
                width: *width,
                height: h,
                fill,
                stroke: true,
            });
            self.cell(x, self.y, *width, h, cell.as_ref(), size, style, align(i));
            x += width;
        }
        self.y += h;
    }

    /// Word-wrapped text across the printable width
    pub fn paragraph(&mut self, text: &str, size: f64, line_height: f64) {
        let g = self.geometry;
        for line in wrap_text(text, size, FontStyle::Regular, g.printable_width() - 2.0) {
            self.ensure_space(line_height);
            self.cell(g.margin, self.y, g.printable_width(), line_height, &line, size, FontStyle::Regular, Align::Left);
            self.y += line_height;
        }
    }

    /// Stamp footers and hand over the pages
    pub fn finish(mut self) -> Vec<Page> {
        let total = self.pages.len();
        for index in 0..total {
            self.render_footer(index, total);
        }
        self.pages
    }
}

/// Text placed inside a cell the way a table cell places it: 1 mm padding,
/// vertically centred, shrunk to fit the cell when possible
#[allow(clippy::too_many_arguments)]
fn text_op(x: f64, y: f64, w: f64, h: f64, text: &str, size: f64, style: FontStyle, align: Align) -> DrawOp {
    const PADDING: f64 = 1.0;
    let available = w - 2.0 * PADDING;

    let mut size = size;
    while size > MIN_CELL_FONT && text_width(text, size, style) > available {
        size -= 0.5;
    }

    let width = text_width(text, size, style);
    let text_x = match align {
        Align::Left => x + PADDING,
        Align::Center => x + (w - width) / 2.0,
        Align::Right => x + w - PADDING - width,
    };
    let baseline = y + 0.5 * h + 0.3 * size * PT_TO_MM;

    DrawOp::Text {
        x: text_x,
        y: baseline,
        size,
        style,
        text: text.to_string(),
    }
}

// ============================================================================
// Report
// ============================================================================

fn vital_cell(field: VitalField, kind: VitalKind, data: &ReportData) -> String {
    match field {
        VitalField::Name => kind.display_name().to_string(),
        VitalField::Result => data.reading.format_value(kind),
        VitalField::Flag => flag_value(&data.reading.format_value(kind), kind.reference_range()).to_string(),
        VitalField::ReferenceRange => kind.reference_range().to_string(),
        VitalField::Unit => kind.unit().to_string(),
    }
}

fn column_parts<F>(columns: &[Column<F>]) -> (Vec<f64>, Vec<&str>, Vec<Align>) {
    (
        columns.iter().map(|c| c.width).collect(),
        columns.iter().map(|c| c.header.as_str()).collect(),
        columns.iter().map(|c| c.align).collect(),
    )
}

/// Lay out one report. No clock, no randomness: equal inputs give equal documents.
pub fn create_report(data: &ReportData, layout: &LayoutDescriptor) -> Result<Document, ReportError> {
    let comments = assess(&data.reading, &data.answers);
    let mut renderer = ReportRenderer::new(&layout.geometry, &layout.banner);

    for section in &layout.sections {
        match section {
            SectionSpec::KeyValues { left, right } => {
                let pairs = |fields: &[PatientField]| -> Vec<(&'static str, String)> {
                    fields.iter().map(|f| (f.label(), f.value(&data.patient))).collect()
                };
                let lowest = renderer.render_two_column_block(&pairs(left), &pairs(right));
                renderer.set_y(lowest + 2.0);
                renderer.rule();
                renderer.set_y(lowest + 6.0);
            }
            SectionSpec::Heading(title) => renderer.heading(title),
            SectionSpec::VitalsTable(columns) => {
                let rows: Vec<Vec<String>> = VitalKind::TABLE_ORDER
                    .iter()
                    .map(|&kind| columns.iter().map(|c| vital_cell(c.field, kind, data)).collect())
                    .collect();
                let (widths, headers, aligns) = column_parts(columns);
                renderer.render_table(&rows, &widths, &headers, &aligns)?;
                renderer.set_y(renderer.y() + 6.0);
            }
            SectionSpec::QuestionnaireTable(columns) => {
                let rows: Vec<Vec<String>> = data
                    .answers
                    .iter()
                    .enumerate()
                    .map(|(i, answer)| {
                        columns
                            .iter()
                            .map(|c| match c.field {
                                AnswerField::Number => format!("{}.", i + 1),
                                AnswerField::Question => answer.question.prompt().to_string(),
                                AnswerField::Response => answer.selected.unwrap_or_default().to_string(),
                            })
                            .collect()
                    })
                    .collect();
                let (widths, headers, aligns) = column_parts(columns);
                renderer.render_table(&rows, &widths, &headers, &aligns)?;
                renderer.set_y(renderer.y() + 6.0);
            }
            SectionSpec::Comments { heading } => {
                renderer.heading_with_height(heading, 10.0);
                renderer.paragraph(&to_paragraph(&comments), 11.0, 6.0);
            }
        }
    }

    let pages = renderer.finish();
    debug!(pages = pages.len(), comments = comments.len(), "report laid out");

    Ok(Document {
        title: layout.title.clone(),
        width: layout.geometry.width,
        height: layout.geometry.height,
        pages,
    })
}
