// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content stream interpretation into positioned text runs.

use std::collections::HashMap;

use blattwerk_core::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::cmap::FontDecoder;
use crate::pdf::objects::{dict_entry, page_content, page_resources, pdf_error, resolve, stream_data};

/// Nesting limit for Form XObjects.
const MAX_FORM_DEPTH: usize = 12;

/// Glyph advance assumed for every character, as a fraction of the font size.
/// No font metrics are read, so widths are estimates.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustments (thousandths of text space) more negative than this become
/// a word break.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// A string painted at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Baseline start in default user space.
    pub x: f32,
    pub y: f32,
    /// Estimated horizontal extent in user space.
    pub width: f32,
    /// Effective font size after the text and current transformation matrices.
    pub font_size: f32,
    pub text: String,
}

impl TextRun {
    pub fn end_x(&self) -> f32 {
        self.x + self.width
    }
}

/// Affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other`.
    fn then(self, other: Self) -> Self {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Self([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn horizontal_scale(&self) -> f32 {
        let [a, b, ..] = self.0;
        (a * a + b * b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        let [_, _, c, d, ..] = self.0;
        (c * c + d * d).sqrt()
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<String>,
    size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Tz as a fraction.
    scaling: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scaling: 1.0,
        }
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    if operands.len() < N {
        return None;
    }
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}

fn string_bytes(object: &Object) -> Option<&[u8]> {
    match object {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}

/// Interpreter state for one page.
struct Interpreter<'a> {
    doc: &'a Document,
    decoders: HashMap<(ObjectId, String), FontDecoder>,
    runs: Vec<TextRun>,
    ctm: Matrix,
    text: TextState,
    stack: Vec<(Matrix, TextState)>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Identifies the resource dictionary in scope, for the decoder cache.
    resources_key: ObjectId,
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document, resources_key: ObjectId) -> Self {
        Self {
            doc,
            decoders: HashMap::new(),
            runs: Vec::new(),
            ctm: Matrix::IDENTITY,
            text: TextState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            resources_key,
        }
    }

    fn run(&mut self, operations: &[Operation], resources: Option<&'a Dictionary>, depth: usize) {
        for op in operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => self.stack.push((self.ctm, self.text.clone())),
                "Q" => {
                    if let Some((ctm, text)) = self.stack.pop() {
                        self.ctm = ctm;
                        self.text = text;
                    }
                }
                "cm" => {
                    if let Some(m) = numbers::<6>(operands) {
                        self.ctm = Matrix(m).then(self.ctm);
                    }
                }
                "BT" => {
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let (Some(name), Some(size)) = (
                        operands.first().and_then(|o| o.as_name().ok()),
                        operands.get(1).and_then(number),
                    ) {
                        self.text.font = Some(String::from_utf8_lossy(name).into_owned());
                        self.text.size = size;
                    }
                }
                "TL" => {
                    if let Some([leading]) = numbers::<1>(operands) {
                        self.text.leading = leading;
                    }
                }
                "Tc" => {
                    if let Some([spacing]) = numbers::<1>(operands) {
                        self.text.char_spacing = spacing;
                    }
                }
                "Tw" => {
                    if let Some([spacing]) = numbers::<1>(operands) {
                        self.text.word_spacing = spacing;
                    }
                }
                "Tz" => {
                    if let Some([scale]) = numbers::<1>(operands) {
                        self.text.scaling = scale / 100.0;
                    }
                }
                "Td" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.text.leading = -ty;
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = numbers::<6>(operands) {
                        self.text_matrix = Matrix(m);
                        self.line_matrix = Matrix(m);
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(bytes) = operands.first().and_then(string_bytes) {
                        self.show(&[Segment::Text(bytes)], resources);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(bytes) = operands.first().and_then(string_bytes) {
                        self.show(&[Segment::Text(bytes)], resources);
                    }
                }
                "\"" => {
                    if let (Some([aw, ac]), Some(bytes)) =
                        (numbers::<2>(operands), operands.get(2).and_then(string_bytes))
                    {
                        self.text.word_spacing = aw;
                        self.text.char_spacing = ac;
                        self.next_line();
                        self.show(&[Segment::Text(bytes)], resources);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let segments: Vec<Segment<'_>> = items
                            .iter()
                            .filter_map(|item| match item {
                                Object::String(bytes, _) => Some(Segment::Text(bytes.as_slice())),
                                other => number(other).map(Segment::Adjust),
                            })
                            .collect();
                        self.show(&segments, resources);
                    }
                }
                "Do" => {
                    if depth < MAX_FORM_DEPTH
                        && let Some(name) = operands.first().and_then(|o| o.as_name().ok())
                    {
                        self.form(name, resources, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.text.leading;
        self.move_line(0.0, -leading);
    }

    fn decoder(&mut self, resources: Option<&'a Dictionary>) -> FontDecoder {
        let Some(font_name) = self.text.font.clone() else {
            return FontDecoder::default();
        };
        let key = (self.resources_key, font_name);
        if let Some(decoder) = self.decoders.get(&key) {
            return decoder.clone();
        }
        let decoder = resources
            .and_then(|res| dict_entry(self.doc, res, b"Font"))
            .and_then(|fonts| fonts.get(key.1.as_bytes()).ok())
            .and_then(|font| match resolve(self.doc, font).ok()? {
                Object::Dictionary(dict) => Some(FontDecoder::from_font(self.doc, dict)),
                _ => None,
            })
            .unwrap_or_default();
        self.decoders.insert(key, decoder.clone());
        decoder
    }

    /// Paint a text-showing operation as one run and advance the text matrix.
    fn show(&mut self, segments: &[Segment<'_>], resources: Option<&'a Dictionary>) {
        let decoder = self.decoder(resources);
        let state = &self.text;
        let start = self.text_matrix.then(self.ctm);

        let mut text = String::new();
        let mut advance = 0.0f32;
        for segment in segments {
            match segment {
                Segment::Text(bytes) => {
                    let decoded = decoder.decode(bytes);
                    let codes = decoder.code_count(bytes) as f32;
                    let spaces = decoded.chars().filter(|c| *c == ' ').count() as f32;
                    advance += (codes * (AVERAGE_GLYPH_WIDTH * state.size + state.char_spacing)
                        + spaces * state.word_spacing)
                        * state.scaling;
                    text.push_str(&decoded);
                }
                Segment::Adjust(amount) => {
                    advance -= amount / 1000.0 * state.size * state.scaling;
                    if *amount < TJ_SPACE_THRESHOLD && !text.ends_with(' ') && !text.is_empty() {
                        text.push(' ');
                    }
                }
            }
        }

        let font_size = state.size * start.vertical_scale();
        let width = advance * start.horizontal_scale();
        self.text_matrix = Matrix::translate(advance, 0.0).then(self.text_matrix);

        if text.trim().is_empty() {
            return;
        }
        self.runs.push(TextRun {
            x: start.0[4],
            y: start.0[5],
            width,
            font_size,
            text,
        });
    }

    fn form(&mut self, name: &[u8], resources: Option<&'a Dictionary>, depth: usize) {
        let doc = self.doc;
        let Some(xobject) = resources
            .and_then(|res| dict_entry(doc, res, b"XObject"))
            .and_then(|xobjects| xobjects.get(name).ok())
        else {
            return;
        };
        let form_id = match xobject {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        let Ok(Object::Stream(stream)) = resolve(doc, xobject) else {
            return;
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .is_some_and(|s| s == b"Form");
        if !is_form {
            return;
        }
        let Ok(data) = stream_data(stream) else {
            return;
        };
        let Ok(content) = Content::decode(&data) else {
            return;
        };

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| match m {
                Object::Array(items) => numbers::<6>(items),
                _ => None,
            })
            .map(Matrix)
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = dict_entry(doc, &stream.dict, b"Resources").or(resources);

        let saved = (self.ctm, self.text.clone(), self.text_matrix, self.line_matrix);
        let saved_key = self.resources_key;
        self.ctm = matrix.then(self.ctm);
        if let Some(id) = form_id {
            self.resources_key = id;
        }
        self.run(&content.operations, form_resources, depth + 1);
        (self.ctm, self.text, self.text_matrix, self.line_matrix) = saved;
        self.resources_key = saved_key;
    }
}

enum Segment<'b> {
    Text(&'b [u8]),
    Adjust(f32),
}

/// Positioned text runs of a page, in painting order.
pub fn page_text_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>> {
    let data = page_content(doc, page_id)?;
    let content = Content::decode(&data).map_err(|err| pdf_error("page content", err))?;
    let mut interpreter = Interpreter::new(doc, page_id);
    interpreter.run(&content.operations, page_resources(doc, page_id), 0);
    Ok(interpreter.runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PdfBuilder;

    fn runs_for(content: &str) -> Vec<TextRun> {
        let mut builder = PdfBuilder::new();
        builder.add_page(content);
        let doc = builder.build();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        page_text_runs(&doc, page_id).unwrap()
    }

    #[test]
    fn td_positions_runs() {
        let runs = runs_for("BT /F1 10 Tf 72 700 Td (Name) Tj 200 0 Td (Qty) Tj ET");
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].x, runs[0].y), (72.0, 700.0));
        assert_eq!((runs[1].x, runs[1].y), (272.0, 700.0));
        assert_eq!(runs[0].text, "Name");
        assert_eq!(runs[0].font_size, 10.0);
        assert_eq!(runs[0].width, 20.0);
    }

    #[test]
    fn leading_and_next_line() {
        let runs = runs_for("BT /F1 12 Tf 14 TL 50 500 Td (one) Tj T* (two) Tj (three) ' ET");
        let ys: Vec<f32> = runs.iter().map(|r| r.y).collect();
        assert_eq!(ys, vec![500.0, 486.0, 472.0]);
        assert!(runs.iter().all(|r| r.x == 50.0));
    }

    #[test]
    fn text_matrix_and_ctm_combine() {
        let runs = runs_for("q 2 0 0 2 10 20 cm BT /F1 5 Tf 1 0 0 1 30 40 Tm (x) Tj ET Q BT /F1 5 Tf 1 0 0 1 30 40 Tm (y) Tj ET");
        assert_eq!((runs[0].x, runs[0].y, runs[0].font_size), (70.0, 100.0, 10.0));
        assert_eq!((runs[1].x, runs[1].y, runs[1].font_size), (30.0, 40.0, 5.0));
    }

    #[test]
    fn tj_kerning_becomes_space() {
        let runs = runs_for("BT /F1 10 Tf 0 0 Td [(Hello) -50 (W) -400 (orld)] TJ ET");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "HelloW orld");
    }

    #[test]
    fn consecutive_shows_advance() {
        let runs = runs_for("BT /F1 10 Tf 100 100 Td (ab) Tj (cd) Tj ET");
        assert_eq!(runs[1].x, 110.0);
    }

    #[test]
    fn td_uppercase_sets_leading() {
        let runs = runs_for("BT /F1 10 Tf 0 300 Td (a) Tj 0 -20 TD (b) Tj T* (c) Tj ET");
        let ys: Vec<f32> = runs.iter().map(|r| r.y).collect();
        assert_eq!(ys, vec![300.0, 280.0, 260.0]);
    }
}
