//! Result interpretation and frame annotation.
//!
//! Two mutually exclusive modes, fixed by the model's capability:
//! detectors yield zero or more boxes drawn onto the frame, classifiers
//! yield the single best label. Both mutate the frame in place.

use crate::frame::Frame;
use crate::infer::outcome::{BoundingBox, InferenceOutput, LabelScore};

const BOX_COLOR: [u8; 3] = [255, 255, 255];
const BOX_THICKNESS: u32 = 2;
const TEXT_COLOR: [u8; 3] = [0, 0, 0];
const GLYPH_ADVANCE: i64 = 6;
const GLYPH_HEIGHT: i64 = 7;

/// What one cycle's rendering reported.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderReport {
    /// Detection mode: the kept boxes, in the engine's candidate order.
    Objects(Vec<BoundingBox>),
    /// Detection mode with every candidate slot empty, or classification
    /// with no score above zero.
    NoObjects,
    /// Classification mode: the first-encountered maximum-confidence label.
    TopClass(LabelScore),
}

/// Interpret `output` and draw it onto `frame`.
pub fn render_result(frame: &mut Frame, output: &InferenceOutput) -> RenderReport {
    match output {
        InferenceOutput::Detection(candidates) => render_detections(frame, candidates),
        InferenceOutput::Classification(scores) => render_classification(frame, scores),
    }
}

fn render_detections(frame: &mut Frame, candidates: &[BoundingBox]) -> RenderReport {
    let mut kept = Vec::new();
    for bb in candidates {
        // Confidence exactly 0 marks an empty candidate slot.
        if bb.confidence == 0.0 {
            continue;
        }
        draw_rectangle(
            frame,
            bb.x as i64,
            bb.y as i64,
            (bb.x + bb.width) as i64,
            (bb.y + bb.height) as i64,
        );
        draw_text(
            frame,
            bb.x as i64,
            bb.y as i64 - GLYPH_HEIGHT - 2,
            &bb.label,
        );
        kept.push(bb.clone());
    }
    if kept.is_empty() {
        RenderReport::NoObjects
    } else {
        RenderReport::Objects(kept)
    }
}

fn render_classification(frame: &mut Frame, scores: &[LabelScore]) -> RenderReport {
    // Strict greater-than keeps the first of tied maxima, and an all-zero
    // list selects nothing.
    let mut best: Option<usize> = None;
    let mut max_value = 0.0f32;
    for (ix, score) in scores.iter().enumerate() {
        if score.confidence > max_value {
            max_value = score.confidence;
            best = Some(ix);
        }
    }

    match best {
        Some(ix) => {
            let top = scores[ix].clone();
            let text = format!("{}: {:.2}", top.label, top.confidence);
            draw_text(frame, 2, 2, &text);
            RenderReport::TopClass(top)
        }
        None => RenderReport::NoObjects,
    }
}

/// Outline rectangle, clipped at the frame edges.
fn draw_rectangle(frame: &mut Frame, left: i64, top: i64, right: i64, bottom: i64) {
    for inset in 0..BOX_THICKNESS as i64 {
        let (lx, ty) = (left + inset, top + inset);
        let (rx, by) = (right - inset, bottom - inset);
        for x in lx..=rx {
            frame.put_bgr(x, ty, BOX_COLOR);
            frame.put_bgr(x, by, BOX_COLOR);
        }
        for y in ty..=by {
            frame.put_bgr(lx, y, BOX_COLOR);
            frame.put_bgr(rx, y, BOX_COLOR);
        }
    }
}

/// 5x7 bitmap text, clipped at the frame edges. Characters without a glyph
/// advance the cursor and draw nothing.
fn draw_text(frame: &mut Frame, x: i64, y: i64, text: &str) {
    let mut cursor = x;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5i64 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        frame.put_bgr(cursor + col, y + row as i64, TEXT_COLOR);
                    }
                }
            }
        }
        cursor += GLYPH_ADVANCE;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([
            0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'B' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110,
        ]),
        'C' => Some([
            0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110,
        ]),
        'D' => Some([
            0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'F' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000,
        ]),
        'G' => Some([
            0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111,
        ]),
        'H' => Some([
            0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'J' => Some([
            0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100,
        ]),
        'K' => Some([
            0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001,
        ]),
        'L' => Some([
            0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'M' => Some([
            0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001,
        ]),
        'N' => Some([
            0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001,
        ]),
        'O' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'P' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ]),
        'Q' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101,
        ]),
        'R' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        'T' => Some([
            0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        'U' => Some([
            0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'V' => Some([
            0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100,
        ]),
        'W' => Some([
            0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010,
        ]),
        'X' => Some([
            0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b01010, 0b10001,
        ]),
        'Y' => Some([
            0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        'Z' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        ':' => Some([0, 0b00110, 0b00110, 0, 0b00110, 0b00110, 0]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        '-' => Some([0, 0, 0, 0b01110, 0, 0, 0]),
        '_' => Some([0, 0, 0, 0, 0, 0, 0b11111]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
