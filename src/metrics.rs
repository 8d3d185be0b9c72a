use unicode_normalization::UnicodeNormalization as _;

use crate::pdf::BuiltinFont;

/// Width of a character when the metric tables cannot answer, as a fraction
/// of the font size. The constant-width estimate keeps layout going when a
/// glyph has no recorded advance.
pub const FALLBACK_WIDTH_FACTOR: f32 = 0.6;

/// Advance widths of the printable ASCII range (0x20..=0x7e) of Helvetica,
/// in 1/1000 of the font size, taken from the Adobe font metrics of the
/// base-14 faces.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20..=0x2f
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30..=0x3f
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40..=0x4f
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50..=0x5f
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60..=0x6f
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70..=0x7e
];

/// Advance widths of the printable ASCII range of Helvetica-Bold.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20..=0x2f
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30..=0x3f
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40..=0x4f
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50..=0x5f
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60..=0x6f
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70..=0x7e
];

/// Advance of one character in points, or `None` when the character is
/// outside the recorded range. The oblique face shares the advances of the
/// regular one.
fn character_advance(font: BuiltinFont, character: char) -> Option<f32> {
    let table = match font {
        BuiltinFont::Bold => &HELVETICA_BOLD_WIDTHS,
        BuiltinFont::Regular | BuiltinFont::Oblique => &HELVETICA_WIDTHS,
    };
    let codepoint = character as u32;
    if (0x20..=0x7e).contains(&codepoint) {
        Some(table[(codepoint - 0x20) as usize] as f32 / 1000.0)
    } else {
        None
    }
}

/// Measure the width of a single line of text in points. Characters without
/// a recorded advance fall back to the constant-width estimate, so the
/// measurement never fails.
pub fn measure_line(text: &str, font: BuiltinFont, font_size: f32) -> f32 {
    text.chars()
        .map(|character| {
            character_advance(font, character)
                .unwrap_or(FALLBACK_WIDTH_FACTOR)
                * font_size
        })
        .sum()
}

/// Reduce arbitrary input text to what the built-in font family can show:
/// the text is NFC-normalized, then every character outside printable ASCII
/// is replaced by a single space. Newlines are kept, since they carry the
/// paragraph structure.
pub fn normalize_to_supported(text: &str) -> String {
    text.nfc()
        .map(|character| {
            if character == '\n' || (' '..='\u{7e}').contains(&character) {
                character
            } else {
                ' '
            }
        })
        .collect()
}

/// Drop every byte a glyph run could choke on, keeping only printable
/// ASCII. This is the second attempt of the draw retry strategy, so it is
/// stricter than `normalize_to_supported`: offending characters are removed
/// rather than replaced.
pub fn strip_unsupported(text: &str) -> String {
    text.chars()
        .filter(|character| (' '..='\u{7e}').contains(character))
        .collect()
}

/// Greedily wrap one paragraph into lines no wider than `max_width` points.
/// Words are accumulated while the measured line still fits; a word that
/// does not fit starts the next line. A single word wider than the whole
/// column is emitted as its own line rather than split.
pub fn wrap_paragraph(
    paragraph: &str,
    font: BuiltinFont,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in paragraph.split_whitespace() {
        let candidate_line = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current_line, word)
        };

        if measure_line(&candidate_line, font, font_size) <= max_width || current_line.is_empty() {
            current_line = candidate_line;
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Wrap a whole body of text: explicit paragraph breaks are honored first,
/// then each paragraph is wrapped independently. The result keeps one entry
/// per paragraph; an empty paragraph yields an empty entry so the caller can
/// advance the cursor for intentional blank lines.
pub fn wrap_text(
    text: &str,
    font: BuiltinFont,
    font_size: f32,
    max_width: f32,
) -> Vec<Vec<String>> {
    text.split('\n')
        .map(|paragraph| wrap_paragraph(paragraph, font, font_size, max_width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measured_lines_accumulate_character_advances() {
        // "HH" in Helvetica: two advances of 722/1000 at 10pt.
        let width = measure_line("HH", BuiltinFont::Regular, 10.0);
        assert!((width - 14.44).abs() < 0.01, "unexpected width {}", width);
        // The bold face is wider than the regular one for the same text.
        assert!(
            measure_line("abc", BuiltinFont::Bold, 10.0)
                > measure_line("abc", BuiltinFont::Regular, 10.0)
        );
    }

    #[test]
    fn unknown_characters_measure_at_the_fallback_estimate() {
        let width = measure_line("\u{3b1}", BuiltinFont::Regular, 10.0);
        assert!((width - FALLBACK_WIDTH_FACTOR * 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn wrapping_is_greedy_and_never_splits_words() {
        let lines = wrap_paragraph(
            "one two three four five six seven",
            BuiltinFont::Regular,
            12.0,
            100.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            // Each emitted line individually fits, except a lone overlong word.
            if line.split_whitespace().count() > 1 {
                assert!(measure_line(line, BuiltinFont::Regular, 12.0) <= 100.0);
            }
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, "one two three four five six seven");
    }

    #[test]
    fn an_overlong_word_is_emitted_whole() {
        let lines = wrap_paragraph(
            "supercalifragilisticexpialidocious",
            BuiltinFont::Regular,
            12.0,
            20.0,
        );
        assert_eq!(lines, vec!["supercalifragilisticexpialidocious".to_string()]);
    }

    #[test]
    fn paragraph_breaks_are_preserved_by_wrap_text() {
        let paragraphs = wrap_text("first\n\nsecond", BuiltinFont::Regular, 12.0, 400.0);
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], vec!["first".to_string()]);
        assert!(paragraphs[1].is_empty());
        assert_eq!(paragraphs[2], vec!["second".to_string()]);
    }

    #[test]
    fn normalization_replaces_and_stripping_removes() {
        similar_asserts::assert_eq!(normalize_to_supported("caf\u{e9} au lait"), "caf  au lait");
        similar_asserts::assert_eq!(strip_unsupported("caf\u{e9} au lait"), "caf au lait");
        // Paragraph structure survives normalization.
        similar_asserts::assert_eq!(normalize_to_supported("a\nb"), "a\nb");
    }
}
