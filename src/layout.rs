use crate::canvas::PageCanvas;
use crate::error::ContextError;
use crate::metrics;
use crate::pdf::{BuiltinFont, DecodedImage, CONTENT_WIDTH, MARGIN, PAGE_HEIGHT};
use crate::sizing::{self, VisualRole};
use crate::visual::VisualOutcome;

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const CAPTION_SIZE: f32 = 9.0;
const PLACEHOLDER_SIZE: f32 = 10.0;

/// Line height as a multiple of the font size.
const LINE_SPACING: f32 = 1.35;
/// Extra vertical gap between two paragraphs of the same section.
const PARAGRAPH_GAP: f32 = 6.0;
/// Gap between a heading and the content under it.
const HEADING_GAP: f32 = 8.0;
/// Gap after the title block.
const TITLE_GAP: f32 = 16.0;
/// Gap between two sections.
const SECTION_GAP: f32 = 18.0;
/// Gap after a section that placed a flowchart; flowcharts need more
/// breathing room before the next heading.
const FLOWCHART_TRAILING_GAP: f32 = 30.0;
/// Gap between the body text and a flowchart stacked under it.
const TEXT_VISUAL_GAP: f32 = 14.0;
/// Horizontal gutter between a diagram and its text column.
const COLUMN_GUTTER: f32 = 15.0;
/// Gap between the bottom of a diagram and the full-width overflow text.
const IMAGE_TEXT_GAP: f32 = 12.0;
/// Minimum space left on the page for a side-by-side layout to start on it;
/// the layout must not begin and then break in the middle of the image.
const SIDE_BY_SIDE_MIN_SPACE: f32 = 250.0;
/// Width fraction of a diagram placed alone, without body text beside it.
const LONE_DIAGRAM_WIDTH_FRACTION: f32 = 0.7;
/// Defensive space requirement checked before every section starts.
const MIN_SECTION_LEAD: f32 = 60.0;

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const CAPTION_COLOR: [f32; 3] = [0.25, 0.25, 0.25];
const PLACEHOLDER_COLOR: [f32; 3] = [0.35, 0.35, 0.35];

/// The text of the notice rendered when a section was meant to carry a
/// visual and none could be produced or decoded.
pub const PLACEHOLDER_NOTICE: &str = "[ visualization unavailable ]";

/// The visual attached to a section: its role together with either the
/// raster buffer or the reason it is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionVisual {
    pub role: VisualRole,
    pub outcome: VisualOutcome,
}

/// One logical unit of the document: an optional heading, body text and an
/// optional visual with its caption. Sections are immutable once built and
/// consumed exactly once, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    pub body_text: String,
    pub visual: Option<SectionVisual>,
    pub caption: Option<String>,
}

/// Render the whole document: the title block followed by every section in
/// order, with the inter-section gaps and the defensive space check between
/// them.
pub fn render_document(
    canvas: &mut PageCanvas,
    title: &str,
    sections: &[Section],
) -> Result<(), ContextError> {
    if !title.trim().is_empty() {
        draw_title(canvas, title);
    }

    for section in sections {
        canvas.ensure_space(MIN_SECTION_LEAD);
        render_section(canvas, section)?;

        let trailing_gap = match &section.visual {
            Some(visual) if visual.role == VisualRole::Flowchart && visual.outcome.is_ready() => {
                FLOWCHART_TRAILING_GAP
            }
            _ => SECTION_GAP,
        };
        canvas.set_y(canvas.y() - trailing_gap);
    }

    Ok(())
}

fn render_section(canvas: &mut PageCanvas, section: &Section) -> Result<(), ContextError> {
    if let Some(heading) = &section.heading {
        draw_heading(canvas, heading);
    }

    match &section.visual {
        None => {
            draw_body(canvas, &section.body_text);
        }
        Some(SectionVisual {
            outcome: VisualOutcome::Failed(reason),
            ..
        }) => {
            draw_body(canvas, &section.body_text);
            draw_placeholder(canvas, reason);
        }
        Some(SectionVisual {
            role: VisualRole::Flowchart,
            outcome: VisualOutcome::Ready(buffer),
        }) => {
            render_flowchart_section(canvas, section, buffer)?;
        }
        Some(SectionVisual {
            role: VisualRole::Diagram,
            outcome: VisualOutcome::Ready(buffer),
        }) => {
            render_diagram_section(canvas, section, buffer)?;
        }
    }

    Ok(())
}

/// Stacked layout: body text at full width, then the flowchart centered
/// under it, then its caption.
fn render_flowchart_section(
    canvas: &mut PageCanvas,
    section: &Section,
    buffer: &[u8],
) -> Result<(), ContextError> {
    draw_body(canvas, &section.body_text);
    canvas.set_y(canvas.y() - TEXT_VISUAL_GAP);

    let Some(decoded_image) = PageCanvas::decode_only(buffer) else {
        draw_placeholder(canvas, "the flowchart buffer could not be decoded");
        return Ok(());
    };
    let footprint = sizing::plan_footprint(
        VisualRole::Flowchart,
        decoded_image.width,
        decoded_image.height,
    );
    let band = match &section.caption {
        Some(_) => sizing::caption_band(VisualRole::Flowchart),
        None => 0.0,
    };
    canvas.ensure_space(footprint.height + band);

    let x = MARGIN + (CONTENT_WIDTH - footprint.width) / 2.0;
    let image_bottom = canvas.y() - footprint.height;
    canvas.draw_decoded(&decoded_image, x, image_bottom, footprint.width, footprint.height)?;
    canvas.set_y(image_bottom);

    if let Some(caption) = &section.caption {
        draw_caption(
            canvas,
            caption,
            MARGIN,
            CONTENT_WIDTH,
            sizing::caption_band(VisualRole::Flowchart),
        );
    }

    Ok(())
}

/// Side-by-side layout: the diagram at the left column, the body text in a
/// right column level with the image top, wrapping around to full width
/// once the text outgrows the image. A diagram without body text is placed
/// alone, centered.
fn render_diagram_section(
    canvas: &mut PageCanvas,
    section: &Section,
    buffer: &[u8],
) -> Result<(), ContextError> {
    let Some(decoded_image) = PageCanvas::decode_only(buffer) else {
        draw_body(canvas, &section.body_text);
        draw_placeholder(canvas, "the diagram buffer could not be decoded");
        return Ok(());
    };

    let normalized_body = metrics::normalize_to_supported(&section.body_text);
    if normalized_body.trim().is_empty() {
        return render_lone_diagram(canvas, section, &decoded_image);
    }

    // The layout must not be interrupted by a page break partway through
    // the image, so a nearly full page is abandoned before starting.
    if canvas.remaining_space() < SIDE_BY_SIDE_MIN_SPACE {
        canvas.break_page();
    }
    let footprint = sizing::plan_footprint(
        VisualRole::Diagram,
        decoded_image.width,
        decoded_image.height,
    );
    let band = match &section.caption {
        Some(_) => sizing::caption_band(VisualRole::Diagram),
        None => 0.0,
    };
    canvas.ensure_space(footprint.height + band);

    let image_top = canvas.y();
    let image_bottom = image_top - footprint.height;
    canvas.draw_decoded(
        &decoded_image,
        MARGIN,
        image_bottom,
        footprint.width,
        footprint.height,
    )?;

    // First phase: the text flows in a column to the right of the image,
    // staying level with it.
    let column_x = MARGIN + footprint.width + COLUMN_GUTTER;
    let column_width = CONTENT_WIDTH - footprint.width - COLUMN_GUTTER;
    let flow = plan_column_flow(
        tokenize(&normalized_body),
        BuiltinFont::Regular,
        BODY_SIZE,
        column_width,
        image_top,
        image_bottom,
    );
    for (line, baseline) in &flow.lines {
        if let Err(error) =
            canvas.draw_line(line, BuiltinFont::Regular, BODY_SIZE, BLACK, column_x, *baseline)
        {
            log::warn!("Dropping an undrawable line: {}", error);
        }
    }

    let caption_bottom = match &section.caption {
        Some(caption) => {
            canvas.set_y(image_bottom);
            draw_caption(
                canvas,
                caption,
                MARGIN,
                footprint.width,
                sizing::caption_band(VisualRole::Diagram),
            );
            canvas.y()
        }
        None => image_bottom,
    };

    if flow.overflow.is_empty() {
        // The final cursor is the lower of the two phases; with no overflow
        // the image (or its caption) is always the lower one.
        canvas.set_y(caption_bottom.min(flow.exit_y));
    } else {
        // Second phase: the remaining words continue at full content width,
        // just below the image and whatever caption it carries.
        canvas.set_y(caption_bottom - IMAGE_TEXT_GAP);
        draw_flow(
            canvas,
            &flow.overflow,
            BuiltinFont::Regular,
            BODY_SIZE,
            MARGIN,
            CONTENT_WIDTH,
        );
    }

    Ok(())
}

fn render_lone_diagram(
    canvas: &mut PageCanvas,
    section: &Section,
    decoded_image: &DecodedImage,
) -> Result<(), ContextError> {
    let natural_width = decoded_image.width.max(1) as f32;
    let natural_height = decoded_image.height.max(1) as f32;
    let band = match &section.caption {
        Some(_) => sizing::caption_band(VisualRole::Diagram),
        None => 0.0,
    };
    let mut width = LONE_DIAGRAM_WIDTH_FRACTION * CONTENT_WIDTH;
    let mut height = width * natural_height / natural_width;
    // A degenerately tall buffer must still fit on one page with its band.
    let height_cap = PAGE_HEIGHT - 2.0 * MARGIN - band;
    if height > height_cap {
        width = width * height_cap / height;
        height = height_cap;
    }
    canvas.ensure_space(height + band);

    let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
    let image_bottom = canvas.y() - height;
    canvas.draw_decoded(decoded_image, x, image_bottom, width, height)?;
    canvas.set_y(image_bottom);

    if let Some(caption) = &section.caption {
        draw_caption(
            canvas,
            caption,
            MARGIN,
            CONTENT_WIDTH,
            sizing::caption_band(VisualRole::Diagram),
        );
    }

    Ok(())
}

fn draw_title(canvas: &mut PageCanvas, title: &str) {
    let normalized_title = metrics::normalize_to_supported(title).replace('\n', " ");
    for line in metrics::wrap_paragraph(
        &normalized_title,
        BuiltinFont::Bold,
        TITLE_SIZE,
        CONTENT_WIDTH,
    ) {
        draw_wrapped_line(canvas, &line, BuiltinFont::Bold, TITLE_SIZE, BLACK, MARGIN);
    }
    canvas.set_y(canvas.y() - TITLE_GAP);
}

fn draw_heading(canvas: &mut PageCanvas, heading: &str) {
    let normalized_heading = metrics::normalize_to_supported(heading).replace('\n', " ");
    for line in metrics::wrap_paragraph(
        &normalized_heading,
        BuiltinFont::Bold,
        HEADING_SIZE,
        CONTENT_WIDTH,
    ) {
        draw_wrapped_line(canvas, &line, BuiltinFont::Bold, HEADING_SIZE, BLACK, MARGIN);
    }
    canvas.set_y(canvas.y() - HEADING_GAP);
}

fn draw_body(canvas: &mut PageCanvas, body_text: &str) {
    let normalized_body = metrics::normalize_to_supported(body_text);
    if normalized_body.trim().is_empty() {
        return;
    }
    let line_height = BODY_SIZE * LINE_SPACING;
    let paragraphs = metrics::wrap_text(
        &normalized_body,
        BuiltinFont::Regular,
        BODY_SIZE,
        CONTENT_WIDTH,
    );
    for (paragraph_index, paragraph_lines) in paragraphs.iter().enumerate() {
        if paragraph_index > 0 {
            canvas.set_y(canvas.y() - PARAGRAPH_GAP);
        }
        if paragraph_lines.is_empty() {
            // An intentionally blank paragraph still advances the cursor by
            // half a line height.
            canvas.set_y(canvas.y() - 0.5 * line_height);
            continue;
        }
        for line in paragraph_lines {
            draw_wrapped_line(canvas, line, BuiltinFont::Regular, BODY_SIZE, BLACK, MARGIN);
        }
    }
}

/// The single notice line standing in for a missing visual. The user must
/// be told content is missing; skipping silently is not an option.
fn draw_placeholder(canvas: &mut PageCanvas, reason: &str) {
    log::warn!("Rendering a placeholder instead of a visual: {}", reason);
    draw_wrapped_line(
        canvas,
        PLACEHOLDER_NOTICE,
        BuiltinFont::Oblique,
        PLACEHOLDER_SIZE,
        PLACEHOLDER_COLOR,
        MARGIN,
    );
}

/// Caption lines centered inside the given box, confined to the reserved
/// band under the visual. The cursor ends at the bottom of the band.
fn draw_caption(canvas: &mut PageCanvas, caption: &str, box_x: f32, box_width: f32, band: f32) {
    let image_bottom = canvas.y();
    let normalized_caption = metrics::normalize_to_supported(caption).replace('\n', " ");
    let mut baseline = image_bottom - 14.0;
    for line in metrics::wrap_paragraph(
        &normalized_caption,
        BuiltinFont::Oblique,
        CAPTION_SIZE,
        box_width,
    ) {
        if baseline < image_bottom - band + 4.0 {
            break;
        }
        let line_width = metrics::measure_line(&line, BuiltinFont::Oblique, CAPTION_SIZE);
        let x = box_x + (box_width - line_width) / 2.0;
        if let Err(error) =
            canvas.draw_line(&line, BuiltinFont::Oblique, CAPTION_SIZE, CAPTION_COLOR, x, baseline)
        {
            log::warn!("Dropping an undrawable caption line: {}", error);
        }
        baseline -= CAPTION_SIZE * 1.3;
    }
    canvas.set_y(image_bottom - band);
}

/// Draw one wrapped line at the current cursor, breaking the page first if
/// it would not fit. A line that cannot be drawn even after sanitization is
/// dropped; the cursor still advances so the flow stays consistent.
fn draw_wrapped_line(
    canvas: &mut PageCanvas,
    text: &str,
    font: BuiltinFont,
    font_size: f32,
    color: [f32; 3],
    x: f32,
) {
    let line_height = font_size * LINE_SPACING;
    canvas.ensure_space(line_height);
    let baseline = canvas.y() - font_size;
    if let Err(error) = canvas.draw_line(text, font, font_size, color, x, baseline) {
        log::warn!("Dropping an undrawable line: {}", error);
    }
    canvas.set_y(canvas.y() - line_height);
}

/// A word stream with explicit paragraph boundaries, so that a text flow
/// can be interrupted and resumed at a different width without losing the
/// paragraph structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlowToken {
    Word(String),
    Break,
}

pub(crate) fn tokenize(text: &str) -> Vec<FlowToken> {
    let mut tokens = Vec::new();
    for (paragraph_index, paragraph) in text.split('\n').enumerate() {
        if paragraph_index > 0 {
            tokens.push(FlowToken::Break);
        }
        for word in paragraph.split_whitespace() {
            tokens.push(FlowToken::Word(word.to_string()));
        }
    }
    tokens
}

/// The first phase of the side-by-side layout, planned ahead of drawing:
/// the lines that fit in the right column beside the image, the tokens left
/// over for the full-width phase, and the vertical position where the
/// column phase exited.
#[derive(Debug, Clone)]
pub(crate) struct ColumnFlow {
    /// Column lines with their baselines; every baseline is at or above the
    /// image bottom.
    pub lines: Vec<(String, f32)>,
    /// Tokens that did not fit beside the image.
    pub overflow: Vec<FlowToken>,
    /// The baseline slot below the last emitted column line.
    pub exit_y: f32,
}

/// Greedily flow tokens into a column of the given width between `top_y`
/// and `bottom_y`. The flow stops the instant a line would fall below
/// `bottom_y`; everything not yet placed is returned as overflow.
pub(crate) fn plan_column_flow(
    tokens: Vec<FlowToken>,
    font: BuiltinFont,
    font_size: f32,
    column_width: f32,
    top_y: f32,
    bottom_y: f32,
) -> ColumnFlow {
    let line_height = font_size * LINE_SPACING;
    // The first baseline sits level with the image top.
    let mut y = top_y - font_size;
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut index = 0;

    while index < tokens.len() {
        if y < bottom_y {
            break;
        }
        match &tokens[index] {
            FlowToken::Word(word) => {
                let candidate_line = if current_line.is_empty() {
                    word.clone()
                } else {
                    format!("{} {}", current_line, word)
                };
                if current_line.is_empty()
                    || metrics::measure_line(&candidate_line, font, font_size) <= column_width
                {
                    current_line = candidate_line;
                    index += 1;
                } else {
                    lines.push((std::mem::take(&mut current_line), y));
                    y -= line_height;
                    // The word stays in place for the next baseline slot.
                }
            }
            FlowToken::Break => {
                if current_line.is_empty() {
                    y -= 0.5 * line_height;
                } else {
                    lines.push((std::mem::take(&mut current_line), y));
                    y -= line_height + PARAGRAPH_GAP;
                }
                index += 1;
            }
        }
    }

    if !current_line.is_empty() && y >= bottom_y && index >= tokens.len() {
        lines.push((std::mem::take(&mut current_line), y));
        y -= line_height;
    }

    let mut overflow = Vec::new();
    for word in current_line.split_whitespace() {
        overflow.push(FlowToken::Word(word.to_string()));
    }
    overflow.extend(tokens[index..].iter().cloned());

    ColumnFlow {
        lines,
        overflow,
        exit_y: y,
    }
}

/// Greedily flow tokens at a fixed width from the current cursor downward,
/// breaking pages as needed. Used for full-width body text and for the
/// overflow phase of the side-by-side layout.
fn draw_flow(
    canvas: &mut PageCanvas,
    tokens: &[FlowToken],
    font: BuiltinFont,
    font_size: f32,
    x: f32,
    width: f32,
) {
    let line_height = font_size * LINE_SPACING;
    let mut current_line = String::new();
    let mut index = 0;

    while index < tokens.len() {
        match &tokens[index] {
            FlowToken::Word(word) => {
                let candidate_line = if current_line.is_empty() {
                    word.clone()
                } else {
                    format!("{} {}", current_line, word)
                };
                if current_line.is_empty()
                    || metrics::measure_line(&candidate_line, font, font_size) <= width
                {
                    current_line = candidate_line;
                    index += 1;
                } else {
                    draw_wrapped_line(canvas, &current_line, font, font_size, BLACK, x);
                    current_line.clear();
                }
            }
            FlowToken::Break => {
                if current_line.is_empty() {
                    // An intentionally blank paragraph still advances the
                    // cursor by half a line height.
                    canvas.set_y(canvas.y() - 0.5 * line_height);
                } else {
                    draw_wrapped_line(canvas, &current_line, font, font_size, BLACK, x);
                    current_line.clear();
                    canvas.set_y(canvas.y() - PARAGRAPH_GAP);
                }
                index += 1;
            }
        }
    }
    if !current_line.is_empty() {
        draw_wrapped_line(canvas, &current_line, font, font_size, BLACK, x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize) -> String {
        (0..count)
            .map(|index| format!("word{}", index))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn png_buffer(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([120, 140, 160]));
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn collect_text_runs(document: &crate::pdf::PdfDocument) -> Vec<String> {
        let mut runs = Vec::new();
        for page in &document.pages {
            for operation in &page.operations {
                if operation.operator == "Tj" {
                    if let Some(lopdf::Object::String(bytes, _)) = operation.operands.first() {
                        runs.push(String::from_utf8_lossy(bytes).to_string());
                    }
                }
            }
        }
        runs
    }

    fn image_placement_count(document: &crate::pdf::PdfDocument) -> usize {
        document
            .pages
            .iter()
            .map(|page| page.image_xobjects.len())
            .sum()
    }

    #[test]
    fn column_lines_never_cross_the_image_bottom() {
        let flow = plan_column_flow(
            tokenize(&words(400)),
            BuiltinFont::Regular,
            BODY_SIZE,
            180.0,
            700.0,
            450.0,
        );
        assert!(!flow.lines.is_empty());
        assert!(!flow.overflow.is_empty());
        for (_, baseline) in &flow.lines {
            assert!(*baseline >= 450.0);
        }
        assert!(flow.exit_y <= 450.0 + BODY_SIZE * LINE_SPACING);
    }

    #[test]
    fn the_flow_switch_loses_no_words() {
        let body = words(300);
        let flow = plan_column_flow(
            tokenize(&body),
            BuiltinFont::Regular,
            BODY_SIZE,
            200.0,
            720.0,
            500.0,
        );
        let mut seen = Vec::new();
        for (line, _) in &flow.lines {
            seen.extend(line.split_whitespace().map(str::to_string));
        }
        for token in &flow.overflow {
            if let FlowToken::Word(word) = token {
                seen.push(word.clone());
            }
        }
        assert_eq!(seen.join(" "), body);
    }

    #[test]
    fn short_text_stays_entirely_in_the_column() {
        let flow = plan_column_flow(
            tokenize("just a few words"),
            BuiltinFont::Regular,
            BODY_SIZE,
            200.0,
            700.0,
            400.0,
        );
        assert!(flow.overflow.is_empty());
        assert_eq!(flow.lines.len(), 1);
    }

    #[test]
    fn side_by_side_text_wraps_around_the_image_bottom() {
        let mut canvas = PageCanvas::new("Side by side");
        let section = Section {
            heading: Some("Cell structure".to_string()),
            body_text: words(350),
            visual: Some(SectionVisual {
                role: VisualRole::Diagram,
                outcome: VisualOutcome::Ready(png_buffer(80, 80)),
            }),
            caption: None,
        };
        render_document(&mut canvas, "Biology", std::slice::from_ref(&section)).unwrap();
        let document = canvas.into_document();

        assert_eq!(image_placement_count(&document), 1);
        let runs = collect_text_runs(&document);
        // Heading, many body lines, both column and full-width phases.
        assert!(runs.iter().any(|run| run == "Cell structure"));
        assert!(runs.iter().any(|run| run.contains("word0")));
        assert!(runs.iter().any(|run| run.contains("word349")));
    }

    #[test]
    fn a_failed_visual_yields_exactly_one_placeholder_line_and_no_image() {
        let mut canvas = PageCanvas::new("Placeholder");
        let section = Section {
            heading: Some("Krebs cycle".to_string()),
            body_text: "The cycle oxidizes acetyl-CoA.".to_string(),
            visual: Some(SectionVisual {
                role: VisualRole::Diagram,
                outcome: VisualOutcome::Failed("rate limited".to_string()),
            }),
            caption: None,
        };
        render_document(&mut canvas, "Metabolism", std::slice::from_ref(&section)).unwrap();
        let document = canvas.into_document();

        assert_eq!(image_placement_count(&document), 0);
        let notices = collect_text_runs(&document)
            .into_iter()
            .filter(|run| run == PLACEHOLDER_NOTICE)
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn a_corrupt_buffer_degrades_to_a_placeholder() {
        let mut canvas = PageCanvas::new("Corrupt");
        let section = Section {
            heading: None,
            body_text: "Some context.".to_string(),
            visual: Some(SectionVisual {
                role: VisualRole::Flowchart,
                outcome: VisualOutcome::Ready(b"not an image at all".to_vec()),
            }),
            caption: Some("Never shown".to_string()),
        };
        render_document(&mut canvas, "", std::slice::from_ref(&section)).unwrap();
        let document = canvas.into_document();

        assert_eq!(image_placement_count(&document), 0);
        assert!(collect_text_runs(&document)
            .iter()
            .any(|run| run == PLACEHOLDER_NOTICE));
    }

    #[test]
    fn long_documents_paginate_without_splitting_lines() {
        let mut canvas = PageCanvas::new("Pagination");
        let sections: Vec<Section> = (0..6)
            .map(|section_index| Section {
                heading: Some(format!("Part {}", section_index)),
                body_text: words(250),
                visual: None,
                caption: None,
            })
            .collect();
        render_document(&mut canvas, "A long read", &sections).unwrap();
        assert!(canvas.page_count() > 1);
    }

    #[test]
    fn a_diagram_without_body_text_is_centered_at_seventy_percent() {
        let mut canvas = PageCanvas::new("Lone diagram");
        let section = Section {
            heading: Some("Anatomy".to_string()),
            body_text: String::new(),
            visual: Some(SectionVisual {
                role: VisualRole::Diagram,
                outcome: VisualOutcome::Ready(png_buffer(64, 64)),
            }),
            caption: Some("The heart".to_string()),
        };
        render_document(&mut canvas, "", std::slice::from_ref(&section)).unwrap();
        let document = canvas.into_document();

        assert_eq!(image_placement_count(&document), 1);
        // The placement operation carries the computed footprint: the cm
        // matrix scales the unit square to 70% of the content width.
        let mut found = false;
        for page in &document.pages {
            for operation in &page.operations {
                if operation.operator == "cm" {
                    if let Some(lopdf::Object::Real(width)) = operation.operands.first() {
                        assert!((*width - 0.7 * CONTENT_WIDTH).abs() < 0.01);
                        found = true;
                    }
                }
            }
        }
        assert!(found);
    }
}
