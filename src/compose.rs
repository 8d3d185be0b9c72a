use crate::canvas::PageCanvas;
use crate::content_format::{GeneratedContent, PlannedSection, SectionPlan};
use crate::error::ContextError;
use crate::layout::{self, Section, SectionVisual};
use crate::metrics;
use crate::pdf::{BuiltinFont, PdfDocument, CONTENT_WIDTH, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use crate::sizing::VisualRole;
use crate::visual::{DiagramResult, FlowchartResult};

/// The display title used when the section plan does not provide one.
pub const DEFAULT_TITLE: &str = "Study notes";

/// Keywords shared between a flowchart name and a section heading or
/// caption that are taken as a hint the two talk about the same process.
/// The last and fuzziest rung of the matching cascade.
const SHARED_KEYWORDS: [&str; 6] = [
    "process", "flow", "algorithm", "steps", "pipeline", "cycle",
];

/// A finished document: the serialized bytes and the title suitable for a
/// file name or display label.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub title: String,
    pub bytes: Vec<u8>,
}

/// Compose the document out of the generated content, the visual results
/// and the optional section plan.
///
/// This function upholds the always-renderable contract: every failure
/// below a total one is degraded in place (placeholders, stripped glyph
/// runs, positional ordering), and if the render itself fails the caller
/// still receives a minimal document explaining what happened. Only when
/// even that last resort cannot be serialized does an error escape.
pub fn assemble(
    content: &GeneratedContent,
    diagrams: Vec<DiagramResult>,
    flowcharts: Vec<FlowchartResult>,
    plan: Option<&SectionPlan>,
) -> Result<ComposedDocument, ContextError> {
    let title = plan
        .map(|plan| plan.title.trim())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let sections = build_sections(content, diagrams, flowcharts, plan);
    match render_sections(&title, &sections) {
        Ok(bytes) => Ok(ComposedDocument { title, bytes }),
        Err(error) => {
            log::error!(
                "Falling back to the degraded document after a render failure: {}",
                error
            );
            let bytes = degraded_document(&title, &error, &content.summary)?;
            Ok(ComposedDocument { title, bytes })
        }
    }
}

/// Map the generated content and the visual results onto an ordered section
/// list. With a usable plan the planned sections drive the order and each
/// visual is matched to the section naming its concept; without one the
/// fixed positional ordering applies: summary first, then one section per
/// diagram, then one per flowchart.
pub fn build_sections(
    content: &GeneratedContent,
    diagrams: Vec<DiagramResult>,
    flowcharts: Vec<FlowchartResult>,
    plan: Option<&SectionPlan>,
) -> Vec<Section> {
    match plan {
        Some(plan) if !plan.sections.is_empty() => {
            build_planned_sections(content, diagrams, flowcharts, plan)
        }
        Some(_) => {
            log::warn!("The section plan is empty, falling back to positional ordering");
            build_positional_sections(content, diagrams, flowcharts)
        }
        None => build_positional_sections(content, diagrams, flowcharts),
    }
}

fn build_planned_sections(
    content: &GeneratedContent,
    diagrams: Vec<DiagramResult>,
    flowcharts: Vec<FlowchartResult>,
    plan: &SectionPlan,
) -> Vec<Section> {
    // Entries are taken out of the pools as they are assigned, so a visual
    // can never be used twice.
    let mut diagram_pool: Vec<Option<DiagramResult>> = diagrams.into_iter().map(Some).collect();
    let mut flowchart_pool: Vec<Option<FlowchartResult>> =
        flowcharts.into_iter().map(Some).collect();
    let mut sections = Vec::new();

    for planned in &plan.sections {
        if !planned.include_image {
            sections.push(Section {
                heading: planned.heading.clone(),
                body_text: planned.content.clone(),
                visual: None,
                caption: None,
            });
            continue;
        }

        let heading_text = planned.heading.as_deref().unwrap_or("");
        let caption_text = planned.image_caption.as_deref().unwrap_or("");

        // Flowcharts are matched first, through the name cascade.
        if let Some(pool_index) = match_flowchart(&flowchart_pool, heading_text, caption_text) {
            if let Some(flowchart) = flowchart_pool[pool_index].take() {
                sections.push(planned_section_with_flowchart(planned, flowchart));
                continue;
            }
        }
        // Then diagrams, by concept-name containment.
        if let Some(pool_index) = match_diagram(
            &diagram_pool,
            &content.concepts_diagram,
            heading_text,
            caption_text,
        ) {
            if let Some(diagram) = diagram_pool[pool_index].take() {
                sections.push(planned_section_with_diagram(
                    planned,
                    diagram,
                    &content.concepts_diagram,
                ));
                continue;
            }
        }
        // The plan wanted a visual here: any remaining one is better than
        // none, with flowcharts preferred.
        if let Some(entry) = flowchart_pool.iter_mut().find(|entry| entry.is_some()) {
            if let Some(flowchart) = entry.take() {
                log::debug!(
                    "Assigning the unmatched flowchart {:?} to the section {:?}",
                    flowchart.name,
                    planned.heading
                );
                sections.push(planned_section_with_flowchart(planned, flowchart));
                continue;
            }
        }
        if let Some(entry) = diagram_pool.iter_mut().find(|entry| entry.is_some()) {
            if let Some(diagram) = entry.take() {
                sections.push(planned_section_with_diagram(
                    planned,
                    diagram,
                    &content.concepts_diagram,
                ));
                continue;
            }
        }
        // No visual left at all; the section still renders as text.
        sections.push(Section {
            heading: planned.heading.clone(),
            body_text: planned.content.clone(),
            visual: None,
            caption: None,
        });
    }

    // Generated visuals must never be silently dropped: whatever the plan
    // did not claim is appended as trailing sections.
    for flowchart in flowchart_pool.into_iter().flatten() {
        let heading = if flowchart.name.trim().is_empty() {
            format!("Process overview {}", flowchart.index + 1)
        } else {
            flowchart.name.clone()
        };
        sections.push(Section {
            heading: Some(heading.clone()),
            body_text: String::new(),
            visual: Some(SectionVisual {
                role: VisualRole::Flowchart,
                outcome: flowchart.outcome,
            }),
            caption: Some(heading),
        });
    }
    for diagram in diagram_pool.into_iter().flatten() {
        let concept = diagram_concept(&content.concepts_diagram, diagram.index);
        sections.push(Section {
            heading: Some(concept.clone()),
            body_text: String::new(),
            visual: Some(SectionVisual {
                role: VisualRole::Diagram,
                outcome: diagram.outcome,
            }),
            caption: Some(concept),
        });
    }

    sections
}

fn build_positional_sections(
    content: &GeneratedContent,
    diagrams: Vec<DiagramResult>,
    flowcharts: Vec<FlowchartResult>,
) -> Vec<Section> {
    let mut sections = vec![Section {
        heading: Some("Overview".to_string()),
        body_text: content.summary.clone(),
        visual: None,
        caption: None,
    }];

    for diagram in diagrams {
        let concept = diagram_concept(&content.concepts_diagram, diagram.index);
        sections.push(Section {
            heading: Some(concept.clone()),
            body_text: String::new(),
            visual: Some(SectionVisual {
                role: VisualRole::Diagram,
                outcome: diagram.outcome,
            }),
            caption: Some(concept),
        });
    }
    for flowchart in flowcharts {
        let heading = if flowchart.name.trim().is_empty() {
            content
                .concepts_flowcharts
                .get(flowchart.index)
                .cloned()
                .unwrap_or_else(|| format!("Process overview {}", flowchart.index + 1))
        } else {
            flowchart.name.clone()
        };
        sections.push(Section {
            heading: Some(heading.clone()),
            body_text: String::new(),
            visual: Some(SectionVisual {
                role: VisualRole::Flowchart,
                outcome: flowchart.outcome,
            }),
            caption: Some(heading),
        });
    }

    sections
}

fn planned_section_with_flowchart(planned: &PlannedSection, flowchart: FlowchartResult) -> Section {
    let caption = planned.image_caption.clone().or_else(|| {
        if flowchart.name.trim().is_empty() {
            None
        } else {
            Some(flowchart.name.clone())
        }
    });
    Section {
        heading: planned.heading.clone(),
        body_text: planned.content.clone(),
        visual: Some(SectionVisual {
            role: VisualRole::Flowchart,
            outcome: flowchart.outcome,
        }),
        caption,
    }
}

fn planned_section_with_diagram(
    planned: &PlannedSection,
    diagram: DiagramResult,
    concepts: &[String],
) -> Section {
    let caption = planned
        .image_caption
        .clone()
        .or_else(|| concepts.get(diagram.index).cloned());
    Section {
        heading: planned.heading.clone(),
        body_text: planned.content.clone(),
        visual: Some(SectionVisual {
            role: VisualRole::Diagram,
            outcome: diagram.outcome,
        }),
        caption,
    }
}

fn diagram_concept(concepts: &[String], index: usize) -> String {
    concepts
        .get(index)
        .filter(|concept| !concept.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| format!("Concept {}", index + 1))
}

fn normalize_for_match(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Find the flowchart matching the given heading and caption, walking the
/// descending-precision cascade: every unused flowchart is tried against a
/// higher-precision strategy before any lower-precision one is considered.
fn match_flowchart(
    pool: &[Option<FlowchartResult>],
    heading: &str,
    caption: &str,
) -> Option<usize> {
    let heading = normalize_for_match(heading);
    let caption = normalize_for_match(caption);

    type Strategy = fn(name: &str, heading: &str, caption: &str) -> bool;
    let cascade: [(&str, Strategy); 5] = [
        ("exact heading match", |name, heading, _| {
            !heading.is_empty() && heading == name
        }),
        ("heading contains the name", |name, heading, _| {
            !name.is_empty() && heading.contains(name)
        }),
        ("name contains the heading", |name, heading, _| {
            !heading.is_empty() && name.contains(heading)
        }),
        ("caption contains the name", |name, _, caption| {
            !name.is_empty() && caption.contains(name)
        }),
        ("shared keyword", |name, heading, caption| {
            SHARED_KEYWORDS.iter().any(|keyword| {
                name.contains(keyword) && (heading.contains(keyword) || caption.contains(keyword))
            })
        }),
    ];

    for (strategy_name, strategy) in cascade {
        for (pool_index, entry) in pool.iter().enumerate() {
            if let Some(flowchart) = entry {
                let name = normalize_for_match(&flowchart.name);
                if strategy(&name, &heading, &caption) {
                    log::debug!(
                        "Matched the flowchart {:?} by {}",
                        flowchart.name,
                        strategy_name
                    );
                    return Some(pool_index);
                }
            }
        }
    }
    None
}

/// Find a diagram whose concept name is contained in the heading or
/// caption (or the other way around).
fn match_diagram(
    pool: &[Option<DiagramResult>],
    concepts: &[String],
    heading: &str,
    caption: &str,
) -> Option<usize> {
    let heading = normalize_for_match(heading);
    let caption = normalize_for_match(caption);

    for (pool_index, entry) in pool.iter().enumerate() {
        if let Some(diagram) = entry {
            let concept = concepts
                .get(diagram.index)
                .map(|concept| normalize_for_match(concept))
                .unwrap_or_default();
            if concept.is_empty() {
                continue;
            }
            if heading.contains(&concept)
                || caption.contains(&concept)
                || (!heading.is_empty() && concept.contains(&heading))
            {
                return Some(pool_index);
            }
        }
    }
    None
}

fn render_sections(title: &str, sections: &[Section]) -> Result<Vec<u8>, ContextError> {
    let mut canvas = PageCanvas::new(title);
    layout::render_document(&mut canvas, title, sections)?;
    let mut document = canvas.into_document();
    document.finalize()?;
    document.save_to_bytes()
}

/// The last-resort document: a title, the error, the summary. It goes
/// through none of the layout machinery — plain estimator-chunked lines and
/// the basic text primitive only — so it cannot fail for the same reason
/// the full render did.
fn degraded_document(
    title: &str,
    error: &ContextError,
    summary: &str,
) -> Result<Vec<u8>, ContextError> {
    let mut document = PdfDocument::new(title);
    let mut page_index = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
    let mut y = PAGE_HEIGHT - MARGIN - 16.0;

    write_degraded_block(
        &mut document,
        &mut page_index,
        &mut y,
        title,
        BuiltinFont::Bold,
        16.0,
    )?;
    y -= 12.0;
    write_degraded_block(
        &mut document,
        &mut page_index,
        &mut y,
        &format!("This document could not be fully composed: {}", error),
        BuiltinFont::Regular,
        11.0,
    )?;
    if !summary.trim().is_empty() {
        y -= 12.0;
        write_degraded_block(
            &mut document,
            &mut page_index,
            &mut y,
            summary,
            BuiltinFont::Regular,
            11.0,
        )?;
    }

    document.finalize()?;
    document.save_to_bytes()
}

/// Write a block of text with fixed-width chunking: the line length comes
/// from the constant-width estimate alone, never from the metric tables.
fn write_degraded_block(
    document: &mut PdfDocument,
    page_index: &mut usize,
    y: &mut f32,
    text: &str,
    font: BuiltinFont,
    font_size: f32,
) -> Result<(), ContextError> {
    let characters_per_line =
        ((CONTENT_WIDTH / (metrics::FALLBACK_WIDTH_FACTOR * font_size)) as usize).max(1);
    let sanitized_text = metrics::strip_unsupported(&text.replace('\n', " "));
    let characters: Vec<char> = sanitized_text.chars().collect();

    for chunk in characters.chunks(characters_per_line) {
        if *y < MARGIN {
            *page_index = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
            *y = PAGE_HEIGHT - MARGIN - font_size;
        }
        let line: String = chunk.iter().collect();
        document.write_text(*page_index, &line, font, font_size, [0.0; 3], [MARGIN, *y])?;
        *y -= font_size * 1.4;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::VisualOutcome;

    fn png_buffer() -> Vec<u8> {
        let mut bytes = Vec::new();
        let image = image::RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn plan(sections: Vec<PlannedSection>) -> SectionPlan {
        SectionPlan {
            title: "Neural networks".to_string(),
            sections,
        }
    }

    fn planned(heading: &str, include_image: bool) -> PlannedSection {
        PlannedSection {
            heading: Some(heading.to_string()),
            content: "Body text.".to_string(),
            include_image,
            image_caption: None,
        }
    }

    fn visual_count(sections: &[Section], role: VisualRole) -> usize {
        sections
            .iter()
            .filter(|section| {
                matches!(&section.visual, Some(visual) if visual.role == role)
            })
            .count()
    }

    #[test]
    fn an_exact_heading_match_assigns_the_flowchart_once() {
        let content = GeneratedContent::default();
        let flowcharts = vec![FlowchartResult {
            index: 0,
            name: "Backprop Steps".to_string(),
            outcome: VisualOutcome::Ready(png_buffer()),
        }];
        let plan = plan(vec![
            planned("Backprop Steps", true),
            planned("Another visual section", true),
        ]);
        let sections = build_sections(&content, vec![], flowcharts, Some(&plan));

        assert_eq!(sections.len(), 2);
        assert!(matches!(
            &sections[0].visual,
            Some(SectionVisual { role: VisualRole::Flowchart, .. })
        ));
        // The flowchart is marked used: the second section gets nothing and
        // no trailing section is appended.
        assert!(sections[1].visual.is_none());
        assert_eq!(visual_count(&sections, VisualRole::Flowchart), 1);
    }

    #[test]
    fn a_shared_keyword_still_matches_a_flowchart() {
        let content = GeneratedContent::default();
        let flowcharts = vec![FlowchartResult {
            index: 0,
            name: "Sorting algorithm".to_string(),
            outcome: VisualOutcome::Ready(png_buffer()),
        }];
        let plan = plan(vec![planned("How the algorithm works", true)]);
        let sections = build_sections(&content, vec![], flowcharts, Some(&plan));

        assert_eq!(visual_count(&sections, VisualRole::Flowchart), 1);
        assert!(sections[0].visual.is_some());
    }

    #[test]
    fn diagrams_match_by_concept_containment() {
        let content = GeneratedContent {
            concepts_diagram: vec!["Chloroplast".to_string()],
            ..GeneratedContent::default()
        };
        let diagrams = vec![DiagramResult {
            index: 0,
            outcome: VisualOutcome::Ready(png_buffer()),
        }];
        let plan = plan(vec![planned("The chloroplast in detail", true)]);
        let sections = build_sections(&content, diagrams, vec![], Some(&plan));

        assert!(matches!(
            &sections[0].visual,
            Some(SectionVisual { role: VisualRole::Diagram, .. })
        ));
        assert_eq!(sections[0].caption.as_deref(), Some("Chloroplast"));
    }

    #[test]
    fn unclaimed_visuals_are_appended_never_dropped() {
        let content = GeneratedContent::default();
        let diagrams = vec![DiagramResult {
            index: 0,
            outcome: VisualOutcome::Ready(png_buffer()),
        }];
        let flowcharts = vec![
            FlowchartResult {
                index: 0,
                name: "Unrelated pipeline".to_string(),
                outcome: VisualOutcome::Ready(png_buffer()),
            },
            FlowchartResult {
                index: 1,
                name: "Second one".to_string(),
                outcome: VisualOutcome::Ready(png_buffer()),
            },
        ];
        // A plan with no visual slots at all.
        let plan = plan(vec![planned("Text only", false)]);
        let sections = build_sections(&content, diagrams, flowcharts, Some(&plan));

        assert_eq!(sections.len(), 4);
        assert_eq!(visual_count(&sections, VisualRole::Flowchart), 2);
        assert_eq!(visual_count(&sections, VisualRole::Diagram), 1);
    }

    #[test]
    fn without_a_plan_the_ordering_is_positional() {
        let content = GeneratedContent {
            summary: "A summary.".to_string(),
            concepts_diagram: vec!["One".to_string(), "Two".to_string(), "Three".to_string()],
            concepts_flowcharts: vec!["Flow".to_string()],
            ..GeneratedContent::default()
        };
        let diagrams: Vec<DiagramResult> = (0..3)
            .map(|index| DiagramResult {
                index,
                outcome: VisualOutcome::Ready(png_buffer()),
            })
            .collect();
        let flowcharts = vec![FlowchartResult {
            index: 0,
            name: "Flow".to_string(),
            outcome: VisualOutcome::Ready(png_buffer()),
        }];
        let sections = build_sections(&content, diagrams, flowcharts, None);

        assert_eq!(sections.len(), 5);
        assert!(sections[0].visual.is_none());
        assert_eq!(sections[0].body_text, "A summary.");
        for section in &sections[1..=3] {
            assert!(matches!(
                &section.visual,
                Some(SectionVisual { role: VisualRole::Diagram, .. })
            ));
        }
        assert!(matches!(
            &sections[4].visual,
            Some(SectionVisual { role: VisualRole::Flowchart, .. })
        ));
    }

    #[test]
    fn a_failed_result_flows_through_as_a_failed_visual() {
        let content = GeneratedContent {
            concepts_diagram: vec!["Mitochondria".to_string()],
            ..GeneratedContent::default()
        };
        let diagrams = vec![DiagramResult {
            index: 0,
            outcome: VisualOutcome::Failed("rate limited".to_string()),
        }];
        let sections = build_sections(&content, diagrams, vec![], None);
        assert!(matches!(
            &sections[1].visual,
            Some(SectionVisual { outcome: VisualOutcome::Failed(reason), .. }) if reason == "rate limited"
        ));
    }

    #[test]
    fn assemble_always_returns_loadable_bytes() {
        let content = GeneratedContent::default();
        let composed = assemble(&content, vec![], vec![], None).unwrap();
        assert_eq!(composed.title, DEFAULT_TITLE);
        assert!(!composed.bytes.is_empty());
        assert!(lopdf::Document::load_mem(&composed.bytes).is_ok());
    }

    #[test]
    fn the_degraded_document_is_loadable_too() {
        let bytes = degraded_document(
            "Broken notes",
            &ContextError::with_context("the page tree imploded"),
            "A short summary that still deserves to reach the reader.",
        )
        .unwrap();
        let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }
}
