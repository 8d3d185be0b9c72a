use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ContextError;

/// The structured study content produced by the upstream AI generation
/// call. The concept lists are index-aligned with their prompt lists; the
/// field names are the literal contract of that collaborator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneratedContent {
    pub summary: String,
    #[serde(default)]
    pub concepts_diagram: Vec<String>,
    #[serde(default)]
    pub diagram_prompts: Vec<String>,
    #[serde(default)]
    pub concepts_flowcharts: Vec<String>,
    #[serde(default)]
    pub flowcharts_prompt: Vec<String>,
}

impl GeneratedContent {
    pub fn from_path(content_path: &PathBuf) -> Result<GeneratedContent, ContextError> {
        let file_content = std::fs::read_to_string(content_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the generated content {:?}", content_path),
                &error,
            )
        })?;
        let content: GeneratedContent = serde_json::from_str(&file_content).map_err(|error| {
            ContextError::with_error(
                format!("Unable to parse the generated content {:?}", content_path),
                &error,
            )
        })?;

        Ok(content)
    }
}

/// An ordered section plan the AI may additionally produce: headings, body
/// text and a flag marking the sections meant to carry a visual.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPlan {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<PlannedSection>,
}

/// One entry of a `SectionPlan`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSection {
    #[serde(default)]
    pub heading: Option<String>,
    pub content: String,
    #[serde(default)]
    pub include_image: bool,
    #[serde(default)]
    pub image_caption: Option<String>,
}

impl SectionPlan {
    pub fn from_path(plan_path: &PathBuf) -> Result<SectionPlan, ContextError> {
        let file_content = std::fs::read_to_string(plan_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the section plan {:?}", plan_path),
                &error,
            )
        })?;
        let plan: SectionPlan = serde_json::from_str(&file_content).map_err(|error| {
            ContextError::with_error(
                format!("Unable to parse the section plan {:?}", plan_path),
                &error,
            )
        })?;

        Ok(plan)
    }
}

/// A manifest describing pre-rasterized visuals on disk, so that the binary
/// can feed the assembler without the generation collaborators. Each entry
/// carries either a file path or the error the generation step reported.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VisualManifest {
    #[serde(default)]
    pub diagrams: Vec<ManifestDiagram>,
    #[serde(default)]
    pub flowcharts: Vec<ManifestFlowchart>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestDiagram {
    pub index: usize,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestFlowchart {
    pub index: usize,
    pub name: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
}

impl VisualManifest {
    pub fn from_path(manifest_path: &PathBuf) -> Result<VisualManifest, ContextError> {
        let file_content = std::fs::read_to_string(manifest_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the visual manifest {:?}", manifest_path),
                &error,
            )
        })?;
        let manifest: VisualManifest = serde_json::from_str(&file_content).map_err(|error| {
            ContextError::with_error(
                format!("Unable to parse the visual manifest {:?}", manifest_path),
                &error,
            )
        })?;

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_generated_content_payload_uses_its_literal_field_names() {
        let content: GeneratedContent = serde_json::from_str(
            r#"{
                "summary": "Photosynthesis converts light into chemical energy.",
                "concepts_diagram": ["Chloroplast"],
                "diagram_prompts": ["a labeled chloroplast"],
                "concepts_flowcharts": ["Light reactions"],
                "flowcharts_prompt": ["light -> ATP"]
            }"#,
        )
        .unwrap();
        assert_eq!(content.concepts_diagram, vec!["Chloroplast"]);
        assert_eq!(content.flowcharts_prompt, vec!["light -> ATP"]);
    }

    #[test]
    fn the_section_plan_is_camel_cased_and_lenient() {
        let plan: SectionPlan = serde_json::from_str(
            r#"{
                "title": "Photosynthesis",
                "sections": [
                    { "heading": "Overview", "content": "...", "includeImage": true, "imageCaption": "The chloroplast" },
                    { "content": "No visual here" }
                ]
            }"#,
        )
        .unwrap();
        assert!(plan.sections[0].include_image);
        assert_eq!(
            plan.sections[0].image_caption.as_deref(),
            Some("The chloroplast")
        );
        assert!(!plan.sections[1].include_image);
        assert!(plan.sections[1].heading.is_none());
    }
}
