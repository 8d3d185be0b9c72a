//! Lectr turns AI-structured study content into a paginated PDF document.
//! The input is the structured output of an upstream generation step: a text
//! summary, per-concept diagram images, per-concept flowchart images and,
//! optionally, an ordered section plan. The output is a byte stream
//! constituting a valid PDF, composed out of headings, wrapped body text,
//! side-by-side diagram layouts and stacked flowchart layouts.
//!
//! The central promise of this crate is that `compose::assemble` always
//! returns a document. A glyph that cannot be drawn is stripped and retried,
//! an image that cannot be decoded becomes a textual placeholder, a section
//! plan that cannot be applied falls back to a fixed ordering, and a render
//! that fails altogether is replaced by a minimal document explaining the
//! failure. Only when even that last document cannot be serialized does an
//! error reach the caller.

/// The `ContextError` type used for error reporting throughout this library.
///
/// Every fallible function returns a `Result` whose error explains in which
/// context the failure happened and, when the failure was propagated from a
/// lower level, what the underlying error was.
pub mod error;

/// The low-level PDF interface: an append-only list of pages over a
/// `lopdf` document, the built-in Helvetica font family, text runs, image
/// XObjects and the final catalog/page-tree assembly.
///
/// The page geometry constants of the whole crate live here: US-Letter
/// pages of 612 by 792 points with a 50 point margin, which leaves 512
/// points of content width.
pub mod pdf;

/// Text measurement and wrapping against the metrics of the built-in font
/// family, with a constant-width estimate as the fallback for characters
/// the tables do not cover.
pub mod metrics;

/// The page canvas: the write cursor over the append-only page list and
/// the defensive drawing primitives that degrade instead of aborting.
pub mod canvas;

/// The sizing policy assigning every visual its on-page footprint from its
/// natural pixel dimensions and its role.
pub mod sizing;

/// The section layout engine: renders the ordered section list one section
/// at a time, picking the layout from the visual each section carries.
pub mod layout;

/// The visual generation boundary: the renderer traits standing in for the
/// external image generation and rasterization collaborators, the tagged
/// outcome type and the concurrent, deadline-bounded batch helpers.
pub mod visual;

/// The serde formats of every external payload: the generated content, the
/// optional section plan and the visual manifest the binary reads.
pub mod content_format;

/// The document assembler: maps the generated content and the visual
/// results onto sections, matches visuals to the sections naming them and
/// serializes the composed document, degrading instead of failing.
pub mod compose;
