use lopdf::{Object, StringFormat};
use std::{io::BufWriter, mem};
use time::OffsetDateTime;

use crate::error::ContextError;

/// The US-Letter page width in points.
pub const PAGE_WIDTH: f32 = 612.0;
/// The US-Letter page height in points.
pub const PAGE_HEIGHT: f32 = 792.0;
/// The margin applied on all four sides of a page, in points.
pub const MARGIN: f32 = 50.0;
/// The usable horizontal drawing extent: the page width minus both margins.
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// The styles of the single built-in font family every document is set in.
/// The base-14 Helvetica faces are understood by every PDF renderer, so none
/// of them has to be embedded into the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFont {
    Regular,
    Bold,
    Oblique,
}

impl BuiltinFont {
    /// The PostScript base font name expected by the PDF specification.
    pub(crate) fn base_font(self) -> &'static str {
        match self {
            BuiltinFont::Regular => "Helvetica",
            BuiltinFont::Bold => "Helvetica-Bold",
            BuiltinFont::Oblique => "Helvetica-Oblique",
        }
    }

    /// The name under which the font is registered in every page's resources.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            BuiltinFont::Regular => "F1",
            BuiltinFont::Bold => "F2",
            BuiltinFont::Oblique => "F3",
        }
    }

    fn all() -> [BuiltinFont; 3] {
        [BuiltinFont::Regular, BuiltinFont::Bold, BuiltinFont::Oblique]
    }
}

/// A raster image decoded down to its raw RGB samples, ready to be embedded
/// as an image XObject.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Natural width of the image in pixels.
    pub width: u32,
    /// Natural height of the image in pixels.
    pub height: u32,
    /// Tightly packed 8-bit RGB samples, row-major.
    pub rgb_data: Vec<u8>,
}

/// The representation of a PDF page: its size and the list of content-stream
/// operations drawn onto it, together with the image XObjects it references.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The 1-based index of the page in the document.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Content stream operations, appended strictly in drawing order.
    pub(crate) operations: Vec<lopdf::content::Operation>,
    /// Resource name and object ID of every image placed on this page.
    pub(crate) image_xobjects: Vec<(String, lopdf::ObjectId)>,
}

/// A high-level interface to the PDF document being produced: an append-only
/// list of pages over the underlying `lopdf` document. Text and images are
/// recorded as content-stream operations per page; `finalize` assembles the
/// catalog, page tree and resources, and `save_to_bytes` serializes the
/// result.
pub struct PdfDocument {
    /// The underlying low-level PDF document. Exposed for the rare case in
    /// which direct manipulation is needed, for instance in tests.
    pub inner_document: lopdf::Document,
    /// The title written into the document information dictionary.
    pub title: String,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create an empty document targeting version 1.5 of the PDF
    /// specification, with the given display title.
    pub fn new<S: Into<String>>(title: S) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            title: title.into(),
            pages: Vec::new(),
        }
    }

    /// Append a new blank page of the given size in points and return its
    /// index. Pages are only ever appended; earlier pages are never reopened.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            number: self.pages.len() + 1,
            width: page_width,
            height: page_height,
            operations: Vec::new(),
            image_xobjects: Vec::new(),
        });
        self.pages.len() - 1
    }

    /// The number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether the given text can be drawn with the built-in fonts. The
    /// base-14 faces are only guaranteed to cover the basic Latin set, so
    /// anything outside printable ASCII is refused and left to the caller's
    /// recovery strategy.
    pub fn is_drawable(text: &str) -> bool {
        text.chars().all(|character| (' '..='\u{7e}').contains(&character))
    }

    /// Write one run of text at the given baseline position onto the page
    /// with the given index. Returns an error if the page does not exist or
    /// the text contains characters the built-in fonts cannot represent.
    ///
    /// # Arguments
    ///
    /// * `page_index` - The index of the page, as returned by `add_page`.
    /// * `text` - The text to draw. Must consist of printable ASCII.
    /// * `font` - The built-in font style to set.
    /// * `font_size` - The size of the font in points.
    /// * `color` - The RGB fill color of the text, each component in 0..=1.
    /// * `position` - The `[x, y]` baseline origin in points, measured from
    ///   the lower-left page corner.
    pub fn write_text(
        &mut self,
        page_index: usize,
        text: &str,
        font: BuiltinFont,
        font_size: f32,
        color: [f32; 3],
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        if !Self::is_drawable(text) {
            return Err(ContextError::with_context(format!(
                "The text {:?} contains characters outside the built-in font coverage",
                text
            )));
        }

        let page = self.page_mut(page_index)?;
        use lopdf::content::Operation;
        let [x, y] = position;
        let [red, green, blue] = color;
        page.operations.extend(vec![
            Operation::new("BT", vec![]), // Begin the text section
            Operation::new(
                "Tf",
                vec![font.resource_name().into(), font_size.into()],
            ), // Set the font and the font size
            Operation::new("Td", vec![x.into(), y.into()]), // Position the baseline
            Operation::new(
                "rg",
                vec![red, green, blue]
                    .into_iter()
                    .map(lopdf::Object::Real)
                    .collect(),
            ), // Set the filling color of the text
            Operation::new(
                "Tj",
                vec![Object::String(
                    text.bytes().collect(),
                    StringFormat::Literal,
                )],
            ), // The actual glyph run
            Operation::new("ET", vec![]), // End the text section
        ]);

        Ok(())
    }

    /// Place a decoded image onto the page with the given index. The image
    /// is registered as an XObject of the page and drawn into the rectangle
    /// whose lower-left corner is `(x, y)` with the given size in points.
    pub fn place_image(
        &mut self,
        page_index: usize,
        image: &DecodedImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;

        // Register the raw samples as an image XObject of the document. The
        // stream is left compressible so that `save_to_bytes` can deflate it.
        let stream_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(image.width as i64)),
            ("Height", Integer(image.height as i64)),
            ("ColorSpace", Name("DeviceRGB".into())),
            ("BitsPerComponent", Integer(8)),
        ]);
        let image_stream = lopdf::Stream::new(stream_dictionary, image.rgb_data.clone());
        let image_object_id = self.inner_document.add_object(image_stream);

        let page = self.page_mut(page_index)?;
        let xobject_name = format!("X{}", page.image_xobjects.len());
        page.image_xobjects
            .push((xobject_name.clone(), image_object_id));

        use lopdf::content::Operation;
        page.operations.extend(vec![
            Operation::new("q", vec![]), // Isolate the transformation matrix
            Operation::new(
                "cm",
                vec![width, 0.0, 0.0, height, x, y]
                    .into_iter()
                    .map(lopdf::Object::Real)
                    .collect(),
            ), // Scale the unit square onto the target rectangle
            Operation::new("Do", vec![xobject_name.into()]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Assemble the document structure from the pages recorded so far: the
    /// information dictionary, the catalog, the font and XObject resources,
    /// the per-page content streams and the page tree. Must be called exactly
    /// once, after all drawing has happened and before `save_to_bytes`.
    pub fn finalize(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let timestamp = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
        let document_info = lopdf::Dictionary::from_iter(vec![
            (
                "Title",
                String(self.title.clone().into_bytes(), Literal),
            ),
            (
                "Producer",
                String("lectr".to_string().into_bytes(), Literal),
            ),
            (
                "CreationDate",
                String(timestamp.clone().into_bytes(), Literal),
            ),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // The catalog and the page tree reference each other, so the page
        // tree ID is reserved up front and filled in at the very end.
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));

        // Register the three built-in font dictionaries once and share the
        // resulting font resource dictionary across every page.
        let mut fonts_dictionary = lopdf::Dictionary::new();
        for font in BuiltinFont::all() {
            let font_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(font.base_font().into())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]);
            let font_id = self.inner_document.add_object(Dictionary(font_dictionary));
            fonts_dictionary.set(font.resource_name(), Reference(font_id));
        }
        let fonts_dictionary_id = self.inner_document.add_object(Dictionary(fonts_dictionary));

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in mem::take(&mut self.pages) {
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                (
                    "MediaBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                ("Parent", Reference(pages_id)),
            ]);

            let mut resources_dictionary = lopdf::Dictionary::new();
            resources_dictionary.set("Font", Reference(fonts_dictionary_id));
            if !page.image_xobjects.is_empty() {
                let mut xobjects_dictionary = lopdf::Dictionary::new();
                for (xobject_name, xobject_id) in &page.image_xobjects {
                    xobjects_dictionary.set(xobject_name.clone(), Reference(*xobject_id));
                }
                resources_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }
            let resources_id = self
                .inner_document
                .add_object(Dictionary(resources_dictionary));
            page_dictionary.set("Resources", Reference(resources_id));

            let content = lopdf::content::Content {
                operations: page.operations,
            };
            let content_bytes = content.encode().map_err(|error| {
                ContextError::with_error(
                    format!("Failed to encode the content of page {}", page.number),
                    &error,
                )
            })?;
            // Page contents are kept uncompressed so that the streams stay
            // inspectable; the image streams carry the bulk of the weight and
            // those are deflated on save.
            let content_stream =
                lopdf::Stream::new(lopdf::Dictionary::new(), content_bytes).with_compression(false);
            let content_id = self.inner_document.add_object(content_stream);
            page_dictionary.set("Contents", Reference(content_id));

            let page_id = self.inner_document.add_object(Dictionary(page_dictionary));
            page_ids.push(Reference(page_id));
        }

        let pages_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages_dictionary));

        Ok(())
    }

    /// Serialize the finalized document to bytes, deflating every stream
    /// that allows compression.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        self.inner_document.compress();

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    fn page_mut(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }
}

/// Formats the given time so that it matches what the PDF specification
/// expects. An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_outside_the_builtin_coverage_is_refused() {
        let mut document = PdfDocument::new("Coverage");
        let page_index = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        assert!(document
            .write_text(page_index, "plain ascii", BuiltinFont::Regular, 11.0, [0.0; 3], [50.0, 700.0])
            .is_ok());
        assert!(document
            .write_text(page_index, "acc\u{e9}nt", BuiltinFont::Regular, 11.0, [0.0; 3], [50.0, 680.0])
            .is_err());
        assert!(document
            .write_text(page_index, "tab\there", BuiltinFont::Regular, 11.0, [0.0; 3], [50.0, 660.0])
            .is_err());
    }

    #[test]
    fn finalized_document_round_trips_through_lopdf() {
        let mut document = PdfDocument::new("Round trip");
        let page_index = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        document
            .write_text(page_index, "First page", BuiltinFont::Bold, 14.0, [0.0; 3], [50.0, 742.0])
            .unwrap();
        document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        document.finalize().unwrap();
        let bytes = document.save_to_bytes().unwrap();

        let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn placed_image_is_registered_in_the_page_resources() {
        let mut document = PdfDocument::new("Image");
        let page_index = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        let image = DecodedImage {
            width: 2,
            height: 2,
            rgb_data: vec![255; 12],
        };
        document
            .place_image(page_index, &image, 50.0, 500.0, 100.0, 100.0)
            .unwrap();
        assert_eq!(document.pages[page_index].image_xobjects.len(), 1);
        document.finalize().unwrap();
        let bytes = document.save_to_bytes().unwrap();
        assert!(lopdf::Document::load_mem(&bytes).is_ok());
    }
}
