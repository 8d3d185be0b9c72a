use crate::error::ContextError;
use crate::metrics;
use crate::pdf::{BuiltinFont, DecodedImage, PdfDocument, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};

/// The outcome of attempting to place an image: either it was drawn with
/// the given footprint, or the buffer could not be decoded and nothing was
/// placed. The skipped case is a sentinel, not an error, so the caller can
/// degrade to a textual placeholder without unwinding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePlacement {
    Placed { width: f32, height: f32 },
    Skipped,
}

/// An append-only sequence of fixed-size pages with a single write cursor.
///
/// The cursor `y` is the distance from the page bottom at which the next
/// baseline may be placed; it decreases as content is added. Only the last
/// page is ever addressed: once `ensure_space` has appended a new page, the
/// previous ones are sealed.
pub struct PageCanvas {
    document: PdfDocument,
    current_page: usize,
    y: f32,
}

impl PageCanvas {
    /// Create a canvas with a single blank page and the cursor at the top
    /// of its content area.
    pub fn new<S: Into<String>>(title: S) -> Self {
        let mut document = PdfDocument::new(title);
        let current_page = document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        PageCanvas {
            document,
            current_page,
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// The current vertical cursor position, measured from the page bottom.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Move the cursor to the given vertical position on the current page.
    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    /// The vertical space left between the cursor and the bottom margin.
    pub fn remaining_space(&self) -> f32 {
        self.y - MARGIN
    }

    /// The number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Guarantee that `required_height` points fit between the cursor and
    /// the bottom margin, appending a fresh page and resetting the cursor
    /// when they do not.
    pub fn ensure_space(&mut self, required_height: f32) {
        if self.y - required_height < MARGIN {
            self.break_page();
        }
    }

    /// Unconditionally start a new page and reset the cursor to its top.
    pub fn break_page(&mut self) {
        self.current_page = self.document.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Draw one line of text at the given baseline. The first attempt uses
    /// the text as given; if the primitive refuses it, a second attempt is
    /// made with everything outside printable ASCII stripped out. Only the
    /// failure of the second attempt propagates.
    pub fn draw_line(
        &mut self,
        text: &str,
        font: BuiltinFont,
        font_size: f32,
        color: [f32; 3],
        x: f32,
        y: f32,
    ) -> Result<(), ContextError> {
        match self
            .document
            .write_text(self.current_page, text, font, font_size, color, [x, y])
        {
            Ok(()) => Ok(()),
            Err(_) => {
                let sanitized_text = metrics::strip_unsupported(text);
                log::warn!(
                    "Retrying the line {:?} with its unsupported characters stripped",
                    text
                );
                self.document.write_text(
                    self.current_page,
                    &sanitized_text,
                    font,
                    font_size,
                    color,
                    [x, y],
                )
            }
        }
    }

    /// Decode and place an image buffer into the rectangle whose lower-left
    /// corner is `(x, y)`. A buffer that is neither valid PNG nor valid JPEG
    /// is reported as `ImagePlacement::Skipped` instead of an error.
    pub fn draw_image(
        &mut self,
        buffer: &[u8],
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<ImagePlacement, ContextError> {
        let Some(decoded_image) = decode_visual(buffer) else {
            return Ok(ImagePlacement::Skipped);
        };
        self.document
            .place_image(self.current_page, &decoded_image, x, y, width, height)?;
        Ok(ImagePlacement::Placed { width, height })
    }

    /// Decode an image buffer without placing it, to learn its natural
    /// pixel dimensions before committing to a footprint.
    pub fn decode_only(buffer: &[u8]) -> Option<DecodedImage> {
        decode_visual(buffer)
    }

    /// Place an already decoded image, skipping the decode step of
    /// `draw_image`.
    pub fn draw_decoded(
        &mut self,
        image: &DecodedImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ContextError> {
        self.document
            .place_image(self.current_page, image, x, y, width, height)
    }

    /// Surrender the canvas and recover the underlying document for
    /// finalization.
    pub fn into_document(self) -> PdfDocument {
        self.document
    }
}

/// Attempt to decode a visual buffer, first as PNG, then as JPEG. Returns
/// `None` when both decoders refuse the buffer.
fn decode_visual(buffer: &[u8]) -> Option<DecodedImage> {
    let decoded = image::load_from_memory_with_format(buffer, image::ImageFormat::Png)
        .or_else(|png_error| {
            log::warn!("The buffer is not valid PNG ({}), attempting JPEG", png_error);
            image::load_from_memory_with_format(buffer, image::ImageFormat::Jpeg)
        });
    match decoded {
        Ok(dynamic_image) => {
            let rgb_image = dynamic_image.to_rgb8();
            let (width, height) = rgb_image.dimensions();
            Some(DecodedImage {
                width,
                height,
                rgb_data: rgb_image.into_raw(),
            })
        }
        Err(error) => {
            log::warn!("The buffer could not be decoded as an image: {}", error);
            None
        }
    }
}
