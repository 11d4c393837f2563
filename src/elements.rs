//! Report elements built on top of `genpdf` primitives.

use std::path::Path;

use image::GenericImageView;

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Mm, RenderResult, Scale, Size};

/// Resolution genpdf assumes when placing an image without explicit scaling.
const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn natural_size(image: &image::DynamicImage) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / DEFAULT_IMAGE_DPI;
    let height_mm = MM_PER_INCH * (px_height as f64) / DEFAULT_IMAGE_DPI;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// An image stretched to a fixed printed width and height.
///
/// The header logo is configured in millimetres rather than pixels, so the element derives the
/// scale from the image's natural size at genpdf's default resolution.
pub struct SizedImage {
    image: Image,
    natural_size: Size,
    width: Mm,
    height: Mm,
}

impl SizedImage {
    /// Loads the image at `path` and sizes it to `width_mm` x `height_mm`.
    pub fn from_path(path: impl AsRef<Path>, width_mm: f64, height_mm: f64) -> Result<Self, Error> {
        let dynamic = decode_image_from_path(path)?;
        Self::from_dynamic_image(dynamic, width_mm, height_mm)
    }

    /// Sizes an already decoded image.
    pub fn from_dynamic_image(
        dynamic: image::DynamicImage,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<Self, Error> {
        // genpdf rejects images with an alpha channel.
        let dynamic = if dynamic.color().has_alpha() {
            image::DynamicImage::ImageRgb8(dynamic.to_rgb8())
        } else {
            dynamic
        };
        let natural_size = natural_size(&dynamic);
        let image = Image::from_dynamic_image(dynamic)?;
        let mut element = Self {
            image,
            natural_size,
            width: mm_from_f64(width_mm),
            height: mm_from_f64(height_mm),
        };
        element.image.set_alignment(Alignment::Center);
        element.apply_scale();
        Ok(element)
    }

    /// Scale factors that map the natural size onto the requested size.
    pub fn scale(&self) -> (f64, f64) {
        (
            ratio(self.width, self.natural_size.width),
            ratio(self.height, self.natural_size.height),
        )
    }

    fn apply_scale(&mut self) {
        let (x, y) = self.scale();
        self.image.set_scale(Scale::new(x, y));
    }
}

fn ratio(desired: Mm, natural: Mm) -> f64 {
    let natural = mm_to_f64(natural);
    let desired = mm_to_f64(desired);
    if natural > f64::EPSILON && desired > 0.0 {
        desired / natural
    } else {
        1.0
    }
}

impl Element for SizedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        self.image.render(context, area, style)
    }
}
