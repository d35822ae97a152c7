//! Text-layer injection with lopdf.
//!
//! Each processed page gets an invisible (render mode 3) Helvetica run per
//! token, appended as its own content stream. The page's existing streams are
//! bracketed with `q`/`Q` so whatever graphics state they leave behind does
//! not leak into the layer; their bytes are not modified. Pages outside the
//! run are copied as they are. Image sources are first wrapped into a
//! one-page PDF whose MediaBox matches the image in pixels, keeping its bit
//! depth and drawing any alpha channel through a soft mask.
//!
//! Placement uses the visible region of the page (CropBox clipped to the
//! MediaBox), which is what the page rasterizer renders.

use super::placement::{PageGeometry, TextPlacement, place_page};
use crate::core::document::Document;
use crate::types::PageResult;
use crate::{Result, ScanlayerError};
use lopdf::content::{Content, Operation};
use image::DynamicImage;
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};

const FONT_RESOURCE: &str = "FScanlayer";
const IMAGE_RESOURCE: &str = "Im0";
/// Render mode 3: neither fill nor stroke.
const INVISIBLE: i64 = 3;
/// Guards against cyclic page trees when walking `/Parent`.
const MAX_TREE_DEPTH: usize = 64;
const US_LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Writes a searchable copy of a source document.
pub trait TextLayerWriter: Send + Sync {
    /// Produce the source document with an invisible text layer on every page in `pages`.
    ///
    /// # Errors
    ///
    /// `AssemblyFailure` when the source cannot be parsed or rewritten.
    fn write(&self, source: &Document, pages: &[PageResult]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextLayerWriter;

impl TextLayerWriter for PdfTextLayerWriter {
    fn write(&self, source: &Document, pages: &[PageResult]) -> Result<Vec<u8>> {
        let mut pdf = if source.is_image() {
            wrap_image(source.bytes())?
        } else {
            lopdf::Document::load_mem(source.bytes())
                .map_err(|e| ScanlayerError::assembly(format!("Failed to parse '{}': {}", source.name(), e)))?
        };

        let page_ids = pdf.get_pages();
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        for page in pages {
            let page_id = *page_ids.get(&page.page_number).ok_or_else(|| {
                ScanlayerError::assembly(format!(
                    "Page {} not found in '{}' ({} pages)",
                    page.page_number,
                    source.name(),
                    page_ids.len()
                ))
            })?;

            let geometry = page_geometry(&pdf, page_id);
            let placements = place_page(page, &geometry);
            tracing::debug!(
                "Placing {} tokens on page {} (rotation {})",
                placements.len(),
                page.page_number,
                geometry.rotation
            );
            if placements.is_empty() {
                continue;
            }

            install_font(&mut pdf, page_id, font_id)?;
            append_layer(&mut pdf, page_id, &placements)?;
        }

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes)
            .map_err(|e| ScanlayerError::assembly(format!("Failed to write searchable document: {}", e)))?;
        Ok(bytes)
    }
}

/// Image samples as PDF planes: interleaved color samples plus an optional alpha plane.
struct ImagePlanes {
    color_space: &'static str,
    bits_per_component: i64,
    color: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

fn split_planes<T>(
    samples: &[T],
    channels: usize,
    color_space: &'static str,
    bits_per_component: i64,
    has_alpha: bool,
    push: impl Fn(&mut Vec<u8>, &T),
) -> ImagePlanes {
    let sample_bytes = bits_per_component as usize / 8;
    let pixels = samples.len() / channels;
    let mut color = Vec::with_capacity(pixels * (channels - 1) * sample_bytes);
    let mut alpha = Vec::with_capacity(if has_alpha { pixels * sample_bytes } else { 0 });

    for pixel in samples.chunks_exact(channels) {
        if let Some((last, rest)) = pixel.split_last() {
            rest.iter().for_each(|sample| push(&mut color, sample));
            if has_alpha {
                push(&mut alpha, last);
            }
        }
    }

    ImagePlanes {
        color_space,
        bits_per_component,
        color,
        alpha: has_alpha.then_some(alpha),
    }
}

/// Gray sources stay gray; sources deeper than 8 bits keep 16 bits per sample.
fn image_planes(image: &DynamicImage) -> ImagePlanes {
    let color_type = image.color();
    let has_alpha = color_type.has_alpha();
    let deep = color_type.bytes_per_pixel() > color_type.channel_count();
    let push8 = |out: &mut Vec<u8>, sample: &u8| out.push(*sample);
    let push16 = |out: &mut Vec<u8>, sample: &u16| out.extend_from_slice(&sample.to_be_bytes());

    match (color_type.has_color(), deep) {
        (false, false) => split_planes(image.to_luma_alpha8().as_raw(), 2, "DeviceGray", 8, has_alpha, push8),
        (false, true) => split_planes(image.to_luma_alpha16().as_raw(), 2, "DeviceGray", 16, has_alpha, push16),
        (true, false) => split_planes(image.to_rgba8().as_raw(), 4, "DeviceRGB", 8, has_alpha, push8),
        (true, true) => split_planes(image.to_rgba16().as_raw(), 4, "DeviceRGB", 16, has_alpha, push16),
    }
}

fn compressed(dict: Dictionary, content: Vec<u8>, what: &str) -> Result<Stream> {
    let mut stream = Stream::new(dict, content);
    stream
        .compress()
        .map_err(|e| ScanlayerError::assembly(format!("Failed to compress {}: {}", what, e)))?;
    Ok(stream)
}

fn image_xobject(width: i64, height: i64, color_space: &str, bits_per_component: i64) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => bits_per_component,
    }
}

/// Wrap an image into a single-page PDF drawing it at one point per pixel.
fn wrap_image(bytes: &[u8]) -> Result<lopdf::Document> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ScanlayerError::assembly_with_source("Failed to decode image source", e))?;
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let planes = image_planes(&image);
    drop(image);

    let mut pdf = lopdf::Document::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let mut image_dict = image_xobject(width, height, planes.color_space, planes.bits_per_component);
    if let Some(alpha) = planes.alpha {
        let mask = compressed(
            image_xobject(width, height, "DeviceGray", planes.bits_per_component),
            alpha,
            "image alpha mask",
        )?;
        image_dict.set("SMask", pdf.add_object(mask));
    }
    let image_id = pdf.add_object(compressed(image_dict, planes.color, "image samples")?);

    let draw = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let draw = draw
        .encode()
        .map_err(|e| ScanlayerError::assembly(format!("Failed to encode image page: {}", e)))?;
    let content_id = pdf.add_object(Stream::new(dictionary! {}, draw));

    let page_id = pdf.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
        },
    });
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    Ok(pdf)
}

fn resolve<'a>(pdf: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => pdf.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, following `/Parent` for inheritable keys.
fn inherited_attribute(pdf: &lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = pdf.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(pdf, value).cloned();
        }
        let parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        node = pdf.get_dictionary(parent).ok()?;
    }
    None
}

fn number(pdf: &lopdf::Document, object: &Object) -> Option<f64> {
    match resolve(pdf, object)? {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn page_box(pdf: &lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<[f64; 4]> {
    let object = inherited_attribute(pdf, page_id, key)?;
    let values: Vec<f64> = object
        .as_array()
        .ok()?
        .iter()
        .filter_map(|value| number(pdf, value))
        .collect();
    let [x0, y0, x1, y1] = <[f64; 4]>::try_from(values).ok()?;
    Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
}

/// Overlap of two normalized boxes, `None` when it is empty.
fn intersect(a: [f64; 4], b: [f64; 4]) -> Option<[f64; 4]> {
    let overlap = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (overlap[2] > overlap[0] && overlap[3] > overlap[1]).then_some(overlap)
}

fn page_geometry(pdf: &lopdf::Document, page_id: ObjectId) -> PageGeometry {
    let media_box = page_box(pdf, page_id, b"MediaBox").unwrap_or_else(|| {
        tracing::warn!("Page object {:?} has no usable MediaBox; assuming US Letter", page_id);
        US_LETTER
    });
    let view_box = match page_box(pdf, page_id, b"CropBox") {
        Some(crop_box) => intersect(media_box, crop_box).unwrap_or_else(|| {
            tracing::debug!("CropBox of page object {:?} misses its MediaBox; ignoring it", page_id);
            media_box
        }),
        None => media_box,
    };
    let rotate = inherited_attribute(pdf, page_id, b"Rotate")
        .and_then(|object| object.as_i64().ok())
        .unwrap_or(0);
    PageGeometry::new(view_box, rotate)
}

/// Give the page its own resource dictionary containing the layer font.
///
/// Inherited or shared resources are copied onto the page first, so other
/// pages are unaffected.
fn install_font(pdf: &mut lopdf::Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let mut resources = inherited_attribute(pdf, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new);

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|fonts| resolve(pdf, fonts))
        .and_then(|fonts| fonts.as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new);
    fonts.set(FONT_RESOURCE, font_id);
    resources.set("Font", fonts);

    pdf.get_dictionary_mut(page_id)
        .map_err(|e| ScanlayerError::assembly(format!("Page object {:?} is not a dictionary: {}", page_id, e)))?
        .set("Resources", resources);
    Ok(())
}

fn append_layer(pdf: &mut lopdf::Document, page_id: ObjectId, placements: &[TextPlacement]) -> Result<()> {
    let existing: Vec<Object> = match pdf.get_dictionary(page_id).map(|page| page.get(b"Contents")) {
        Ok(Ok(Object::Reference(id))) => match pdf.get_object(*id) {
            Ok(Object::Array(streams)) => streams.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Ok(Object::Array(streams))) => streams.clone(),
        _ => Vec::new(),
    };

    let mut operations = Vec::with_capacity(placements.len() * 7 + 3);
    if !existing.is_empty() {
        operations.push(Operation::new("Q", vec![]));
    }
    operations.push(Operation::new("q", vec![]));
    for placement in placements {
        operations.extend(text_operations(placement));
    }
    operations.push(Operation::new("Q", vec![]));

    let layer = Content { operations }
        .encode()
        .map_err(|e| ScanlayerError::assembly(format!("Failed to encode text layer: {}", e)))?;
    let layer_id = pdf.add_object(compressed(dictionary! {}, layer, "text layer")?);

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let save_id = pdf.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
    }
    contents.push(Object::Reference(layer_id));

    pdf.get_dictionary_mut(page_id)
        .map_err(|e| ScanlayerError::assembly(format!("Page object {:?} is not a dictionary: {}", page_id, e)))?
        .set("Contents", Object::Array(contents));
    Ok(())
}

fn text_operations(placement: &TextPlacement) -> Vec<Operation> {
    let (cos, sin): (i64, i64) = match placement.angle {
        90 => (0, 1),
        180 => (-1, 0),
        270 => (0, -1),
        _ => (1, 0),
    };

    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(placement.font_size as f32),
            ],
        ),
        Operation::new("Tr", vec![INVISIBLE.into()]),
        Operation::new("Tz", vec![Object::Real(placement.horizontal_scale as f32)]),
        Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                Object::Real(placement.x as f32),
                Object::Real(placement.y as f32),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&placement.text), StringFormat::Hexadecimal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Encode text for a WinAnsi simple font; characters outside it become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, RecognitionToken, TokenLevel};

    fn pdf_page(media_box: [i64; 4], rotate: Option<i64>, contents: Option<&[u8]>) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        if let Some(rotate) = rotate {
            page.set("Rotate", rotate);
        }
        if let Some(contents) = contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, contents.to_vec()));
            page.set("Contents", content_id);
        }
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
                "Resources" => dictionary! {},
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn page_result(page_number: u32, scale: f64, words: &[(&str, u32, u32, u32, u32)]) -> PageResult {
        PageResult {
            page_number,
            text: words.iter().map(|w| w.0).collect::<Vec<_>>().join(" "),
            confidence: 90.0,
            tokens: words
                .iter()
                .map(|(text, left, top, width, height)| RecognitionToken {
                    text: text.to_string(),
                    confidence: 90.0,
                    bbox: BoundingBox::new(*left, *top, *width, *height),
                    level: TokenLevel::Word,
                })
                .collect(),
            positional_markup: String::new(),
            tabular_rows: String::new(),
            scale,
            raster_width: 0,
            raster_height: 0,
        }
    }

    fn first_tm(pdf: &lopdf::Document) -> Vec<f32> {
        let page_id = *pdf.get_pages().get(&1).unwrap();
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();
        let tm = content.operations.iter().find(|op| op.operator == "Tm").unwrap();
        tm.operands.iter().map(|o| o.as_float().unwrap()).collect()
    }

    #[test]
    fn test_layer_on_inherited_media_box() {
        let source = Document::from_pdf("letter.pdf", pdf_page([0, 0, 612, 792], None, None)).unwrap();
        let bytes = PdfTextLayerWriter
            .write(&source, &[page_result(1, 2.0, &[("HELLO", 100, 200, 120, 24)])])
            .unwrap();

        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        let tm = first_tm(&pdf);
        assert_eq!(&tm[..4], &[1.0, 0.0, 0.0, 1.0]);
        assert!((tm[4] - 50.0).abs() < 0.01);
        assert!((tm[5] - (792.0 - 112.0)).abs() < 0.01);
        assert!(pdf.extract_text(&[1]).unwrap().contains("HELLO"));
    }

    #[test]
    fn test_existing_content_is_bracketed() {
        let original = b"0 0 m 10 10 l S 2 0 0 2 0 0 cm";
        let source = Document::from_pdf("drawn.pdf", pdf_page([0, 0, 200, 200], None, Some(original))).unwrap();
        let bytes = PdfTextLayerWriter
            .write(&source, &[page_result(1, 1.0, &[("x", 0, 0, 10, 10)])])
            .unwrap();

        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *pdf.get_pages().get(&1).unwrap();
        let page = pdf.get_dictionary(page_id).unwrap();
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);

        let kept = pdf
            .get_object(contents[1].as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert_eq!(kept.content, original.to_vec());
    }

    #[test]
    fn test_rotated_page_placement() {
        let source = Document::from_pdf("rotated.pdf", pdf_page([0, 0, 100, 200], Some(90), None)).unwrap();
        let bytes = PdfTextLayerWriter
            .write(&source, &[page_result(1, 1.0, &[("A", 10, 20, 10, 10)])])
            .unwrap();

        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        let tm = first_tm(&pdf);
        assert_eq!(&tm[..4], &[0.0, 1.0, -1.0, 0.0]);
        // Displayed baseline origin (10, 30) maps to user (30, 10) under /Rotate 90.
        assert!((tm[4] - 30.0).abs() < 0.01);
        assert!((tm[5] - 10.0).abs() < 0.01);
    }

    fn with_crop_box(bytes: Vec<u8>, crop_box: [i64; 4]) -> Vec<u8> {
        let mut doc = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("CropBox", crop_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>());
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_cropped_page_places_from_crop_corner() {
        let bytes = with_crop_box(pdf_page([0, 0, 612, 792], None, None), [100, 100, 512, 692]);
        let source = Document::from_pdf("cropped.pdf", bytes).unwrap();
        let bytes = PdfTextLayerWriter
            .write(&source, &[page_result(1, 1.0, &[("corner", 0, 0, 50, 10)])])
            .unwrap();

        let tm = first_tm(&lopdf::Document::load_mem(&bytes).unwrap());
        assert!((tm[4] - 100.0).abs() < 0.01);
        assert!((tm[5] - 682.0).abs() < 0.01);
    }

    #[test]
    fn test_disjoint_crop_box_is_ignored() {
        let bytes = with_crop_box(pdf_page([0, 0, 612, 792], None, None), [700, 800, 900, 1000]);
        let source = Document::from_pdf("odd.pdf", bytes).unwrap();
        let bytes = PdfTextLayerWriter
            .write(&source, &[page_result(1, 1.0, &[("corner", 0, 0, 50, 10)])])
            .unwrap();

        let tm = first_tm(&lopdf::Document::load_mem(&bytes).unwrap());
        assert!(tm[4].abs() < 0.01);
        assert!((tm[5] - 782.0).abs() < 0.01);
    }

    #[test]
    fn test_deep_gray_image_keeps_samples() {
        let image: image::ImageBuffer<image::Luma<u16>, Vec<u16>> =
            image::ImageBuffer::from_raw(2, 1, vec![0x1234, 0xFFFF]).unwrap();
        let mut png = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let source = Document::from_image("gray.png", png).unwrap();

        let pdf = lopdf::Document::load_mem(&PdfTextLayerWriter.write(&source, &[]).unwrap()).unwrap();
        let page = pdf.get_dictionary(*pdf.get_pages().get(&1).unwrap()).unwrap();
        let xobjects = page.get(b"Resources").unwrap().as_dict().unwrap();
        let image_id = xobjects
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Im0")
            .unwrap()
            .as_reference()
            .unwrap();
        let stream = pdf.get_object(image_id).unwrap().as_stream().unwrap();

        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(stream.dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 16);
        assert!(stream.dict.get(b"SMask").is_err());
        let samples = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        assert_eq!(samples, vec![0x12, 0x34, 0xFF, 0xFF]);
    }

    #[test]
    fn test_missing_page_is_assembly_failure() {
        let source = Document::from_pdf("one.pdf", pdf_page([0, 0, 100, 100], None, None)).unwrap();
        let result = PdfTextLayerWriter.write(&source, &[page_result(4, 1.0, &[("A", 0, 0, 5, 5)])]);
        assert!(matches!(result, Err(ScanlayerError::AssemblyFailure { .. })));
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Grüße"), vec![b'G', b'r', 0xFC, 0xDF, b'e']);
        assert_eq!(encode_win_ansi("a—b"), vec![b'a', 0x97, b'b']);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
