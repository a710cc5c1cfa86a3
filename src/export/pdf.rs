use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::geometry::{Color, PdfPoints, Point, Rect, Size};

use super::{ExportError, ExportResult, PdfBackend};

/// US Letter, used when neither a page nor its ancestors declare a MediaBox.
const FALLBACK_PAGE_SIZE: (f64, f64) = (612.0, 792.0);
/// Bound on Parent-chain walks; page trees are shallow, cycles are not.
const MAX_TREE_DEPTH: usize = 32;
const FONT_RESOURCE: &str = "DsHelv";

/// An image XObject added to the document, referenced by its resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
    name: String,
}

impl EmbeddedImage {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    ext_gstates: BTreeMap<String, ObjectId>,
    xobjects: BTreeMap<String, ObjectId>,
    fonts: BTreeMap<String, ObjectId>,
}

/// [`PdfBackend`] over a parsed lopdf [`Document`].
///
/// Draw calls are buffered per page and written on [`PdfBackend::save`] as a
/// new content stream. The page's original content is wrapped in `q`/`Q` so
/// any graphics state it leaves behind cannot leak into the overlay.
pub struct LopdfBackend {
    document: Document,
    pages: Vec<(ObjectId, Size<PdfPoints>)>,
    overlays: BTreeMap<usize, PageOverlay>,
    opacity_states: BTreeMap<u32, (String, ObjectId)>,
    font: Option<ObjectId>,
    next_image: usize,
}

impl LopdfBackend {
    pub fn load(bytes: &[u8]) -> ExportResult<Self> {
        let document = Document::load_mem(bytes).map_err(ExportError::Parse)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        let pages = document
            .get_pages()
            .into_values()
            .map(|id| (id, page_size(&document, id)))
            .collect::<Vec<_>>();
        tracing::debug!(page_count = pages.len(), "PDF loaded for export");
        Self {
            document,
            pages,
            overlays: BTreeMap::new(),
            opacity_states: BTreeMap::new(),
            font: None,
            next_image: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn overlay(&mut self, page_index: usize) -> ExportResult<&mut PageOverlay> {
        if page_index >= self.pages.len() {
            return Err(ExportError::PageOutOfRange {
                page_index,
                page_count: self.pages.len(),
            });
        }
        Ok(self.overlays.entry(page_index).or_default())
    }

    fn opacity_state(&mut self, opacity: f32) -> (String, ObjectId) {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let key = (opacity * 1000.0).round() as u32;
        let document = &mut self.document;
        self.opacity_states
            .entry(key)
            .or_insert_with(|| {
                let id = document.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(opacity),
                    "CA" => Object::Real(opacity),
                });
                (format!("DsGs{key}"), id)
            })
            .clone()
    }

    fn font(&mut self) -> ObjectId {
        if let Some(id) = self.font {
            return id;
        }
        let id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font = Some(id);
        id
    }

    fn install_resources(&mut self, page_id: ObjectId, overlay: &PageOverlay) -> ExportResult<()> {
        let mut resources = inherited_resources(&self.document, page_id);
        merge_resource_table(&self.document, &mut resources, b"ExtGState", &overlay.ext_gstates);
        merge_resource_table(&self.document, &mut resources, b"XObject", &overlay.xobjects);
        merge_resource_table(&self.document, &mut resources, b"Font", &overlay.fonts);

        let page = self
            .document
            .get_object_mut(page_id)
            .and_then(|object| object.as_dict_mut())?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn wrap_contents(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> ExportResult<()> {
        let existing = existing_contents(&self.document, page_id)?;
        let encoded = Content { operations }.encode()?;

        let mut closing = b"Q\n".to_vec();
        closing.extend(encoded);
        let open_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close_id = self.document.add_object(Stream::new(Dictionary::new(), closing));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));

        let page = self
            .document
            .get_object_mut(page_id)
            .and_then(|object| object.as_dict_mut())?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

impl PdfBackend for LopdfBackend {
    type Image = EmbeddedImage;

    fn page_sizes(&self) -> Vec<Size<PdfPoints>> {
        self.pages.iter().map(|(_, size)| *size).collect()
    }

    fn draw_rectangle(
        &mut self,
        page_index: usize,
        rect: Rect<PdfPoints>,
        color: Color,
        opacity: f32,
    ) -> ExportResult<()> {
        let (state_name, state_id) = self.opacity_state(opacity);
        let overlay = self.overlay(page_index)?;
        overlay.ext_gstates.insert(state_name.clone(), state_id);
        overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(state_name.into_bytes())]),
            Operation::new("rg", color_operands(color)),
            Operation::new(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_line(
        &mut self,
        page_index: usize,
        start: Point<PdfPoints>,
        end: Point<PdfPoints>,
        thickness: f64,
        color: Color,
    ) -> ExportResult<()> {
        let overlay = self.overlay(page_index)?;
        overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(color)),
            Operation::new("w", vec![real(thickness)]),
            Operation::new("m", vec![real(start.x), real(start.y)]),
            Operation::new("l", vec![real(end.x), real(end.y)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn embed_png(&mut self, png: &[u8]) -> ExportResult<EmbeddedImage> {
        let image = image::load_from_memory(png)?.to_rgba8();
        let (width, height) = image.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel[3]);
        }

        let smask_id = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        let id = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        ));

        let name = format!("DsIm{}", self.next_image);
        self.next_image += 1;
        tracing::debug!(width, height, %name, "signature image embedded");
        Ok(EmbeddedImage { id, name })
    }

    fn draw_image(
        &mut self,
        page_index: usize,
        image: &EmbeddedImage,
        rect: Rect<PdfPoints>,
    ) -> ExportResult<()> {
        let overlay = self.overlay(page_index)?;
        overlay.xobjects.insert(image.name.clone(), image.id);
        overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(rect.width),
                    real(0.0),
                    real(0.0),
                    real(rect.height),
                    real(rect.x),
                    real(rect.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image.name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(
        &mut self,
        page_index: usize,
        text: &str,
        baseline: Point<PdfPoints>,
        font_size: f64,
        color: Color,
    ) -> ExportResult<()> {
        let font = self.font();
        let overlay = self.overlay(page_index)?;
        overlay.fonts.insert(FONT_RESOURCE.to_string(), font);
        overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(font_size)],
            ),
            Operation::new("rg", color_operands(color)),
            Operation::new("Td", vec![real(baseline.x), real(baseline.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn save(mut self) -> ExportResult<Vec<u8>> {
        let overlays = std::mem::take(&mut self.overlays);
        for (page_index, overlay) in overlays {
            let Some((page_id, _)) = self.pages.get(page_index).copied() else {
                continue;
            };
            self.install_resources(page_id, &overlay)?;
            self.wrap_contents(page_id, overlay.operations)?;
        }

        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|err| ExportError::Serialize(err.to_string()))?;
        Ok(buffer)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Color) -> Vec<Object> {
    color
        .unit_rgb()
        .into_iter()
        .map(Object::Real)
        .collect()
}

/// Maps text onto the standard fonts' WinAnsi encoding. Latin-1 passes
/// through; anything else becomes `?`, control characters become spaces.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match u32::from(ch) {
            code @ 0x20..=0x7E => code as u8,
            code @ 0xA0..=0xFF => code as u8,
            _ if ch.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

fn resolve_dictionary<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dictionary) => Some(dictionary),
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        _ => None,
    }
}

fn page_size(document: &Document, page_id: ObjectId) -> Size<PdfPoints> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else {
            break;
        };
        let Ok(node) = document.get_dictionary(id) else {
            break;
        };
        if let Some(size) = media_box_size(document, node) {
            return size;
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    tracing::debug!(?page_id, "page has no MediaBox; assuming US Letter");
    Size::new(FALLBACK_PAGE_SIZE.0, FALLBACK_PAGE_SIZE.1)
}

fn media_box_size(document: &Document, node: &Dictionary) -> Option<Size<PdfPoints>> {
    let raw = node.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let values = resolved
        .as_array()
        .ok()?
        .iter()
        .map(number)
        .collect::<Option<Vec<_>>>()?;
    let [llx, lly, urx, ury] = values.as_slice() else {
        return None;
    };
    let size = Size::new((urx - llx).abs(), (ury - lly).abs());
    (!size.is_degenerate()).then_some(size)
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// The page's effective resource dictionary as an owned copy, following
/// indirect references and Parent inheritance.
fn inherited_resources(document: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else {
            break;
        };
        let Ok(node) = document.get_dictionary(id) else {
            break;
        };
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|object| resolve_dictionary(document, object))
        {
            return resources.clone();
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Dictionary::new()
}

fn merge_resource_table(
    document: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    entries: &BTreeMap<String, ObjectId>,
) {
    if entries.is_empty() {
        return;
    }
    let mut table = resources
        .get(category)
        .ok()
        .and_then(|object| resolve_dictionary(document, object))
        .cloned()
        .unwrap_or_else(Dictionary::new);
    for (name, id) in entries {
        table.set(name.as_str(), Object::Reference(*id));
    }
    resources.set(category.to_vec(), Object::Dictionary(table));
}

fn existing_contents(document: &Document, page_id: ObjectId) -> ExportResult<Vec<Object>> {
    let page = document.get_dictionary(page_id)?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}

/// In-memory documents for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    /// `page_count` pages of `width` x `height` points, each with a short text run.
    pub(crate) fn blank_pdf(page_count: usize, width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("BT 72 700 Td (page {}) Tj ET", index + 1).into_bytes(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save fixture");
        buffer
    }
}
