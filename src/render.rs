//! Writing labels into the document
//!
//! With an embedded TrueType font all labels of a page are composed into
//! one content stream and the font objects (glyph widths, ToUnicode map)
//! are written once at the end of the run, covering exactly the glyphs
//! used. With the built-in Helvetica each label is appended on its own as
//! soon as it is written.

use crate::font::{winansi_encode, LabelFont, TrueTypeFont};
use crate::geometry::PageBox;
use crate::images::page_resources;
use crate::placer::LabelPlacement;
use crate::LabelError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;

/// Text drawing style
#[derive(Debug, Clone)]
pub struct LabelStyle {
    pub font_size: f32,
    /// Fill colour, RGB components in 0..=1
    pub color: (f32, f32, f32),
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 6.0,
            color: (0.2, 0.2, 0.2),
        }
    }
}

/// Writes label placements into a document
pub struct LabelWriter {
    font: LabelFont,
    style: LabelStyle,
    /// Font dictionary object, created on first use
    font_id: Option<ObjectId>,
    /// Glyphs used with the embedded font, gid -> character
    used_glyphs: BTreeMap<u16, char>,
    warned_chars: HashSet<char>,
    wrapped_pages: HashSet<ObjectId>,
    labels_written: usize,
}

impl LabelWriter {
    pub fn new(font: LabelFont, style: LabelStyle) -> Self {
        Self {
            font,
            style,
            font_id: None,
            used_glyphs: BTreeMap::new(),
            warned_chars: HashSet::new(),
            wrapped_pages: HashSet::new(),
            labels_written: 0,
        }
    }

    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    /// True when labels are composed per page rather than per label
    pub fn is_batched(&self) -> bool {
        !self.font.is_builtin()
    }

    pub fn labels_written(&self) -> usize {
        self.labels_written
    }

    /// Commit one page's placements
    pub fn write_page(
        &mut self,
        doc: &mut Document,
        page_id: ObjectId,
        page_box: &PageBox,
        placements: &[LabelPlacement],
    ) -> Result<(), LabelError> {
        if placements.is_empty() {
            return Ok(());
        }

        let font_id = self.ensure_font(doc);
        let resource_name = register_font(doc, page_id, font_id)?;

        if self.is_batched() {
            let mut operations = vec![Operation::new("q", vec![])];
            for placement in placements {
                operations.extend(self.text_operations(&resource_name, page_box, placement));
            }
            operations.push(Operation::new("Q", vec![]));
            self.append(doc, page_id, operations)?;
            self.labels_written += placements.len();
        } else {
            for placement in placements {
                let mut operations = vec![Operation::new("q", vec![])];
                operations.extend(self.text_operations(&resource_name, page_box, placement));
                operations.push(Operation::new("Q", vec![]));
                self.append(doc, page_id, operations)?;
                self.labels_written += 1;
            }
        }

        Ok(())
    }

    /// Write deferred font objects. Must be called once after the last page.
    pub fn finish(self, doc: &mut Document) -> Result<(), LabelError> {
        let (Some(font_id), LabelFont::TrueType(font)) = (self.font_id, &self.font) else {
            return Ok(());
        };
        let type0 = type0_font_dict(doc, font, &self.used_glyphs)?;
        doc.objects.insert(font_id, Object::Dictionary(type0));
        Ok(())
    }

    fn ensure_font(&mut self, doc: &mut Document) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = match &self.font {
            LabelFont::Helvetica => {
                let mut dict = Dictionary::new();
                dict.set("Type", Object::Name(b"Font".to_vec()));
                dict.set("Subtype", Object::Name(b"Type1".to_vec()));
                dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
                dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
                doc.add_object(Object::Dictionary(dict))
            }
            // Filled in by `finish` once every glyph is known
            LabelFont::TrueType(_) => doc.new_object_id(),
        };
        self.font_id = Some(id);
        id
    }

    fn text_operations(
        &mut self,
        resource_name: &[u8],
        page_box: &PageBox,
        placement: &LabelPlacement,
    ) -> Vec<Operation> {
        let (x, y) = page_box.to_user_point(placement.anchor.0, placement.anchor.1);
        let (r, g, b) = self.style.color;
        vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(resource_name.to_vec()),
                    Object::Real(self.style.font_size),
                ],
            ),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Tj", vec![self.encode_text(&placement.text)]),
            Operation::new("ET", vec![]),
        ]
    }

    fn encode_text(&mut self, text: &str) -> Object {
        match &self.font {
            LabelFont::Helvetica => {
                let (bytes, missing) = winansi_encode(text);
                for ch in missing {
                    if self.warned_chars.insert(ch) {
                        log::warn!("Built-in font cannot encode {:?}; printing '?' instead", ch);
                    }
                }
                Object::String(bytes, StringFormat::Literal)
            }
            LabelFont::TrueType(font) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for (ch, gid) in font.glyph_ids(text) {
                    let gid = match gid {
                        Some(gid) => {
                            self.used_glyphs.entry(gid).or_insert(ch);
                            gid
                        }
                        None => {
                            if self.warned_chars.insert(ch) {
                                log::warn!("Font {} has no glyph for {:?}", font.name, ch);
                            }
                            0
                        }
                    };
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
        }
    }

    fn append(
        &mut self,
        doc: &mut Document,
        page_id: ObjectId,
        operations: Vec<Operation>,
    ) -> Result<(), LabelError> {
        let mut data = Content { operations }.encode()?;
        data.push(b'\n');
        let wrap = self.wrapped_pages.insert(page_id);
        append_page_content(doc, page_id, data, wrap)
    }
}

/// Register `font_id` in the page's font resources under an unused name
fn register_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<Vec<u8>, LabelError> {
    // Locate (or materialize) the page's own resources dictionary
    let existing_resources = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(Some(*id)),
        Ok(Object::Dictionary(_)) => Some(None),
        _ => None,
    };
    let resources_ref = match existing_resources {
        Some(location) => location,
        None => {
            let inherited = page_resources(doc, page_id).cloned().unwrap_or_default();
            doc.get_dictionary_mut(page_id)?
                .set("Resources", Object::Dictionary(inherited));
            None
        }
    };

    let resources = resources_mut(doc, page_id, resources_ref)?;
    let fonts_ref = match resources.get(b"Font") {
        Ok(Object::Reference(id)) => Some(Some(*id)),
        Ok(Object::Dictionary(_)) => Some(None),
        _ => None,
    };
    let fonts_ref = match fonts_ref {
        Some(location) => location,
        None => {
            resources.set("Font", Object::Dictionary(Dictionary::new()));
            None
        }
    };

    let fonts = match fonts_ref {
        Some(id) => doc.get_dictionary_mut(id)?,
        None => resources_mut(doc, page_id, resources_ref)?
            .get_mut(b"Font")?
            .as_dict_mut()?,
    };

    // Reuse the name if this page already references our font
    if let Some((name, _)) = fonts
        .iter()
        .find(|(_, value)| matches!(value, Object::Reference(id) if *id == font_id))
    {
        return Ok(name.clone());
    }

    let name = (0..)
        .map(|i| format!("FLbl{}", i).into_bytes())
        .find(|candidate| !fonts.has(candidate))
        .unwrap_or_else(|| b"FLbl".to_vec());
    fonts.set(name.clone(), Object::Reference(font_id));
    Ok(name)
}

fn resources_mut(
    doc: &mut Document,
    page_id: ObjectId,
    resources_ref: Option<ObjectId>,
) -> Result<&mut Dictionary, LabelError> {
    let dict = match resources_ref {
        Some(id) => doc.get_dictionary_mut(id)?,
        None => doc
            .get_dictionary_mut(page_id)?
            .get_mut(b"Resources")?
            .as_dict_mut()?,
    };
    Ok(dict)
}

/// Append a content stream to a page. When `wrap` is set the existing
/// content is first enclosed in `q`/`Q` so its graphics state cannot leak
/// into the appended stream.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    data: Vec<u8>,
    wrap: bool,
) -> Result<(), LabelError> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if wrap && !existing.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        contents.push(Object::Reference(close));
    } else {
        contents.extend(existing);
    }

    let label_stream = doc.add_object(Stream::new(Dictionary::new(), data));
    contents.push(Object::Reference(label_stream));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Build the Type0 font dictionary and its descendants for the glyphs used
fn type0_font_dict(
    doc: &mut Document,
    font: &TrueTypeFont,
    used_glyphs: &BTreeMap<u16, char>,
) -> Result<Dictionary, LabelError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(font.data())?;
    let compressed = encoder.finish()?;

    let mut file_dict = Dictionary::new();
    file_dict.set("Length1", Object::Integer(font.data().len() as i64));
    file_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let font_file = doc.add_object(Stream::new(file_dict, compressed));

    let base_font = Object::Name(font.name.as_bytes().to_vec());

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", base_font.clone());
    descriptor.set("Flags", Object::Integer(32));
    descriptor.set(
        "FontBBox",
        Object::Array(font.bbox.iter().map(|&v| Object::Integer(font.to_1000(v))).collect()),
    );
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", Object::Integer(font.to_1000(font.ascender)));
    descriptor.set("Descent", Object::Integer(font.to_1000(font.descender)));
    descriptor.set("CapHeight", Object::Integer(font.to_1000(font.cap_height)));
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set("FontFile2", Object::Reference(font_file));
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    let mut widths = Vec::with_capacity(used_glyphs.len() * 2);
    for &gid in used_glyphs.keys() {
        widths.push(Object::Integer(gid as i64));
        widths.push(Object::Array(vec![Object::Real(font.advance_1000(gid))]));
    }

    let mut system_info = Dictionary::new();
    system_info.set("Registry", Object::string_literal("Adobe"));
    system_info.set("Ordering", Object::string_literal("Identity"));
    system_info.set("Supplement", Object::Integer(0));

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", Object::Name(b"Font".to_vec()));
    cid_font.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
    cid_font.set("BaseFont", base_font.clone());
    cid_font.set("CIDSystemInfo", Object::Dictionary(system_info));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
    cid_font.set("DW", Object::Integer(1000));
    cid_font.set("W", Object::Array(widths));
    cid_font.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let to_unicode = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(used_glyphs).into_bytes(),
    ));

    let mut type0 = Dictionary::new();
    type0.set("Type", Object::Name(b"Font".to_vec()));
    type0.set("Subtype", Object::Name(b"Type0".to_vec()));
    type0.set("BaseFont", base_font);
    type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));
    type0.set("ToUnicode", Object::Reference(to_unicode));
    Ok(type0)
}

/// ToUnicode CMap mapping 2-byte glyph ids back to text
pub fn to_unicode_cmap(used_glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used_glyphs.iter().collect();
    // bfchar sections hold at most 100 entries
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}
