//! Image XObject enumeration and sample decoding
//!
//! Walks a page's content stream tracking the CTM, records every image
//! XObject painted with `Do` together with its page-space bounding box, and
//! decodes image samples to RGB so the page can be rasterized.

use crate::geometry::{self, Matrix, PageBox, Rect, IDENTITY};
use crate::legend::Rgb;
use crate::LabelError;
use flate2::read::ZlibDecoder;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::Read;

/// Form XObjects nested deeper than this are not descended into
const MAX_FORM_DEPTH: usize = 8;

/// An image XObject as painted on a page
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Resource name used by the `Do` operator
    pub name: String,
    /// Object id of the image stream
    pub object_id: ObjectId,
    /// Bounding box in page space
    pub bbox: Rect,
    /// Image space (unit square) to PDF user space
    pub ctm: Matrix,
    /// Sample grid width from the image dictionary
    pub pixel_width: u32,
    /// Sample grid height from the image dictionary
    pub pixel_height: u32,
}

/// All images found on one page, in content order
#[derive(Debug, Clone)]
pub struct PageScan {
    pub page_box: PageBox,
    pub images: Vec<PlacedImage>,
}

/// Decoded image samples, row-major from the top row
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb>,
    /// Soft-mask alpha per pixel, same dimensions as `pixels`
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Sample at column `x`, row `y`. `None` for transparent pixels.
    pub fn sample(&self, x: u32, y: u32) -> Option<Rgb> {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        if let Some(alpha) = &self.alpha {
            if alpha.get(idx).copied().unwrap_or(255) < 128 {
                return None;
            }
        }
        self.pixels.get(idx).copied()
    }
}

/// Resolve an object that may be a reference to a dictionary
fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Resolve a reference, returning the object itself otherwise
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn dict_int(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// Look up a page attribute, following `/Parent` for inheritable keys
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound only stops malformed parent cycles
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// MediaBox of a page, inherited if needed
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let values: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().filter_map(|v| get_number(resolve(doc, v))).collect());

    match values.as_deref() {
        Some([a, b, c, d]) => PageBox {
            llx: a.min(*c),
            lly: b.min(*d),
            urx: a.max(*c),
            ury: b.max(*d),
        },
        _ => PageBox::LETTER,
    }
}

/// Resources dictionary of a page, inherited if needed
pub fn page_resources<'a>(doc: &'a Document, page_id: ObjectId) -> Option<&'a Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|obj| resolve_dict(doc, obj))
}

/// Enumerate the image XObjects painted on a page
pub fn scan_page(doc: &Document, page_id: ObjectId) -> Result<PageScan, LabelError> {
    let page_box = page_box(doc, page_id);
    let mut images = Vec::new();

    let content_data = doc.get_page_content(page_id);
    if let Some(resources) = page_resources(doc, page_id) {
        let content = Content::decode(&content_data)?;
        walk_content(doc, &content, resources, IDENTITY, 0, &page_box, &mut images);
    }

    Ok(PageScan { page_box, images })
}

fn walk_content(
    doc: &Document,
    content: &Content,
    resources: &Dictionary,
    base: Matrix,
    depth: usize,
    page_box: &PageBox,
    out: &mut Vec<PlacedImage>,
) {
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj));

    let mut ctm = base;
    let mut ctm_stack: Vec<Matrix> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    ctm = geometry::multiply(&new_matrix, &ctm);
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    continue;
                };
                let Some(xobject_ref) = xobjects
                    .and_then(|dict| dict.get(name).ok())
                    .and_then(|obj| obj.as_reference().ok())
                else {
                    log::debug!("XObject /{} not found in resources", String::from_utf8_lossy(name));
                    continue;
                };
                let Ok(stream) = doc.get_object(xobject_ref).and_then(|obj| obj.as_stream()) else {
                    continue;
                };

                match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
                    Ok(b"Image") => {
                        let (x0, y0, x1, y1) = geometry::unit_square_bounds(&ctm);
                        out.push(PlacedImage {
                            name: String::from_utf8_lossy(name).to_string(),
                            object_id: xobject_ref,
                            bbox: page_box.to_page_rect(x0, y0, x1, y1),
                            ctm,
                            pixel_width: dict_int(&stream.dict, b"Width").unwrap_or(0).max(0) as u32,
                            pixel_height: dict_int(&stream.dict, b"Height").unwrap_or(0).max(0) as u32,
                        });
                    }
                    Ok(b"Form") => {
                        if depth + 1 >= MAX_FORM_DEPTH {
                            log::debug!("Form XObject nesting limit reached, skipping");
                            continue;
                        }
                        walk_form(doc, stream, resources, ctm, depth + 1, page_box, out);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn walk_form(
    doc: &Document,
    stream: &Stream,
    parent_resources: &Dictionary,
    ctm: Matrix,
    depth: usize,
    page_box: &PageBox,
    out: &mut Vec<PlacedImage>,
) {
    let form_matrix = stream
        .dict
        .get(b"Matrix")
        .ok()
        .and_then(|m| m.as_array().ok())
        .map(|arr| arr.iter().filter_map(get_number).collect::<Vec<f32>>())
        .and_then(|v| <[f32; 6]>::try_from(v.as_slice()).ok())
        .unwrap_or(IDENTITY);

    let resources = stream
        .dict
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or(parent_resources);

    let data = match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    };

    match Content::decode(&data) {
        Ok(content) => walk_content(
            doc,
            &content,
            resources,
            geometry::multiply(&form_matrix, &ctm),
            depth,
            page_box,
            out,
        ),
        Err(e) => log::debug!("Skipping undecodable form XObject: {}", e),
    }
}

/// Decode every distinct image on a scanned page. Images that cannot be
/// decoded are absent from the map.
pub fn decode_page_images(doc: &Document, scan: &PageScan) -> HashMap<ObjectId, DecodedImage> {
    let mut decoded = HashMap::new();
    let mut failed = Vec::new();

    for image in &scan.images {
        if decoded.contains_key(&image.object_id) || failed.contains(&image.object_id) {
            continue;
        }
        let result = doc
            .get_object(image.object_id)
            .and_then(|obj| obj.as_stream())
            .ok()
            .and_then(|stream| decode_image(doc, stream));
        match result {
            Some(img) => {
                decoded.insert(image.object_id, img);
            }
            None => failed.push(image.object_id),
        }
    }

    decoded
}

/// Image colour space, reduced to what the rasterizer needs
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: u32,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    /// Convert 8-bit component values to RGB
    fn to_rgb(&self, c: &[u8]) -> Rgb {
        match self {
            ColorSpace::Gray => Rgb(c[0], c[0], c[0]),
            ColorSpace::Rgb => Rgb(c[0], c[1], c[2]),
            ColorSpace::Cmyk => {
                let k = 255 - c[3] as u32;
                let ch = |v: u8| ((255 - v as u32) * k / 255) as u8;
                Rgb(ch(c[0]), ch(c[1]), ch(c[2]))
            }
            ColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let n = base.components();
                let idx = (c[0] as u32).min(*hival) as usize * n;
                match lookup.get(idx..idx + n) {
                    Some(entry) => base.to_rgb(entry),
                    None => Rgb(0, 0, 0),
                }
            }
        }
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> Option<ColorSpace> {
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
            other => {
                log::debug!("Unsupported colour space /{}", String::from_utf8_lossy(other));
                None
            }
        },
        Object::Array(arr) => {
            let family = arr.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let stream = resolve(doc, arr.get(1)?).as_stream().ok()?;
                    match dict_int(&stream.dict, b"N") {
                        Some(1) => Some(ColorSpace::Gray),
                        Some(3) => Some(ColorSpace::Rgb),
                        Some(4) => Some(ColorSpace::Cmyk),
                        _ => stream
                            .dict
                            .get(b"Alternate")
                            .ok()
                            .and_then(|alt| parse_color_space(doc, alt)),
                    }
                }
                b"CalRGB" => Some(ColorSpace::Rgb),
                b"CalGray" => Some(ColorSpace::Gray),
                b"Indexed" | b"I" => {
                    let base = parse_color_space(doc, arr.get(1)?)?;
                    let hival = get_number(resolve(doc, arr.get(2)?))? as u32;
                    let lookup = match resolve(doc, arr.get(3)?) {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(stream) => stream
                            .decompressed_content()
                            .unwrap_or_else(|_| stream.content.clone()),
                        _ => return None,
                    };
                    Some(ColorSpace::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                other => {
                    log::debug!("Unsupported colour space family /{}", String::from_utf8_lossy(other));
                    None
                }
            }
        }
        _ => None,
    }
}

/// Filter names applied to a stream, in order
fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| f.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Raw sample bytes of an image stream after undoing its filters
fn stream_samples(doc: &Document, stream: &Stream) -> Option<Vec<u8>> {
    let filters = stream_filters(stream);
    match filters.as_slice() {
        [] => Some(stream.content.clone()),
        [f] if f.as_slice() == b"FlateDecode" || f.as_slice() == b"Fl" => {
            let data = inflate(&stream.content)?;
            let parms = stream
                .dict
                .get(b"DecodeParms")
                .ok()
                .map(|p| resolve(doc, p))
                .and_then(|p| match p {
                    Object::Dictionary(d) => Some(d),
                    Object::Array(arr) => arr.first().and_then(|first| resolve_dict(doc, first)),
                    _ => None,
                });
            match parms {
                Some(parms) => undo_predictor(data, parms),
                None => Some(data),
            }
        }
        other => {
            let names: Vec<String> = other
                .iter()
                .map(|f| String::from_utf8_lossy(f).to_string())
                .collect();
            log::debug!("Image filter chain {:?} not supported, image left unpainted", names);
            None
        }
    }
}

/// Inflate zlib data. A truncated stream yields whatever decoded cleanly.
fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Some(out),
        Err(_) if !out.is_empty() => Some(out),
        Err(e) => {
            log::debug!("Failed to inflate image stream: {}", e);
            None
        }
    }
}

/// Undo PNG (10-15) or TIFF (2) predictors
fn undo_predictor(data: Vec<u8>, parms: &Dictionary) -> Option<Vec<u8>> {
    let predictor = dict_int(parms, b"Predictor").unwrap_or(1);
    let colors = dict_int(parms, b"Colors").unwrap_or(1).max(1) as usize;
    let bpc = dict_int(parms, b"BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = dict_int(parms, b"Columns").unwrap_or(1).max(1) as usize;

    let bpp = ((colors * bpc) / 8).max(1);
    let row_len = (colors * bpc * columns).div_ceil(8);

    match predictor {
        1 => Some(data),
        2 => {
            if bpc != 8 {
                log::debug!("TIFF predictor with {} bits per component not supported", bpc);
                return None;
            }
            let mut out = data;
            for row in out.chunks_mut(row_len) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
            Some(out)
        }
        10..=15 => {
            let mut out = Vec::with_capacity(data.len());
            let mut prev = vec![0u8; row_len];
            for chunk in data.chunks(row_len + 1) {
                if chunk.len() < 2 {
                    break;
                }
                let filter = chunk[0];
                let mut row = chunk[1..].to_vec();
                row.resize(row_len, 0);
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    let up = prev[i];
                    let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
                    row[i] = match filter {
                        0 => row[i],
                        1 => row[i].wrapping_add(left),
                        2 => row[i].wrapping_add(up),
                        3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                        4 => row[i].wrapping_add(paeth(left, up, up_left)),
                        _ => return None,
                    };
                }
                out.extend_from_slice(&row);
                prev = row;
            }
            Some(out)
        }
        _ => None,
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Unpack `count` samples of `bpc` bits from one byte-aligned row
fn unpack_row(row: &[u8], bpc: usize, count: usize) -> Vec<u32> {
    match bpc {
        8 => row.iter().take(count).map(|&b| b as u32).collect(),
        16 => row
            .chunks_exact(2)
            .take(count)
            .map(|c| u16::from_be_bytes([c[0], c[1]]) as u32)
            .collect(),
        _ => (0..count)
            .map(|i| {
                let bit = i * bpc;
                let byte = row.get(bit / 8).copied().unwrap_or(0);
                let shift = 8 - bpc - (bit % 8);
                ((byte >> shift) as u32) & ((1 << bpc) - 1)
            })
            .collect(),
    }
}

/// Decode an image XObject into RGB samples
pub fn decode_image(doc: &Document, stream: &Stream) -> Option<DecodedImage> {
    let dict = &stream.dict;
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        log::debug!("Stencil mask image skipped");
        return None;
    }

    let width = dict_int(dict, b"Width")?.max(0) as u32;
    let height = dict_int(dict, b"Height")?.max(0) as u32;
    let bpc = dict_int(dict, b"BitsPerComponent").unwrap_or(8) as usize;
    if width == 0 || height == 0 || ![1, 2, 4, 8, 16].contains(&bpc) {
        return None;
    }

    let color_space = parse_color_space(doc, dict.get(b"ColorSpace").ok()?)?;
    let samples = stream_samples(doc, stream)?;
    let pixels = samples_to_rgb(&samples, width, height, bpc, &color_space, decode_array(dict))?;

    let alpha = dict
        .get(b"SMask")
        .ok()
        .and_then(|m| m.as_reference().ok())
        .and_then(|id| doc.get_object(id).ok())
        .and_then(|obj| obj.as_stream().ok())
        .and_then(|mask| decode_soft_mask(doc, mask, width, height));

    Some(DecodedImage {
        width,
        height,
        pixels,
        alpha,
    })
}

fn decode_array(dict: &Dictionary) -> Option<Vec<f32>> {
    dict.get(b"Decode")
        .ok()
        .and_then(|d| d.as_array().ok())
        .map(|arr| arr.iter().filter_map(get_number).collect())
}

fn samples_to_rgb(
    samples: &[u8],
    width: u32,
    height: u32,
    bpc: usize,
    color_space: &ColorSpace,
    decode: Option<Vec<f32>>,
) -> Option<Vec<Rgb>> {
    let comps = color_space.components();
    let per_row = width as usize * comps;
    let row_bytes = (per_row * bpc).div_ceil(8);
    if samples.len() < row_bytes * height as usize {
        log::debug!(
            "Image data too short: {} bytes for {}x{} at {} bpc",
            samples.len(),
            width,
            height,
            bpc
        );
        return None;
    }

    let max_value = ((1u64 << bpc) - 1) as f32;
    let indexed = matches!(color_space, ColorSpace::Indexed { .. });

    // Map a raw sample of component `c` to 0..=255, honouring /Decode
    let scale = |raw: u32, c: usize| -> u8 {
        if indexed {
            return raw.min(255) as u8;
        }
        let (dmin, dmax) = decode
            .as_ref()
            .and_then(|d| Some((*d.get(2 * c)?, *d.get(2 * c + 1)?)))
            .unwrap_or((0.0, 1.0));
        let v = dmin + raw as f32 * (dmax - dmin) / max_value;
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    let mut pixels = Vec::with_capacity((width * height) as usize);
    let mut comp = vec![0u8; comps];
    for row in samples.chunks(row_bytes).take(height as usize) {
        let values = unpack_row(row, bpc, per_row);
        for px in values.chunks_exact(comps) {
            for (c, &raw) in px.iter().enumerate() {
                comp[c] = scale(raw, c);
            }
            pixels.push(color_space.to_rgb(&comp));
        }
    }

    Some(pixels)
}

/// Decode an 8-bit gray soft mask, resampled to the base image size
fn decode_soft_mask(doc: &Document, mask: &Stream, width: u32, height: u32) -> Option<Vec<u8>> {
    let mask_w = dict_int(&mask.dict, b"Width")?.max(0) as u32;
    let mask_h = dict_int(&mask.dict, b"Height")?.max(0) as u32;
    let bpc = dict_int(&mask.dict, b"BitsPerComponent").unwrap_or(8) as usize;
    if mask_w == 0 || mask_h == 0 || ![1, 2, 4, 8, 16].contains(&bpc) {
        return None;
    }
    let samples = stream_samples(doc, mask)?;
    let gray = samples_to_rgb(&samples, mask_w, mask_h, bpc, &ColorSpace::Gray, None)?;

    let mut alpha = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let my = (y as u64 * mask_h as u64 / height as u64) as usize;
        for x in 0..width {
            let mx = (x as u64 * mask_w as u64 / width as u64) as usize;
            alpha.push(gray[my * mask_w as usize + mx].0);
        }
    }
    Some(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn image_stream(dict: Dictionary, data: Vec<u8>) -> Stream {
        Stream::new(dict, data)
    }

    fn rgb_dict(width: i64, height: i64) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width));
        dict.set("Height", Object::Integer(height));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_raw_rgb() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(rgb_dict(2, 1), vec![0, 95, 170, 255, 255, 255]);
        let img = decode_image(&doc, &stream).unwrap();
        assert_eq!(img.pixels, vec![Rgb(0, 95, 170), Rgb(255, 255, 255)]);
        assert_eq!(img.sample(0, 0), Some(Rgb(0, 95, 170)));
    }

    #[test]
    fn test_decode_flate_with_png_up_predictor() {
        let doc = Document::with_version("1.5");
        let mut dict = rgb_dict(1, 2);
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let mut parms = Dictionary::new();
        parms.set("Predictor", Object::Integer(12));
        parms.set("Colors", Object::Integer(3));
        parms.set("Columns", Object::Integer(1));
        dict.set("DecodeParms", Object::Dictionary(parms));

        // Row 0: None filter. Row 1: Up filter, deltas added to row 0.
        let encoded = zlib(&[0, 10, 20, 30, 2, 5, 5, 5]);
        let img = decode_image(&doc, &image_stream(dict, encoded)).unwrap();
        assert_eq!(img.pixels, vec![Rgb(10, 20, 30), Rgb(15, 25, 35)]);
    }

    #[test]
    fn test_decode_indexed_four_bit() {
        let doc = Document::with_version("1.5");
        let mut dict = rgb_dict(2, 1);
        dict.set("BitsPerComponent", Object::Integer(4));
        dict.set(
            "ColorSpace",
            Object::Array(vec![
                Object::Name(b"Indexed".to_vec()),
                Object::Name(b"DeviceRGB".to_vec()),
                Object::Integer(1),
                Object::String(vec![255, 255, 255, 0, 150, 70], lopdf::StringFormat::Hexadecimal),
            ]),
        );
        // Indices 1 then 0 packed into one byte
        let img = decode_image(&doc, &image_stream(dict, vec![0x10])).unwrap();
        assert_eq!(img.pixels, vec![Rgb(0, 150, 70), Rgb(255, 255, 255)]);
    }

    #[test]
    fn test_decode_gray_with_inverting_decode_array() {
        let doc = Document::with_version("1.5");
        let mut dict = rgb_dict(8, 1);
        dict.set("BitsPerComponent", Object::Integer(1));
        dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        dict.set("Decode", Object::Array(vec![Object::Integer(1), Object::Integer(0)]));
        let img = decode_image(&doc, &image_stream(dict, vec![0b1000_0000])).unwrap();
        assert_eq!(img.pixels[0], Rgb(0, 0, 0));
        assert_eq!(img.pixels[1], Rgb(255, 255, 255));
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(ColorSpace::Cmyk.to_rgb(&[0, 0, 0, 0]), Rgb(255, 255, 255));
        assert_eq!(ColorSpace::Cmyk.to_rgb(&[0, 0, 0, 255]), Rgb(0, 0, 0));
        assert_eq!(ColorSpace::Cmyk.to_rgb(&[255, 0, 255, 0]), Rgb(0, 255, 0));
    }

    #[test]
    fn test_unsupported_filter_is_not_decoded() {
        let doc = Document::with_version("1.5");
        let mut dict = rgb_dict(1, 1);
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        assert!(decode_image(&doc, &image_stream(dict, vec![0xFF, 0xD8])).is_none());
    }

    #[test]
    fn test_soft_mask_hides_transparent_pixels() {
        let mut doc = Document::with_version("1.5");
        let mut mask_dict = Dictionary::new();
        mask_dict.set("Width", Object::Integer(2));
        mask_dict.set("Height", Object::Integer(1));
        mask_dict.set("BitsPerComponent", Object::Integer(8));
        mask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        let mask_id = doc.add_object(Stream::new(mask_dict, vec![0, 255]));

        let mut dict = rgb_dict(2, 1);
        dict.set("SMask", Object::Reference(mask_id));
        let img = decode_image(&doc, &image_stream(dict, vec![0, 0, 0, 0, 95, 170])).unwrap();
        assert_eq!(img.sample(0, 0), None);
        assert_eq!(img.sample(1, 0), Some(Rgb(0, 95, 170)));
    }
}
