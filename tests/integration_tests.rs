//! Integration tests for schedule-labeler

use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use schedule_labeler::legend::Rgb;
use schedule_labeler::{
    label_document, label_schedule, label_schedule_mem, plan_document, LabelError, LabelOptions, Legend,
    Rect,
};
use std::path::Path;

const PAPIER: Rgb = Rgb(0, 95, 170);
const PAGE_SIZE: i64 = 400;

/// An icon drawn at `(x, y)` in PDF user space (origin bottom-left)
struct DrawnIcon {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Rgb,
}

fn icon(x: f32, y: f32, color: Rgb) -> DrawnIcon {
    DrawnIcon {
        x,
        y,
        width: 20.0,
        height: 20.0,
        color,
    }
}

fn solid_image(doc: &mut Document, color: Rgb) -> ObjectId {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => 4,
        "Height" => 4,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let pixels: Vec<u8> = (0..16).flat_map(|_| [color.0, color.1, color.2]).collect();
    doc.add_object(Stream::new(dict, pixels))
}

/// One page per entry, each painting its icons as image XObjects
fn build_calendar(pages: &[Vec<DrawnIcon>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for icons in pages {
        let mut xobjects = Dictionary::new();
        let mut content = String::new();
        for (i, drawn) in icons.iter().enumerate() {
            let image_id = solid_image(&mut doc, drawn.color);
            let name = format!("Im{}", i);
            xobjects.set(name.as_str(), Object::Reference(image_id));
            content.push_str(&format!(
                "q {} 0 0 {} {} {} cm /{} Do Q\n",
                drawn.width, drawn.height, drawn.x, drawn.y, name
            ));
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_SIZE.into(), PAGE_SIZE.into()],
            "Resources" => dictionary! { "XObject" => xobjects },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Strings shown with `Tj` on a page, in content order
fn shown_strings(doc: &Document, page_number: u32) -> Vec<Vec<u8>> {
    let page_id = doc.get_pages()[&page_number];
    let data = doc.get_page_content(page_id);
    Content::decode(&data)
        .unwrap()
        .operations
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first().and_then(|o| o.as_str().ok()).map(<[u8]>::to_vec))
        .collect()
}

fn text_x_positions(doc: &Document, page_number: u32) -> Vec<f32> {
    let page_id = doc.get_pages()[&page_number];
    let data = doc.get_page_content(page_id);
    Content::decode(&data)
        .unwrap()
        .operations
        .into_iter()
        .filter(|op| op.operator == "Tm")
        .map(|op| op.operands[4].as_float().unwrap())
        .collect()
}

fn system_ttf() -> Option<&'static str> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .into_iter()
    .find(|p| Path::new(p).exists())
}

// ============================================================================
// End-to-end Labeling Tests
// ============================================================================

#[test]
fn test_single_icon_gets_one_label() {
    let input = to_bytes(build_calendar(&[vec![icon(200.0, 300.0, PAPIER)]]));
    let (output, stats) = label_schedule_mem(&input, &LabelOptions::default()).unwrap();

    assert_eq!(stats.pages_processed, 1);
    assert_eq!(stats.images_seen, 1);
    assert_eq!(stats.icons_detected, 1);
    assert_eq!(stats.labels_placed, 1);
    assert!(stats.has_matches());

    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"PAPIER".to_vec()]);

    // Label starts left of the icon and ends before it
    let xs = text_x_positions(&labeled, 1);
    assert_eq!(xs.len(), 1);
    assert!(xs[0] < 200.0);
}

#[test]
fn test_label_does_not_overlap_and_icon_is_unchanged() {
    let input = build_calendar(&[vec![icon(200.0, 300.0, PAPIER)]]);
    let options = LabelOptions::default();
    let before = plan_document(&input, &options).unwrap();

    let (output, _) = label_schedule_mem(&to_bytes(input), &options).unwrap();
    let after = plan_document(&Document::load_mem(&output).unwrap(), &options).unwrap();

    let icon_box = Rect::new(200.0, 80.0, 220.0, 100.0);
    assert_eq!(before[0].icons.len(), 1);
    assert_eq!(after[0].icons.len(), 1);
    assert_eq!(after[0].icons[0].bbox, icon_box);

    let placement = &before[0].placements[0];
    assert!(!placement.text_rect.intersects(&icon_box));
    assert_eq!(placement.text_rect.x1, 195.0);
    assert_eq!(placement.anchor.1, 98.0);
}

#[test]
fn test_relabeling_output_yields_same_placements() {
    let input = build_calendar(&[vec![
        icon(50.0, 300.0, PAPIER),
        icon(150.0, 300.0, Rgb(0, 150, 70)),
        icon(250.0, 300.0, Rgb(220, 40, 30)),
    ]]);
    let options = LabelOptions::default();
    let first = plan_document(&input, &options).unwrap();

    let (output, _) = label_schedule_mem(&to_bytes(input), &options).unwrap();
    let second = plan_document(&Document::load_mem(&output).unwrap(), &options).unwrap();

    assert_eq!(first[0].placements, second[0].placements);
    assert_eq!(first[0].icons, second[0].icons);
}

#[test]
fn test_multiple_pages_are_processed_in_order() {
    let input = build_calendar(&[
        vec![icon(100.0, 300.0, PAPIER)],
        vec![icon(100.0, 300.0, Rgb(130, 80, 40)), icon(200.0, 300.0, Rgb(255, 205, 0))],
    ]);
    let (output, stats) = label_schedule_mem(&to_bytes(input), &LabelOptions::default()).unwrap();
    assert_eq!(stats.pages_processed, 2);
    assert_eq!(stats.labels_placed, 3);

    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"PAPIER".to_vec()]);
    assert_eq!(shown_strings(&labeled, 2), vec![b"BIO".to_vec(), b"PLASTIK".to_vec()]);
}

// ============================================================================
// Filtering Tests
// ============================================================================

#[test]
fn test_footer_icons_get_no_labels() {
    // Page-space top edge at 370, below 0.9 * 400
    let input = build_calendar(&[vec![icon(100.0, 10.0, PAPIER), icon(200.0, 10.0, PAPIER)]]);
    let (output, stats) = label_schedule_mem(&to_bytes(input), &LabelOptions::default()).unwrap();

    assert_eq!(stats.images_seen, 2);
    assert_eq!(stats.icons_detected, 0);
    assert_eq!(stats.labels_placed, 0);
    assert!(!stats.has_matches());

    let labeled = Document::load_mem(&output).unwrap();
    assert!(shown_strings(&labeled, 1).is_empty());
}

#[test]
fn test_narrow_icon_is_ignored() {
    let narrow = DrawnIcon {
        width: 5.0,
        ..icon(100.0, 300.0, PAPIER)
    };
    let input = build_calendar(&[vec![narrow]]);
    let (_, stats) = label_schedule_mem(&to_bytes(input), &LabelOptions::default()).unwrap();
    assert_eq!(stats.images_seen, 1);
    assert_eq!(stats.icons_detected, 0);
    assert_eq!(stats.labels_placed, 0);
}

#[test]
fn test_skip_and_unknown_colours_are_not_labeled() {
    let input = build_calendar(&[vec![
        icon(100.0, 300.0, Rgb(220, 40, 30)),
        icon(200.0, 300.0, Rgb(255, 0, 255)),
        icon(300.0, 300.0, PAPIER),
    ]]);
    let (output, stats) = label_schedule_mem(&to_bytes(input), &LabelOptions::default()).unwrap();
    assert_eq!(stats.icons_detected, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.unmatched, 1);
    assert_eq!(stats.labels_placed, 1);

    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"PAPIER".to_vec()]);
}

#[test]
fn test_skip_only_calendar_counts_as_matched() {
    let input = build_calendar(&[vec![icon(100.0, 300.0, Rgb(220, 40, 30)), icon(200.0, 300.0, Rgb(120, 60, 150))]]);
    let (output, stats) = label_schedule_mem(&to_bytes(input), &LabelOptions::default()).unwrap();
    assert_eq!(stats.icons_detected, 2);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.labels_placed, 0);
    assert_eq!(stats.icons_classified(), 2);
    assert!(stats.has_matches());

    let labeled = Document::load_mem(&output).unwrap();
    assert!(shown_strings(&labeled, 1).is_empty());
}

#[test]
fn test_dedup_option_suppresses_near_duplicates() {
    let input = build_calendar(&[vec![icon(100.0, 300.0, PAPIER), icon(104.0, 298.0, PAPIER)]]);
    let plain = plan_document(&input, &LabelOptions::default()).unwrap();
    assert_eq!(plain[0].icons.len(), 2);

    let options = LabelOptions {
        dedup_radius: Some(15.0),
        ..LabelOptions::default()
    };
    let deduped = plan_document(&input, &options).unwrap();
    assert_eq!(deduped[0].icons.len(), 1);
}

// ============================================================================
// Placement Tests
// ============================================================================

#[test]
fn test_label_shifts_past_neighbouring_icon() {
    // Icons at x=[0,20] and x=[30,50] on the same row
    let input = build_calendar(&[vec![icon(0.0, 300.0, Rgb(255, 0, 255)), icon(30.0, 300.0, PAPIER)]]);
    let plans = plan_document(&input, &LabelOptions::default()).unwrap();
    let plan = &plans[0];

    assert_eq!(plan.placements.len(), 1);
    let placement = &plan.placements[0];
    assert_eq!(placement.shifts, 1);
    assert_eq!(placement.text_rect.x1, -5.0);
    for icon in &plan.icons {
        assert!(!placement.text_rect.intersects(&icon.bbox));
    }
}

#[test]
fn test_label_collisions_only_checked_when_enabled() {
    let input = build_calendar(&[vec![icon(100.0, 300.0, PAPIER), icon(122.0, 300.0, PAPIER)]]);

    let default_plan = plan_document(&input, &LabelOptions::default()).unwrap();
    let [a, b] = &default_plan[0].placements[..] else {
        panic!("expected two placements");
    };
    assert!(a.text_rect.intersects(&b.text_rect));

    let options = LabelOptions {
        avoid_label_collisions: true,
        ..LabelOptions::default()
    };
    let resolved = plan_document(&input, &options).unwrap();
    let [a, b] = &resolved[0].placements[..] else {
        panic!("expected two placements");
    };
    assert!(!a.text_rect.intersects(&b.text_rect));
}

// ============================================================================
// Font Tests
// ============================================================================

#[test]
fn test_missing_font_falls_back_to_builtin() {
    let input = to_bytes(build_calendar(&[vec![icon(200.0, 300.0, PAPIER)]]));
    let options = LabelOptions {
        font_path: Some("/nonexistent/fonts/label.ttf".into()),
        ..LabelOptions::default()
    };
    let (output, stats) = label_schedule_mem(&input, &options).unwrap();
    assert_eq!(stats.labels_placed, 1);
    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"PAPIER".to_vec()]);
}

#[test]
fn test_builtin_font_replaces_non_winansi_characters() {
    let legend = Legend::parse("SZKŁO = 0, 150, 70").unwrap();
    let input = to_bytes(build_calendar(&[vec![icon(200.0, 300.0, Rgb(0, 150, 70))]]));
    let options = LabelOptions {
        legend,
        ..LabelOptions::default()
    };
    let (output, _) = label_schedule_mem(&input, &options).unwrap();
    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"SZK?O".to_vec()]);
}

#[test]
fn test_truetype_font_is_embedded_once() {
    let Some(font_path) = system_ttf() else {
        eprintln!("no system TrueType font found, skipping");
        return;
    };
    let mut doc = build_calendar(&[
        vec![icon(100.0, 300.0, Rgb(0, 150, 70)), icon(200.0, 300.0, PAPIER)],
        vec![icon(100.0, 300.0, PAPIER)],
    ]);
    let options = LabelOptions {
        font_path: Some(font_path.into()),
        ..LabelOptions::default()
    };
    let stats = label_document(&mut doc, &options).unwrap();
    assert_eq!(stats.labels_placed, 3);

    let labeled = Document::load_mem(&to_bytes(doc)).unwrap();
    let type0_fonts: Vec<&Dictionary> = labeled
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter(|d| d.get(b"Subtype").and_then(|s| s.as_name()).ok() == Some(b"Type0".as_slice()))
        .collect();
    assert_eq!(type0_fonts.len(), 1);
    assert!(type0_fonts[0].has(b"ToUnicode"));

    // Identity-H: two bytes per character
    let shown = shown_strings(&labeled, 1);
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].len(), "SZKŁO".chars().count() * 2);
    assert_eq!(shown[1].len(), "PAPIER".len() * 2);
}

// ============================================================================
// File Handling and Error Tests
// ============================================================================

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("calendar.pdf");
    let output = dir.path().join("calendar-labeled.pdf");
    std::fs::write(&input, to_bytes(build_calendar(&[vec![icon(200.0, 300.0, PAPIER)]]))).unwrap();

    let stats = label_schedule(&input, &output, &LabelOptions::default()).unwrap();
    assert_eq!(stats.labels_placed, 1);

    let labeled = Document::load(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"PAPIER".to_vec()]);
}

#[test]
fn test_no_matches_still_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("calendar.pdf");
    let output = dir.path().join("out.pdf");
    std::fs::write(&input, to_bytes(build_calendar(&[vec![icon(200.0, 300.0, Rgb(255, 0, 255))]]))).unwrap();

    let stats = label_schedule(&input, &output, &LabelOptions::default()).unwrap();
    assert!(!stats.has_matches());
    assert!(output.exists());
}

#[test]
fn test_missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    let err = label_schedule(dir.path().join("missing.pdf"), &output, &LabelOptions::default()).unwrap_err();

    assert!(matches!(err, LabelError::InputNotFound { .. }));
    assert_eq!(err.kind(), schedule_labeler::ErrorKind::InputNotFound);
    assert_eq!(err.exit_code(), 2);
    assert!(err.hint().is_some());
    assert!(!output.exists());
}

#[test]
fn test_garbage_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.pdf");
    let output = dir.path().join("out.pdf");
    std::fs::write(&input, b"this is not a pdf").unwrap();

    let err = label_schedule(&input, &output, &LabelOptions::default()).unwrap_err();
    assert_eq!(err.kind(), schedule_labeler::ErrorKind::Generic);
    assert_eq!(err.exit_code(), 4);
    assert!(!output.exists());
}

#[test]
fn test_custom_legend_file() {
    let dir = tempfile::tempdir().unwrap();
    let legend_path = dir.path().join("legend.txt");
    std::fs::write(&legend_path, "# custom palette\nMAKULATURA = #005FAA\n").unwrap();

    let options = LabelOptions {
        legend: Legend::from_file(&legend_path).unwrap(),
        ..LabelOptions::default()
    };
    let input = to_bytes(build_calendar(&[vec![icon(200.0, 300.0, PAPIER)]]));
    let (output, _) = label_schedule_mem(&input, &options).unwrap();
    let labeled = Document::load_mem(&output).unwrap();
    assert_eq!(shown_strings(&labeled, 1), vec![b"MAKULATURA".to_vec()]);
}
