//! Debug tool: list every image candidate per page with its filter verdict
//! and classification. Writes nothing.

use schedule_labeler::images::{decode_page_images, scan_page};
use schedule_labeler::raster::rasterize;
use schedule_labeler::{load_document, LabelOptions, Legend, Verdict};
use std::env;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [legend_file] [page_number]", args[0]);
        process::exit(1);
    }

    let mut options = LabelOptions::default();
    if let Some(path) = args.get(2) {
        match Legend::from_file(path) {
            Ok(legend) => options.legend = legend,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(e.exit_code());
            }
        }
    }
    let only_page: Option<u32> = args.get(3).and_then(|p| p.parse().ok());

    let doc = match load_document(&args[1]) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {}", hint);
            }
            process::exit(e.exit_code());
        }
    };

    let filter = options.icon_filter();
    let classifier = options.classifier();

    for (page_number, page_id) in doc.get_pages() {
        if only_page.is_some_and(|p| p != page_number) {
            continue;
        }
        let scan = match scan_page(&doc, page_id) {
            Ok(scan) => scan,
            Err(e) => {
                eprintln!("Page {}: {}", page_number, e);
                continue;
            }
        };
        let decoded = decode_page_images(&doc, &scan);
        let grid = rasterize(&scan, &decoded, options.raster_scale);

        println!(
            "=== Page {} ({:.0} x {:.0} pt, {} images) ===",
            page_number,
            scan.page_box.width(),
            scan.page_box.height(),
            scan.images.len()
        );
        for candidate in filter.candidates(&scan) {
            let image = candidate.image;
            let bbox = image.bbox;
            let class = if candidate.verdict == Verdict::Accepted {
                match classifier.classify(&grid, &bbox, &options.legend) {
                    Some(entry) => entry.label.clone(),
                    None => "-".to_string(),
                }
            } else {
                String::new()
            };
            println!(
                "  /{:<8} {:>4}x{:<4} px  [{:7.1} {:7.1} {:7.1} {:7.1}] w={:5.1} {}{:?} {}",
                image.name,
                image.pixel_width,
                image.pixel_height,
                bbox.x0,
                bbox.y0,
                bbox.x1,
                bbox.y1,
                bbox.width(),
                if decoded.contains_key(&image.object_id) { "" } else { "(undecoded) " },
                candidate.verdict,
                class
            );
        }
    }
}
