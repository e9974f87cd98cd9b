//! CLI tool for labeling icons in a waste-collection calendar PDF

use schedule_labeler::{label_schedule, LabelOptions, Legend};
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <input.pdf> <output.pdf> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --font <file.ttf>          Embed this font for the labels (default: Helvetica)");
    eprintln!("  --legend <file>            Colour legend, one `LABEL = #RRGGBB` per line");
    eprintln!("  --dedup <radius>           Drop icons within <radius> points of an earlier one");
    eprintln!("  --font-size <pt>           Label font size (default: 6)");
    eprintln!("  --avoid-label-collisions   Keep labels from overlapping each other");
    eprintln!("  --json                     Print run statistics as JSON");
    process::exit(1);
}

fn parse_number(program: &str, flag: &str, value: Option<&String>) -> f32 {
    match value.map(|v| v.parse::<f32>()) {
        Some(Ok(n)) if n.is_finite() && n > 0.0 => n,
        _ => {
            eprintln!("Error: {} expects a positive number", flag);
            usage(program);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("label-schedule");

    if args.len() < 3 {
        usage(program);
    }

    let input = &args[1];
    let output = &args[2];
    let mut options = LabelOptions::default();
    let mut json_output = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--font" => {
                let Some(path) = args.get(i + 1) else {
                    usage(program);
                };
                options.font_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--legend" => {
                let Some(path) = args.get(i + 1) else {
                    usage(program);
                };
                match Legend::from_file(path) {
                    Ok(legend) => options.legend = legend,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(e.exit_code());
                    }
                }
                i += 1;
            }
            "--dedup" => {
                options.dedup_radius = Some(parse_number(program, "--dedup", args.get(i + 1)));
                i += 1;
            }
            "--font-size" => {
                options.font_size = parse_number(program, "--font-size", args.get(i + 1));
                i += 1;
            }
            "--avoid-label-collisions" => options.avoid_label_collisions = true,
            "--json" => json_output = true,
            other => {
                eprintln!("Error: unknown option {}", other);
                usage(program);
            }
        }
        i += 1;
    }

    let start = Instant::now();

    match label_schedule(input, output, &options) {
        Ok(stats) => {
            let elapsed = start.elapsed();
            if json_output {
                println!(
                    r#"{{"pages_processed":{},"images_seen":{},"icons_detected":{},"labels_placed":{},"skipped":{},"unmatched":{},"unresolved_collisions":{},"time_ms":{}}}"#,
                    stats.pages_processed,
                    stats.images_seen,
                    stats.icons_detected,
                    stats.labels_placed,
                    stats.skipped,
                    stats.unmatched,
                    stats.unresolved_collisions,
                    elapsed.as_millis()
                );
            } else {
                println!("Labeling Results");
                println!("================");
                println!("Input:  {}", input);
                println!("Output: {}", output);
                println!();
                println!("Pages processed:  {}", stats.pages_processed);
                println!("Images seen:      {}", stats.images_seen);
                println!("Icons detected:   {}", stats.icons_detected);
                println!("Labels placed:    {}", stats.labels_placed);
                println!("Skipped (SKIP):   {}", stats.skipped);
                println!("Unmatched:        {}", stats.unmatched);
                if stats.unresolved_collisions > 0 {
                    println!("Unresolved collisions: {}", stats.unresolved_collisions);
                }
                println!();
                println!("Time: {}ms", elapsed.as_millis());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {}", hint);
            }
            process::exit(e.exit_code());
        }
    }
}
