//! Uma Event Checker CLI - Testing and development entry point
//!
//! Runs the dataset search and the frame detectors on desktop, without an
//! Android device or an OCR engine.

use std::path::Path;
use std::process;

use uma_event_checker::config::Settings;
use uma_event_checker::event::{EventDataset, EventOwners, EventSearch};
use uma_event_checker::vision::{
    EventTitleProcessor, EventTypeDetector, Frame, GameHeaderDetector, TemplateAssets,
    VisionError,
};
use uma_event_checker::{CheckerError, DATA_FILE};

const USAGE: &str = "\
Usage:
  uma-checker search <data.json> <query> [max]
  uma-checker frame <assets-dir> <screenshot.png> [settings.json]";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("search") if args.len() >= 3 => {
            let max = args.get(3).and_then(|m| m.parse().ok()).unwrap_or(5);
            search(&args[1], &args[2], max)
        }
        Some("frame") if args.len() >= 3 => inspect_frame(&args[1], &args[2], args.get(3)),
        _ => {
            println!("{USAGE}");
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn search(data: &str, query: &str, max: usize) -> Result<(), CheckerError> {
    let dataset = EventDataset::load(data)?;
    let search = EventSearch::new(dataset.shared_events());

    println!("Top {} events for '{}':", max, query);
    for result in search.search_top_k(query, max) {
        println!();
        println!(
            "[{:.3}] {} ({})",
            result.score,
            result.event.title(),
            result.event.owner().name()
        );
        for choice in result.event.choices() {
            println!("{choice}");
        }
    }
    Ok(())
}

fn inspect_frame(
    assets_dir: &str,
    screenshot: &str,
    settings_file: Option<&String>,
) -> Result<(), CheckerError> {
    let settings = match settings_file {
        Some(path) => {
            let json =
                std::fs::read_to_string(path).map_err(|e| CheckerError::Data(e.into()))?;
            Settings::from_json(&json)?
        }
        None => Settings::default(),
    };

    let data_path = Path::new(assets_dir).join(DATA_FILE);
    let owners = if data_path.exists() {
        EventDataset::load(&data_path)?.owners().clone()
    } else {
        EventOwners::default()
    };
    let assets = TemplateAssets::load_from_dir(assets_dir, &owners, &settings)?;

    let image = image::open(screenshot).map_err(VisionError::from)?.to_rgba8();
    let frame = settings.screen.crop_content(&Frame::from_image(image))?;
    println!("Frame: {}x{}", frame.width(), frame.height());

    let header = GameHeaderDetector::new(&settings.game_header, assets.header);
    let score = header.score(&frame)?;
    println!("  - Game header score: {:.3}", score);
    if score <= settings.game_header.threshold {
        println!("  - Not a game screen");
        return Ok(());
    }

    let detector = EventTypeDetector::new(
        &settings.event_type,
        assets.event_chara,
        assets.event_support,
        assets.event_scenario,
    );
    let Some(category) = detector.detect(&frame)? else {
        println!("  - No event on screen");
        return Ok(());
    };
    println!("  - Event type: {:?}", category);

    let title = EventTitleProcessor::new(settings.event_title).pre_process(&frame, category)?;
    let out = Path::new("title.png");
    title.save(out).map_err(VisionError::from)?;
    println!("  - Title image written to {}", out.display());
    Ok(())
}
