//! Example demonstrating the analysis pipeline's tracing instrumentation.
//!
//! Run with: cargo run -p smartfill-core --example fill_tracing

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use smartfill_core::{
    Frame, ImageMetadata, MemoryAnalysisCache, MemoryLibrary, ScoringOptions, SmartFillCoordinator,
};
use tracing_subscriber::{fmt, EnvFilter};

fn gradient_png(width: u32, height: u32, tint: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let shade = ((x + y) * 255 / (width + height)) as u8;
        Rgb([tint[0].saturating_add(shade / 2), tint[1], tint[2].saturating_add(shade / 3)])
    });
    let mut buffer = Cursor::new(Vec::new());
    let _ = img.write_to(&mut buffer, ImageFormat::Png);
    buffer.into_inner()
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("smartfill_core=debug,info"))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== SmartFill Tracing Demo ===\n");

    let library = Arc::new(MemoryLibrary::new());
    library.add_photo(
        "tall.png",
        ImageMetadata::new("tall.png", 3000, 4500),
        gradient_png(60, 90, [120, 40, 30]),
    );
    library.add_photo(
        "wide.png",
        ImageMetadata::new("wide.png", 4500, 3000),
        gradient_png(90, 60, [20, 80, 140]),
    );
    library.add_photo(
        "grey.png",
        ImageMetadata::new("grey.png", 2000, 2000),
        gradient_png(60, 60, [90, 90, 90]),
    );
    library.set_frames(vec![
        Frame::new("left", 4.0, 6.0),
        Frame::new("center", 8.0, 8.0),
        Frame::new("right", 6.0, 4.0),
    ]);

    let coordinator = match SmartFillCoordinator::for_library(library.clone())
        .with_cache(Arc::new(MemoryAnalysisCache::new()))
        .build()
        .await
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to start coordinator: {}", e);
            return;
        }
    };

    let frame = Frame::new("left", 4.0, 6.0);
    println!("\nRequesting suggestions before analysis...\n");
    if let Ok(early) = coordinator.get_suggestions_for_frame(&frame, ScoringOptions::default()).await {
        println!("   {} suggestions available", early.len());
    }

    coordinator.wait_idle().await;

    println!("\nGenerating gallery solutions...\n");
    match coordinator.generate_gallery_solutions(3, ScoringOptions::default()).await {
        Ok(solutions) => {
            for solution in solutions {
                println!("   {} ({} points)", solution.id, solution.total_score);
                for (frame_id, photo_id) in &solution.assignments {
                    println!("      {frame_id} <- {photo_id}");
                }
            }
        }
        Err(e) => println!("\nFailed: {}", e),
    }
}
