//! Browse a Vimeo channel from the command line
//!
//! Run with: VIMEO_ACCESS_TOKEN=... cargo run --example browse_channel -p continuum-core -- staffpicks

use continuum_core::{FeedConfig, FeedManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = std::env::var("VIMEO_ACCESS_TOKEN")
        .map_err(|_| "VIMEO_ACCESS_TOKEN must be set")?;
    let channel = std::env::args().nth(1).unwrap_or_else(|| "staffpicks".to_string());

    let feed = FeedManager::new(FeedConfig::with_token(token))?;
    feed.configure(&channel).await?;

    println!("Fetching newest videos from '{}'...\n", channel);
    let entries = feed.fetch_newest().await?;

    if entries.is_empty() {
        println!("Channel is empty!");
        return Ok(());
    }

    for video in &entries {
        println!("{:>4}. {} ({})", video.idx, video.name, video.identifier);
        if let Some(ref author) = video.author {
            println!("      by {}", author);
        }
    }

    if feed.has_next_page().await {
        let more = feed.fetch_next_page().await?;
        println!("\nNext page added {} videos", more.len());
    }

    let video = &entries[0];
    println!("\nResolving presets for: {}", video.name);
    let detailed = feed.fetch_detail(&video.identifier).await?;

    match detailed.presets {
        Some(ref presets) if !presets.is_empty() => {
            for preset in presets {
                let size = match (preset.width, preset.height) {
                    (Some(w), Some(h)) => format!("{}x{}", w, h),
                    _ => "adaptive".to_string(),
                };
                println!("   {:<6} {:<10} {}", preset.quality, size, preset.url);
            }
        }
        _ => println!("   No playable files (video may still be transcoding)"),
    }

    if let Some(ref credits) = detailed.credits {
        for credit in credits {
            println!("   {}: {}", credit.role, credit.name);
        }
    }

    Ok(())
}
