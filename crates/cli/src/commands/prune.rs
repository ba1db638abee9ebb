//! `weathercanvas prune` — one eviction pass over the image directory.

use weathercanvas_gallery::RetentionManager;

pub async fn run(keep: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let keep = keep.unwrap_or(config.storage.max_images_retained);
    if keep == 0 {
        return Err("--keep must be at least 1".into());
    }

    let directory = config.storage.resolved_directory();
    let removed = RetentionManager::new(directory.clone(), keep).evict().await?;

    println!(
        "🧹 Removed {removed} image(s) from {}, keeping the newest {keep}",
        directory.display()
    );
    Ok(())
}
