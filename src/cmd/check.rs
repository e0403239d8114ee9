use anyhow::{bail, Result};

use vidmaker::{Compositor, VidmakerConfig};

pub async fn cmd_check(config: &VidmakerConfig) -> Result<()> {
    let compositor = Compositor::with_config(config.render.clone());
    let results = compositor.check_available().await;

    let mut missing = 0;
    for (binary, ok) in &results {
        if *ok {
            println!("✅ {binary}");
        } else {
            println!("❌ {binary} (not found or not executable)");
            missing += 1;
        }
    }

    if missing > 0 {
        bail!("{missing} required tool(s) missing; install ffmpeg or set [render] paths in the config");
    }
    println!("\nwork dir: {}", config.work_dir.display());
    Ok(())
}
