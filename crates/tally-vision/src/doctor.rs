use anyhow::Result;

use crate::{EngineConfig, Mode};

pub fn check_engine(mode: &str, cfg: &EngineConfig) -> Result<Mode> {
    let mode: Mode = mode.parse()?;
    anyhow::ensure!(!cfg.tracked_class.trim().is_empty(), "engine.tracked_class is empty");
    anyhow::ensure!(cfg.max_dist_sq > 0, "engine.max_dist_sq must be > 0");
    anyhow::ensure!(cfg.stale_frames > 0, "engine.stale_frames must be > 0");
    anyhow::ensure!(
        cfg.exit_frac > 0.0 && cfg.exit_frac < cfg.entry_frac && cfg.entry_frac < 1.0,
        "engine lines must satisfy 0 < exit_frac < entry_frac < 1 (got exit={}, entry={})",
        cfg.exit_frac, cfg.entry_frac
    );
    Ok(mode)
}
