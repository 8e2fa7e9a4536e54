use anyhow::Result;

use crate::AlertConfig;

pub fn check_alerts(cfg: &AlertConfig) -> Result<()> {
    anyhow::ensure!(cfg.capacity >= 1, "alert.capacity must be >= 1");
    cfg.cooldown()?;
    anyhow::ensure!(
        cfg.restricted.iter().all(|s| !s.trim().is_empty()),
        "alert.restricted contains an empty class name"
    );
    if let Some(p) = &cfg.spool_path {
        anyhow::ensure!(!p.is_empty(), "alert.spool_path is empty");
    }
    Ok(())
}
