use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use tally_alert::{
    doctor as alert_doctor, AlertConfig, AlertManager, LogTransport, SpoolTransport, Transport,
};
use tally_proto::records::{CountEvent, FrameRecord};
use tally_vision::annotate::DrawOp;
use tally_vision::{doctor as vision_doctor, raster, CountingEngine, EngineConfig};

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "tally - people counting from per-frame detections")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration file.
    Doctor,
    /// Feed a JSON-lines detection log through the counter.
    Replay {
        #[arg(long)]
        input: PathBuf,
        /// Write the last frame's annotations as a PNG.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Snapshot canvas size as WxH (defaults to the last frame's size).
        #[arg(long)]
        canvas: Option<String>,
    },
    /// List detector model files in the model directory.
    Models,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    engine: EngineCfg,
    alert: Option<AlertConfig>,
    replay: Option<ReplayCfg>,
    models: Option<ModelsCfg>,
}

#[derive(Debug, serde::Deserialize)]
struct EngineCfg {
    mode: String,
    #[serde(flatten)]
    params: EngineConfig,
}

#[derive(Debug, serde::Deserialize)]
struct ReplayCfg {
    /// Pace output at this rate; unset replays as fast as possible.
    fps: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
struct ModelsCfg {
    dir: String,
}

const MODEL_EXTS: [&str; 2] = ["pt", "onnx"];
const FALLBACK_MODEL: &str = "yolov8n.pt";

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config toml")
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    parse_config(&s)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Replay { input, snapshot, canvas } => {
            let canvas = canvas.as_deref().map(parse_canvas).transpose()?;
            replay(&cfg, &input, snapshot.as_deref(), canvas).await?
        }
        Command::Models => {
            for m in list_models(&model_dir(&cfg))? {
                println!("{}", m);
            }
        }
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    let mode = vision_doctor::check_engine(&cfg.engine.mode, &cfg.engine.params)?;
    info!(%mode, "doctor: engine OK");

    if let Some(a) = &cfg.alert {
        alert_doctor::check_alerts(a)?;
        info!(capacity = a.capacity, restricted = a.restricted.len(), "doctor: alerts OK");
    } else {
        warn!("doctor: no [alert] section, defaults apply");
    }

    if let Some(d) = replay_pace(cfg)? {
        info!(interval_ms = d.as_millis() as u64, "doctor: replay pacing OK");
    }

    if let Some(m) = &cfg.models {
        anyhow::ensure!(Path::new(&m.dir).is_dir(), "models.dir {} is not a directory", m.dir);
    }

    info!("doctor: OK");
    Ok(())
}

async fn replay(
    cfg: &Config,
    input: &Path,
    snapshot: Option<&Path>,
    canvas: Option<(u32, u32)>,
) -> Result<()> {
    let mode = vision_doctor::check_engine(&cfg.engine.mode, &cfg.engine.params)?;
    let mut engine = CountingEngine::new(mode, cfg.engine.params.clone());

    let alert_cfg = cfg.alert.clone().unwrap_or_default();
    let transport: Box<dyn Transport> = match &alert_cfg.spool_path {
        Some(p) => Box::new(SpoolTransport::new(p)),
        None => Box::new(LogTransport),
    };
    let mut alerts = AlertManager::new(&alert_cfg, transport).context("alert config")?;
    let pace = replay_pace(cfg)?;

    info!(input = %input.display(), %mode, "replay: starting");
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("open {}", input.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut stdout = tokio::io::stdout();

    let mut last: Option<(u32, u32, Vec<DrawOp>)> = None;
    let mut line_no = 0u64;
    let mut skipped = 0u64;

    while let Some(line) = lines.next_line().await.context("read input")? {
        line_no += 1;
        if line.trim().is_empty() { continue; }

        let rec: FrameRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line_no, "replay: skipping bad record: {}", e);
                skipped += 1;
                continue;
            }
        };

        if rec.reset { engine.reset(); }
        if let Some(m) = rec.mode { engine.set_mode(m); }

        let out = engine.process(&rec.detections, rec.width, rec.height);
        let status = alerts.evaluate(out.net_total, &rec.detections);

        let ev = CountEvent {
            ts_unix_ms: tally_alert::transport::unix_ms(),
            frame: out.frame,
            mode: engine.mode(),
            in_count: out.in_count,
            out_count: out.out_count,
            net_total: out.net_total,
            active_tracks: engine.active_tracks(),
            alert: status.banner().map(str::to_string),
        };
        let mut buf = serde_json::to_vec(&ev).context("encode count event")?;
        buf.push(b'\n');
        stdout.write_all(&buf).await.context("write stdout")?;

        let mut draw = out.draw;
        draw.extend(status.draw);
        last = Some((rec.width, rec.height, draw));

        if let Some(d) = pace {
            tokio::time::sleep(d).await;
        }
    }
    stdout.flush().await.context("flush stdout")?;

    info!(
        frames = engine.frame_counter(),
        in_count = engine.in_count(),
        out_count = engine.out_count(),
        skipped,
        "replay: done"
    );

    if let Some(path) = snapshot {
        let (w, h, ops) = last.context("no frames replayed; nothing to snapshot")?;
        let (w, h) = canvas.unwrap_or((w, h));
        let mut img = raster::blank(w, h);
        raster::paint(&mut img, &ops);
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        info!(path = %path.display(), "replay: snapshot written");
    }
    Ok(())
}

/// Sleep between frames for `replay.fps`; `None` when unpaced.
fn replay_pace(cfg: &Config) -> Result<Option<Duration>> {
    let Some(fps) = cfg.replay.as_ref().and_then(|r| r.fps) else { return Ok(None); };
    anyhow::ensure!(fps > 0.0 && fps.is_finite(), "replay.fps must be > 0 (got {})", fps);
    let d = Duration::try_from_secs_f64(1.0 / fps)
        .with_context(|| format!("replay.fps too small: {}", fps))?;
    Ok(Some(d))
}

fn parse_canvas(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X']).context("canvas must look like 640x480")?;
    let w: u32 = w.trim().parse().context("canvas width")?;
    let h: u32 = h.trim().parse().context("canvas height")?;
    anyhow::ensure!(w > 0 && h > 0, "canvas must be non-empty");
    Ok((w, h))
}

fn model_dir(cfg: &Config) -> PathBuf {
    cfg.models.as_ref().map(|m| PathBuf::from(&m.dir)).unwrap_or_else(|| PathBuf::from("models"))
}

/// Model file names in `dir`, sorted. Falls back to the stock model name when
/// the directory is missing or has no model files.
fn list_models(dir: &Path) -> Result<Vec<String>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            let is_model = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| MODEL_EXTS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_model && path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    found.push(name.to_string());
                }
            }
        }
    }
    found.sort();
    if found.is_empty() {
        found.push(FALLBACK_MODEL.to_string());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_defaults() {
        let cfg = parse_config("[engine]\nmode = \"directional\"\n").unwrap();
        assert_eq!(cfg.engine.params, EngineConfig::default());
        assert!(cfg.alert.is_none());
        doctor(&cfg).unwrap();
    }

    #[test]
    fn config_full() {
        let s = r#"
            [engine]
            mode = "occupancy"
            tracked_class = "person"
            max_dist_sq = 2500
            stale_frames = 15

            [alert]
            capacity = 4
            restricted = ["knife"]

            [replay]
            fps = 15.0
        "#;
        let cfg = parse_config(s).unwrap();
        assert_eq!(cfg.engine.params.max_dist_sq, 2500);
        assert_eq!(cfg.engine.params.stale_frames, 15);
        assert_eq!(cfg.engine.params.entry_frac, 0.9);
        let alert = cfg.alert.as_ref().unwrap();
        assert_eq!((alert.capacity, alert.cooldown_s), (4, 10.0));
        doctor(&cfg).unwrap();
    }

    #[test]
    fn doctor_rejects_bad_mode() {
        let cfg = parse_config("[engine]\nmode = \"sideways\"\n").unwrap();
        assert!(doctor(&cfg).is_err());
    }

    #[test]
    fn replay_pace_rejects_unrepresentable_rates() {
        let cfg = parse_config("[engine]\nmode = \"occupancy\"\n[replay]\nfps = 4.0\n").unwrap();
        assert_eq!(replay_pace(&cfg).unwrap(), Some(Duration::from_millis(250)));

        for fps in ["1e-320", "0.0", "-5.0", "inf", "nan"] {
            let s = format!("[engine]\nmode = \"occupancy\"\n[replay]\nfps = {}\n", fps);
            let cfg = parse_config(&s).unwrap();
            assert!(replay_pace(&cfg).is_err(), "fps={}", fps);
            assert!(doctor(&cfg).is_err(), "fps={}", fps);
        }
    }

    #[test]
    fn doctor_rejects_huge_cooldown() {
        for cooldown in ["1e300", "inf"] {
            let s = format!("[engine]\nmode = \"occupancy\"\n[alert]\ncooldown_s = {}\n", cooldown);
            let cfg = parse_config(&s).unwrap();
            assert!(doctor(&cfg).is_err(), "cooldown_s={}", cooldown);
        }
    }

    #[test]
    fn canvas_parsing() {
        assert_eq!(parse_canvas("640x480").unwrap(), (640, 480));
        assert_eq!(parse_canvas("1280X720").unwrap(), (1280, 720));
        assert!(parse_canvas("640").is_err());
        assert!(parse_canvas("0x10").is_err());
    }

    #[test]
    fn models_listing_and_fallback() {
        let dir = std::env::temp_dir().join(format!("tally-models-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(list_models(&dir).unwrap(), vec![FALLBACK_MODEL.to_string()]);

        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.onnx", "a.PT", "notes.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        assert_eq!(list_models(&dir).unwrap(), vec!["a.PT".to_string(), "b.onnx".to_string()]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
