//! Open the program editor with a simulated sensor feed.
//!
//! Usage: `cargo run --example egui_editor --features egui -- [PROGRAM.json]`

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use eframe::egui;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flowedit::EditorConfig;
use flowedit::editor::{EditorSession, Scene, SensorMessage, SensorPayload, SensorReading};
use flowedit::egui_app::EditorApp;
use flowedit::model::{BlockId, DeviceKind, FilterKind, Value};
use flowedit::spec::{BlockSpec, ProgramSpec};

fn demo_program() -> ProgramSpec {
    let mut temperature =
        BlockSpec::device("temperature", DeviceKind::Temperature, "degrees C").at(40.0, 60.0);
    temperature.id = Some(BlockId(1));

    let mut average = flowedit::editor::filter_block_spec(FilterKind::SimpleMovingAverage.as_str())
        .at(300.0, 60.0);
    average.id = Some(BlockId(2));
    average.sources = vec![Some(BlockId(1))];

    let mut plot = BlockSpec::plot("plot").at(560.0, 40.0);
    plot.id = Some(BlockId(3));
    plot.sources = vec![Some(BlockId(2))];

    let mut humidity =
        BlockSpec::device("humidity", DeviceKind::Humidity, "percent").at(40.0, 300.0);
    humidity.id = Some(BlockId(4));

    ProgramSpec {
        name: Some("greenhouse".to_string()),
        blocks: vec![temperature, average, plot, humidity],
    }
}

/// Send a reading for every sensor roughly ten times per second.
fn spawn_sensor_feed(tx: crossbeam_channel::Sender<SensorMessage>) {
    std::thread::spawn(move || {
        let start = Instant::now();
        loop {
            let t = start.elapsed().as_secs_f64();
            let msg = SensorMessage {
                timestamp: t,
                payload: SensorPayload {
                    data: Some(vec![
                        SensorReading {
                            name: "temperature".to_string(),
                            value: Some(Value::Number(
                                ((21.0 + 2.0 * (t * 0.5).sin()) * 10.0).round() / 10.0,
                            )),
                        },
                        SensorReading {
                            name: "humidity".to_string(),
                            value: Some(Value::Number((55.0 + 5.0 * (t * 0.2).cos()).round())),
                        },
                    ]),
                },
            };
            if tx.send(msg).is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    });
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flowedit=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args().nth(1).map(Utf8PathBuf::from);
    let spec = match &path {
        Some(p) => ProgramSpec::load(p).with_context(|| format!("Failed to load {}", p))?,
        None => demo_program(),
    };

    let mut session = EditorSession::new(Scene::new(), EditorConfig::default());
    session.load_program(&spec)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    spawn_sensor_feed(tx);

    let mut app = EditorApp::new(session).with_sensor_feed(rx);
    if let Some(p) = path {
        app = app.with_program_path(p);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Program Editor"),
        ..Default::default()
    };
    eframe::run_native(
        "flowedit",
        options,
        Box::new(|cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))
}
