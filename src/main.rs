use std::io::BufRead;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flowedit::EditorConfig;
use flowedit::editor::{EditorSession, Scene, SensorMessage};
use flowedit::model::Value;
use flowedit::spec::ProgramSpec;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay sensor data through a dataflow program and print the result as JSON", long_about = None)]
struct Cli {
    /// Program file (JSON)
    #[arg(value_name = "PROGRAM")]
    program: Utf8PathBuf,

    /// Editor configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,

    /// Sensor log with one timestamped payload per line
    #[arg(long, value_name = "FILE")]
    sensor_log: Option<Utf8PathBuf>,

    /// Write the program back to this file after replaying
    #[arg(long, value_name = "FILE")]
    output: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
struct BlockReport {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    block_type: String,
    value: Option<Value>,
}

#[derive(Serialize)]
struct PlotReport {
    name: String,
    samples: usize,
    last: Option<[f64; 2]>,
}

#[derive(Serialize)]
struct Report {
    program: Option<String>,
    messages: usize,
    connections: usize,
    blocks: Vec<BlockReport>,
    plots: Vec<PlotReport>,
    unmapped_sensors: Vec<String>,
}

/// Feed every line of a sensor log to the session. Returns the number of
/// messages applied.
fn replay(session: &mut EditorSession, path: &Utf8PathBuf) -> Result<usize> {
    let file = std::fs::File::open(path).with_context(|| format!("Open {}", path))?;
    let mut applied = 0;
    for (number, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Read {}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match SensorMessage::from_json(&line) {
            Ok(msg) => {
                session.handle_sensor_data(msg.timestamp, &msg.payload);
                applied += 1;
            }
            Err(e) => tracing::warn!("{}:{}: skipping bad sensor message: {}", path, number + 1, e),
        }
    }
    Ok(applied)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,flowedit=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path).with_context(|| format!("Load config {}", path))?,
        None => EditorConfig::default(),
    };

    let spec = ProgramSpec::load(&cli.program)
        .with_context(|| format!("Failed to load program {}", cli.program))?;
    let mut session = EditorSession::new(Scene::new(), config);
    session
        .load_program(&spec)
        .with_context(|| format!("Failed to build diagram from {}", cli.program))?;

    let messages = match &cli.sensor_log {
        Some(path) => replay(&mut session, path)?,
        None => 0,
    };

    let diagram = session.diagram();
    let report = Report {
        program: session.program_name().map(str::to_string),
        messages,
        connections: diagram.connection_count(),
        blocks: diagram
            .blocks
            .iter()
            .map(|b| BlockReport {
                id: b.id.0,
                name: b.name.clone(),
                block_type: b.block_type.to_string(),
                value: b.value.clone(),
            })
            .collect(),
        plots: diagram
            .blocks
            .iter()
            .filter_map(|b| {
                let series = session.plot_series(b.id)?;
                Some(PlotReport {
                    name: b.name.clone(),
                    samples: series.len(),
                    last: series.last().map(|(t, v)| [t, v]),
                })
            })
            .collect(),
        unmapped_sensors: session.get_unmapped_sensors(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = &cli.output {
        session
            .save_program(path)
            .with_context(|| format!("Failed to write {}", path))?;
    }
    Ok(())
}
