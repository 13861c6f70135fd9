use std::process::Command;

use camino::Utf8PathBuf;
use flowedit::EditorConfig;
use flowedit::editor::{EditorSession, Scene, SensorPayload, SensorReading};
use flowedit::model::{BlockId, BlockType, FilterKind, Value};
use flowedit::spec::ProgramSpec;

const PROGRAM: &str = r#"{
  "name": "greenhouse",
  "blocks": [
    {"id": 1, "name": "temperature", "type": "temperature", "units": "degrees C",
     "has_seq": true, "output_type": "n", "output_count": 1, "view": {"x": 10, "y": 20}},
    {"id": 2, "name": "average", "type": "simple moving average",
     "input_type": "n", "input_count": 1, "output_type": "n", "output_count": 1,
     "params": [{"name": "period", "min": 0, "max": 9999, "default": 10, "value": 2}],
     "view": {"x": 250, "y": 20}, "sources": [1]},
    {"id": 3, "name": "plot", "type": "plot", "input_type": "n", "input_count": 1,
     "view": {"x": 500, "y": 20}, "sources": [2]},
    {"id": 4, "name": "mystery", "type": "frobnicate", "input_type": "n", "input_count": 2,
     "output_type": "n", "output_count": 1, "view": {"x": 10, "y": 300}}
  ]
}"#;

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn program_file_loads_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "program.json", PROGRAM);

    let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
    s.load_program_file(&path).unwrap();
    let d = s.diagram();
    assert_eq!(d.blocks.len(), 4);
    assert_eq!(d.connection_count(), 2);
    assert_eq!(
        d.blocks[1].block_type,
        BlockType::Filter(FilterKind::SimpleMovingAverage)
    );
    assert_eq!(d.blocks[3].block_type, BlockType::Other("frobnicate".into()));

    s.layout_modified();
    let out = Utf8PathBuf::from_path_buf(dir.path().join("saved.json")).unwrap();
    s.save_program(&out).unwrap();
    assert!(!s.is_modified());

    let saved = ProgramSpec::load(&out).unwrap();
    let original = ProgramSpec::from_json(PROGRAM).unwrap();
    assert_eq!(saved.name, original.name);
    assert_eq!(saved.blocks.len(), original.blocks.len());
    for (a, b) in saved.blocks.iter().zip(&original.blocks) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, b.name);
        assert_eq!(a.block_type, b.block_type);
        assert_eq!(a.view, b.view);
        assert_eq!(a.sources, b.sources);
    }
}

const SAVED_AVERAGE: &str = r#"{
  "blocks": [
    {"id": 1, "name": "temperature", "type": "temperature", "units": "degrees C",
     "output_type": "n", "output_count": 1, "view": {"x": 10, "y": 20}},
    {"id": 2, "name": "simple moving average", "type": "number_display_and_input",
     "input_type": "n", "input_count": 1, "output_type": "n", "output_count": 1,
     "params": [{"name": "period", "min": 0, "max": 9999, "default": 10, "value": 2}],
     "view": {"x": 250, "y": 20}, "sources": [1]}
  ]
}"#;

fn temperature(value: f64) -> SensorPayload {
    SensorPayload {
        data: Some(vec![SensorReading {
            name: "temperature".to_string(),
            value: Some(Value::Number(value)),
        }]),
    }
}

#[test]
fn saved_moving_average_computes_its_average() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "average.json", SAVED_AVERAGE);

    let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
    s.load_program_file(&path).unwrap();
    let avg = s.diagram().find_block_by_id(BlockId(2)).unwrap();
    assert_eq!(avg.block_type, BlockType::NumberDisplayAndInput);
    assert_eq!(avg.filter_kind(), Some(FilterKind::SimpleMovingAverage));

    s.handle_sensor_data(0.0, &temperature(2.0));
    s.handle_sensor_data(1.0, &temperature(4.0));
    let avg = s.diagram().find_block_by_id(BlockId(2)).unwrap();
    assert_eq!(avg.value, Some(Value::Number(3.0)));
}

#[test]
fn malformed_program_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "broken.json", "{\"blocks\": [");
    let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
    assert!(s.load_program_file(&path).is_err());
    assert!(s.diagram().blocks.is_empty());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "config.json",
        r##"{"plot_window": 5, "pin_color": "#000", "device_units": {"temperature": "degrees F"}}"##,
    );
    let config = EditorConfig::load(&path).unwrap();
    assert_eq!(config.plot_window, 5);
    assert_eq!(config.min_scale, 0.2);
    assert_eq!(
        config.device_units.get("temperature").map(String::as_str),
        Some("degrees F")
    );

    let bad = write(&dir, "bad.json", r#"{"pin_color": "steelblue-ish"}"#);
    assert!(EditorConfig::load(&bad).is_err());
}

#[test]
fn cli_replays_a_sensor_log() {
    let dir = tempfile::tempdir().unwrap();
    let program = write(&dir, "program.json", PROGRAM);
    let log = write(
        &dir,
        "sensors.jsonl",
        concat!(
            "{\"timestamp\": 10.0, \"data\": [{\"name\": \"temperature\", \"value\": 20.0}]}\n",
            "not json\n",
            "\n",
            "{\"timestamp\": 11.0, \"data\": [{\"name\": \"temperature\", \"value\": 22.0}]}\n",
        ),
    );
    let output = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_flowedit"))
        .arg(program.as_str())
        .arg("--sensor-log")
        .arg(log.as_str())
        .arg("--output")
        .arg(output.as_str())
        .output()
        .unwrap();
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(report["program"], "greenhouse");
    assert_eq!(report["messages"], 2);
    assert_eq!(report["connections"], 2);
    // period 2 average of 20 and 22
    assert_eq!(report["blocks"][1]["value"], 21.0);
    assert_eq!(report["plots"][0]["name"], "plot");
    assert_eq!(report["plots"][0]["samples"], 2);
    assert_eq!(report["plots"][0]["last"], serde_json::json!([1.0, 21.0]));
    assert_eq!(report["unmapped_sensors"], serde_json::json!([]));

    let saved = ProgramSpec::load(&output).unwrap();
    assert_eq!(saved.blocks[0].id, Some(BlockId(1)));
}
