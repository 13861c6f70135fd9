use base64::Engine as _;
use flowedit::EditorConfig;
use flowedit::editor::{
    BlockBody, EditorSession, Scene, SensorMessage, SensorPayload, SensorReading,
};
use flowedit::model::{BlockId, BlockType, DeviceKind, PinType, Value};
use flowedit::spec::{BlockSpec, ProgramSpec};

fn payload(readings: &[(&str, Option<Value>)]) -> SensorPayload {
    SensorPayload {
        data: Some(
            readings
                .iter()
                .map(|(name, value)| SensorReading {
                    name: name.to_string(),
                    value: value.clone(),
                })
                .collect(),
        ),
    }
}

fn temperature_plot() -> EditorSession<Scene> {
    let mut temp = BlockSpec::device("temperature", DeviceKind::Temperature, "degrees C");
    temp.id = Some(BlockId(1));
    let mut plot = BlockSpec::plot("plot").at(300.0, 0.0);
    plot.id = Some(BlockId(2));
    plot.sources = vec![Some(BlockId(1))];
    let mut humidity = BlockSpec::device("humidity", DeviceKind::Humidity, "percent").at(0.0, 300.0);
    humidity.id = Some(BlockId(3));

    let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
    s.load_program(&ProgramSpec {
        name: None,
        blocks: vec![temp, plot, humidity],
    })
    .unwrap();
    s
}

fn value_text(s: &EditorSession<Scene>, id: BlockId) -> String {
    match &s.surface().element_for_block(id).unwrap().content.body {
        BlockBody::Value { text, .. } => text.clone(),
        other => panic!("block {} has no value label: {:?}", id, other),
    }
}

#[test]
fn temperature_feeds_plot() {
    let mut s = temperature_plot();
    let msg = SensorMessage::from_json(
        r#"{"timestamp": 100.0, "data": [{"name": "temperature", "value": 21.5}]}"#,
    )
    .unwrap();
    s.handle_sensor_data(msg.timestamp, &msg.payload);

    assert_eq!(value_text(&s, BlockId(1)), "21.5");
    let plot = s.diagram().find_block_by_id(BlockId(2)).unwrap();
    assert_eq!(plot.value, Some(Value::Number(21.5)));
    let series = s.plot_series(BlockId(2)).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.last(), Some((0.0, 21.5)));
    assert_eq!(
        s.surface().element_for_block(BlockId(2)).unwrap().plot,
        vec![[0.0, 21.5]]
    );
}

#[test]
fn plot_keeps_only_the_latest_samples() {
    let mut s = temperature_plot();
    for i in 0..45 {
        s.handle_sensor_data(
            i as f64,
            &payload(&[("temperature", Some(Value::Number(i as f64)))]),
        );
    }
    let series = s.plot_series(BlockId(2)).unwrap();
    assert_eq!(series.len(), 30);
    assert_eq!(series.points().first(), Some(&[15.0, 15.0]));
    assert_eq!(series.last(), Some((44.0, 44.0)));
}

#[test]
fn null_value_clears_the_plot() {
    let mut s = temperature_plot();
    s.handle_sensor_data(1.0, &payload(&[("temperature", Some(Value::Number(20.0)))]));
    s.handle_sensor_data(2.0, &payload(&[("temperature", None)]));
    assert!(s.plot_series(BlockId(2)).unwrap().is_empty());
    assert_eq!(value_text(&s, BlockId(1)), "...");
}

#[test]
fn missing_device_becomes_null() {
    let mut s = temperature_plot();
    s.handle_sensor_data(
        1.0,
        &payload(&[
            ("temperature", Some(Value::Number(20.0))),
            ("humidity", Some(Value::Number(40.0))),
        ]),
    );
    assert_eq!(value_text(&s, BlockId(3)), "40");

    s.handle_sensor_data(2.0, &payload(&[("temperature", Some(Value::Number(20.5)))]));
    let humidity = s.diagram().find_block_by_id(BlockId(3)).unwrap();
    assert_eq!(humidity.value, None);
    assert_eq!(value_text(&s, BlockId(3)), "...");
}

#[test]
fn payload_without_data_is_ignored() {
    let mut s = temperature_plot();
    s.handle_sensor_data(1.0, &payload(&[("temperature", Some(Value::Number(20.0)))]));
    s.handle_sensor_data(2.0, &SensorPayload { data: None });
    assert_eq!(
        s.diagram().find_block_by_id(BlockId(1)).unwrap().value,
        Some(Value::Number(20.0))
    );
    assert_eq!(s.plot_series(BlockId(2)).unwrap().len(), 1);
    assert_eq!(s.last_sensor_data().unwrap().len(), 1);
}

#[test]
fn unmapped_sensors_are_reported_until_seen() {
    let mut s = temperature_plot();
    assert_eq!(s.get_unmapped_sensors(), ["temperature", "humidity"]);
    s.handle_sensor_data(1.0, &payload(&[("temperature", Some(Value::Number(20.0)))]));
    assert_eq!(s.get_unmapped_sensors(), ["humidity"]);
    s.handle_sensor_data(2.0, &payload(&[("humidity", None)]));
    assert!(s.get_unmapped_sensors().is_empty());
}

#[test]
fn image_sensor_updates_its_element() {
    let camera = BlockSpec {
        output_type: Some(PinType::Image),
        output_count: 1,
        ..BlockSpec::new("camera", BlockType::parse("camera"))
    };
    let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
    s.load_program(&ProgramSpec {
        name: None,
        blocks: vec![camera],
    })
    .unwrap();
    let id = s.diagram().blocks[0].id;

    let jpeg = vec![0xff, 0xd8, 0xff, 0xd9];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
    s.handle_sensor_data(1.0, &payload(&[("camera", Some(Value::Image(encoded)))]));
    let (_, bytes) = s.surface().element_for_block(id).unwrap().image.clone().unwrap();
    assert_eq!(bytes, jpeg);

    // a null frame leaves the last picture in place
    s.handle_sensor_data(2.0, &payload(&[("camera", None)]));
    let (_, bytes) = s.surface().element_for_block(id).unwrap().image.clone().unwrap();
    assert_eq!(bytes, jpeg);
}
