#![cfg(feature = "egui")]

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use crossbeam_channel::Receiver;
use eframe::egui;

use crate::editor::{EditorSession, ElementId, RenameRequest, Scene, SensorMessage};

/// Open rename dialog.
#[derive(Clone, Debug)]
pub struct RenamePrompt {
    pub request: RenameRequest,
    pub text: String,
    pub error: Option<String>,
}

/// Image currently handed to egui's image loaders for an element.
#[derive(Clone)]
pub(crate) struct LoadedImage {
    pub revision: u64,
    pub uri: String,
    pub bytes: Arc<[u8]>,
}

/// Interactive editor window for a dataflow program.
pub struct EditorApp {
    pub session: EditorSession<Scene>,
    /// Where "Save" writes the program.
    pub program_path: Option<Utf8PathBuf>,
    /// Live sensor messages, drained once per frame.
    pub sensors: Option<Receiver<SensorMessage>>,
    pub filter_selector_open: bool,
    pub rename: Option<RenamePrompt>,
    pub notification: Option<String>,
    pub(crate) images: HashMap<ElementId, LoadedImage>,
}

impl EditorApp {
    pub fn new(session: EditorSession<Scene>) -> Self {
        Self {
            session,
            program_path: None,
            sensors: None,
            filter_selector_open: false,
            rename: None,
            notification: None,
            images: HashMap::new(),
        }
    }

    /// Attach a channel delivering sensor messages from another thread.
    pub fn with_sensor_feed(mut self, rx: Receiver<SensorMessage>) -> Self {
        self.sensors = Some(rx);
        self
    }

    pub fn with_program_path(mut self, path: Utf8PathBuf) -> Self {
        self.program_path = Some(path);
        self
    }

    /// Apply the newest pending sensor message, dropping older ones.
    pub fn poll_sensors(&mut self) {
        let Some(rx) = &self.sensors else {
            return;
        };
        let mut latest = None;
        while let Ok(msg) = rx.try_recv() {
            latest = Some(msg);
        }
        if let Some(msg) = latest {
            self.session.handle_sensor_data(msg.timestamp, &msg.payload);
        }
    }

    /// Save to `program_path`, reporting the outcome as a notification.
    pub fn save(&mut self) {
        let Some(path) = self.program_path.clone() else {
            self.notification = Some("No program file to save to".to_string());
            return;
        };
        self.notification = Some(match self.session.save_program(&path) {
            Ok(()) => format!("Saved {}", path),
            Err(e) => {
                tracing::warn!("Saving {} failed: {}", path, e);
                format!("Saving failed: {}", e)
            }
        });
    }

    /// Image source for an element, refreshing the loader cache when the
    /// scene holds a newer image.
    pub(crate) fn image_source(
        &mut self,
        ctx: &egui::Context,
        element: ElementId,
    ) -> Option<egui::ImageSource<'static>> {
        let (revision, bytes) = self.session.surface().element(element)?.image.as_ref()?;
        let stale = self
            .images
            .get(&element)
            .is_none_or(|loaded| loaded.revision != *revision);
        if stale {
            if let Some(old) = self.images.remove(&element) {
                ctx.forget_image(&old.uri);
            }
            self.images.insert(
                element,
                LoadedImage {
                    revision: *revision,
                    uri: format!("bytes://block-{}-{}.jpg", element.0, revision),
                    bytes: Arc::from(bytes.as_slice()),
                },
            );
        }
        let loaded = self.images.get(&element)?;
        Some(egui::ImageSource::Bytes {
            uri: loaded.uri.clone().into(),
            bytes: egui::load::Bytes::Shared(loaded.bytes.clone()),
        })
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        super::ui::update(self, ctx);
    }
}
