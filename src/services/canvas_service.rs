use std::collections::HashMap;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;
use crate::models::ChartConfig;
use crate::utils::ChartError;

/// An RGB drawing surface identified by id
#[derive(Debug, Clone)]
pub struct Canvas {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(id: &str, width: u32, height: u32) -> Self {
        Canvas {
            id: id.to_string(),
            width,
            height,
            pixels: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    /// Reset every pixel to white
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 255);
    }

    /// True when no pixel differs from the cleared state
    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 255)
    }
}

/// The set of canvases charts can be drawn into
#[derive(Debug, Default)]
pub struct Document {
    canvases: HashMap<String, Canvas>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn add_canvas(&mut self, id: &str, width: u32, height: u32) {
        self.canvases.insert(id.to_string(), Canvas::new(id, width, height));
    }

    pub fn canvas(&self, id: &str) -> Option<&Canvas> {
        self.canvases.get(id)
    }

    /// Resolve the drawing surface for `id`
    pub fn context_mut(&mut self, id: &str) -> Result<&mut Canvas, ChartError> {
        self.canvases
            .get_mut(id)
            .ok_or_else(|| ChartError::CanvasNotFound(id.to_string()))
    }
}

/// A chart currently bound to a canvas
#[derive(Debug, Clone)]
pub struct ChartInstance {
    pub id: Uuid,
    pub canvas_id: String,
    pub config: ChartConfig,
    pub created_at: DateTime<Utc>,
}

impl ChartInstance {
    pub fn new(canvas_id: &str, config: ChartConfig) -> Self {
        ChartInstance {
            id: Uuid::new_v4(),
            canvas_id: canvas_id.to_string(),
            config,
            created_at: Utc::now(),
        }
    }
}

/// Tracks which chart owns each canvas. At most one instance per canvas.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    instances: HashMap<String, ChartInstance>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        ChartRegistry::default()
    }

    pub fn get(&self, canvas_id: &str) -> Option<&ChartInstance> {
        self.instances.get(canvas_id)
    }

    /// Register `instance`, returning the one it displaced
    pub fn insert(&mut self, instance: ChartInstance) -> Option<ChartInstance> {
        let previous = self.instances.insert(instance.canvas_id.clone(), instance);
        if let Some(ref old) = previous {
            debug!("Replaced chart {} (created {}) on canvas {}", old.id, old.created_at, old.canvas_id);
        }
        previous
    }

    pub fn remove(&mut self, canvas_id: &str) -> Option<ChartInstance> {
        self.instances.remove(canvas_id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.instances.len()
    }
}
