//! Background scale shared by every presented modal.
//!
//! A single numeric source of truth. Writers send [`ScaleRequest`]s, the
//! coordinator owns the spring and is the only thing that moves the value.

use crate::config::{ScaleConfig, SpringConfig};
use crate::utils::sleep_ms;
use tokio::sync::{mpsc, watch};

/// Background scale while a modal is fully open.
pub const SCALE_FACTOR: f32 = 0.83;
/// Background scale with no modal presented.
pub const SCALE_AT_REST: f32 = 1.0;

const MAX_STEP_SECONDS: f32 = 1.0 / 120.0;
const SETTLE_EPSILON: f32 = 1e-3;
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRequest(pub f32);

#[derive(Clone)]
pub struct ScaleSender {
    tx: mpsc::UnboundedSender<ScaleRequest>,
}

impl ScaleSender {
    pub fn request(&self, value: f32) {
        if self.tx.send(ScaleRequest(value)).is_err() {
            tracing::debug!(value, "scale coordinator is gone, request ignored");
        }
    }
}

pub struct ScaleCoordinator {
    factor: f32,
    spring: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    tx: mpsc::UnboundedSender<ScaleRequest>,
    requests: mpsc::UnboundedReceiver<ScaleRequest>,
    published: watch::Sender<f32>,
}

impl ScaleCoordinator {
    pub fn new(config: &ScaleConfig) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        Self {
            factor: config.scale_factor,
            spring: config.spring,
            value: SCALE_AT_REST,
            velocity: 0.0,
            target: SCALE_AT_REST,
            tx,
            requests,
            published: watch::channel(SCALE_AT_REST).0,
        }
    }

    pub fn sender(&self) -> ScaleSender {
        ScaleSender {
            tx: self.tx.clone(),
        }
    }

    #[allow(dead_code)]
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.published.subscribe()
    }

    #[cfg(test)]
    pub fn scale(&self) -> f32 {
        self.value
    }

    #[cfg(test)]
    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < SETTLE_EPSILON && self.velocity.abs() < SETTLE_EPSILON
    }

    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.factor, SCALE_AT_REST)
    }

    fn accept(&mut self, ScaleRequest(value): ScaleRequest) {
        if value.is_nan() {
            tracing::debug!("ignoring NaN scale request");
            return;
        }
        self.target = self.clamp(value);
    }

    fn drain(&mut self) {
        while let Ok(request) = self.requests.try_recv() {
            self.accept(request);
        }
    }

    /// Apply pending requests and advance the spring by `dt_seconds`.
    pub fn tick(&mut self, dt_seconds: f32) -> f32 {
        self.drain();

        let SpringConfig {
            mass,
            damping,
            stiffness,
        } = self.spring;
        let mut remaining = dt_seconds.max(0.0);
        while remaining > 0.0 && !self.is_settled() {
            let step = remaining.min(MAX_STEP_SECONDS);
            let force = -stiffness * (self.value - self.target) - damping * self.velocity;
            self.velocity += force / mass * step;
            self.value += self.velocity * step;

            let clamped = self.clamp(self.value);
            if clamped != self.value {
                self.value = clamped;
                self.velocity = 0.0;
            }
            remaining -= step;
        }

        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
        }
        self.published.send_replace(self.value);
        self.value
    }

    /// Resolves once a new request arrives.
    pub async fn wait_for_request(&mut self) {
        if let Some(request) = self.requests.recv().await {
            self.accept(request);
        }
    }

    /// Frame driver: ticks while the spring is moving, parks while settled.
    pub async fn run(mut self, mut on_frame: impl FnMut(StackTransform)) {
        loop {
            if self.is_settled() {
                self.wait_for_request().await;
            }
            sleep_ms(FRAME_MS).await;
            let scale = self.tick(FRAME_MS as f32 / 1000.0);
            on_frame(StackTransform::from_scale(scale));
        }
    }
}

/// Root stack geometry derived from the scale alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackTransform {
    pub scale: f32,
    pub corner_radius: f32,
    pub offset_y: f32,
}

impl StackTransform {
    pub fn from_scale(scale: f32) -> Self {
        Self {
            scale,
            corner_radius: if scale >= SCALE_AT_REST { 0.0 } else { scale * 40.0 },
            offset_y: (1.0 - scale) * -200.0,
        }
    }

    pub fn style(&self) -> String {
        format!(
            "transform: translateY({:.2}px) scale({:.4}); border-radius: {:.2}px;",
            self.offset_y, self.scale, self.corner_radius
        )
    }
}

impl Default for StackTransform {
    fn default() -> Self {
        Self::from_scale(SCALE_AT_REST)
    }
}
