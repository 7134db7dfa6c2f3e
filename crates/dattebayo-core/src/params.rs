use serde::{Deserialize, Serialize};

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 1.2;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const TEMPERATURE_STEP: f32 = 0.1;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const AVAILABLE_MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4"];

/// Upper bound on generated tokens, sent with every request.
pub const MAX_OUTPUT_TOKENS: u32 = 600;

/// Per-request settings picked by the user. Not part of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParameters {
    pub model: String,
    pub temperature: f32,
}

impl RequestParameters {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature: clamp_temperature(temperature),
        }
    }

    pub fn raise_temperature(&mut self) {
        self.temperature = clamp_temperature(self.temperature + TEMPERATURE_STEP);
    }

    pub fn lower_temperature(&mut self) {
        self.temperature = clamp_temperature(self.temperature - TEMPERATURE_STEP);
    }
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_TEMPERATURE)
    }
}

/// Clamp into the slider range and snap to its 0.1 step.
pub fn clamp_temperature(value: f32) -> f32 {
    if value.is_nan() {
        return DEFAULT_TEMPERATURE;
    }
    let clamped = value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
    (clamped * 10.0).round() / 10.0
}
