//! Material render states and blend setup.
//!
//! The decoded material document (`mat.json`) lists material instances in
//! `Entries`; sub-meshes refer to them by 1-based `Material Id`. Only the
//! first binder's render state matters here: it decides whether the imported
//! material needs alpha clipping or blending.

use serde_json::Value;

/// Alpha reference value the engine uses for "no alpha test".
const OPAQUE_ALPHA_REFERENCE: f64 = 254.0;

/// How a material's alpha is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMethod {
    Opaque,
    /// Alpha-tested cut-outs
    Clip,
    /// Alpha blending
    Blend,
}

/// Where a blended material takes its alpha from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlphaSource {
    Opaque,
    /// Alpha channel of the diffuse texture
    Texture,
    /// Fixed opacity for the whole material
    Constant(f32),
}

/// Blend configuration to apply to an imported material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendSetup {
    pub method: BlendMethod,
    pub alpha: AlphaSource,
}

impl Default for BlendSetup {
    fn default() -> Self {
        Self {
            method: BlendMethod::Opaque,
            alpha: AlphaSource::Opaque,
        }
    }
}

/// The render-state fields read from a material instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderState {
    pub blend_enabled: Option<i64>,
    pub blend_mode: Option<String>,
    pub alpha_reference: Option<f64>,
    pub opacity: Option<f64>,
    pub culling_mode: Option<String>,
}

impl RenderState {
    /// Read a `Render State` record. Missing or mistyped fields stay `None`.
    pub fn from_value(value: &Value) -> Self {
        let blend_enabled = match value.get("Blend Enabled") {
            Some(Value::Bool(enabled)) => Some(i64::from(*enabled)),
            Some(other) => other.as_i64(),
            None => None,
        };
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| value.get(key).and_then(Value::as_f64);

        Self {
            blend_enabled,
            blend_mode: text("Blend Mode"),
            alpha_reference: number("Alpha Reference"),
            opacity: number("Opacity"),
            culling_mode: text("Culling Mode"),
        }
    }

    /// Blend setup implied by this state, if the material is not plain opaque.
    pub fn blend_setup(&self) -> Option<BlendSetup> {
        let (Some(enabled), Some(mode), Some(alpha_reference), Some(culling)) = (
            self.blend_enabled,
            self.blend_mode.as_deref(),
            self.alpha_reference,
            self.culling_mode.as_deref(),
        ) else {
            return None;
        };
        if enabled != 1 {
            return None;
        }

        let opacity = self.opacity.unwrap_or(1.0);
        let opaque = opacity == 1.0;
        let translucent = mode == "TRANS";
        let needs_alpha = alpha_reference != OPAQUE_ALPHA_REFERENCE
            || !opaque
            || !translucent
            || culling == "TwoSided";
        if !needs_alpha {
            return None;
        }

        let method = if translucent && opaque {
            BlendMethod::Clip
        } else {
            BlendMethod::Blend
        };
        let alpha = if opaque {
            AlphaSource::Texture
        } else {
            AlphaSource::Constant(opacity as f32)
        };
        Some(BlendSetup { method, alpha })
    }
}

/// Render states of every material instance in a map, by material id.
#[derive(Clone, Debug, Default)]
pub struct MaterialLibrary {
    states: Vec<Option<RenderState>>,
}

impl MaterialLibrary {
    /// Build the library from a decoded `{"Entries": [...]}` document.
    pub fn from_value(document: &Value) -> Self {
        let states = document
            .get("Entries")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(Self::first_render_state).collect())
            .unwrap_or_default();
        Self { states }
    }

    fn first_render_state(entry: &Value) -> Option<RenderState> {
        let state = entry
            .get("Instance")?
            .get(0)?
            .get("Binder")?
            .get(0)?
            .get("Render State")?
            .get(0)?;
        Some(RenderState::from_value(state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Render state of the 1-based `material_id`.
    pub fn render_state(&self, material_id: i32) -> Option<&RenderState> {
        let slot = usize::try_from(material_id).ok()?.checked_sub(1)?;
        self.states.get(slot)?.as_ref()
    }

    /// Blend setup for `material_id`, or `None` for opaque materials.
    ///
    /// Ids that do not resolve to a render state are logged and treated as
    /// opaque.
    pub fn blend_setup(&self, material_id: i32) -> Option<BlendSetup> {
        match self.render_state(material_id) {
            Some(state) => state.blend_setup(),
            None => {
                log::warn!("No render state for material id {}", material_id);
                None
            }
        }
    }
}
