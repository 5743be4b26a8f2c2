//! Rendering backend interface.
//!
//! The material system never compiles or runs shaders itself. It talks to a
//! [`ShaderBackend`] through four synchronous calls, and only the variant cache calls
//! `compile` and `destroy`.

use ahash::AHashMap;
use ember_common::{MaterialSlot, ShaderHandle};
use ember_shader::UniformValue;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Compiles, binds and parameterises particle shaders.
pub trait ShaderBackend: Send + Sync {
    /// Compiles shader source, returning a handle or a diagnostic.
    fn compile(&self, source: &str) -> Result<ShaderHandle, String>;

    /// Frees a compiled shader.
    fn destroy(&self, handle: ShaderHandle);

    /// Attaches a compiled shader to a material slot; `None` detaches.
    fn bind(&self, slot: MaterialSlot, handle: Option<ShaderHandle>);

    /// Sets a named shader parameter on a material slot.
    fn set_param(&self, slot: MaterialSlot, name: &str, value: &UniformValue);
}

/// Call counters recorded by [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCounters {
    /// Successful compiles
    pub compiles: u64,
    /// Rejected compiles
    pub rejected: u64,
    /// Destroys of live handles
    pub destroys: u64,
    /// Destroys of unknown or already freed handles
    pub invalid_destroys: u64,
    /// Bind calls
    pub binds: u64,
    /// Parameter writes
    pub param_writes: u64,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_handle: u64,
    sources: AHashMap<ShaderHandle, String>,
    bindings: AHashMap<MaterialSlot, ShaderHandle>,
    params: AHashMap<(MaterialSlot, String), UniformValue>,
    reject_patterns: Vec<String>,
    counters: BackendCounters,
}

/// In-memory backend without a GPU.
///
/// Accepts any source that declares `shader_type` and has balanced braces, unless it
/// contains a pattern registered with [`HeadlessBackend::reject_sources_containing`].
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes future compiles fail for sources containing `pattern`.
    pub fn reject_sources_containing(&self, pattern: impl Into<String>) {
        self.state.lock().reject_patterns.push(pattern.into());
    }

    /// Clears all rejection patterns.
    pub fn clear_rejections(&self) {
        self.state.lock().reject_patterns.clear();
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn counters(&self) -> BackendCounters {
        self.state.lock().counters
    }

    /// Number of compiled shaders not yet destroyed.
    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.state.lock().sources.len()
    }

    /// Source of a live shader.
    #[must_use]
    pub fn source(&self, handle: ShaderHandle) -> Option<String> {
        self.state.lock().sources.get(&handle).cloned()
    }

    /// Shader currently bound to `slot`.
    #[must_use]
    pub fn bound(&self, slot: MaterialSlot) -> Option<ShaderHandle> {
        self.state.lock().bindings.get(&slot).copied()
    }

    /// Last value written to a parameter.
    #[must_use]
    pub fn param(&self, slot: MaterialSlot, name: &str) -> Option<UniformValue> {
        self.state.lock().params.get(&(slot, name.to_string())).copied()
    }

    fn validate(source: &str) -> Result<(), String> {
        if !source.lines().any(|line| line.trim_start().starts_with("shader_type ")) {
            return Err("missing shader_type declaration".to_string());
        }

        let mut depth: i64 = 0;
        for (line_no, line) in source.lines().enumerate() {
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {},
                }
                if depth < 0 {
                    return Err(format!("unexpected '}}' on line {}", line_no + 1));
                }
            }
        }
        if depth != 0 {
            return Err(format!("{depth} unclosed block(s)"));
        }
        Ok(())
    }
}

impl ShaderBackend for HeadlessBackend {
    fn compile(&self, source: &str) -> Result<ShaderHandle, String> {
        let mut state = self.state.lock();

        let rejected = state
            .reject_patterns
            .iter()
            .find(|pattern| source.contains(pattern.as_str()))
            .map(|pattern| format!("source contains rejected pattern '{pattern}'"));
        if let Some(reason) = rejected.map_or_else(|| Self::validate(source).err(), Some) {
            state.counters.rejected += 1;
            return Err(reason);
        }

        state.next_handle += 1;
        let handle = ShaderHandle::new(state.next_handle);
        state.sources.insert(handle, source.to_string());
        state.counters.compiles += 1;
        debug!("Headless backend compiled shader {}", handle.raw());
        Ok(handle)
    }

    fn destroy(&self, handle: ShaderHandle) {
        let mut state = self.state.lock();
        if state.sources.remove(&handle).is_some() {
            state.bindings.retain(|_, bound| *bound != handle);
            state.counters.destroys += 1;
        } else {
            warn!("Destroy of unknown shader {}", handle.raw());
            state.counters.invalid_destroys += 1;
        }
    }

    fn bind(&self, slot: MaterialSlot, handle: Option<ShaderHandle>) {
        let mut state = self.state.lock();
        state.counters.binds += 1;
        match handle {
            Some(handle) => {
                state.bindings.insert(slot, handle);
            },
            None => {
                state.bindings.remove(&slot);
            },
        }
    }

    fn set_param(&self, slot: MaterialSlot, name: &str, value: &UniformValue) {
        let mut state = self.state.lock();
        state.counters.param_writes += 1;
        state.params.insert((slot, name.to_string()), *value);
    }
}
