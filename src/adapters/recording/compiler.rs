//! Recording adapter for the `Compiler` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{Compiler, EmitOutput, EmitRequest};

/// Records compiler runs while delegating to an inner implementation.
pub struct RecordingCompiler {
    inner: Box<dyn Compiler>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingCompiler {
    /// Creates a new recording compiler wrapping the given implementation.
    pub fn new(inner: Box<dyn Compiler>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl Compiler for RecordingCompiler {
    fn emit(
        &self,
        request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.emit(request);
        record_result(&self.recorder, "compiler", "emit", request, &result);
        result
    }
}
