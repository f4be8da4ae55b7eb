//! WGSL programs of the fullscreen stages
//!
//! Each texture stage computes its blend on the CPU through the reference
//! backend and also carries the equivalent WGSL program for a GPU host.
//! Tunables are prepended as `const` declarations.

use crate::{Error, Result};

const FULLSCREEN: &str = include_str!("../../shaders/fullscreen.wgsl");

pub const OBFUSCATION: &str = include_str!("../../shaders/obfuscation.wgsl");
pub const FINAL_BLOOM: &str = include_str!("../../shaders/final_bloom.wgsl");
pub const HIGH_PASS: &str = include_str!("../../shaders/high_pass.wgsl");
pub const FXAA: &str = include_str!("../../shaders/fxaa.wgsl");

/// Shader constant value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderDefine {
    Bool(bool),
    U32(u32),
    F32(f32),
}

/// A complete fullscreen program: shared vertex stage, defines, fragment body
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    label: String,
    source: String,
}

impl ShaderProgram {
    pub fn new(label: impl Into<String>, fragment: &str, defines: &[(&str, ShaderDefine)]) -> Self {
        let mut source = String::new();

        for (name, value) in defines {
            match value {
                ShaderDefine::Bool(b) => {
                    source.push_str(&format!("const {}: bool = {};\n", name, b));
                }
                ShaderDefine::U32(u) => {
                    source.push_str(&format!("const {}: u32 = {}u;\n", name, u));
                }
                ShaderDefine::F32(f) => {
                    let f = if f.is_finite() { *f } else { 0.0 };
                    source.push_str(&format!("const {}: f32 = {:?};\n", name, f));
                }
            }
        }

        source.push_str(FULLSCREEN);
        source.push_str(fragment);

        Self {
            label: label.into(),
            source,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse and validate the program
    pub fn validate(&self) -> Result<naga::Module> {
        let module = naga::front::wgsl::parse_str(&self.source).map_err(|e| {
            Error::Shader(format!("{}: {}", self.label, e.emit_to_string(&self.source)))
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| Error::Shader(format!("{}: {:?}", self.label, e)))?;

        Ok(module)
    }
}
