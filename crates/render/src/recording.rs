use glam::Vec4;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

use crate::backend::{
    GraphicsBackend, ProgramId, ShaderStage, StageId, UniformLocation, UniformValue,
};

/// One call made against the [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    CreateProgram(ProgramId),
    CreateStage(StageId, ShaderStage),
    CompileStage(StageId),
    AttachStage(ProgramId, StageId),
    DetachStage(ProgramId, StageId),
    BindAttribute { program: ProgramId, index: u32, name: String },
    Link(ProgramId),
    Validate(ProgramId),
    UseProgram(ProgramId),
    SetUniform { program: ProgramId, location: UniformLocation, value: UniformValue },
    DeleteStage(StageId),
    DeleteProgram(ProgramId),
    DepthTest(bool),
    CullFace(bool),
    ClearColor(Vec4),
    Clear,
}

/// Misuse the recording backend observed instead of crashing on.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxFault {
    DoubleDeleteStage(StageId),
    DoubleDeleteProgram(ProgramId),
    UnknownProgram(ProgramId),
    UniformWithoutProgram(UniformLocation),
}

/// Headless backend: hands out handles, records every call, tracks what is
/// alive and reports misuse as [`GfxFault`]s.
///
/// Stage compilation fails when the stage source contains the failure marker
/// (`#error` by default, as a GLSL compiler would).
#[derive(Debug)]
pub struct RecordingBackend {
    next_handle: u32,
    programs: BTreeSet<ProgramId>,
    stages: BTreeMap<StageId, ShaderStage>,
    sources: HashMap<StageId, String>,
    attached: BTreeSet<(ProgramId, StageId)>,
    locations: HashMap<(ProgramId, String), UniformLocation>,
    values: HashMap<(ProgramId, UniformLocation), UniformValue>,
    current: Option<ProgramId>,
    depth_test: bool,
    cull_face: bool,
    clear_color: Vec4,
    compile_failure_marker: String,
    fail_link: bool,
    calls: Vec<GfxCall>,
    faults: Vec<GfxFault>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            next_handle: 0,
            programs: BTreeSet::new(),
            stages: BTreeMap::new(),
            sources: HashMap::new(),
            attached: BTreeSet::new(),
            locations: HashMap::new(),
            values: HashMap::new(),
            current: None,
            depth_test: false,
            cull_face: false,
            clear_color: Vec4::ZERO,
            compile_failure_marker: "#error".into(),
            fail_link: false,
            calls: Vec::new(),
            faults: Vec::new(),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent link fail.
    pub fn failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn calls(&self) -> &[GfxCall] {
        &self.calls
    }

    pub fn drain_calls(&mut self) -> Vec<GfxCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn faults(&self) -> &[GfxFault] {
        &self.faults
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn cull_face(&self) -> bool {
        self.cull_face
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Last value written to the uniform called `name` in `program`.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let location = self.locations.get(&(program, name.to_string()))?;
        self.values.get(&(program, *location)).copied()
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Human-readable dump of the recorded calls, one per line.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Backend (programs={}, stages={}, faults={}) ===",
            self.programs.len(),
            self.stages.len(),
            self.faults.len()
        );
        for call in &self.calls {
            let line = match call {
                GfxCall::SetUniform { program, location, value } => {
                    format!("  uniform p{}@{} = {:?}", program.0, location.0, value)
                }
                GfxCall::ClearColor(c) => {
                    format!("  clear_color ({:.3}, {:.3}, {:.3}, {:.1})", c.x, c.y, c.z, c.w)
                }
                other => format!("  {other:?}"),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.handle());
        self.programs.insert(id);
        self.calls.push(GfxCall::CreateProgram(id));
        id
    }

    fn create_stage(&mut self, stage: ShaderStage) -> StageId {
        let id = StageId(self.handle());
        self.stages.insert(id, stage);
        self.calls.push(GfxCall::CreateStage(id, stage));
        id
    }

    fn stage_source(&mut self, stage: StageId, source: &str) {
        self.sources.insert(stage, source.to_string());
    }

    fn compile_stage(&mut self, stage: StageId) -> Result<(), String> {
        self.calls.push(GfxCall::CompileStage(stage));
        match self.sources.get(&stage) {
            None => Err(format!("stage {} has no source", stage.0)),
            Some(src) if src.trim().is_empty() => Err(format!("stage {} source is empty", stage.0)),
            Some(src) if src.contains(&self.compile_failure_marker) => Err(format!(
                "0:1: error: {} directive encountered",
                self.compile_failure_marker
            )),
            Some(_) => Ok(()),
        }
    }

    fn attach_stage(&mut self, program: ProgramId, stage: StageId) {
        self.attached.insert((program, stage));
        self.calls.push(GfxCall::AttachStage(program, stage));
    }

    fn detach_stage(&mut self, program: ProgramId, stage: StageId) {
        self.attached.remove(&(program, stage));
        self.calls.push(GfxCall::DetachStage(program, stage));
    }

    fn bind_attribute_location(&mut self, program: ProgramId, index: u32, name: &str) {
        self.calls.push(GfxCall::BindAttribute {
            program,
            index,
            name: name.to_string(),
        });
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        self.calls.push(GfxCall::Link(program));
        if self.fail_link {
            return Err("error: linking with uncompiled/unspecialized shader".into());
        }
        let stages = self.attached.iter().filter(|(p, _)| *p == program).count();
        if stages < 2 {
            return Err(format!("program {} has {stages} attached stages", program.0));
        }
        Ok(())
    }

    fn validate_program(&mut self, program: ProgramId) -> Result<(), String> {
        self.calls.push(GfxCall::Validate(program));
        if self.programs.contains(&program) {
            Ok(())
        } else {
            Err(format!("program {} does not exist", program.0))
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation {
        let next = self
            .locations
            .keys()
            .filter(|(p, _)| *p == program)
            .count() as i32;
        *self
            .locations
            .entry((program, name.to_string()))
            .or_insert(UniformLocation(next))
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains(&program) {
            self.faults.push(GfxFault::UnknownProgram(program));
        }
        self.current = Some(program);
        self.calls.push(GfxCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current else {
            self.faults.push(GfxFault::UniformWithoutProgram(location));
            return;
        };
        self.values.insert((program, location), value);
        self.calls.push(GfxCall::SetUniform {
            program,
            location,
            value,
        });
    }

    fn delete_stage(&mut self, stage: StageId) {
        if self.stages.remove(&stage).is_none() {
            self.faults.push(GfxFault::DoubleDeleteStage(stage));
        }
        self.sources.remove(&stage);
        self.calls.push(GfxCall::DeleteStage(stage));
    }

    fn delete_program(&mut self, program: ProgramId) {
        if !self.programs.remove(&program) {
            self.faults.push(GfxFault::DoubleDeleteProgram(program));
        }
        if self.current == Some(program) {
            self.current = None;
        }
        self.calls.push(GfxCall::DeleteProgram(program));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.calls.push(GfxCall::DepthTest(enabled));
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.cull_face = enabled;
        self.calls.push(GfxCall::CullFace(enabled));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
        self.calls.push(GfxCall::ClearColor(color));
    }

    fn clear(&mut self) {
        self.calls.push(GfxCall::Clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_tracked_until_deleted() {
        let mut gl = RecordingBackend::new();
        let program = gl.create_program();
        let stage = gl.create_stage(ShaderStage::Vertex);
        assert_eq!(gl.live_programs(), 1);
        assert_eq!(gl.live_stages(), 1);

        gl.delete_stage(stage);
        gl.delete_program(program);
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_stages(), 0);
        assert!(gl.faults().is_empty());
    }

    #[test]
    fn double_delete_is_reported() {
        let mut gl = RecordingBackend::new();
        let program = gl.create_program();
        gl.delete_program(program);
        gl.delete_program(program);
        assert_eq!(gl.faults(), &[GfxFault::DoubleDeleteProgram(program)]);
    }

    #[test]
    fn compile_fails_on_marker() {
        let mut gl = RecordingBackend::new();
        let good = gl.create_stage(ShaderStage::Vertex);
        let bad = gl.create_stage(ShaderStage::Fragment);
        gl.stage_source(good, "void main() {}");
        gl.stage_source(bad, "#error broken\nvoid main() {}");
        assert!(gl.compile_stage(good).is_ok());
        assert!(gl.compile_stage(bad).unwrap_err().contains("#error"));
    }

    #[test]
    fn uniform_writes_land_in_current_program() {
        let mut gl = RecordingBackend::new();
        let program = gl.create_program();
        let loc = gl.uniform_location(program, "maxDistance");
        assert_eq!(gl.uniform_location(program, "maxDistance"), loc);

        gl.set_uniform(loc, UniformValue::Float(1.0));
        assert_eq!(gl.faults(), &[GfxFault::UniformWithoutProgram(loc)]);

        gl.use_program(program);
        gl.set_uniform(loc, UniformValue::Float(50.0));
        assert_eq!(
            gl.uniform_value(program, "maxDistance"),
            Some(UniformValue::Float(50.0))
        );
    }

    #[test]
    fn transcript_lists_calls() {
        let mut gl = RecordingBackend::new();
        gl.set_depth_test(true);
        gl.clear();
        let text = gl.transcript();
        assert!(text.contains("programs=0"));
        assert!(text.contains("DepthTest(true)"));
        assert!(text.contains("Clear"));
    }
}
