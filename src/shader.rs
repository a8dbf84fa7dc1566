//! GLSL shader sources, read from disk and compiled to SPIR-V at startup.

use crate::error::Error;
use crate::settings::ShaderSettings;
use gfx_hal::pso;
use log::{debug, error, info};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn shader_type(self) -> glsl_to_spirv::ShaderType {
        match self {
            ShaderStage::Vertex => glsl_to_spirv::ShaderType::Vertex,
            ShaderStage::Fragment => glsl_to_spirv::ShaderType::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compiled SPIR-V for the two programmable stages of the triangle pipeline.
pub struct ShaderSet {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

/// Reads a shader source file, terminating every line with `\n`.
pub fn load_source(path: &Path) -> Result<String, Error> {
    let read_error = |source| Error::ShaderRead {
        path: path.to_owned(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(read_error)?);
    let mut source = String::new();
    for line in reader.lines() {
        let line = line.map_err(read_error)?;
        source.push_str(line.trim_end_matches('\r'));
        source.push('\n');
    }
    Ok(source)
}

/// Compiles one stage. Failures are logged and yield `None`.
pub fn compile(stage: ShaderStage, path: &Path, source: &str) -> Option<Vec<u32>> {
    let result = glsl_to_spirv::compile(source, stage.shader_type()).and_then(|mut file| {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|err| err.to_string())?;
        pso::read_spirv(Cursor::new(&bytes[..])).map_err(|err| err.to_string())
    });

    match result {
        Ok(words) => {
            debug!(
                "compiled {} shader {} ({} words)",
                stage,
                path.display(),
                words.len()
            );
            Some(words)
        }
        Err(err) => {
            error!(
                "not able to compile {} shader {}: {}",
                stage,
                path.display(),
                err.trim_end()
            );
            debug!("with source:\n{}", source);
            None
        }
    }
}

/// Reads both stages, then compiles them.
///
/// A missing or unreadable file is fatal. A compile failure only leaves the
/// program without shaders: frames are still cleared, nothing is drawn.
pub fn load_program(settings: &ShaderSettings) -> Result<Option<ShaderSet>, Error> {
    let vertex_source = load_source(&settings.vertex)?;
    let fragment_source = load_source(&settings.fragment)?;

    let vertex = compile(ShaderStage::Vertex, &settings.vertex, &vertex_source);
    let fragment = compile(ShaderStage::Fragment, &settings.fragment, &fragment_source);

    match (vertex, fragment) {
        (Some(vertex), Some(fragment)) => {
            info!(
                "loaded shaders {} and {}",
                settings.vertex.display(),
                settings.fragment.display()
            );
            Ok(Some(ShaderSet { vertex, fragment }))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("intro-to-shaders-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn shipped() -> ShaderSettings {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        ShaderSettings {
            vertex: root.join("shaders/triangle.vert"),
            fragment: root.join("shaders/triangle.frag"),
        }
    }

    #[test]
    fn source_lines_end_with_newline() {
        let path = scratch_file("crlf.vert", "#version 450\r\nvoid main() {}");
        let source = load_source(&path).unwrap();
        assert_eq!(source, "#version 450\nvoid main() {}\n");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_source(Path::new("shaders/does-not-exist.vert")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(err, Error::ShaderRead { .. }));
    }

    #[test]
    fn shipped_shaders_compile() {
        let program = load_program(&shipped()).unwrap().expect("shaders should compile");
        assert_eq!(program.vertex[0], SPIRV_MAGIC);
        assert_eq!(program.fragment[0], SPIRV_MAGIC);
    }

    #[test]
    fn compile_failure_is_not_fatal() {
        let path = scratch_file("broken.frag", "#version 450\nvoid main() { nope }\n");
        let mut settings = shipped();
        settings.fragment = path;
        assert!(load_program(&settings).unwrap().is_none());
    }

    #[test]
    fn unreadable_fragment_fails_even_if_vertex_is_fine() {
        let mut settings = shipped();
        settings.fragment = PathBuf::from("shaders/does-not-exist.frag");
        let err = load_program(&settings).err().expect("read must fail");
        assert_eq!(err.exit_code(), 2);
    }
}
