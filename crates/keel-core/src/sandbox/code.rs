//! Scratch files for code snippets.

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    error::{KeelError, Result},
    models::Language,
};

/// How to run a prepared script: program, arguments and a printable form.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub display: String,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let program = program.into();
        let display = std::iter::once(program.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            display,
        }
    }

    /// Replace the printable form, e.g. with the unsanitized command line.
    pub fn displayed_as(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }
}

/// A snippet written to the scratch directory.
///
/// The file, and any compiler output next to it, is removed when the value
/// is dropped, whatever happened in between.
#[derive(Debug)]
pub(crate) struct ScratchScript {
    language: Language,
    path: PathBuf,
    dir: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl ScratchScript {
    /// Write `source` to `scr_<id>.<ext>` in `dir`, prefixed with the
    /// language's shebang when it has none, and mark it executable.
    pub async fn write(dir: &Path, language: Language, source: &str) -> Result<Self> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!("scr_{}.{}", &id[..8], language.extension());
        let path = dir.join(file_name);

        let contents = match language.shebang() {
            Some(shebang) if !source.starts_with("#!") => format!("{shebang}\n{source}"),
            _ => source.to_string(),
        };

        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| KeelError::file_system(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| KeelError::file_system(&path, e))?;
        }

        debug!("Wrote {} scratch file {}", language.as_str(), path.display());
        Ok(Self {
            language,
            path,
            dir: dir.to_path_buf(),
            artifacts: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The compile step that has to succeed before [`Self::run`], if any.
    pub fn compile(&mut self) -> Option<Invocation> {
        if self.language != Language::TypeScript {
            return None;
        }

        let output = self.path.with_extension("js");
        self.artifacts.push(output);
        Some(Invocation::new(
            "npx",
            vec![
                "tsc".to_string(),
                self.path.display().to_string(),
                "--outDir".to_string(),
                self.dir.display().to_string(),
                "--module".to_string(),
                "commonjs".to_string(),
                "--target".to_string(),
                "ES2020".to_string(),
            ],
        ))
    }

    /// The interpreter invocation for the script (or its compiled output).
    pub fn run(&self) -> Invocation {
        let target = match self.language {
            Language::TypeScript => self.path.with_extension("js"),
            _ => self.path.clone(),
        };
        Invocation::new(
            self.language.interpreter(),
            vec![target.display().to_string()],
        )
    }
}

impl Drop for ScratchScript {
    fn drop(&mut self) {
        for path in std::iter::once(&self.path).chain(&self.artifacts) {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove scratch file {}: {e}", path.display()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_script_gets_shebang_and_is_removed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let script = ScratchScript::write(temp_dir.path(), Language::Python, "print('hi')")
            .await
            .expect("Failed to write script");

        let path = script.path().to_path_buf();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("scr_"));
        assert!(name.ends_with(".py"));

        let contents = std::fs::read_to_string(&path).expect("Failed to read script");
        assert_eq!(contents, "#!/usr/bin/env python3\nprint('hi')");

        let run = script.run();
        assert_eq!(run.program, PathBuf::from("python3"));

        drop(script);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_existing_shebang_is_kept() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let script = ScratchScript::write(temp_dir.path(), Language::Shell, "#!/bin/sh\necho hi")
            .await
            .expect("Failed to write script");
        let contents = std::fs::read_to_string(script.path()).expect("Failed to read script");
        assert_eq!(contents, "#!/bin/sh\necho hi");
    }

    #[tokio::test]
    async fn test_typescript_compiles_before_running() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut script = ScratchScript::write(temp_dir.path(), Language::TypeScript, "let x: number = 1;")
            .await
            .expect("Failed to write script");

        let compile = script.compile().expect("TypeScript needs a compile step");
        assert_eq!(compile.program, PathBuf::from("npx"));
        assert_eq!(compile.args[0], "tsc");

        let run = script.run();
        assert_eq!(run.program, PathBuf::from("node"));
        assert!(run.args[0].ends_with(".js"));
    }
}
