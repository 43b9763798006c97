//! Command handlers for the keel CLI
//!
//! Each handler converts its clap arguments into core parameters, calls the
//! planner and hands the resulting display type to the terminal renderer.

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{bail, Context, Result};
use keel_core::{
    params::{
        BuildPlan, ClassifyCommand, ClassifyOperation, Id, InstallPackages, RunCode, RunSandboxed,
    },
    ExecutionResult, Language, Planner,
};
use log::debug;
use serde_json::{Map, Value};

use crate::{
    args::{CheckArgs, CheckOpArgs, CodeArgs, ExecArgs, InstallArgs, PlanArgs, PlanCommands},
    renderer::TerminalRenderer,
};

/// Binds a planner to a renderer for one CLI invocation.
pub struct Cli {
    planner: Planner,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(planner: Planner, renderer: TerminalRenderer) -> Self {
        Self { planner, renderer }
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Show(args) => self.show_plan(args),
            PlanCommands::Run(args) => self.run_plan(args).await,
        }
    }

    fn show_plan(&self, args: PlanArgs) -> Result<()> {
        let created = self
            .planner
            .build_plan_result(&build_params(args)?)
            .context("Failed to build plan")?;
        self.renderer.render(&created.resource.to_string())
    }

    async fn run_plan(&self, args: PlanArgs) -> Result<()> {
        let created = self
            .planner
            .build_plan_result(&build_params(args)?)
            .context("Failed to build plan")?;
        let id = Id {
            id: created.resource.id.clone(),
        };

        let report = self
            .planner
            .run_plan_report(&id)
            .await
            .context("Failed to run plan")?;
        self.renderer.render(&report.to_string())?;

        if !report.0.ok {
            bail!("Plan '{}' failed", report.0.plan.title);
        }
        Ok(())
    }

    pub fn check(&self, args: CheckArgs) -> Result<()> {
        let verdict = self.planner.classify_command(&ClassifyCommand::from(args));
        self.renderer.render(&format!("{verdict}\n"))
    }

    pub fn check_operation(&self, args: CheckOpArgs) -> Result<()> {
        let verdict = self
            .planner
            .classify_operation(&ClassifyOperation::from(args));
        self.renderer.render(&format!("{verdict}\n"))
    }

    pub fn list_whitelist(&self) -> Result<()> {
        let whitelist = self.planner.list_whitelist();
        self.renderer.render(&whitelist.to_string())
    }

    pub fn list_danger_patterns(&self) -> Result<()> {
        let patterns = self.planner.list_danger_patterns();
        self.renderer.render(&patterns.to_string())
    }

    pub fn security_report(&self) -> Result<()> {
        let report = self.planner.security_report();
        self.renderer.render(&report.to_string())
    }

    pub async fn exec(&self, args: ExecArgs) -> Result<()> {
        let params = RunSandboxed {
            command: args.command,
            args: args.args,
            work_dir: args.cwd,
            timeout_ms: args.timeout_ms,
            env: args.env.into_iter().collect(),
        };
        let result = self.planner.run_sandboxed(&params).await;
        self.finish_execution(result)
    }

    pub async fn code(&self, args: CodeArgs) -> Result<()> {
        let source = read_input(&args.file)?;
        let language = match args.language {
            Some(language) => language,
            None => {
                let file_name = (args.file != "-").then_some(args.file.as_str());
                let language = Language::detect(&source, file_name);
                debug!("Detected {language} snippet");
                language
            }
        };

        let params = RunCode {
            language,
            source,
            work_dir: args.cwd,
            timeout_ms: args.timeout_ms,
            env: args.env.into_iter().collect(),
        };
        let result = self.planner.run_code(&params).await;
        self.finish_execution(result)
    }

    pub async fn install(&self, args: InstallArgs) -> Result<()> {
        let params = InstallPackages::from(args);
        let result = self
            .planner
            .install_packages(&params)
            .await
            .context("Failed to install packages")?;
        self.finish_execution(result)
    }

    fn finish_execution(&self, result: ExecutionResult) -> Result<()> {
        self.renderer.render(&result.to_string())?;
        if !result.ok {
            bail!(
                "{}",
                result.error.as_deref().unwrap_or("Execution did not succeed")
            );
        }
        Ok(())
    }
}

/// Turn plan arguments into core parameters, reading the spec from a file,
/// stdin, or the argument itself.
fn build_params(args: PlanArgs) -> Result<BuildPlan> {
    let spec: Value = if args.spec == "-" || Path::new(&args.spec).is_file() {
        let text = read_input(&args.spec)?;
        serde_json::from_str(&text)
            .with_context(|| format!("Plan spec '{}' is not valid JSON", args.spec))?
    } else {
        // Inline JSON, or a bare command line
        serde_json::from_str(&args.spec).unwrap_or(Value::String(args.spec))
    };

    let context: Map<String, Value> = args.context.into_iter().collect();
    Ok(BuildPlan {
        spec,
        context,
        title: args.title,
    })
}

/// Read a file, or stdin for `-`.
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(source).with_context(|| format!("Failed to read '{source}'"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn plan_args(spec: &str) -> PlanArgs {
        PlanArgs {
            spec: spec.to_string(),
            title: None,
            context: vec![("work_dir".to_string(), json!("/srv"))],
        }
    }

    #[test]
    fn test_inline_json_spec() {
        let params = build_params(plan_args(r#"["ls", "pwd"]"#)).unwrap();
        assert_eq!(params.spec, json!(["ls", "pwd"]));
        assert_eq!(params.context["work_dir"], json!("/srv"));
    }

    #[test]
    fn test_bare_command_spec() {
        let params = build_params(plan_args("cargo test --workspace")).unwrap();
        assert_eq!(params.spec, json!("cargo test --workspace"));
    }

    #[test]
    fn test_spec_file_must_be_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"steps": ["echo hi"]}}"#).unwrap();
        let path = file.path().display().to_string();
        let params = build_params(plan_args(&path)).unwrap();
        assert_eq!(params.spec, json!({"steps": ["echo hi"]}));

        let mut broken = NamedTempFile::new().unwrap();
        write!(broken, "echo hi").unwrap();
        let path = broken.path().display().to_string();
        assert!(build_params(plan_args(&path)).is_err());
    }
}
