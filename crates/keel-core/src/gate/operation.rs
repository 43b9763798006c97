//! Non-shell operation kinds and their fixed risk table.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::RiskLevel;

/// An operation classified by [`SecurityGate::classify_operation`].
///
/// [`SecurityGate::classify_operation`]: super::SecurityGate::classify_operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum OperationKind {
    DeleteFile,
    DeleteDir,
    WriteFile,
    MoveFile,
    CopyFile,
    ReadFile,
    CreateDirectory,
    RunCommand,
    ExecuteCode,
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "delete_file" => Ok(OperationKind::DeleteFile),
            "delete_dir" => Ok(OperationKind::DeleteDir),
            "write_file" => Ok(OperationKind::WriteFile),
            "move_file" => Ok(OperationKind::MoveFile),
            "copy_file" => Ok(OperationKind::CopyFile),
            "read_file" => Ok(OperationKind::ReadFile),
            "create_directory" => Ok(OperationKind::CreateDirectory),
            "run_command" => Ok(OperationKind::RunCommand),
            "execute_code" => Ok(OperationKind::ExecuteCode),
            _ => Err(format!("Unknown operation kind: {s}")),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::DeleteFile => "delete_file",
            OperationKind::DeleteDir => "delete_dir",
            OperationKind::WriteFile => "write_file",
            OperationKind::MoveFile => "move_file",
            OperationKind::CopyFile => "copy_file",
            OperationKind::ReadFile => "read_file",
            OperationKind::CreateDirectory => "create_directory",
            OperationKind::RunCommand => "run_command",
            OperationKind::ExecuteCode => "execute_code",
        }
    }

    /// Intrinsic level and rationale, before any path is considered.
    pub fn risk(&self) -> (RiskLevel, &'static str) {
        match self {
            OperationKind::DeleteFile => (RiskLevel::High, "Irreversible deletion"),
            OperationKind::DeleteDir => (RiskLevel::High, "Directory contents may be lost"),
            OperationKind::WriteFile => (RiskLevel::Medium, "May overwrite existing data"),
            OperationKind::MoveFile => (RiskLevel::Medium, "Changes file location"),
            OperationKind::CopyFile | OperationKind::ReadFile | OperationKind::CreateDirectory => {
                (RiskLevel::Low, "Safe operation")
            }
            OperationKind::RunCommand => (RiskLevel::Medium, "Has system access"),
            OperationKind::ExecuteCode => (RiskLevel::High, "Has full system access"),
        }
    }

    pub fn mitigations(&self) -> &'static [&'static str] {
        match self {
            OperationKind::DeleteFile => &["Back up first", "Move to trash instead", "Verify before deleting"],
            OperationKind::DeleteDir => &["Check the contents", "Move to trash instead", "Confirm the path"],
            OperationKind::WriteFile => &["Back up the file", "Verify the path", "Append instead of overwrite"],
            OperationKind::RunCommand => &["Review the command", "Trust the source", "Test it first"],
            OperationKind::ExecuteCode => &["Review the code", "Trust the source", "Run it in the sandbox"],
            _ => &["Verify the operation"],
        }
    }

    /// Warning shown when asking a human to confirm.
    pub fn warning(&self) -> &'static str {
        match self {
            OperationKind::DeleteFile => "⚠️ Permanent delete. Cannot be undone.",
            OperationKind::DeleteDir => "⚠️ The directory and all its contents will be deleted.",
            OperationKind::WriteFile => "⚠️ Existing file contents will be overwritten.",
            OperationKind::RunCommand => "⚠️ The command runs on your system.",
            OperationKind::ExecuteCode => "⚠️ Code has full system access. Only run trusted code.",
            _ => "⚠️ Please confirm.",
        }
    }
}
