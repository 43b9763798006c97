//! Languages the sandbox can run snippets in.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A snippet language with its scratch-file and interpreter conventions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Shell,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "shell" | "sh" | "bash" => Ok(Language::Shell),
            _ => Err(format!("Unsupported language: {s}")),
        }
    }
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Shell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Shell => "shell",
        }
    }

    /// Extensions recognised for this language; the first one is used for
    /// scratch files.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyw"],
            Language::JavaScript => &["js", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Shell => &["sh", "bash"],
        }
    }

    pub fn extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Header line prepended to scripts that do not start with one.
    pub fn shebang(&self) -> Option<&'static str> {
        match self {
            Language::Python => Some("#!/usr/bin/env python3"),
            Language::JavaScript => Some("#!/usr/bin/env node"),
            Language::TypeScript => None,
            Language::Shell => Some("#!/bin/bash"),
        }
    }

    /// Program that runs a scratch file of this language.
    ///
    /// TypeScript is compiled first and the output runs under `node`.
    pub fn interpreter(&self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::JavaScript | Language::TypeScript => "node",
            Language::Shell => "bash",
        }
    }

    /// Guess the language of `source`.
    ///
    /// A recognised file extension wins, then a shebang, then a few keyword
    /// heuristics. Anything undecided is treated as JavaScript.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keel_core::models::Language;
    ///
    /// assert_eq!(Language::detect("print(1)", Some("hello.py")), Language::Python);
    /// assert_eq!(Language::detect("#!/bin/bash\necho hi", None), Language::Shell);
    /// assert_eq!(Language::detect("def main():\n    pass", None), Language::Python);
    /// ```
    pub fn detect(source: &str, file_name: Option<&str>) -> Language {
        if let Some(ext) = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            let ext = ext.to_lowercase();
            if let Some(lang) = Self::ALL
                .into_iter()
                .find(|lang| lang.extensions().contains(&ext.as_str()))
            {
                return lang;
            }
        }

        let first_line = source.lines().next().unwrap_or_default().trim();
        if first_line.starts_with("#!") {
            if first_line.contains("python") {
                return Language::Python;
            }
            if first_line.contains("node") {
                return Language::JavaScript;
            }
            if first_line.contains("bash") || first_line.ends_with("/sh") {
                return Language::Shell;
            }
        }

        if source.contains("def ") || source.contains("import sys") {
            Language::Python
        } else if source.contains("interface ") || source.contains(": string") {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }
}
