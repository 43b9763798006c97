//! Terminal rendering for the Markdown produced by keel-core's display layer
//!
//! Rich mode styles headers and inline Markdown with termimad. Fenced code
//! blocks carry captured process output, so their lines are written as they
//! are instead of being parsed as Markdown.

use std::io::{self, Write};

use anyhow::Result;
use termimad::{crossterm::style::Color, MadSkin};

const HEADER_STYLE: &str = "\x1b[34m";
const FENCE_STYLE: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Terminal renderer that can switch between rich and plain text output
pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();

        skin.set_headers_fg(Color::Blue);
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::Magenta);
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    /// Render markdown text to stdout
    pub fn render(&self, markdown: &str) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(&mut out, markdown)?;
        out.flush()?;
        Ok(())
    }

    fn render_to(&self, out: &mut impl Write, markdown: &str) -> io::Result<()> {
        if !self.rich_enabled {
            return write!(out, "{markdown}");
        }

        let mut in_fence = false;
        for line in markdown.lines() {
            if line.starts_with("```") {
                in_fence = !in_fence;
                writeln!(out, "{FENCE_STYLE}{line}{RESET}")?;
            } else if in_fence {
                writeln!(out, "{line}")?;
            } else if line.starts_with('#') {
                writeln!(out, "{HEADER_STYLE}{line}{RESET}")?;
            } else {
                writeln!(out, "{}", self.skin.inline(line))?;
            }
        }
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(renderer: &TerminalRenderer, markdown: &str) -> String {
        let mut out = Vec::new();
        renderer.render_to(&mut out, markdown).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_renderer_passes_markdown_through() {
        let renderer = TerminalRenderer::new(false);
        let markdown = "# Plan\n\n- Status: **done**\n";
        assert_eq!(render(&renderer, markdown), markdown);
    }

    #[test]
    fn test_rich_renderer_colors_headers() {
        let renderer = TerminalRenderer::new(true);
        let output = render(&renderer, "# Plan\n## Steps");
        assert!(output.starts_with("\x1b[34m# Plan\x1b[0m\n"));
        assert!(output.contains("\x1b[34m## Steps\x1b[0m\n"));
    }

    #[test]
    fn test_rich_renderer_keeps_fenced_output_verbatim() {
        let renderer = TerminalRenderer::new(true);
        let output = render(&renderer, "```\n# not a header *or* emphasis\n```");
        assert!(output.contains("\n# not a header *or* emphasis\n"));
    }

    #[test]
    fn test_default_is_rich() {
        let renderer = TerminalRenderer::default();
        assert!(renderer.rich_enabled);
    }
}
