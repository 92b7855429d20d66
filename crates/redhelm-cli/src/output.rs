//! Terminal output formatting.
//!
//! A reply is first turned into a flat list of [`Block`]s by [`layout`],
//! which decides what is shown and in which order. [`Renderer`] then draws
//! those blocks as rounded panels sized to the terminal.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use redhelm_core::StructuredReply;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::highlight::{self, TokenKind};

/// Narrowest layout we will attempt to draw.
const MIN_WIDTH: usize = 20;

/// A titled panel in the reply view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Content,
    Commands,
    ToolsUsed,
    Sources,
    Summary,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Commands => "Commands",
            Self::ToolsUsed => "Tools Used",
            Self::Sources => "Sources",
            Self::Summary => "Summary",
        }
    }

    /// Long-form prose panels get extra breathing room.
    fn padding(self) -> (usize, usize) {
        match self {
            Self::Content | Self::Summary => (1, 2),
            _ => (0, 1),
        }
    }

    fn accent(self, s: ColoredString) -> ColoredString {
        match self {
            Self::Content => s.cyan().bold(),
            Self::Commands => s.yellow().bold(),
            Self::ToolsUsed => s.magenta().bold(),
            Self::Sources => s.blue().bold(),
            Self::Summary => s.green().bold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelBody {
    /// Wrapped prose.
    Text(String),
    /// Shell code, highlighted and line-numbered.
    Code(String),
    /// Numbered table rows, starting at 1.
    Numbered(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Blank,
    Heading(String),
    Rule,
    Panel(Section, PanelBody),
}

/// Decide which parts of a reply are shown, in display order.
pub fn layout(reply: &StructuredReply) -> Vec<Block> {
    let mut blocks = vec![
        Block::Blank,
        Block::Heading(reply.display_title().to_string()),
        Block::Rule,
    ];

    if !reply.content.is_empty() {
        blocks.push(Block::Panel(
            Section::Content,
            PanelBody::Text(reply.content.clone()),
        ));
    }

    if reply.has_commands() {
        blocks.push(Block::Panel(
            Section::Commands,
            PanelBody::Code(reply.commands.clone()),
        ));
    }

    if let Some(tools) = reply.tools_line() {
        blocks.push(Block::Panel(Section::ToolsUsed, PanelBody::Text(tools)));
    }

    let sources = reply.source_list();
    if !sources.is_empty() {
        blocks.push(Block::Panel(Section::Sources, PanelBody::Numbered(sources)));
    }

    if !reply.summary.is_empty() {
        blocks.push(Block::Panel(
            Section::Summary,
            PanelBody::Text(reply.summary.clone()),
        ));
    }

    blocks.push(Block::Rule);
    blocks.push(Block::Blank);
    blocks
}

/// A rendered line inside a panel, with its visual width (ANSI codes excluded).
struct Row {
    text: String,
    width: usize,
}

impl Row {
    fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let width = UnicodeWidthStr::width(text.as_str());
        Self { text, width }
    }
}

/// Draws blocks to a writer at a fixed width.
pub struct Renderer {
    width: usize,
    color: bool,
}

impl Renderer {
    pub fn new(width: usize, color: bool) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
            color,
        }
    }

    /// Renderer sized to the current terminal.
    pub fn for_terminal(color: bool) -> Self {
        Self::new(term_width(), color)
    }

    pub fn render(&self, blocks: &[Block], out: &mut impl Write) -> io::Result<()> {
        for block in blocks {
            match block {
                Block::Blank => writeln!(out)?,
                Block::Heading(title) => self.render_heading(title, out)?,
                Block::Rule => self.render_rule(out)?,
                Block::Panel(section, body) => self.render_panel(*section, body, out)?,
            }
        }
        out.flush()
    }

    fn render_rule(&self, out: &mut impl Write) -> io::Result<()> {
        let rule = "─".repeat(self.width);
        writeln!(out, "{}", self.paint(&rule, |s| s.dimmed()))
    }

    fn render_heading(&self, title: &str, out: &mut impl Write) -> io::Result<()> {
        let title = clean_text(title);
        for line in textwrap::wrap(&title, self.width - 2) {
            let label = format!(" {} ", line);
            let visual = UnicodeWidthStr::width(label.as_str());
            let left = self.width.saturating_sub(visual) / 2;
            writeln!(
                out,
                "{}{}",
                " ".repeat(left),
                self.paint(&label, |s| s.white().bold().on_green())
            )?;
        }
        Ok(())
    }

    fn render_panel(
        &self,
        section: Section,
        body: &PanelBody,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let (vpad, hpad) = section.padding();
        let inner = self.width.saturating_sub(2 + 2 * hpad).max(1);

        let rows = match body {
            PanelBody::Text(text) => self.text_rows(text, inner),
            PanelBody::Code(code) => self.code_rows(code, inner),
            PanelBody::Numbered(items) => self.numbered_rows(items, inner),
        };

        // ── Top border with centered title ──
        let label = format!(" {} ", section.title());
        let span = self.width - 2;
        let label_width = UnicodeWidthStr::width(label.as_str()).min(span);
        let left = (span - label_width) / 2;
        let right = span - label_width - left;
        let title = if self.color {
            section.accent(label.normal()).to_string()
        } else {
            label
        };
        writeln!(
            out,
            "{}{}{}",
            self.paint(&format!("╭{}", "─".repeat(left)), |s| s.dimmed()),
            title,
            self.paint(&format!("{}╮", "─".repeat(right)), |s| s.dimmed()),
        )?;

        let blank = Row::plain("");
        for _ in 0..vpad {
            self.write_row(&blank, inner, hpad, out)?;
        }
        for row in &rows {
            self.write_row(row, inner, hpad, out)?;
        }
        for _ in 0..vpad {
            self.write_row(&blank, inner, hpad, out)?;
        }

        let bottom = format!("╰{}╯", "─".repeat(span));
        writeln!(out, "{}", self.paint(&bottom, |s| s.dimmed()))
    }

    fn write_row(
        &self,
        row: &Row,
        inner: usize,
        hpad: usize,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let border = self.paint("│", |s| s.dimmed());
        let fill = inner.saturating_sub(row.width);
        writeln!(
            out,
            "{border}{pad}{}{}{pad}{border}",
            row.text,
            " ".repeat(fill),
            pad = " ".repeat(hpad),
        )
    }

    fn text_rows(&self, text: &str, inner: usize) -> Vec<Row> {
        let text = clean_text(text);
        textwrap::wrap(&text, inner)
            .into_iter()
            .map(|line| Row::plain(line.into_owned()))
            .collect()
    }

    fn code_rows(&self, code: &str, inner: usize) -> Vec<Row> {
        let code = clean_text(code);
        let lines: Vec<&str> = code.lines().collect();
        let gutter = lines.len().to_string().len();
        let code_width = inner.saturating_sub(gutter + 1).max(1);

        let mut rows = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let tokens = highlight::tokenize(line);
            let segments = wrap_tokens(&tokens, code_width);
            for (segment, pieces) in segments.into_iter().enumerate() {
                let number = if segment == 0 {
                    format!("{:>gutter$}", i + 1)
                } else {
                    " ".repeat(gutter)
                };
                let width: usize = pieces
                    .iter()
                    .map(|(_, piece)| UnicodeWidthStr::width(piece.as_str()))
                    .sum();
                let body: String = pieces
                    .iter()
                    .map(|(kind, piece)| {
                        if self.color {
                            highlight::paint(*kind, piece).to_string()
                        } else {
                            piece.clone()
                        }
                    })
                    .collect();
                rows.push(Row {
                    text: format!("{} {}", self.paint(&number, |s| s.dimmed()), body),
                    width: gutter + 1 + width,
                });
            }
        }
        rows
    }

    fn numbered_rows(&self, items: &[String], inner: usize) -> Vec<Row> {
        let label_width = items.len().to_string().len() + 1;
        let text_width = inner.saturating_sub(label_width + 1).max(1);

        let mut rows = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let label = format!("{:>label_width$}", format!("{}.", i + 1));
            let item = clean_text(item);
            for (j, line) in textwrap::wrap(&item, text_width).into_iter().enumerate() {
                let prefix = if j == 0 {
                    self.paint(&label, |s| s.bold())
                } else {
                    " ".repeat(label_width)
                };
                let width = label_width + 1 + UnicodeWidthStr::width(line.as_ref());
                rows.push(Row {
                    text: format!("{} {}", prefix, line),
                    width,
                });
            }
        }
        rows
    }

    fn paint(&self, text: &str, style: fn(ColoredString) -> ColoredString) -> String {
        if self.color {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Normalize model text for a panel: every line break becomes `\n`, tabs
/// expand to four spaces and other control characters are dropped, so
/// nothing can move the cursor inside a bordered row.
fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => cleaned.push('\n'),
            '\t' => cleaned.push_str("    "),
            c if c.is_control() => {}
            c => cleaned.push(c),
        }
    }
    cleaned
}

/// Hard-wrap a token stream into rows of at most `max` columns, keeping
/// each character's token kind.
fn wrap_tokens(tokens: &[highlight::Token<'_>], max: usize) -> Vec<Vec<(TokenKind, String)>> {
    let mut rows = Vec::new();
    let mut current: Vec<(TokenKind, String)> = Vec::new();
    let mut used = 0;

    for token in tokens {
        let mut piece = String::new();
        for ch in token.text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > max && used > 0 {
                if !piece.is_empty() {
                    current.push((token.kind, std::mem::take(&mut piece)));
                }
                rows.push(std::mem::take(&mut current));
                used = 0;
            }
            piece.push(ch);
            used += w;
        }
        if !piece.is_empty() {
            current.push((token.kind, piece));
        }
    }

    rows.push(current);
    rows
}

/// Get terminal width, defaulting to 80.
fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}
