//! Observation display: tool-call sections, parameter tables, highlighted JSON and
//! truncated previews for the operator.
//!
//! Everything here is display only. The text handed back to the reasoning engine is
//! produced elsewhere and is never shortened by the preview policy.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::{IsTerminal, Write};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use tracing::warn;

const RULE_WIDTH: usize = 72;

/// Tool-call display settings, passed explicitly to every formatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show tool-call sections and the final-answer panel
    #[serde(default = "default_true")]
    pub show_tool_calls: bool,

    /// Force color on or off; unset means "when stdout is a terminal and NO_COLOR is unset"
    #[serde(default)]
    pub color: Option<bool>,

    /// Lines of plain output shown before truncating
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
}

fn default_true() -> bool {
    true
}

fn default_preview_lines() -> usize {
    20
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_tool_calls: default_true(),
            color: None,
            preview_lines: default_preview_lines(),
        }
    }
}

impl DisplayConfig {
    pub fn use_color(&self) -> bool {
        self.color.unwrap_or_else(|| {
            std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        })
    }
}

/// Label for one row of the parameter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKey {
    Positional(usize),
    Named(String),
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Positional(index) => write!(f, "arg{}", index),
            ParamKey::Named(name) => f.write_str(name),
        }
    }
}

/// How a result string will be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedOutput {
    Json(Value),
    Plain { preview: String, omitted: usize },
}

/// Decide between JSON and plain rendering for `result`.
///
/// JSON is attempted only when the trimmed text starts with `{` and ends with `}`;
/// anything that fails to parse falls back to the plain preview.
pub fn classify_output(result: &str, preview_lines: usize) -> RenderedOutput {
    let trimmed = result.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return RenderedOutput::Json(value);
        }
    }
    let (preview, omitted) = preview(result, preview_lines);
    RenderedOutput::Plain { preview, omitted }
}

/// First `limit` newline-separated lines of `text` and the count of lines left out.
pub fn preview(text: &str, limit: usize) -> (String, usize) {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= limit {
        return (text.to_string(), 0);
    }
    (lines[..limit].join("\n"), lines.len() - limit)
}

/// Two-space indented JSON.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

const JSON_THEME: &str = "base16-ocean.dark";

struct JsonHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

static JSON_HIGHLIGHTER: OnceLock<Option<JsonHighlighter>> = OnceLock::new();

fn json_highlighter() -> Option<&'static JsonHighlighter> {
    JSON_HIGHLIGHTER
        .get_or_init(|| {
            let theme = ThemeSet::load_defaults().themes.remove(JSON_THEME);
            if theme.is_none() {
                warn!(theme = JSON_THEME, "Highlight theme missing, JSON shown uncolored");
            }
            theme.map(|theme| JsonHighlighter {
                syntaxes: SyntaxSet::load_defaults_nonewlines(),
                theme,
            })
        })
        .as_ref()
}

/// [`pretty_json`] with 24-bit terminal colors. Every line ends with a reset so the
/// text can be split per line; stripping the escapes gives back the pretty text.
pub fn highlight_json(value: &Value) -> String {
    let text = pretty_json(value);
    let Some(highlighter) = json_highlighter() else {
        return text;
    };
    let Some(syntax) = highlighter.syntaxes.find_syntax_by_extension("json") else {
        return text;
    };

    let mut lines = HighlightLines::new(syntax, &highlighter.theme);
    let mut out = Vec::new();
    for line in text.lines() {
        match lines.highlight_line(line, &highlighter.syntaxes) {
            Ok(ranges) => {
                out.push(format!("{}\x1b[0m", as_24_bit_terminal_escaped(&ranges, false)))
            }
            Err(e) => {
                warn!("JSON highlighting failed: {}", e);
                return text;
            }
        }
    }
    out.join("\n")
}

/// Writes tool-call observations and session output to an operator-facing stream.
pub struct ObservationFormatter<W: Write> {
    out: Mutex<W>,
    config: DisplayConfig,
    color: bool,
}

/// Formatter bound to the process stdout.
pub type TerminalFormatter = ObservationFormatter<std::io::Stdout>;

impl TerminalFormatter {
    pub fn stdout(config: DisplayConfig) -> Self {
        Self::new(std::io::stdout(), config)
    }
}

impl ObservationFormatter<Vec<u8>> {
    /// Everything written so far, for in-memory formatters.
    pub fn captured(&self) -> String {
        String::from_utf8_lossy(&self.out.lock()).into_owned()
    }
}

impl<W: Write> ObservationFormatter<W> {
    pub fn new(out: W, config: DisplayConfig) -> Self {
        let color = config.use_color();
        Self {
            out: Mutex::new(out),
            config,
            color,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn shows_tool_calls(&self) -> bool {
        self.config.show_tool_calls
    }

    /// Full section for one tool call whose result is already known.
    pub fn render(&self, operation: &str, params: &[(ParamKey, String)], result: &str) {
        self.begin(operation, params, None);
        self.output(result);
        self.finish();
    }

    /// Announce a tool call: rule, parameter table and, when known, the command line.
    pub fn begin(&self, operation: &str, params: &[(ParamKey, String)], command_line: Option<&str>) {
        if !self.config.show_tool_calls {
            return;
        }
        let mut text = String::from("\n");
        text.push_str(&self.rule(Some(&format!("EXECUTING: {}", operation))));
        text.push('\n');
        text.push_str(&self.paint("Parameters", Style::new().bold()));
        text.push('\n');
        text.push_str(&self.parameter_table(params));
        text.push('\n');
        if let Some(line) = command_line {
            text.push_str(&self.paint("Command:", Style::new().bold().cyan()));
            text.push('\n');
            text.push_str(&self.paint(&format!("$ {}", line), Style::new().bright_white()));
            text.push('\n');
        }
        self.emit(&text);
    }

    /// Show a successful result, as highlighted JSON when possible.
    pub fn output(&self, result: &str) {
        if !self.config.show_tool_calls {
            return;
        }
        let mut text = String::new();
        match classify_output(result, self.config.preview_lines) {
            RenderedOutput::Json(value) => {
                text.push_str(&self.paint("Output:", Style::new().bold().green()));
                text.push('\n');
                let body = if self.color {
                    highlight_json(&value)
                } else {
                    pretty_json(&value)
                };
                text.push_str(&self.number_lines(&body));
            }
            RenderedOutput::Plain { preview, omitted } if omitted > 0 => {
                text.push_str(&self.paint("Output (truncated):", Style::new().bold().green()));
                text.push('\n');
                text.push_str(&preview);
                text.push('\n');
                text.push_str(&self.paint(
                    &format!("...and {} more lines", omitted),
                    Style::new().italic(),
                ));
            }
            RenderedOutput::Plain { preview, .. } => {
                text.push_str(&self.paint("Output:", Style::new().bold().green()));
                text.push('\n');
                text.push_str(&preview);
            }
        }
        text.push('\n');
        self.emit(&text);
    }

    /// Show an error section for a failed command or a failed execution.
    pub fn error(&self, message: &str) {
        if !self.config.show_tool_calls {
            return;
        }
        let text = format!(
            "{}\n{}\n",
            self.paint("Error:", Style::new().bold().red()),
            message.trim_end()
        );
        self.emit(&text);
    }

    /// Close a tool-call section.
    pub fn finish(&self) {
        if !self.config.show_tool_calls {
            return;
        }
        let text = format!("{}\n", self.rule(None));
        self.emit(&text);
    }

    /// Boxed final answer. Callers print the bare answer when tool display is off.
    pub fn final_answer(&self, answer: &str) {
        if !self.config.show_tool_calls {
            return;
        }
        let mut table = self.table();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("Final Answer")
            .add_attribute(Attribute::Bold)
            .fg(Color::Green)]);
        table.add_row(vec![Cell::new(answer.trim())]);
        self.emit(&format!("\n{}\n", table));
    }

    /// Titled panel for session start/end banners.
    pub fn banner(&self, title: &str, body: &str) {
        let mut table = self.table();
        table.set_header(vec![Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Blue)]);
        table.add_row(vec![Cell::new(body)]);
        self.emit(&format!("{}\n", table));
    }

    /// Unstyled line; shown regardless of tool display.
    pub fn plain(&self, text: &str) {
        self.emit(&format!("{}\n", text));
    }

    /// Input prompt without a trailing newline.
    pub fn prompt(&self, text: &str) {
        self.emit(text);
    }

    /// Dimmed one-line status message; shown regardless of tool display.
    pub fn notice(&self, message: &str) {
        let text = format!("{}\n", self.paint(message, Style::new().dimmed()));
        self.emit(&text);
    }

    /// Highlighted warning line; shown regardless of tool display.
    pub fn warning(&self, message: &str) {
        let text = format!("{}\n", self.paint(message, Style::new().bold().yellow()));
        self.emit(&text);
    }

    fn parameter_table(&self, params: &[(ParamKey, String)]) -> String {
        let mut table = self.table();
        table.set_header(vec![
            Cell::new("Parameter")
                .add_attribute(Attribute::Bold)
                .fg(Color::Magenta),
            Cell::new("Value").add_attribute(Attribute::Bold).fg(Color::Magenta),
        ]);
        for (key, value) in params {
            table.add_row(vec![
                Cell::new(key).fg(Color::Cyan),
                Cell::new(value).fg(Color::Yellow),
            ]);
        }
        table.to_string()
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
        if self.color {
            table.enforce_styling();
        } else {
            table.force_no_tty();
        }
        table
    }

    fn rule(&self, title: Option<&str>) -> String {
        match title {
            None => "─".repeat(RULE_WIDTH),
            Some(title) => {
                let side = RULE_WIDTH.saturating_sub(title.chars().count() + 2) / 2;
                format!(
                    "{} {} {}",
                    "─".repeat(side),
                    self.paint(title, Style::new().bold().blue()),
                    "─".repeat(side)
                )
            }
        }
    }

    fn number_lines(&self, body: &str) -> String {
        let width = body.lines().count().to_string().len();
        body.lines()
            .enumerate()
            .map(|(i, line)| {
                let gutter = format!("{:>width$} │", i + 1, width = width);
                format!("{} {}", self.paint(&gutter, Style::new().dimmed()), line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!("Failed to write display output: {}", e);
        }
    }
}
