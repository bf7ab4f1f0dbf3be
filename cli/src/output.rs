use analyst_core::{BlockView, ContentBlock, ConversationTurn, Role, SemanticModelRef, SemanticModelRegistry};
use colored::*;
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use serde_json::Value;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

/// Print one conversation turn to the terminal
pub fn print_turn(turn: &ConversationTurn, feedback_submitted: bool) {
    match turn.role {
        Role::User => println!("{}: {}", "You".green().bold(), turn.text()),
        Role::Assistant => {
            println!("{}:", "Analyst".blue().bold());
            for block in &turn.content {
                print!("{}", render_block(block));
            }
            if turn.request_id.is_some() && !feedback_submitted {
                println!("{}", "Rate this answer with /good or /bad [comment]".dimmed());
            }
        }
    }
}

/// Render a single content block as terminal text
pub fn render_block(block: &ContentBlock) -> String {
    match block.view() {
        BlockView::Text { text } => {
            let mut out = render_markdown(text).trim_end().to_string();
            out.push('\n');
            out
        }
        BlockView::Sql {
            statement,
            confidence,
        } => {
            let mut out = format!("{}\n", "SQL query:".cyan().bold());
            out.push_str(&highlight_code(statement, "sql"));
            if let Some(verified) = confidence
                .as_ref()
                .and_then(|c| c.get("verified_query_used"))
                .filter(|v| !v.is_null())
            {
                let name = verified
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("verified query");
                out.push_str(&format!("{} {}\n", "Verified query:".dimmed(), name));
            }
            out
        }
        BlockView::Suggestions { suggestions } => {
            let mut out = format!("{}\n", "Suggestions:".yellow().bold());
            for (i, suggestion) in suggestions.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", (i + 1).to_string().yellow(), suggestion));
            }
            out.push_str(&format!("{}\n", "Pick one with /suggest N".dimmed()));
            out
        }
        BlockView::ResultTable { columns, rows } => render_table(columns, rows),
        BlockView::Chart { chart_spec } => {
            let mark = chart_spec
                .get("mark")
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .unwrap_or_else(|| "chart".to_string());
            format!(
                "{} {} ({})\n",
                "Chart:".magenta().bold(),
                mark,
                "Vega-Lite definition not rendered".dimmed()
            )
        }
        BlockView::Other => format!(
            "{} {}\n",
            format!("[{}]", block.kind()).dimmed(),
            Value::Object(block.payload().clone())
        ),
    }
}

/// Plain text for a table cell
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render rows as a column-aligned table with a header separator
pub fn render_table(columns: &[String], rows: &[Vec<Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(format_cell).collect())
        .collect();

    let col_count = cells
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(columns.len()))
        .max()
        .unwrap_or(0);
    let mut col_widths = vec![0; col_count];
    for (i, header) in columns.iter().enumerate() {
        col_widths[i] = col_widths[i].max(header.chars().count());
    }
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    let pad = |text: &str, width: usize| {
        let padding = width.saturating_sub(text.chars().count());
        format!("{}{}", text, " ".repeat(padding))
    };

    let mut output = String::new();
    let header: Vec<String> = col_widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let name = columns.get(i).map(String::as_str).unwrap_or("");
            format!("{}{}", name.bold(), " ".repeat(width.saturating_sub(name.chars().count())))
        })
        .collect();
    output.push_str(header.join(" ").trim_end());
    output.push('\n');

    let separator: Vec<String> = col_widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join(" ").dimmed().to_string());
    output.push('\n');

    for row in &cells {
        let line: Vec<String> = col_widths
            .iter()
            .enumerate()
            .map(|(i, width)| pad(row.get(i).map(String::as_str).unwrap_or(""), *width))
            .collect();
        output.push_str(line.join(" ").trim_end());
        output.push('\n');
    }

    if cells.is_empty() {
        output.push_str(&format!("{}\n", "(no rows)".dimmed()));
    }
    output
}

pub fn print_warning(warning: &str) {
    println!("{} {}", "Warning:".yellow().bold(), warning);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

/// List semantic models, marking the selected one
pub fn print_models(registry: &SemanticModelRegistry, selected: Option<&SemanticModelRef>) {
    println!("{}", "Semantic models:".cyan().bold());
    for model in registry.models() {
        let marker = if Some(model) == selected { "*" } else { " " };
        println!(
            " {} {} {}",
            marker.green().bold(),
            model.display_name().bold(),
            format!("({})", model.path()).dimmed()
        );
    }
}

/// Show interactive commands
pub fn print_help() {
    println!("{}", "Commands:".cyan().bold());
    println!("  <question>         Ask Cortex Analyst about your data");
    println!("  /suggest N         Pick suggestion N from the last answer");
    println!("  /send or <enter>   Ask the picked suggestion");
    println!("  /good [comment]    Rate the last answer as helpful");
    println!("  /bad [comment]     Rate the last answer as unhelpful");
    println!("  /history           Show the conversation so far");
    println!("  /models            List semantic models");
    println!("  /model NAME        Switch semantic model (clears the chat)");
    println!("  /clear             Clear the chat history");
    println!("  exit | quit        Leave");
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "cortex-analyst \"your question\"".green().bold());
    println!("    Ask a single question");
    println!();
    println!("  {}", "cortex-analyst -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --model <NAME>     Semantic model to use");
    println!("  --list-models      List configured semantic models");
    println!("  --config <PATH>    Config file location");
    println!("  --help             Show this help message");
    println!();
}

fn syntaxes() -> &'static SyntaxSet {
    static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let mut theme_set = ThemeSet::load_defaults();
        theme_set
            .themes
            .remove("base16-ocean.dark")
            .or_else(|| theme_set.themes.into_values().next())
            .unwrap_or_default()
    })
}

/// Syntax-highlight a code snippet between separator lines
pub fn highlight_code(code: &str, lang: &str) -> String {
    let syntax_set = syntaxes();
    let syntax = syntax_set
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| syntax_set.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme());

    let mut output = String::new();
    output.push_str(&"─".repeat(40).dimmed().to_string());
    output.push('\n');
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, syntax_set) {
            Ok(ranges) => output.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
            Err(_) => output.push_str(line),
        }
    }
    if !code.ends_with('\n') {
        output.push('\n');
    }
    output.push_str("\x1b[0m");
    output.push_str(&"─".repeat(40).dimmed().to_string());
    output.push('\n');
    output
}

/// Render markdown in the terminal with syntax highlighting
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut in_code_block = false;
    let mut code_block_lang = String::new();
    let mut code_block_content = String::new();
    let mut output = String::new();

    for event in MdParser::new_ext(markdown, options) {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => match level {
                HeadingLevel::H1 | HeadingLevel::H2 => {
                    output.push_str(&format!("\n{} ", "#".bright_cyan().bold()))
                }
                _ => output.push('\n'),
            },
            MdEvent::End(Tag::Heading(..)) => output.push('\n'),
            MdEvent::Start(Tag::Paragraph) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push_str("\n\n");
                }
            }
            MdEvent::End(Tag::Paragraph) => output.push('\n'),
            MdEvent::Start(Tag::CodeBlock(info)) => {
                in_code_block = true;
                code_block_lang = match info {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block_content.clear();
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                output.push('\n');
                output.push_str(&highlight_code(&code_block_content, &code_block_lang));
            }
            MdEvent::Start(Tag::List(_)) | MdEvent::End(Tag::List(_)) => output.push('\n'),
            MdEvent::Start(Tag::Item) => output.push_str(&format!("{}  ", "•".yellow())),
            MdEvent::End(Tag::Item) => output.push('\n'),
            MdEvent::Code(code) => {
                output.push_str(&format!("`{}`", code.on_bright_black().white()));
            }
            MdEvent::Text(text) => {
                if in_code_block {
                    code_block_content.push_str(&text);
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            _ => {}
        }
    }

    output
}
