#![allow(clippy::module_inception)]

use std::rc::Rc;

use colored::Colorize;

use crate::errors::errors::{Error, ErrorTip};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;

extern crate regex;

/// Byte offset into a named source.
#[derive(Debug, Clone)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }

    pub fn is_null(&self) -> bool {
        self.1.as_str() == "<null>"
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Finds the line containing byte `position` of `source`.
///
/// Returns the 1-based line number, the line text without its newline, and
/// the offset of `position` within that line. A position at the very end of
/// the source maps to the end of the last line.
pub fn get_line_at_position(source: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    if pos > source.len() {
        return None;
    }

    let mut start = 0;
    let mut line_number = 1;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return Some((line_number, line.trim_end_matches('\n').to_string(), pos - start));
        }

        start = end;
        line_number += 1;
    }

    // End of input: point just past the last line
    let last = source.lines().last().unwrap_or("");
    let line_number = source.lines().count().max(1);
    Some((line_number, last.to_string(), last.len()))
}

/// Renders a diagnostic without colour.
///
/// ```text
/// Error: UnknownFunction (Function `foo` is not declared, implicit declaration not allowed)
/// -> main.b
///   |
/// 2 | return foo();
///   | -------^
/// ```
pub fn format_error(error: &Error, source: &str, file: &str) -> String {
    let mut lines = vec![header(error), format!("-> {}", file)];

    let position = error.get_position();
    if position.is_null() {
        lines.push(format!("   {}", error));
        return lines.join("\n");
    }

    if let Some((line, line_text, line_pos)) = get_line_at_position(source, position.0) {
        let line_string = line.to_string();
        let padding = line_string.len() + 2;

        let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
        let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

        lines.push(format!("{:>padding$}", "|"));
        lines.push(format!("{} | {}", line_string, line_text_removed.trim_end()));
        lines.push(format!("{:>padding$} {:->arrows$}", "|", "^"));
    }

    lines.join("\n")
}

fn header(error: &Error) -> String {
    if let ErrorTip::None = error.get_tip() {
        format!("Error: {}: {}", error.get_error_name(), error)
    } else {
        format!("Error: {} ({})", error.get_error_name(), error.get_tip())
    }
}

/// Prints a coloured diagnostic to stderr.
pub fn display_error(error: &Error, source: &str, file: &str) {
    for (index, line) in format_error(error, source, file).lines().enumerate() {
        if index == 0 {
            eprintln!("{}", line.red().bold());
        } else if line.trim_start().starts_with('|') && line.contains('^') {
            eprintln!("{}", line.cyan());
        } else {
            eprintln!("{}", line);
        }
    }
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' || c == '\t' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
