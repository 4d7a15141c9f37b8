//! Markdown rendering for the terminal.
//!
//! Two projections of the same event walk: `styled` produces terminal
//! text (bold, italic, headers, bullets, block quotes) for the note
//! list, and `plain_text` strips every marker for the read-aloud path,
//! which must receive plain prose.

use std::fmt::Write as _;

use crossterm::style::Stylize;
use pulldown_cmark::{Event, Options, Parser, Tag};

/// Render markdown as styled terminal text.
pub fn styled(markdown: &str) -> String {
    render(markdown, true)
}

/// Strip markdown down to plain prose (for speech synthesis).
pub fn plain_text(markdown: &str) -> String {
    render(markdown, false)
}

fn render(markdown: &str, styled: bool) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());

    let mut out = String::new();
    let mut strong = 0u32;
    let mut emphasis = 0u32;
    let mut heading = 0u32;
    let mut quote = 0u32;
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph | Tag::Heading(..) => {
                    if matches!(tag, Tag::Heading(..)) {
                        heading += 1;
                    }
                    push_prefix(&mut out, quote, styled);
                }
                Tag::BlockQuote => quote += 1,
                Tag::List(start) => lists.push(start),
                Tag::Item => {
                    push_prefix(&mut out, quote, styled);
                    if styled {
                        match lists.last_mut() {
                            Some(Some(number)) => {
                                let _ = write!(out, "{}. ", number);
                                *number += 1;
                            }
                            _ => out.push_str("• "),
                        }
                    }
                }
                Tag::Emphasis => emphasis += 1,
                Tag::Strong => strong += 1,
                _ => {}
            },
            Event::End(tag) => match tag {
                Tag::Paragraph | Tag::Heading(..) => {
                    if matches!(tag, Tag::Heading(..)) {
                        heading = heading.saturating_sub(1);
                    }
                    out.push_str("\n\n");
                }
                Tag::BlockQuote => {
                    quote = quote.saturating_sub(1);
                }
                Tag::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                Tag::Item => out.push('\n'),
                Tag::Emphasis => emphasis = emphasis.saturating_sub(1),
                Tag::Strong => strong = strong.saturating_sub(1),
                _ => {}
            },
            Event::Text(text) | Event::Code(text) => {
                push_text(&mut out, &text, styled, strong > 0, emphasis > 0, heading > 0);
            }
            Event::SoftBreak => {
                if styled {
                    out.push('\n');
                    push_prefix(&mut out, quote, styled);
                } else {
                    out.push(' ');
                }
            }
            Event::HardBreak => {
                out.push('\n');
                push_prefix(&mut out, quote, styled);
            }
            Event::Rule => {
                if styled {
                    out.push_str(&"─".repeat(32));
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Block-quote bars at the start of a line.
fn push_prefix(out: &mut String, quote: u32, styled: bool) {
    if styled {
        for _ in 0..quote {
            out.push_str("│ ");
        }
    }
}

fn push_text(out: &mut String, text: &str, styled: bool, strong: bool, emphasis: bool, heading: bool) {
    if !styled || !(strong || emphasis || heading) {
        out.push_str(text);
        return;
    }

    let mut content = text.stylize();
    if strong || heading {
        content = content.bold();
    }
    if emphasis {
        content = content.italic();
    }
    let _ = write!(out, "{}", content);
}
