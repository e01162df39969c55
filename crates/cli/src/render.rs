use anyhow::{anyhow, bail, Result};
use pocket_api::Item;
use regex::Regex;

pub const DEFAULT_TEMPLATE: &str =
    r#"[{{.ItemId | printf "%9d"}}] {{.ResolvedTitle}} <{{.ResolvedURL}}>"#;

const MAX_WIDTH: usize = 1024;

const ACTION_PATTERN: &str =
    r#"\{\{\s*\.(\w+)\s*(?:\|\s*printf\s+"%(-?)(\d*)[ds]"\s*)?\}\}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ItemId,
    ResolvedTitle,
    ResolvedUrl,
    GivenTitle,
    GivenUrl,
    Excerpt,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ItemId" => Some(Field::ItemId),
            "ResolvedTitle" => Some(Field::ResolvedTitle),
            "ResolvedURL" => Some(Field::ResolvedUrl),
            "GivenTitle" => Some(Field::GivenTitle),
            "GivenURL" => Some(Field::GivenUrl),
            "Excerpt" => Some(Field::Excerpt),
            _ => None,
        }
    }

    fn value<'a>(&self, item: &'a Item) -> &'a str {
        match self {
            Field::ItemId => &item.item_id,
            Field::ResolvedTitle => &item.resolved_title,
            Field::ResolvedUrl => &item.resolved_url,
            Field::GivenTitle => &item.given_title,
            Field::GivenUrl => &item.given_url,
            Field::Excerpt => &item.excerpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        width: usize,
        left_align: bool,
    },
}

/// Per-item output line, e.g. `{{.ResolvedTitle}} <{{.ResolvedURL}}>`.
#[derive(Debug, Clone)]
pub struct ItemTemplate {
    segments: Vec<Segment>,
}

impl ItemTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let pattern = Regex::new(ACTION_PATTERN).map_err(|e| anyhow!("template pattern: {e}"))?;
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in pattern.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            push_literal(&mut segments, &source[last..whole.start()])?;

            let name = &caps[1];
            let field = Field::from_name(name)
                .ok_or_else(|| anyhow!("Unknown template field .{name}"))?;
            let width = match caps.get(3).map(|m| m.as_str()) {
                Some(digits) if !digits.is_empty() => digits.parse()?,
                _ => 0,
            };
            if width > MAX_WIDTH {
                bail!("Template width {width} for .{name} exceeds {MAX_WIDTH}");
            }
            segments.push(Segment::Field {
                field,
                width,
                left_align: caps.get(2).is_some_and(|m| m.as_str() == "-"),
            });
            last = whole.end();
        }
        push_literal(&mut segments, &source[last..])?;

        Ok(Self { segments })
    }

    pub fn render(&self, item: &Item) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    width,
                    left_align,
                } => {
                    let value = field.value(item);
                    let width = *width;
                    if *left_align {
                        out.push_str(&format!("{value:<width$}"));
                    } else {
                        out.push_str(&format!("{value:>width$}"));
                    }
                }
            }
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<()> {
    if text.contains("{{") {
        bail!("Unsupported template action near {:?}", text);
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}
