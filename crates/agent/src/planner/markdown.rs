//! The plan document: `## Heading` sections holding either free text or a
//! `- ` bullet list.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// First fenced block, language tag included.
static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap_or_else(|e| unreachable!("{e}")));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionBody {
    Content(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    pub heading: String,
    #[serde(flatten)]
    pub body: SectionBody,
}

/// Sections in document order. Headings are unique; a repeated heading
/// replaces the earlier body in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub sections: Vec<PlanSection>,
}

impl PlanDocument {
    /// Parse plan markdown. Text before the first heading is ignored, and a
    /// section with any bullets keeps only the bullets.
    pub fn parse(markdown: &str) -> Self {
        let mut doc = Self::default();
        let mut heading: Option<String> = None;
        let mut items = Vec::new();
        let mut content = String::new();

        for line in markdown.split('\n') {
            if let Some(next) = line.strip_prefix("## ") {
                if let Some(done) = heading.take() {
                    doc.insert(done, body_of(&mut items, &mut content));
                }
                heading = Some(next.trim().to_string());
            } else if let Some(item) = line.strip_prefix("- ") {
                items.push(item.trim().to_string());
            } else {
                content.push_str(line);
                content.push('\n');
            }
        }
        if let Some(done) = heading {
            doc.insert(done, body_of(&mut items, &mut content));
        }
        doc
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("## {}\n", section.heading));
            match &section.body {
                SectionBody::Content(text) => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                SectionBody::List(items) => {
                    for item in items {
                        out.push_str(&format!("- {item}\n"));
                    }
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn section(&self, heading: &str) -> Option<&SectionBody> {
        self.sections
            .iter()
            .find(|s| s.heading == heading)
            .map(|s| &s.body)
    }

    /// The `Goals` section as run goals: its bullets, or its non-empty lines.
    pub fn goals(&self) -> Vec<String> {
        match self.section("Goals") {
            Some(SectionBody::List(items)) => items.clone(),
            Some(SectionBody::Content(text)) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            None => Vec::new(),
        }
    }

    fn insert(&mut self, heading: String, body: SectionBody) {
        match self.sections.iter_mut().find(|s| s.heading == heading) {
            Some(existing) => existing.body = body,
            None => self.sections.push(PlanSection { heading, body }),
        }
    }
}

fn body_of(items: &mut Vec<String>, content: &mut String) -> SectionBody {
    let body = if items.is_empty() {
        SectionBody::Content(content.trim().to_string())
    } else {
        SectionBody::List(std::mem::take(items))
    };
    content.clear();
    body
}

/// The inside of the first ``` fenced block in `text`.
pub fn extract_fenced(text: &str) -> Option<&str> {
    FENCED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = "\
## TBD
- location_of_user

## Goals
- Find three cafes near {location_of_user}
- Write them to cafes.txt

## Description
A short list for a weekend trip.
Prefer places with outdoor seating.

## Constraints
- Use only public reviews

## Tools
- url-finder: search the web
";

    #[test]
    fn sections_parse_as_lists_or_content() {
        let doc = PlanDocument::parse(PLAN);
        let headings: Vec<&str> = doc.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["TBD", "Goals", "Description", "Constraints", "Tools"]);

        assert_eq!(
            doc.section("TBD"),
            Some(&SectionBody::List(vec!["location_of_user".into()]))
        );
        assert_eq!(
            doc.section("Description"),
            Some(&SectionBody::Content(
                "A short list for a weekend trip.\nPrefer places with outdoor seating.".into()
            ))
        );
        assert_eq!(doc.goals().len(), 2);
    }

    #[test]
    fn markdown_round_trips() {
        let doc = PlanDocument::parse(PLAN);
        let rendered = doc.to_markdown();
        assert_eq!(PlanDocument::parse(&rendered), doc);
        assert!(rendered.starts_with("## TBD\n- location_of_user\n\n## Goals\n"));
    }

    #[test]
    fn bullets_win_over_prose_in_a_section() {
        let doc = PlanDocument::parse("## Goals\nsome intro\n- first\n- second\n");
        assert_eq!(
            doc.section("Goals"),
            Some(&SectionBody::List(vec!["first".into(), "second".into()]))
        );
    }

    #[test]
    fn text_before_first_heading_is_ignored() {
        let doc = PlanDocument::parse("markdown\npreamble\n## Goals\n- ship it\n");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.goals(), vec!["ship it".to_string()]);
    }

    #[test]
    fn repeated_heading_replaces_in_place() {
        let doc = PlanDocument::parse("## Goals\n- old\n## Tools\n- none\n## Goals\n- new\n");
        assert_eq!(doc.sections[0].heading, "Goals");
        assert_eq!(doc.goals(), vec!["new".to_string()]);
        assert_eq!(doc.sections.len(), 2);
    }

    #[test]
    fn content_goals_are_split_by_line() {
        let doc = PlanDocument::parse("## Goals\nfirst goal\n\nsecond goal\n");
        assert_eq!(doc.goals(), vec!["first goal".to_string(), "second goal".to_string()]);
    }

    #[test]
    fn sections_serialize_with_content_or_list() {
        let doc = PlanDocument::parse("## Description\nhello\n## Goals\n- a\n");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"sections": [
                {"heading": "Description", "content": "hello"},
                {"heading": "Goals", "list": ["a"]}
            ]})
        );
        let back: PlanDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn first_fenced_block_is_extracted() {
        let reply = "Here you go:\n```\n## Goals\n- a\n```\nand another\n```\nignored\n```";
        assert_eq!(extract_fenced(reply), Some("\n## Goals\n- a\n"));
        assert_eq!(extract_fenced("no fences here"), None);
    }
}
