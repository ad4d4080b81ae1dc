//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use civic_assistant::{plain_text, render, render_message, DisplaySegment, Rule, Turn};
use civic_domain::{Department, Message, Response, Role};
use civic_store::SessionSummary;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Placeholder shown for a marker whose citation is missing.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the reply of one turn.
    pub fn format_turn(&self, turn: &Turn) -> Result<String> {
        let response = turn
            .reply
            .data
            .clone()
            .unwrap_or_else(|| Response::plain(turn.reply.content.clone()));

        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "department": turn.reply.department.as_str(),
                "session": turn.reply.session_id.as_str(),
                "rule": turn.rule,
                "response": response_json(&response),
            }))?),
            OutputFormat::Table => Ok(self.format_response_table(&response)),
            OutputFormat::Quiet => Ok(plain_text(&render(&response))),
        }
    }

    /// Format a response with its sources.
    pub fn format_response(&self, response: &Response) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&response_json(response))?),
            OutputFormat::Table => Ok(self.format_response_table(response)),
            OutputFormat::Quiet => Ok(plain_text(&render(response))),
        }
    }

    fn format_response_table(&self, response: &Response) -> String {
        let segments = render(response);
        let mut out = self.format_segments(&segments);

        let sources = self.sources_table(response, &segments);
        if !sources.is_empty() {
            out.push_str("\n\n");
            out.push_str(&sources);
        }
        out
    }

    /// Inline rendering of display segments.
    pub fn format_segments(&self, segments: &[DisplaySegment]) -> String {
        segments
            .iter()
            .map(|segment| match segment {
                DisplaySegment::PlainText(text) => text.clone(),
                DisplaySegment::Bold(text) => self.bold(text),
                DisplaySegment::Link { label, url } => {
                    format!("{} <{}>", self.colorize(label, "blue"), url)
                }
                DisplaySegment::CitationMarker { id, resolved: Some(_) } => {
                    self.colorize(&format!("[{}]", id), "cyan")
                }
                DisplaySegment::CitationMarker { id, resolved: None } => {
                    self.colorize(&format!("[{}?]", id), "red")
                }
            })
            .collect()
    }

    /// Source list: the citation list plus a placeholder row per unresolved marker.
    fn sources_table(&self, response: &Response, segments: &[DisplaySegment]) -> String {
        let mut rows: Vec<[String; 3]> = response
            .citations
            .iter()
            .map(|c| [c.id.to_string(), c.source.clone(), c.url.clone()])
            .collect();

        for segment in segments {
            if let DisplaySegment::CitationMarker { id, resolved: None } = segment {
                let id = id.to_string();
                if !rows.iter().any(|row| row[0] == id) {
                    rows.push([id, UNKNOWN_SOURCE.to_string(), "-".to_string()]);
                }
            }
        }

        if rows.is_empty() {
            return String::new();
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Source", "URL"]);
        for row in rows {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a partition transcript.
    pub fn format_transcript(&self, messages: &[Message]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = messages.iter().map(message_json).collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(messages
                .iter()
                .map(|m| plain_text(&render_message(m)))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if messages.is_empty() {
                    return Ok(self.colorize("No messages found.", "yellow"));
                }
                Ok(messages
                    .iter()
                    .map(|m| self.transcript_line(m))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }

    fn transcript_line(&self, message: &Message) -> String {
        let speaker = match message.role {
            Role::User => self.colorize("you", "green"),
            Role::Assistant => self.colorize(message.department.profile().brand, "magenta"),
        };
        format!("{}: {}", speaker, self.format_segments(&render_message(message)))
    }

    /// Format the rule table.
    pub fn format_rules<'a>(&self, rules: impl Iterator<Item = &'a Rule>) -> Result<String> {
        let rules: Vec<&Rule> = rules.collect();
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = rules
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "id": r.id,
                            "scope": r.scope.to_string(),
                            "priority": r.priority,
                            "trigger": r.trigger.describe(),
                            "response": response_json(&r.response),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(rules.iter().map(|r| r.id.as_str()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if rules.is_empty() {
                    return Ok(self.colorize("No rules found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["#", "Rule", "Scope", "Priority", "Trigger"]);
                for (position, rule) in rules.iter().enumerate() {
                    builder.push_record([
                        (position + 1).to_string(),
                        rule.id.clone(),
                        rule.scope.to_string(),
                        rule.priority.to_string(),
                        rule.trigger.describe(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format the department directory.
    pub fn format_departments(&self) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = Department::ALL
                    .iter()
                    .map(|d| {
                        let profile = d.profile();
                        serde_json::json!({
                            "id": d.as_str(),
                            "name": profile.name,
                            "brand": profile.brand,
                            "title": profile.hero_title,
                            "subtitle": profile.hero_subtitle,
                            "suggestion": profile.query_suggestion,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(Department::ALL
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["", "Id", "Name", "Brand", "Try asking"]);
                for department in Department::ALL {
                    let profile = department.profile();
                    builder.push_record([
                        profile.icon.glyph(),
                        department.as_str(),
                        profile.name,
                        profile.brand,
                        profile.query_suggestion,
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format stored session summaries.
    pub fn format_sessions(&self, sessions: &[SessionSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = sessions
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "session": s.partition.session.as_str(),
                            "department": s.partition.department.as_str(),
                            "messages": s.message_count,
                            "last_activity": s.last_activity,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(sessions
                .iter()
                .map(|s| s.partition.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if sessions.is_empty() {
                    return Ok(self.colorize("No sessions found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Session", "Department", "Messages", "Last activity"]);
                for summary in sessions {
                    builder.push_record([
                        summary.partition.session.to_string(),
                        summary.partition.department.to_string(),
                        summary.message_count.to_string(),
                        summary.last_activity.to_string(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn bold(&self, text: &str) -> String {
        if self.color_enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

fn segment_json(segment: &DisplaySegment) -> serde_json::Value {
    match segment {
        DisplaySegment::PlainText(text) => serde_json::json!({ "type": "text", "text": text }),
        DisplaySegment::Bold(text) => serde_json::json!({ "type": "bold", "text": text }),
        DisplaySegment::Link { label, url } => {
            serde_json::json!({ "type": "link", "label": label, "url": url })
        }
        DisplaySegment::CitationMarker { id, resolved } => serde_json::json!({
            "type": "citation",
            "id": id,
            "source": resolved.as_ref().map(|c| c.source.as_str()),
            "resolved": resolved.is_some(),
        }),
    }
}

fn response_json(response: &Response) -> serde_json::Value {
    serde_json::json!({
        "text": response.text,
        "segments": render(response).iter().map(segment_json).collect::<Vec<_>>(),
        "citations": response
            .citations
            .iter()
            .map(|c| serde_json::json!({ "id": c.id, "source": c.source, "url": c.url }))
            .collect::<Vec<_>>(),
    })
}

fn message_json(message: &Message) -> serde_json::Value {
    serde_json::json!({
        "id": message.id.to_string(),
        "role": message.role.as_str(),
        "content": message.content,
        "department": message.department.as_str(),
        "session": message.session_id.as_str(),
        "created_at": message.created_at,
        "data": message.data.as_ref().map(response_json),
    })
}
