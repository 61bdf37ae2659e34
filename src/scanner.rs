//! Line-oriented editor for the `configurations:` list of a
//! modulemd-packager document.
//!
//! The scanner copies every input line verbatim and, for each configuration
//! named in the edit plan, buffers the entry's raw lines (context line
//! rewritten to the new context, platform line rewritten to the new platform,
//! comments and nested fields as-is) and emits the buffer right before the
//! line that closes the entry. Everything outside the duplicated regions is
//! preserved byte for byte, including line endings and the presence or
//! absence of a final newline.
use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::scalar::{self, DecodeError, Scalar};

/// The textual side of one patch operation, resolved by the orchestrator.
pub struct EditPlan<'a> {
    pub old_platform: &'a str,
    pub new_platform: &'a str,
    /// Context of each template entry mapped to the context its duplicate
    /// must carry.
    pub context_map: &'a BTreeMap<String, String>,
}

/// Apply the plan to the document text and return the patched text.
pub fn apply(content: &str, plan: &EditPlan<'_>) -> Result<String, DecodeError> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    let ends_with_newline = content.ends_with('\n');
    if ends_with_newline {
        lines.pop();
    }

    let mut scanner = Scanner::new(plan);
    for line in lines {
        scanner.feed(line)?;
    }
    let mut output = scanner.finish().join("\n");
    if ends_with_newline {
        output.push('\n');
    }
    Ok(output)
}

enum State {
    /// Before the `configurations:` header.
    Outside,
    /// Inside the configurations list, between entries.
    Configurations { list_indent: String },
    /// Inside one list entry, buffering its lines.
    Entry {
        list_indent: String,
        entry: EntryFrame,
    },
}

struct EntryFrame {
    /// Full indentation of the entry's field column.
    field_prefix: String,
    context: String,
    record: Vec<String>,
}

struct Scanner<'a> {
    plan: &'a EditPlan<'a>,
    header_re: Regex,
    entry_re: Regex,
    platform_re: Regex,
    state: State,
    out: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn new(plan: &'a EditPlan<'a>) -> Self {
        Self {
            plan,
            header_re: Regex::new(r"^(\s+)configurations\s*:").expect("valid regex"),
            entry_re: Regex::new(r"^((\s*)-(\s+)context\s*:\s*)(.*)$").expect("valid regex"),
            platform_re: Regex::new(r"^(platform\s*:\s*)(\S.*)$").expect("valid regex"),
            state: State::Outside,
            out: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) -> Result<(), DecodeError> {
        debug!("input: {line}");
        let state = std::mem::replace(&mut self.state, State::Outside);
        self.state = self.dispatch(state, line)?;
        Ok(())
    }

    fn dispatch(&mut self, state: State, line: &str) -> Result<State, DecodeError> {
        // Comments can interleave disrespecting indentation. They never
        // change state, but inside an entry they belong to its record.
        if is_comment(line) {
            let mut state = state;
            if let State::Entry { entry, .. } = &mut state {
                entry.record.push(line.to_string());
            }
            self.out.push(line.to_string());
            return Ok(state);
        }

        match state {
            State::Entry { list_indent, entry } => self.entry_line(list_indent, entry, line),
            State::Configurations { list_indent } => self.configurations_line(list_indent, line),
            State::Outside => {
                let next = match self.header_re.captures(line) {
                    Some(caps) => {
                        debug!("start of configurations");
                        State::Configurations {
                            list_indent: caps[1].to_string(),
                        }
                    }
                    None => State::Outside,
                };
                self.out.push(line.to_string());
                Ok(next)
            }
        }
    }

    fn entry_line(
        &mut self,
        list_indent: String,
        mut entry: EntryFrame,
        line: &str,
    ) -> Result<State, DecodeError> {
        if let Some(rest) = line.strip_prefix(entry.field_prefix.as_str()) {
            let recorded = self.record_field_line(&entry.field_prefix, rest, line)?;
            entry.record.push(recorded);
            self.out.push(line.to_string());
            return Ok(State::Entry { list_indent, entry });
        }

        // A dedent closes the entry: emit its duplicate before the closing
        // line, then reconsider that line as a potential sibling entry.
        self.close_entry(entry);
        self.configurations_line(list_indent, line)
    }

    /// Buffer one field line, rewriting the platform value when it matches.
    /// The original line always reaches the output untouched.
    fn record_field_line(
        &self,
        field_prefix: &str,
        rest: &str,
        line: &str,
    ) -> Result<String, DecodeError> {
        let Some(caps) = self.platform_re.captures(rest) else {
            return Ok(line.to_string());
        };
        let decoded = scalar::decode(&caps[2])?;
        if decoded.value != self.plan.old_platform {
            return Ok(line.to_string());
        }
        debug!("hit the old platform");
        let replacement = Scalar {
            value: self.plan.new_platform.to_string(),
            style: decoded.style,
            suffix: decoded.suffix,
        };
        Ok(format!("{field_prefix}{}{}", &caps[1], replacement.encode()))
    }

    fn configurations_line(
        &mut self,
        list_indent: String,
        line: &str,
    ) -> Result<State, DecodeError> {
        let caps = line
            .strip_prefix(list_indent.as_str())
            .and_then(|rest| self.entry_re.captures(rest));
        let Some(caps) = caps else {
            self.out.push(line.to_string());
            return Ok(State::Configurations { list_indent });
        };

        let decoded = scalar::decode(&caps[4])?;
        debug!("start of context {:?}", decoded.value);
        let field_prefix = format!("{list_indent}{} {}", &caps[2], &caps[3]);
        let mut record = Vec::new();
        if let Some(new_context) = self.plan.context_map.get(&decoded.value) {
            let rewritten = Scalar {
                value: new_context.clone(),
                style: decoded.style,
                suffix: decoded.suffix,
            };
            record.push(format!("{list_indent}{}{}", &caps[1], rewritten.encode()));
        }
        let entry = EntryFrame {
            field_prefix,
            context: decoded.value,
            record,
        };
        self.out.push(line.to_string());
        Ok(State::Entry { list_indent, entry })
    }

    fn close_entry(&mut self, entry: EntryFrame) {
        debug!("end of context {:?}", entry.context);
        if self.plan.context_map.contains_key(&entry.context) {
            for line in &entry.record {
                debug!("recorded: {line}");
            }
            self.out.extend(entry.record);
        }
    }

    /// An entry still open at end of input closes as if a dedent occurred,
    /// appending its duplicate after the last line.
    fn finish(mut self) -> Vec<String> {
        if let State::Entry { entry, .. } = std::mem::replace(&mut self.state, State::Outside) {
            self.close_entry(entry);
        }
        self.out
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}
