//! Terminal and JSON renderings of an effective workflow.
//!
//! Rendering starts only after resolution succeeded, so output is never partial.
use crate::extract::document_lines;
use crate::model::{EffectiveWorkflow, Reference, ReferenceIndex, Workflow};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use serde::Serialize;
use std::io::Write;

/// Where a workflow sits in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    TopLevel,
    Reusable,
}

impl Section {
    fn title(self) -> &'static str {
        match self {
            Section::TopLevel => "Workflow file for this run",
            Section::Reusable => "Called reusable workflow file",
        }
    }
}

/// Receives each resolved workflow with its incoming call sites.
pub(crate) trait PresentationSink {
    fn workflow(
        &mut self,
        section: Section,
        workflow: &Workflow,
        references: &[Reference],
    ) -> Result<()>;
}

/// Feed the top-level workflow, then each reusable workflow, to `sink`.
pub(crate) fn present(effective: &EffectiveWorkflow, sink: &mut dyn PresentationSink) -> Result<()> {
    sink.workflow(Section::TopLevel, &effective.workflow, &[])?;
    for workflow in &effective.reusable_workflows {
        sink.workflow(
            Section::Reusable,
            workflow,
            effective.references_to(workflow),
        )?;
    }
    Ok(())
}

/// Human-readable output with optional ANSI styling.
pub(crate) struct TerminalSink<W: Write> {
    out: W,
    color: bool,
    line_numbers: bool,
}

impl<W: Write> TerminalSink<W> {
    pub(crate) fn new(out: W, color: bool, line_numbers: bool) -> Self {
        Self {
            out,
            color,
            line_numbers,
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> PresentationSink for TerminalSink<W> {
    fn workflow(
        &mut self,
        section: Section,
        workflow: &Workflow,
        references: &[Reference],
    ) -> Result<()> {
        let mut out = String::new();
        out.push_str(&format!("{}\n\n", self.heading(section.title())));

        let sha = if workflow.sha.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.muted(&workflow.sha))
        };
        out.push_str(&format!(
            "{} - {}@{}{}\n",
            workflow.name,
            self.muted(&workflow.filename),
            workflow.git_ref,
            sha
        ));

        if !references.is_empty() {
            out.push('\n');
            let noun = if references.len() == 1 {
                "reference"
            } else {
                "references"
            };
            out.push_str(&format!(
                "{}\n",
                self.muted(&format!("{} {noun}", references.len()))
            ));
            out.push_str(&self.reference_table(references));
        }

        out.push('\n');
        out.push_str(&self.yaml_block(&workflow.yaml));
        out.push('\n');

        self.out
            .write_all(out.as_bytes())
            .context("write workflow output")?;
        self.out.flush().context("flush workflow output")
    }
}

impl<W: Write> TerminalSink<W> {
    fn reference_table(&self, references: &[Reference]) -> String {
        let width = references
            .iter()
            .map(|r| r.source_filename.chars().count())
            .max()
            .unwrap_or(0);
        let mut table = String::new();
        for reference in references {
            let filename = format!("{:<width$}", reference.source_filename);
            let line = format!("{:>4}", reference.source_line_number);
            table.push_str(&format!(
                "{}  {}  {}\n",
                self.muted(&filename),
                self.muted(&line),
                reference.source_line.trim()
            ));
        }
        table
    }

    fn yaml_block(&self, yaml: &str) -> String {
        let mut block = String::new();
        if !self.line_numbers {
            block.push_str(yaml);
            if !yaml.ends_with('\n') {
                block.push('\n');
            }
            return block;
        }
        let mut lines: Vec<&str> = document_lines(yaml).collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }
        let width = lines.len().to_string().len().max(4);
        for (idx, line) in lines.iter().enumerate() {
            let number = format!("{:>width$}", idx + 1);
            block.push_str(&format!("{}  {line}\n", self.muted(&number)));
        }
        block
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    workflow: &'a Workflow,
    reusable_workflows: Vec<JsonReusable<'a>>,
    references: &'a ReferenceIndex,
}

#[derive(Serialize)]
struct JsonReusable<'a> {
    #[serde(flatten)]
    workflow: &'a Workflow,
    references: &'a [Reference],
}

/// Write the whole effective workflow as one pretty-printed JSON document.
pub(crate) fn write_json<W: Write>(effective: &EffectiveWorkflow, mut out: W) -> Result<()> {
    let report = JsonReport {
        workflow: &effective.workflow,
        reusable_workflows: effective
            .reusable_workflows
            .iter()
            .map(|workflow| JsonReusable {
                workflow,
                references: effective.references_to(workflow),
            })
            .collect(),
        references: &effective.references,
    };
    serde_json::to_writer_pretty(&mut out, &report).context("serialize effective workflow")?;
    out.write_all(b"\n").context("write JSON output")?;
    Ok(())
}
