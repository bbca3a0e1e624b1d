//! Terminal output
//!
//! [`TermPresenter`] is the [`Presenter`] used by the binary. It writes to any
//! `io::Write`, so tests can capture what a user would see.

use std::io::{self, Write};

use colored::Colorize;

use crate::core::exec::Presenter;
use crate::core::item::{CommandItem, Host, HostItem, Info, Item};
use crate::core::project::{CommandNode, NodeKind};

pub struct TermPresenter<W: Write> {
    out: W,
    width: usize,
}

impl TermPresenter<io::Stdout> {
    /// Presenter on stdout, wrapping at `wrap_width` or the terminal width,
    /// whichever is smaller
    pub fn stdout(wrap_width: usize) -> Self {
        let width = console::Term::stdout()
            .size_checked()
            .map(|(_, cols)| usize::from(cols).min(wrap_width))
            .unwrap_or(wrap_width);
        Self::new(io::stdout(), width)
    }
}

impl<W: Write> TermPresenter<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(20),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TermPresenter<W> {
    fn children(&mut self, node: &CommandNode) -> io::Result<()> {
        let pad = node
            .subcommands
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0);

        for child in &node.subcommands {
            let name = format!("{:<pad$}", child.name);
            let name = match child.kind {
                NodeKind::Repo => name.blue().bold(),
                _ => name.normal(),
            };
            if child.about.is_empty() {
                writeln!(self.out, "{}", name.to_string().trim_end())?;
            } else {
                writeln!(self.out, "{}  {}", name, child.about.dimmed())?;
            }
        }
        Ok(())
    }

    fn info(&mut self, _item: &Item, info: &Info) -> io::Result<()> {
        writeln!(self.out, "{}", textwrap::fill(info.body.trim_end(), self.width))
    }

    fn targets(&mut self, _item: &Item, command: &CommandItem) -> io::Result<()> {
        writeln!(self.out, "Specify host targets:")?;
        for (alias, definition) in &command.hosts {
            writeln!(
                self.out,
                "  {}: {}",
                alias.green().bold(),
                definition.yellow().bold()
            )?;
        }
        Ok(())
    }

    fn plan(&mut self, item: &Item, command: &str, definition: &str, host: &Host) -> io::Result<()> {
        writeln!(
            self.out,
            "{}: {}\nRuns {} on hosts matching {} ({})\n",
            item.id().blue().bold(),
            item.summary().magenta().bold(),
            command.yellow().bold(),
            definition.green().bold(),
            host.fqdn
        )?;
        self.out.flush()
    }

    fn hosts(&mut self, _item: &Item, hosts: &HostItem) -> io::Result<()> {
        for (name, category) in &hosts.types {
            writeln!(self.out, "{}:", name.cyan().bold())?;
            if !category.summary.is_empty() {
                let summary = textwrap::fill(&category.summary, self.width.saturating_sub(2));
                writeln!(self.out, "{}", textwrap::indent(&summary, "  ").trim_end())?;
            }

            for (index, host) in category.hosts.iter().enumerate() {
                write!(
                    self.out,
                    "  {}{}{} {}",
                    "[".yellow(),
                    index.to_string().bright_yellow().bold(),
                    "]".yellow(),
                    host.fqdn.blue().bold()
                )?;
                if host.primary {
                    write!(self.out, " ({})", "primary".green().bold())?;
                }
                if !host.summary.is_empty() {
                    write!(self.out, " ({})", host.summary.white())?;
                }
                writeln!(self.out)?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }
}

/// Render a command hierarchy as an ASCII tree.
///
/// `depth` limits how many levels below `node` are shown; `None` shows all.
pub fn render_tree(node: &CommandNode, depth: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str(&node.name);
    out.push('\n');
    render_children(node, "", depth, &mut out);
    out
}

fn render_children(node: &CommandNode, prefix: &str, depth: Option<usize>, out: &mut String) {
    if depth == Some(0) {
        return;
    }
    let depth = depth.map(|d| d - 1);

    let count = node.subcommands.len();
    for (i, child) in node.subcommands.iter().enumerate() {
        let last = i + 1 == count;
        let (branch, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&child.name);
        if child.kind == NodeKind::Repo {
            out.push('/');
        }
        out.push('\n');

        render_children(child, &format!("{prefix}{extension}"), depth, out);
    }
}
