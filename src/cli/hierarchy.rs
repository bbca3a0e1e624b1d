//! Command hierarchy as clap commands
//!
//! Repositories are only known at runtime, so their commands are built with
//! the clap builder API from the projected [`CommandNode`] tree. Every node
//! takes trailing free arguments, which are handed to the node's action.

use std::collections::HashSet;

use clap::{Arg, ArgMatches, Command};

use crate::core::project::CommandNode;

const ARGS: &str = "args";

/// Build the clap command for a node and everything below it.
pub fn to_clap(node: &CommandNode) -> Command {
    let mut cmd = Command::new(node.name.clone())
        .about(node.about.clone())
        .disable_help_subcommand(true)
        .arg(
            Arg::new(ARGS)
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Arguments for the entry"),
        );

    let mut taken: HashSet<&str> = node.names().into_iter().collect();
    for child in &node.subcommands {
        let mut sub = to_clap(child);
        if let Some(alias) = &child.alias {
            // names win over aliases, earlier aliases over later ones
            if taken.insert(alias.as_str()) {
                sub = sub.visible_alias(alias.clone());
            }
        }
        cmd = cmd.subcommand(sub);
    }
    cmd
}

/// Walk parsed matches down to the invoked node.
///
/// Returns the names of the subcommands taken below the root, and the free
/// arguments given to the last one.
pub fn route(matches: &ArgMatches) -> (Vec<String>, Vec<String>) {
    let mut path = Vec::new();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        path.push(name.to_string());
        current = sub;
    }

    let args = current
        .get_many::<String>(ARGS)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    (path, args)
}
