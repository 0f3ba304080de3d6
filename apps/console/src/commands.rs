use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use larkcore_query::{InsertSide, LevelBound, SearchCriterion};
use larkd::{Command, HighlightWindow};

pub(crate) enum Directive {
    Service(Command),
    SaveFile(PathBuf),
    Status,
    Help,
    Quit,
}

pub(crate) struct DirectiveHelp {
    pub(crate) usage: &'static str,
    pub(crate) description: &'static str,
}

pub(crate) const DIRECTIVES: [DirectiveHelp; 14] = [
    DirectiveHelp {
        usage: "/refresh",
        description: "Reload the save, converting only if it changed",
    },
    DirectiveHelp {
        usage: "/reconvert",
        description: "Reload the save and force conversion",
    },
    DirectiveHelp {
        usage: "/tames",
        description: "Browse tamed creatures",
    },
    DirectiveHelp {
        usage: "/wild",
        description: "Back to the saved wild searches",
    },
    DirectiveHelp {
        usage: "/select 0 2 ..",
        description: "Show results for these searches",
    },
    DirectiveHelp {
        usage: "/add <species> [group]",
        description: "Save a new search",
    },
    DirectiveHelp {
        usage: "/remove <n>",
        description: "Delete a saved search",
    },
    DirectiveHelp {
        usage: "/drop <n> before|after <m>",
        description: "Move search n next to search m",
    },
    DirectiveHelp {
        usage: "/level <n> min|max up|down",
        description: "Step a level bound",
    },
    DirectiveHelp {
        usage: "/gender <n> next|prev",
        description: "Cycle the gender filter",
    },
    DirectiveHelp {
        usage: "/save <path>",
        description: "Switch to another save file",
    },
    DirectiveHelp {
        usage: "/status",
        description: "Print status, searches and results",
    },
    DirectiveHelp {
        usage: "/help",
        description: "List directives",
    },
    DirectiveHelp {
        usage: "/quit",
        description: "Exit",
    },
];

pub(crate) fn parse_directive(input: &str) -> anyhow::Result<Directive> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(Directive::Service(Command::SearchTextChanged {
            text: trimmed.to_string(),
            window: HighlightWindow::Fast,
        }));
    }

    let mut tokens = trimmed.split_whitespace();
    let name = tokens.next().unwrap_or("").to_ascii_lowercase();
    let args: Vec<&str> = tokens.collect();

    let command = match name.as_str() {
        "/refresh" => Command::Refresh { force: false },
        "/reconvert" => Command::Refresh { force: true },
        "/tames" | "/tamed" => Command::ShowTames,
        "/wild" => Command::ShowWild,
        "/select" => Command::SelectSearches(
            args.iter()
                .map(|arg| parse_index(arg))
                .collect::<anyhow::Result<_>>()?,
        ),
        "/add" => {
            let Some((species, group)) = args.split_first() else {
                bail!("usage: /add <species> [group]");
            };
            Command::AddSearch(SearchCriterion {
                group: group.join(" "),
                ..SearchCriterion::for_species(*species)
            })
        }
        "/remove" => Command::RemoveSearch(parse_index(single_arg(&args, "/remove <n>")?)?),
        "/drop" => {
            let [source, side, target] = args.as_slice() else {
                bail!("usage: /drop <n> before|after <m>");
            };
            let side = match side.to_ascii_lowercase().as_str() {
                "before" => InsertSide::Before,
                "after" => InsertSide::After,
                other => bail!("expected before or after, got {other}"),
            };
            Command::DropSearch {
                source: parse_index(source)?,
                target: parse_index(target)?,
                side,
            }
        }
        "/level" => {
            let [index, bound, direction] = args.as_slice() else {
                bail!("usage: /level <n> min|max up|down");
            };
            let bound = match bound.to_ascii_lowercase().as_str() {
                "min" => LevelBound::Min,
                "max" => LevelBound::Max,
                other => bail!("expected min or max, got {other}"),
            };
            Command::StepLevel {
                index: parse_index(index)?,
                bound,
                delta: parse_direction(direction)?,
            }
        }
        "/gender" => {
            let [index, direction] = args.as_slice() else {
                bail!("usage: /gender <n> next|prev");
            };
            Command::StepGender {
                index: parse_index(index)?,
                delta: parse_direction(direction)?,
            }
        }
        "/save" => {
            if args.is_empty() {
                bail!("usage: /save <path>");
            }
            return Ok(Directive::SaveFile(PathBuf::from(args.join(" "))));
        }
        "/status" | "/list" => return Ok(Directive::Status),
        "/help" | "/" => return Ok(Directive::Help),
        "/quit" | "/exit" => return Ok(Directive::Quit),
        other => bail!("unknown directive {other}, try /help"),
    };

    Ok(Directive::Service(command))
}

fn single_arg<'a>(args: &[&'a str], usage: &str) -> anyhow::Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(anyhow!("usage: {usage}")),
    }
}

fn parse_index(token: &str) -> anyhow::Result<usize> {
    token
        .parse()
        .with_context(|| format!("expected a search number, got {token}"))
}

fn parse_direction(token: &str) -> anyhow::Result<i32> {
    match token.to_ascii_lowercase().as_str() {
        "up" | "next" | "+" => Ok(1),
        "down" | "prev" | "-" => Ok(-1),
        other => Err(anyhow!("expected a direction, got {other}")),
    }
}
