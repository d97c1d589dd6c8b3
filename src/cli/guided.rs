//! Interactive prompts for the evaluate command.

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use std::path::Path;

use super::evaluate::EvalMode;
use crate::eval::{BugCase, Selection};

#[derive(Debug, Clone, PartialEq)]
pub struct GuidedPlan {
    pub selection: Selection,
    pub mode: EvalMode,
    pub loops: usize,
}

pub fn choose_guided_plan(home: &Path, cases: &[BugCase]) -> Result<GuidedPlan> {
    print_preview(home, cases);
    let theme = ColorfulTheme::default();

    let items = ["All bugs", "Random sample", "Pick bugs"];
    let selection = match Select::with_theme(&theme)
        .with_prompt("Which bugs should be evaluated?")
        .default(0)
        .items(&items)
        .interact()?
    {
        0 => Selection::All,
        1 => {
            let count: usize = Input::with_theme(&theme)
                .with_prompt("How many bugs?")
                .default(cases.len().min(10))
                .interact_text()?;
            Selection::Random { count, seed: None }
        }
        _ => {
            let labels: Vec<String> = cases.iter().map(|c| format!("bug-{}", c.bug_id)).collect();
            let picked = MultiSelect::with_theme(&theme).with_prompt("Select bugs").items(&labels).interact()?;
            let ids: Vec<u64> = picked.into_iter().filter_map(|idx| cases.get(idx)).map(|c| c.bug_id).collect();
            if ids.is_empty() {
                Selection::All
            } else {
                Selection::Ids(ids)
            }
        }
    };

    let modes = ["Enhanced (GUI signals)", "Base (text only)", "Compare enhanced vs base"];
    let mode = match Select::with_theme(&theme).with_prompt("Ranking mode").default(0).items(&modes).interact()? {
        0 => EvalMode::Enhanced,
        1 => EvalMode::Base,
        _ => EvalMode::Compare,
    };

    let loops: usize = Input::with_theme(&theme).with_prompt("Number of loops").default(1).interact_text()?;

    Ok(GuidedPlan { selection, mode, loops: loops.max(1) })
}

fn print_preview(home: &Path, cases: &[BugCase]) {
    println!();
    println!("Dataset at {}", home.display());
    println!("  Bugs found: {}", cases.len());
    let preview = cases.iter().take(8).map(|c| format!("bug-{}", c.bug_id)).collect::<Vec<_>>().join(", ");
    if !preview.is_empty() {
        let more = if cases.len() > 8 { ", ..." } else { "" };
        println!("  Cases:      {preview}{more}");
    }
    println!();
}
