use std::path::PathBuf;

use clap::{Args, Subcommand};
use daily_challenge_core::{Catalog, ProblemPool};

use super::{catalog_path, load, print_json, CliResult};

#[derive(Args)]
pub struct ImportArgs {
    /// Catalog file (defaults to catalog.problems_file)
    path: Option<PathBuf>,
    /// Write the de-duplicated catalog to this file instead of importing
    #[arg(long)]
    dedupe_to: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ProblemsAction {
    /// List problems
    List {
        /// Only problems not yet posted
        #[arg(long)]
        unused: bool,
    },
    /// Total and unused counts
    Count,
}

pub fn import(args: ImportArgs) -> CliResult {
    let (config, db) = load()?;
    let path = catalog_path(args.path.as_ref().unwrap_or(&config.catalog.problems_file));
    let catalog = Catalog::load(&path)?;

    if let Some(out) = args.dedupe_to {
        let deduped = catalog.dedupe();
        std::fs::write(&out, deduped.to_yaml_string()?)?;
        println!(
            "wrote {} of {} problems to {}",
            deduped.len(),
            catalog.len(),
            out.display()
        );
        return Ok(());
    }

    let summary = catalog.import(db.conn())?;
    print_json(&summary)
}

pub fn run(action: ProblemsAction) -> CliResult {
    let (_, db) = load()?;
    let pool = ProblemPool::new(db.conn());
    match action {
        ProblemsAction::List { unused } => print_json(&pool.list(unused)?),
        ProblemsAction::Count => print_json(&pool.counts()?),
    }
}
