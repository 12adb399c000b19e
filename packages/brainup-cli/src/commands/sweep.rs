use super::report;
use crate::cli::SweepArgs;
use crate::exit_codes;
use crate::output;
use brainup_rs::{BrainupConfig, SessionStore, Sweeper};
use std::sync::Arc;

pub async fn execute(args: SweepArgs) -> i32 {
    let mut config = match BrainupConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    if let Some(dir) = args.data_dir {
        config.store.data_dir = dir.into();
    }

    let store = match SessionStore::open(config.store) {
        Ok(store) => Arc::new(store),
        Err(e) => return report(&e),
    };

    if args.watch {
        let handle = Sweeper::from_store(Arc::clone(&store)).start();
        eprintln!("Sweeping {} (Ctrl-C to stop)", store.data_dir().display());
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
        }
        handle.shutdown().await;
        return exit_codes::SUCCESS;
    }

    let outcome = match store.sweep() {
        Ok(r) => r,
        Err(e) => return report(&e),
    };

    if args.json {
        return output::print_json(&outcome);
    }

    println!(
        "Removed {} files, dropped {} records, purged {} sessions ({} tracked files remain)",
        outcome.files_removed,
        outcome.records_dropped,
        outcome.sessions_purged,
        store.records().len()
    );
    exit_codes::SUCCESS
}
