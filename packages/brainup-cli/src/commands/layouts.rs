use crate::cli::LayoutsArgs;
use crate::exit_codes;
use crate::output;
use brainup_rs::available_layouts;
use serde::Serialize;

#[derive(Serialize)]
struct LayoutInfo {
    name: &'static str,
    description: &'static str,
    electrodes: usize,
    labels: &'static [&'static str],
}

pub fn execute(args: LayoutsArgs) -> i32 {
    let layouts: Vec<LayoutInfo> = available_layouts()
        .iter()
        .map(|l| LayoutInfo {
            name: l.name,
            description: l.description,
            electrodes: l.len(),
            labels: l.labels,
        })
        .collect();

    if args.json {
        return output::print_json(&layouts);
    }

    println!("Available layouts:\n");
    println!("  {:<10} {:<6} {}", "Name", "Count", "Description");
    println!("  {}", "-".repeat(56));
    for l in &layouts {
        println!("  {:<10} {:<6} {}", l.name, l.electrodes, l.description);
    }
    println!();
    println!("Topomap templates: standard_1020 or any layout name above");

    exit_codes::SUCCESS
}
