// Interactive front end for the report engine.
//
// - Option [1] loads a saved upload response (.json) or a CSV export.
// - Options [2] and [3] pick the factory for the percent and units views;
//   the two choices are independent.
// - Option [4] writes the dashboard JSON and the classification CSV and
//   prints Markdown previews.
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::error;

use production_report::dashboard::{Dashboard, DashboardState, Panel};
use production_report::layout::ReportLayout;
use production_report::loader;
use production_report::output;
use production_report::resolver::factory_options;
use production_report::types::{Category, FactorySelector};
use production_report::{logging, util};

static APP_STATE: Lazy<Mutex<Option<Dashboard>>> = Lazy::new(|| Mutex::new(None));

const DASHBOARD_FILE: &str = "dashboard.json";
const CLASSIFICATION_FILE: &str = "summary_classification.csv";

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

fn with_dashboard<R>(f: impl FnOnce(&mut Dashboard) -> R) -> Option<R> {
    let mut guard = match APP_STATE.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.as_mut().map(f)
}

/// Option [1]: load a report through the file-backed source.
fn handle_load() {
    let path = prompt("Report file (.json or .csv): ");
    let source = match loader::source_for(path.as_str()) {
        Ok(s) => s,
        Err(e) => {
            println!("Error: {}\n", e);
            return;
        }
    };
    let loaded = with_dashboard(|dash| {
        dash.load(&*source);
        (dash.state().clone(), dash.report())
    });
    match loaded {
        Some((DashboardState::Ready, report)) => {
            println!(
                "Report loaded ({} rows received, {} summary rows).\n",
                util::format_int(report.raw.len()),
                util::format_int(report.summary.len())
            );
        }
        Some((DashboardState::NoData { reason }, _)) => {
            println!("No data available: {}\n", reason);
        }
        _ => {}
    }
}

/// Options [2] and [3]: choose a factory for one axis.
fn handle_select(units: bool) {
    let options = with_dashboard(|dash| factory_options(&dash.layout().mapping)).unwrap_or_default();
    for (i, (_, label)) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, label);
    }
    let choice = read_choice();
    let selected = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .map(|(sel, _)| sel.clone())
        .unwrap_or_else(|| FactorySelector::from_key(&choice));
    println!("Selected: {}\n", selected);
    with_dashboard(|dash| {
        if units {
            dash.set_units_selector(selected);
        } else {
            dash.set_percent_selector(selected);
        }
    });
}

/// Option [4]: export and preview every view.
fn handle_generate() {
    let Some((snapshot, rows, supply, supply_low)) = with_dashboard(|dash| {
        let supply = dash.supply_categories().ready();
        let low = supply
            .as_ref()
            .map(|cats| output::supply_items(cats, Category::Low, &dash.layout().supply))
            .unwrap_or_default();
        let counts = supply.map(|cats| cats.counts());
        (dash.snapshot(), dash.classified_rows(), counts, low)
    }) else {
        return;
    };

    if let DashboardState::NoData { reason } = &snapshot.state {
        println!("No data available: {}\n", reason);
    }
    if let Err(e) = output::write_json(DASHBOARD_FILE, &snapshot) {
        error!(error = %e, file = DASHBOARD_FILE, "write failed");
    }
    if let Err(e) = output::write_csv(CLASSIFICATION_FILE, &rows) {
        error!(error = %e, file = CLASSIFICATION_FILE, "write failed");
    }

    println!("Plan completion by summary row ({})\n", snapshot.percent_selector);
    output::preview_table_rows(&rows, rows.len());
    println!("(Full table exported to {})\n", CLASSIFICATION_FILE);

    match &snapshot.percent {
        Panel::Ready(series) => {
            for s in series {
                println!("{}: {} [{}]", s.label, s.title, s.status);
            }
            println!();
        }
        Panel::NoData { reason } => println!("Percent view: no data ({})\n", reason),
    }
    match &snapshot.units {
        Panel::Ready(g) => {
            println!("Actual vs plan ({}):", snapshot.units_selector);
            let points = g
                .labels
                .iter()
                .zip(&g.actual.data)
                .zip(&g.plan.data)
                .zip(&g.statuses);
            for (((label, actual), plan), status) in points {
                println!(
                    "  {}: {} / {} [{}]",
                    label,
                    util::format_number(*actual, 0),
                    util::format_number(*plan, 0),
                    status
                );
            }
            println!();
        }
        Panel::NoData { reason } => println!("Units view: no data ({})\n", reason),
    }

    if let Some(supply) = supply {
        println!(
            "Supply bands: low {}, medium {}, high {}",
            supply.low, supply.medium, supply.high
        );
        if !supply_low.is_empty() {
            output::preview_table_rows(&supply_low, 5);
        }
    }
    println!("(Dashboard exported to {})\n", DASHBOARD_FILE);
}

fn main() {
    logging::init();

    let layout = match ReportLayout::from_env() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to read layout: {}", e);
            std::process::exit(1);
        }
    };
    let dashboard = match Dashboard::new(layout) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid layout: {}", e);
            std::process::exit(1);
        }
    };
    if let Ok(mut state) = APP_STATE.lock() {
        *state = Some(dashboard);
    }

    loop {
        println!("Production report");
        println!("[1] Load report");
        println!("[2] Factory for percent view");
        println!("[3] Factory for units view");
        println!("[4] Generate charts");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(),
            "2" => handle_select(false),
            "3" => handle_select(true),
            "4" => {
                println!();
                handle_generate();
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-4.\n"),
        }
    }
}
