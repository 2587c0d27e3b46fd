use clap::Parser;
use rebar_optimizer::config::OptimizerConfig;
use rebar_optimizer::render;
use rebar_optimizer::report::Report;
use rebar_optimizer::solver::{Solver, group_by_diameter};
use rebar_optimizer::types::{BAR_LENGTH, DEFAULT_TRIALS, DemandLine, Diameter};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "rebar_optimizer",
    about = "Rebar cutting stock optimizer for fixed-length stock bars"
)]
struct Cli {
    /// Price per ton of rebar
    #[arg(long, default_value_t = 1000.0)]
    price: f64,

    /// Cut pieces as DIAMETER:LENGTH:QTY (e.g. 16:4.5:6 12:2.75:10)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Stock bar length in meters
    #[arg(long, default_value_t = BAR_LENGTH)]
    bar_length: f64,

    /// Randomized greedy trials per diameter
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: u32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Stop starting new trials after this many milliseconds per diameter
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Show ASCII layout of each bar
    #[arg(long)]
    layout: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(long)]
    verbose: bool,
}

fn parse_cut(s: &str) -> Result<(Diameter, DemandLine), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid cut '{}', expected DIAMETER:LENGTH:QTY", s));
    }
    let diameter = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid diameter in '{}'", s))?;
    let length = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let qty = parts[2]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok((Diameter::new(diameter), DemandLine::new(length, qty)))
}

fn print_report(report: &Report, layout: bool) {
    println!("Ordered pieces:");
    for row in &report.demand {
        println!(
            "  Ø{:<3} {:>7.2} m x {:<4} {:>10.2} kg",
            row.diameter.mm(), row.length, row.quantity, row.weight
        );
    }

    println!("\nWaste bars:");
    for row in &report.waste {
        println!(
            "  Ø{:<3} {:>7.2} m   {:>4} bar{} {:>10.2} kg",
            row.diameter.mm(),
            row.waste_length,
            row.bars,
            if row.bars == 1 { " " } else { "s" },
            row.waste_weight
        );
    }

    println!("\nPurchase:");
    for row in &report.purchase {
        println!(
            "  Ø{:<3} {:>4} bar{} {:>10.2} kg {:>12.2}",
            row.diameter.mm(),
            row.bars,
            if row.bars == 1 { " " } else { "s" },
            row.weight,
            row.cost
        );
    }

    println!("\nCutting instructions:");
    for row in &report.cutting {
        println!("  Ø{:<3} {:>4} x  {}", row.diameter.mm(), row.count, row.pattern);
    }

    if layout {
        for result in &report.results {
            println!("\nØ{} layout:", result.diameter);
            for (i, bar) in result.packing.bars.iter().enumerate() {
                println!("Bar {}:", i + 1);
                print!("{}", render::render_bar(result.packing.capacity, bar));
            }
        }
    }

    let t = &report.totals;
    println!(
        "\nSummary: {} bar{} to buy, {:.2} kg, {:.2} m waste ({:.2} kg), cost {:.2}",
        t.bars,
        if t.bars == 1 { "" } else { "s" },
        t.weight,
        t.waste_length,
        t.waste_weight,
        t.cost,
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::INFO } else { Level::WARN })
        .init();

    let rows: Vec<(Diameter, DemandLine)> = cli
        .cuts
        .iter()
        .map(|c| parse_cut(c))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let config = OptimizerConfig {
        bar_length: cli.bar_length,
        trials: cli.trials,
        seed: cli.seed,
        time_limit_ms: cli.time_limit_ms,
    };

    let solver = Solver::new(config, cli.price, group_by_diameter(rows));
    let report = solver.solve().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    print_report(&report, cli.layout);
}
