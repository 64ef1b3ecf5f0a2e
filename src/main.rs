mod app;
mod average;
mod capture;
mod config;
mod constants;
mod engine;
mod error;
mod history;
mod level;
mod machine;
mod state;
mod thresholds;
mod ui;

use clap::Parser;
use dialoguer::{Select, theme::ColorfulTheme};

fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let device_list = capture::list_input_devices()?;

    if device_list.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    // Interactive selection
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an audio input device")
        .items(&device_list)
        .default(0)
        .interact()?;

    println!("{}", device_list[selection]);

    Ok(())
}

fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Warn);
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .init();
}

fn print_average(report: &app::AverageReport, quiet: bool, export: bool) {
    let average = report
        .average
        .as_ref()
        .map(|avg| level::format_db(*avg))
        .unwrap_or_else(|_| constants::ui::NO_AVERAGE.to_string());

    if quiet {
        println!("{}", average);
        println!("{}", report.lives_lost);
    } else {
        println!("Average dB level: {}", average);
        println!("Readings: {}", report.readings);
        println!("Lives lost: {} ({} left)", report.lives_lost, report.lives);
    }

    if export && !report.export.is_empty() {
        println!("{}", report.export);
    }
}

#[tokio::main]
async fn main() {
    use app::ExitCode;
    use config::{Args, Commands};

    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Commands::Play(play_args) => {
            let config = match config::Config::from_meter_args(&play_args.meter) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            };

            match app::App::new_with_config(config) {
                Ok(app) => {
                    let run_result = app.run().await;
                    match run_result.result {
                        Ok(_) => {
                            std::process::exit(run_result.exit_code as i32);
                        }
                        Err(e) => {
                            eprintln!("Application error: {}", e);
                            std::process::exit(ExitCode::Error as i32);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Setup error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            }
        }
        Commands::List(_) => {
            if let Err(e) = list_devices() {
                eprintln!("Error listing devices: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }
        }
        Commands::Average(average_args) => {
            let config = match config::Config::from_meter_args(&average_args.meter)
                .and_then(|c| config::validate_seconds(average_args.seconds).map(|_| c))
            {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            };

            match app::run_average(&config, average_args.seconds).await {
                Ok(report) => print_average(&report, average_args.quiet, average_args.export),
                Err(e) => {
                    eprintln!("Error during monitoring: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            }
        }
    }
}
