//! Command-line runner for the freefall engine.
//!
//! Runs the reference 39 km jump (or a scenario given as six positional
//! numbers: mass, initial height, body area, parachute area, deploy
//! altitude, transition time) and prints the sampled trajectory.
//! Pass `--json` to dump the full result as JSON instead.

use std::env;
use std::process::ExitCode;

use freefall::{simulate_jump, JumpParameters, SimulationResult};

fn main() -> ExitCode {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    args.retain(|a| a != "--json");

    let params = match parse_params(&args) {
        Ok(params) => params,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match simulate_jump(&params) {
        Ok(result) => {
            if as_json {
                match serde_json::to_string_pretty(&result) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        eprintln!("failed to serialize result: {err}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_table(&result);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("simulation failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_params(args: &[String]) -> Result<JumpParameters, String> {
    if args.is_empty() {
        // Reference scenario: 39 km stratospheric jump.
        return Ok(JumpParameters {
            mass: 104.0,
            initial_height: 39_000.0,
            area: 0.5,
            area_parachute: 25.0,
            deploy_altitude: 1_500.0,
            transition_time: 4.0,
        });
    }

    if args.len() != 6 {
        return Err(
            "usage: freefall [--json] [mass initial_height area area_parachute \
             deploy_altitude transition_time]"
                .to_string(),
        );
    }

    let mut values = [0.0f64; 6];
    for (slot, arg) in values.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| format!("not a number: {arg}"))?;
    }

    Ok(JumpParameters {
        mass: values[0],
        initial_height: values[1],
        area: values[2],
        area_parachute: values[3],
        deploy_altitude: values[4],
        transition_time: values[5],
    })
}

fn print_table(result: &SimulationResult) {
    println!(
        "{:>9} {:>11} {:>10} {:>10} {:>7} {:>6} {:>8}",
        "time[s]", "alt[m]", "vel[m/s]", "acc[m/s2]", "mach", "cd", "deploy"
    );
    for i in 0..result.len() {
        println!(
            "{:>9.2} {:>11.2} {:>10.2} {:>10.3} {:>7.3} {:>6.3} {:>8.3}",
            result.time[i],
            result.altitude[i],
            result.velocity[i],
            result.acceleration[i],
            result.mach_number[i],
            result.drag_coefficient[i],
            result.deployment_progress[i],
        );
    }
    println!(
        "\n{} samples, average time step {:.4}s",
        result.len(),
        result.average_time_step
    );
}
