// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the “License”);
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an “AS IS” BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the MIND project (Machine Intelligence Native Design).

//! MIND runtime driver: backend parity checks, job inspection, and op
//! listing.

use std::fs;
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mind_runtime::conformance::{make_add_job, run_parity_suite};
use mind_runtime::ops::runtime_ops;
use mind_runtime::tensor::format_tensor_human;
use mind_runtime::{Job, Tensor};

#[derive(Parser, Debug)]
#[command(author, about = None, long_about = None, disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Print the runtime version.
    #[arg(long, action = ArgAction::SetTrue)]
    version: bool,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the compiled-vs-reference backend parity suite.
    Parity {
        /// Seed for the uniform input cases.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Build the standard add job and print its graph, plan, and a
    /// sample run over all-ones inputs.
    Describe {
        /// Backend to build against (reference|compiled).
        #[arg(long, value_name = "BACKEND", default_value = "compiled")]
        backend: String,
        /// Input shape as comma-separated dims.
        #[arg(long, value_name = "DIMS", default_value = "2,10,2")]
        shape: String,
        /// Write the job spec JSON to this path.
        #[arg(long, value_name = "FILE")]
        emit_spec: Option<String>,
    },
    /// List the ops this runtime executes.
    Ops,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.version {
        println!("mindrt {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match cli.command {
        Some(Command::Parity { seed }) => run_parity(seed),
        Some(Command::Describe {
            backend,
            shape,
            emit_spec,
        }) => run_describe(&backend, &shape, emit_spec.as_deref()),
        Some(Command::Ops) => run_ops(),
        None => {
            eprintln!("error[cli]: expected a subcommand (parity|describe|ops)");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let env_filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn run_parity(seed: u64) {
    match run_parity_suite(seed) {
        Ok(()) => {
            println!("backend parity passed (seed = {seed})");
        }
        Err(err) => {
            eprintln!("parity failures detected:");
            for failure in err.0.iter() {
                eprintln!("- {failure}");
            }
            process::exit(1);
        }
    }
}

fn run_describe(backend: &str, shape: &str, emit_spec: Option<&str>) {
    let use_compiled = match parse_backend(backend) {
        Ok(flag) => flag,
        Err(msg) => {
            eprintln!("error[backend]: {msg}");
            process::exit(1);
        }
    };

    let shape = match parse_shape(shape) {
        Ok(shape) => shape,
        Err(msg) => {
            eprintln!("error[shape]: {msg}");
            process::exit(1);
        }
    };

    let job = match make_add_job("add_job", &shape, use_compiled) {
        Ok(job) => job,
        Err(err) => {
            eprintln!("error[build]: {err}");
            process::exit(1);
        }
    };

    println!("job: {} (backend = {})", job.name(), job.backend());
    println!("digest: {}", job.spec().digest());
    print!("{}", job.graph());
    if let Some(plan) = job.plan() {
        print!("{plan}");
    }

    let ones = Tensor::ones(&shape);
    match job.run(&[ones.clone(), ones]) {
        Ok(out) => println!("run(ones, ones) = {}", format_tensor_human(&out)),
        Err(err) => {
            eprintln!("error[run]: {err}");
            process::exit(1);
        }
    }

    if let Some(path) = emit_spec {
        if let Err(err) = write_spec(&job, path) {
            eprintln!("error[spec]: {err:#}");
            process::exit(1);
        }
        println!("spec written to {path}");
    }
}

fn run_ops() {
    for op in runtime_ops() {
        println!("{:<10} arity={}  {}", op.name, op.arity, op.summary);
    }
}

fn write_spec(job: &Job, path: &str) -> anyhow::Result<()> {
    let json = job
        .spec()
        .to_json()
        .context("failed to serialize job spec")?;
    fs::write(path, json).with_context(|| format!("unable to write {path}"))?;
    Ok(())
}

fn parse_backend(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "reference" => Ok(false),
        "compiled" => Ok(true),
        other => Err(format!(
            "unknown backend '{other}' (expected reference|compiled)"
        )),
    }
}

fn parse_shape(raw: &str) -> Result<Vec<usize>, String> {
    let mut dims = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        let dim: usize = part
            .parse()
            .map_err(|_| format!("invalid dimension '{part}' in shape '{raw}'"))?;
        dims.push(dim);
    }
    Ok(dims)
}
