// Copyright (c) 2025 knix
// All rights reserved.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use itertools::Itertools;
use jitclass::JitEngine;
use jitclass::config::EngineConfig;
use jitclass::prelude::register_prelude;
use log::info;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the prelude classes
    Classes,
    /// Specialize a prelude class and print its layout
    Layout {
        /// Class name, e.g. Pair
        class: String,
        /// Comma separated type arguments, e.g. int,List[float]
        args: Option<String>,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log specialization activity
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Interpret every method instead of caching its lowered form
    #[arg(long, default_value_t = false)]
    pub no_compile: bool,

    /// Lower methods as soon as a specialization is published
    #[arg(long, default_value_t = false)]
    pub eager: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let l = Box::leak(Box::new(
        env_logger::Builder::new()
            .format_timestamp(None)
            .filter_level(log::LevelFilter::Trace)
            .build(),
    ));
    log::set_logger(l).map_err(|e| anyhow::anyhow!("{e}"))?;
    log::set_max_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn });

    let mut config = EngineConfig::from_env();
    if args.no_compile {
        config.compile_methods = false;
    }
    if args.eager {
        config.eager_compile = true;
    }
    info!("{:?}", config);
    let mut engine = JitEngine::new(config);
    register_prelude(&mut engine)?;

    let code = match &args.command {
        Command::Classes => {
            for (_, decl) in engine.classes() {
                let params = decl.params.iter().map(|p| p.name.as_str()).join(", ");
                let name = engine.idents.get_name(decl.name);
                if params.is_empty() {
                    println!("{}", name.green());
                } else {
                    println!("{}[{}]", name.green(), params.cyan());
                }
            }
            ExitCode::SUCCESS
        }
        Command::Layout { class, args } => {
            match engine.specialize_named(class, args.as_deref().unwrap_or("")) {
                Ok(spec) => {
                    let dump = engine.dump_specialization(spec);
                    let mut lines = dump.lines();
                    if let Some(header) = lines.next() {
                        println!("{}", header.bold());
                    }
                    for line in lines {
                        println!("{line}");
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{} {}: {}", "error".red(), e.kind, e.message);
                    ExitCode::FAILURE
                }
            }
        }
    };
    engine.log_state();
    Ok(code)
}
