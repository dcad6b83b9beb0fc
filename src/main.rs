// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! mountctl entry point.
//!
//! Offline inspection of the keys, annotations and configuration used by
//! the workspace mounts controller.

mod cli_parser;

use std::path::PathBuf;
use std::process::ExitCode;

use workspace_mounts::k8s::keys::{decode_resource_key, split_cluster_aware_key};
use workspace_mounts::k8s::validation::validate_cluster_path;
use workspace_mounts::k8s::Mount;
use workspace_mounts::telemetry::init_tracing;
use workspace_mounts::MountsConfig;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    init_tracing(args.iter().any(|a| a == "--json"));

    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    match command {
        "key" => run_key(args.get(2)),
        "mount" => run_mount(args.get(2)),
        "config" => run_config(&args),
        "help" | "--help" | "-h" => {
            if let Some(sub) = args.get(2) {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("mountctl {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run_key(key: Option<&String>) -> ExitCode {
    let Some(key) = key else {
        cli_parser::print_command_help("key");
        return ExitCode::FAILURE;
    };
    let (gvr, object_key) = match decode_resource_key(key) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Key would be dropped: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("group:     {}", gvr.group);
    println!("version:   {}", gvr.version);
    println!("resource:  {}", gvr.resource);
    match split_cluster_aware_key(object_key) {
        Ok((cluster, namespace, name)) => {
            match validate_cluster_path(cluster.as_str()) {
                Ok(()) => println!("cluster:   {}", cluster),
                Err(e) => println!("cluster:   {} ({})", cluster, e),
            }
            println!("namespace: {}", namespace);
            println!("name:      {}", name);
        }
        Err(e) => println!("object:    {} ({})", object_key, e),
    }
    ExitCode::SUCCESS
}

fn run_mount(raw: Option<&String>) -> ExitCode {
    let Some(raw) = raw else {
        cli_parser::print_command_help("mount");
        return ExitCode::FAILURE;
    };
    match Mount::parse_annotation(raw) {
        Ok(mount) => {
            println!("watches:   {}", mount.reference.group_version_kind());
            if !mount.reference.namespace.is_empty() {
                println!("namespace: {}", mount.reference.namespace);
            }
            println!("name:      {}", mount.reference.name);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid mount annotation: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_config(args: &[String]) -> ExitCode {
    let sub = args.get(2).map(|s| s.as_str()).unwrap_or("show");
    let path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match MountsConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2u8);
        }
    };

    match sub {
        "show" => match config.to_toml() {
            Ok(rendered) => {
                print!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                ExitCode::from(2u8)
            }
        },
        "validate" => {
            println!("Configuration OK");
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown config subcommand: {}", sub);
            cli_parser::print_command_help("config");
            ExitCode::FAILURE
        }
    }
}
