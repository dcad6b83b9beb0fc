// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Help text for mountctl.

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "mountctl - workspace mounts inspection tool v{}

USAGE:
    mountctl [COMMAND] [OPTIONS]

COMMANDS:
    key          Decode a resource queue key
    mount        Parse and validate a mount annotation
    config       Show or validate the controller configuration
    version      Show version information
    help         Show this help message

OPTIONS:
    -h, --help     Show help for command
    -V, --version  Show version information
    --json         Log as JSON

EXAMPLES:
    mountctl key 'kubeclusters.v1alpha1.proxy.example.io::root:org|proxy-cluster'
    mountctl mount '{{\"reference\":{{\"version\":\"v1\",\"kind\":\"Thing\",\"name\":\"t\"}}}}'
    mountctl config show
    mountctl config validate --config /etc/mounts.toml

ENVIRONMENT:
    MOUNTS_CONFIG               Config file path
    MOUNTS_WORKERS              Resource queue workers
    MOUNTS_DRIFT_INTERVAL_SECS  Drift poll period
    MOUNTS_READINESS_POLL_MS    Readiness check period
    MOUNTS_BACKOFF_BASE_MS      First retry delay
    MOUNTS_BACKOFF_MAX_SECS     Retry delay cap
    RUST_LOG                    Log level (debug, info, warn, error)

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "key" => print_key_help(),
        "mount" => print_mount_help(),
        "config" => print_config_help(),
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'mountctl help' for general usage.",
                command
            );
        }
    }
}

fn print_key_help() {
    eprintln!(
        "mountctl key - Decode a resource queue key

USAGE:
    mountctl key <KEY>

DESCRIPTION:
    Splits '<resource>.<version>.<group>::<cluster>|<namespace>/<name>'
    into its parts. Keys the router would drop exit with code 1.
"
    );
}

fn print_mount_help() {
    eprintln!(
        "mountctl mount - Parse a mount annotation

USAGE:
    mountctl mount <JSON>

DESCRIPTION:
    Parses the value of the experimental.tenancy.kcp.io/mount annotation
    and prints the kind that would be watched.
"
    );
}

fn print_config_help() {
    eprintln!(
        "mountctl config - Controller configuration

USAGE:
    mountctl config <show|validate> [--config FILE]

SUBCOMMANDS:
    show       Print the effective configuration as TOML
    validate   Check the configuration (exit 2 if invalid)
"
    );
}
