//! Parsing logic for the node config

use std::{env, fs};

use clap::Parser;
use toml::{Value, map::Map};

use crate::{Cli, NodeConfig, validate_config};

/// The CLI argument name for the config file
const CONFIG_FILE_ARG: &str = "--config-file";

/// Parses command line args into the node config
///
/// Configurations may come from both a config file and overrides on the
/// command line directly. To support this, we first read configuration
/// options from the config file, prepend them to the cli args string, and
/// parse with the config file args first so that the command line takes
/// precedence.
pub fn parse_command_line_args() -> Result<NodeConfig, String> {
    // The first argument from the command line is the executable name, so
    // place it before the config file args, then the rest of the command line
    let mut command_line_args: Vec<String> =
        env::args_os().map(|val| val.to_string_lossy().to_string()).collect();
    let config_file_args = config_file_args(&command_line_args)?;

    let mut full_args = vec![command_line_args.remove(0)];
    full_args.extend(config_file_args);
    full_args.extend(command_line_args);

    let cli = Cli::parse_from(full_args);
    parse_config_from_args(cli)
}

/// Parse a config entirely from a file
pub fn parse_config_from_file(path: &str) -> Result<NodeConfig, String> {
    let mut file_args = read_config_file(path)?;
    file_args.insert(0, "dummy-program-name".to_string());
    let cli = Cli::parse_from(file_args);
    parse_config_from_args(cli)
}

/// Parse the config from a set of command line arguments
///
/// Separating out this functionality allows us to easily inject custom args
/// apart from what is specified on the command line
pub(crate) fn parse_config_from_args(cli_args: Cli) -> Result<NodeConfig, String> {
    let config = NodeConfig {
        matching_interval: cli_args.matching_interval,
        chain_poll_interval: cli_args.chain_poll_interval,
        proof_threads: cli_args.proof_threads,
        bind_addr: cli_args.bind_addr,
        http_port: cli_args.http_port,
        debug: cli_args.debug,
    };

    validate_config(&config)?;
    Ok(config)
}

/// Parse args from a config file if one is given on the command line
fn config_file_args(cli_args: &[String]) -> Result<Vec<String>, String> {
    // Find a match for the config file argument; the next argument is the
    // file to read from
    let mut found = false;
    let mut index = 0;

    for arg in cli_args.iter() {
        index += 1;
        if arg == CONFIG_FILE_ARG {
            found = true;
            break;
        }
    }

    // No config file found
    if !found {
        return Ok(vec![]);
    }
    read_config_file(&cli_args[index])
}

/// Read a TOML config file into CLI-style arguments
fn read_config_file(path: &str) -> Result<Vec<String>, String> {
    let file_contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    let config_kv_pairs: Map<_, _> =
        toml::from_str(&file_contents).map_err(|err| err.to_string())?;

    let mut config_file_args: Vec<String> = Vec::with_capacity(config_kv_pairs.len());
    for (toml_key, value) in config_kv_pairs.iter() {
        // Format the TOML key into --key
        let cli_arg = format!("--{}", toml_key);
        let cli_values = parse_toml_value(cli_arg, value)?;
        config_file_args.extend(cli_values);
    }

    Ok(config_file_args)
}

// ----------------
// | TOML Parsing |
// ----------------

/// Parse a toml value into a list of strings to append to the CLI args
fn parse_toml_value(cli_arg: String, val: &Value) -> Result<Vec<String>, String> {
    let values: Vec<String> = match val {
        Value::Boolean(b) => toml_boolean_to_args(cli_arg, *b),
        Value::Array(arr) => toml_array_to_args(&cli_arg, arr)?,
        x => toml_value_to_args(cli_arg, x)?,
    };

    Ok(values)
}

/// Parse a toml boolean into a string that is CLI compatible
///
/// This will be "--key" if the boolean is true, otherwise it will be empty
fn toml_boolean_to_args(cli_arg: String, b: bool) -> Vec<String> {
    if b { vec![cli_arg] } else { vec![] }
}

/// Parse a toml array into a string that is CLI compatible
///
/// This will be "--arg val1 --arg val2 --arg val3"
fn toml_array_to_args(cli_arg: &str, arr: &[Value]) -> Result<Vec<String>, String> {
    let mut res: Vec<String> = Vec::new();
    for val in arr.iter() {
        res.push(cli_arg.to_string());
        res.push(toml_value_to_string(val)?);
    }

    Ok(res)
}

/// Parse a toml value into a string that is CLI compatible
fn toml_value_to_args(cli_arg: String, val: &Value) -> Result<Vec<String>, String> {
    let value_str = toml_value_to_string(val)?;
    Ok(vec![cli_arg, value_str])
}

/// Helper method to convert a toml value to a string
fn toml_value_to_string(val: &Value) -> Result<String, String> {
    Ok(match val {
        Value::String(val) => val.clone(),
        Value::Integer(val) => format!("{:?}", val),
        Value::Float(val) => format!("{:?}", val),
        Value::Boolean(val) => format!("{:?}", val),
        _ => {
            return Err("unsupported value".to_string());
        },
    })
}
