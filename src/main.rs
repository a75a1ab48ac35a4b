//! Thin CLI front-end: parses `numOfNodes` and `N`, installs the tracing
//! subscriber, and runs one [`overlay_net::network::Network`] simulation.
//!
//! This binary is deliberately minimal (§4.3 of the spec): everything it
//! does beyond argument parsing and logging setup belongs to the library.

use std::process::ExitCode;

use overlay_net::network::Network;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (num_of_nodes, n) = match parse_args(std::env::args().skip(1).collect()) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: overlay-sim <numOfNodes> <N>");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start Tokio runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    let network = Network::new(num_of_nodes, n);
    match runtime.block_on(network.run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("simulation failed: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Parses `numOfNodes`/`N` as either two positionals (`5 2`) or the
/// `--num-of-nodes`/`--n` long forms, each accepting `--flag=value` or
/// `--flag value`.
fn parse_args(args: Vec<String>) -> Result<(usize, usize), String> {
    let mut num_of_nodes: Option<usize> = None;
    let mut n: Option<usize> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(rest) => {
                let (key, inline_value) = match rest.split_once('=') {
                    Some((key, value)) => (key.to_string(), Some(value.to_string())),
                    None => (rest.to_string(), None),
                };
                let value = match inline_value {
                    Some(value) => value,
                    None => iter.next().ok_or_else(|| format!("missing value for --{key}"))?,
                };
                match key.as_str() {
                    "num-of-nodes" => {
                        num_of_nodes =
                            Some(value.parse::<usize>().map_err(|_| format!("invalid numOfNodes: {value}"))?);
                    }
                    "n" => {
                        n = Some(value.parse::<usize>().map_err(|_| format!("invalid N: {value}"))?);
                    }
                    other => return Err(format!("unrecognized flag: --{other}")),
                }
            }
            None => positional.push(arg),
        }
    }

    match (num_of_nodes, n, positional.len()) {
        (Some(num_of_nodes), Some(n), 0) => Ok((num_of_nodes, n)),
        (Some(num_of_nodes), None, 1) => {
            let n = positional[0].parse::<usize>().map_err(|_| format!("invalid N: {}", positional[0]))?;
            Ok((num_of_nodes, n))
        }
        (None, Some(n), 1) => {
            let num_of_nodes = positional[0]
                .parse::<usize>()
                .map_err(|_| format!("invalid numOfNodes: {}", positional[0]))?;
            Ok((num_of_nodes, n))
        }
        (None, None, 2) => {
            let num_of_nodes = positional[0]
                .parse::<usize>()
                .map_err(|_| format!("invalid numOfNodes: {}", positional[0]))?;
            let n = positional[1].parse::<usize>().map_err(|_| format!("invalid N: {}", positional[1]))?;
            Ok((num_of_nodes, n))
        }
        (None, None, count) => Err(format!("expected 2 arguments, got {count}")),
        _ => Err("mix of --flags and positional arguments is ambiguous".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_positional_integers() {
        assert_eq!(parse_args(vec!["5".into(), "2".into()]), Ok((5, 2)));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        assert!(parse_args(vec!["5".into()]).is_err());
    }

    #[test]
    fn rejects_non_numeric_arguments() {
        assert!(parse_args(vec!["five".into(), "2".into()]).is_err());
    }

    #[test]
    fn parses_long_flags_with_equals() {
        assert_eq!(
            parse_args(vec!["--num-of-nodes=5".into(), "--n=2".into()]),
            Ok((5, 2))
        );
    }

    #[test]
    fn parses_long_flags_with_separate_values() {
        assert_eq!(
            parse_args(vec!["--num-of-nodes".into(), "5".into(), "--n".into(), "2".into()]),
            Ok((5, 2))
        );
    }

    #[test]
    fn parses_one_flag_and_one_positional() {
        assert_eq!(parse_args(vec!["--num-of-nodes=5".into(), "2".into()]), Ok((5, 2)));
        assert_eq!(parse_args(vec!["--n=2".into(), "5".into()]), Ok((5, 2)));
    }

    #[test]
    fn rejects_unrecognized_flag() {
        assert!(parse_args(vec!["--bogus=1".into(), "2".into()]).is_err());
    }

    #[test]
    fn rejects_flag_missing_value() {
        assert!(parse_args(vec!["--num-of-nodes".into()]).is_err());
    }
}
