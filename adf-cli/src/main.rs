// Command-line interface for the adf toolchain.
//
// Converts between ADF JSON documents and GitHub-Flavored Markdown using
// the adf-babel library. The forward direction reads an ADF JSON file and
// prints markdown; --reverse reads markdown and prints pretty ADF JSON.
//
// Usage:
//  adf <input> [--output <file>]                      - ADF JSON to markdown
//  adf <input> --reverse [--output <file>]            - markdown to ADF JSON
//  adf <input> --preset pandoc                        - use a named preset
//  adf <input> --config profile.toml                  - load a profile file
//
// Presets (refined further by --allow-html and --strict):
//  balanced | strict | readable | lossy | pandoc
//
// Warnings go to stderr; the exit code is non-zero only for conversion
// errors, never for warnings.

mod presets;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};

use adf_babel::{MarkdownParser, MarkdownSerializer, Warning};

fn cli() -> Command {
    Command::new("adf")
        .about("Convert between ADF JSON and GitHub-Flavored Markdown")
        .arg(
            Arg::new("input")
                .help("Input file (ADF JSON, or markdown with --reverse)")
                .required(true),
        )
        .arg(
            Arg::new("reverse")
                .long("reverse")
                .help("Convert markdown to ADF JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("preset")
                .long("preset")
                .value_name("NAME")
                .help("Conversion preset: balanced|strict|readable|lossy|pandoc")
                .default_value("balanced"),
        )
        .arg(
            Arg::new("allow-html")
                .long("allow-html")
                .help("Use HTML output for constructs that support it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Fail on unknown nodes and marks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Profile file layered over the embedded defaults"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write output to a file instead of stdout"),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let input_path = matches.get_one::<String>("input").expect("required arg");
    let reverse = matches.get_flag("reverse");
    let preset = matches.get_one::<String>("preset").expect("has default");
    let allow_html = matches.get_flag("allow-html");
    let strict = matches.get_flag("strict");
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let output_path = matches.get_one::<String>("output").map(PathBuf::from);

    let data = match fs::read(input_path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Error reading file: {err}");
            return ExitCode::FAILURE;
        }
    };

    // A profile file replaces the preset as the base configuration; the
    // flags refine whichever base was chosen.
    let profile = match config_path {
        Some(path) => match adf_config::Loader::new().with_file(&path).load() {
            Ok(profile) => Some(profile),
            Err(err) => {
                eprintln!("Invalid config file: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if reverse {
        let mut config = match &profile {
            Some(profile) => profile.reverse.clone().into(),
            None => match presets::reverse_preset(preset) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Invalid preset: {err}");
                    return ExitCode::FAILURE;
                }
            },
        };
        if allow_html {
            presets::apply_allow_html_reverse(&mut config);
        }
        if strict {
            presets::apply_strict_reverse(&mut config);
        }

        let parser = match MarkdownParser::new(config) {
            Ok(parser) => parser,
            Err(err) => {
                eprintln!("Invalid config: {err}");
                return ExitCode::FAILURE;
            }
        };

        let markdown = String::from_utf8_lossy(&data).into_owned();
        let result = match parser.parse(&markdown) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("Error converting file: {err}");
                return ExitCode::FAILURE;
            }
        };

        report_warnings(&result.warnings);

        let parsed: serde_json::Value = match serde_json::from_slice(&result.adf) {
            Ok(parsed) => parsed,
            Err(err) => {
                eprintln!("Error parsing converted ADF JSON: {err}");
                return ExitCode::FAILURE;
            }
        };
        let pretty = match serde_json::to_string_pretty(&parsed) {
            Ok(pretty) => pretty,
            Err(err) => {
                eprintln!("Error formatting ADF JSON: {err}");
                return ExitCode::FAILURE;
            }
        };

        return emit(output_path.as_deref(), &format!("{pretty}\n"));
    }

    let mut config = match &profile {
        Some(profile) => profile.forward.clone().into(),
        None => match presets::forward_preset(preset) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Invalid preset: {err}");
                return ExitCode::FAILURE;
            }
        },
    };
    if allow_html {
        presets::apply_allow_html(&mut config);
    }
    if strict {
        presets::apply_strict(&mut config);
    }

    let serializer = match MarkdownSerializer::new(config) {
        Ok(serializer) => serializer,
        Err(err) => {
            eprintln!("Invalid config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match serializer.serialize(&data) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Error converting file: {err}");
            return ExitCode::FAILURE;
        }
    };

    report_warnings(&result.warnings);
    emit(output_path.as_deref(), &result.markdown)
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        match &warning.node_type {
            Some(node_type) => eprintln!("warning [{node_type}]: {}", warning.message),
            None => eprintln!("warning: {}", warning.message),
        }
    }
}

fn emit(output: Option<&std::path::Path>, content: &str) -> ExitCode {
    match output {
        Some(path) => {
            if let Err(err) = fs::write(path, content) {
                eprintln!("Error writing output: {err}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        None => {
            print!("{content}");
            ExitCode::SUCCESS
        }
    }
}
