use cform_spec::FormSpec;
use clap::{Parser, Subcommand};
use component_cform::{
    collect as form_collect, evaluate as form_evaluate, populate as form_populate,
    reset as form_reset, run_conditions as form_run_conditions,
};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional form engine CLI",
    long_about = "Aggregates form state into submission documents and evaluates visibility conditions, backed by the form component"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate a form's state into its submission document.
    Collect {
        /// Path to the form spec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file with the current form state.
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        /// Keep hidden-field values instead of blanking them.
        #[arg(long)]
        include_hidden: bool,
        /// Pretty-print the document.
        #[arg(long)]
        pretty: bool,
    },
    /// Evaluate a condition expression against the current state.
    Eval {
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        /// Condition expression; lines combine with logical AND.
        #[arg(long, value_name = "EXPR", conflicts_with = "condition_file")]
        condition: Option<String>,
        /// Read the condition expression from a file instead.
        #[arg(long, value_name = "FILE")]
        condition_file: Option<PathBuf>,
        /// Also print the substituted expression.
        #[arg(long)]
        verbose: bool,
    },
    /// Run every authored condition and report the visibility outcomes.
    Visibility {
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        /// Write the updated state (with visibility annotations) to a file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Write a document of values back into a form state file.
    Populate {
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        /// JSON file with the document to populate from.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// Write the updated state to a file instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Restore a form state to its authored defaults.
    Reset {
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Collect {
            spec,
            state,
            include_hidden,
            pretty,
        } => run_collect(spec, state, include_hidden, pretty),
        Command::Eval {
            spec,
            state,
            condition,
            condition_file,
            verbose,
        } => run_eval(spec, state, condition, condition_file, verbose),
        Command::Visibility { spec, state, out } => run_visibility(spec, state, out),
        Command::Populate {
            spec,
            state,
            data,
            out,
        } => run_populate(spec, state, data, out),
        Command::Reset { spec, state, out } => run_reset(spec, state, out),
    }
}

struct FormInput {
    form_id: String,
    config_json: String,
    state_json: String,
}

fn load_form_input(spec_path: &PathBuf, state_path: Option<PathBuf>) -> CliResult<FormInput> {
    let spec_str = fs::read_to_string(spec_path)?;
    let spec: FormSpec = serde_json::from_str(&spec_str)?;
    let form_id = spec.id;
    let config_json = json!({ "form_spec_json": spec_str }).to_string();
    let state_json = match state_path {
        Some(path) => fs::read_to_string(path)?,
        None => "{}".to_string(),
    };
    Ok(FormInput {
        form_id,
        config_json,
        state_json,
    })
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_collect(
    spec_path: PathBuf,
    state_path: Option<PathBuf>,
    include_hidden: bool,
    pretty: bool,
) -> CliResult<()> {
    let input = load_form_input(&spec_path, state_path)?;
    let ctx = json!({ "exclude_hidden_fields": !include_hidden }).to_string();
    let response = form_collect(&input.form_id, &input.config_json, &input.state_json, &ctx);
    let value = parse_component_result(&response)?;
    let document = &value["document"];
    if pretty {
        println!("{}", serde_json::to_string_pretty(document)?);
    } else {
        println!("{}", document);
    }
    Ok(())
}

fn run_eval(
    spec_path: PathBuf,
    state_path: Option<PathBuf>,
    condition: Option<String>,
    condition_file: Option<PathBuf>,
    verbose: bool,
) -> CliResult<()> {
    let expression = match (condition, condition_file) {
        (Some(expression), None) => expression,
        (None, Some(path)) => fs::read_to_string(path)?,
        _ => return Err("provide exactly one of --condition or --condition-file".into()),
    };

    let input = load_form_input(&spec_path, state_path)?;
    let response = form_evaluate(
        &input.form_id,
        &input.config_json,
        &input.state_json,
        "{}",
        &expression,
    );
    let value = parse_component_result(&response)?;

    if verbose {
        println!(
            "Effective expression: {}",
            value["effective"].as_str().unwrap_or("")
        );
        println!(
            "Substituted expression: {}",
            value["substituted"].as_str().unwrap_or("")
        );
    }
    println!(
        "Condition result: {}",
        if value["result"] == true { "true" } else { "false" }
    );
    Ok(())
}

fn run_visibility(
    spec_path: PathBuf,
    state_path: Option<PathBuf>,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let input = load_form_input(&spec_path, state_path)?;
    let response = form_run_conditions(&input.form_id, &input.config_json, &input.state_json, "{}");
    let value = parse_component_result(&response)?;

    let outcomes = value["outcomes"].as_array().cloned().unwrap_or_default();
    if outcomes.is_empty() {
        println!("No conditions defined.");
    }
    for outcome in &outcomes {
        println!(
            "{}: {}",
            outcome["target"].as_str().unwrap_or("<unknown>"),
            if outcome["visible"] == true {
                "shown"
            } else {
                "hidden"
            }
        );
    }

    write_state_output(&value["state"], out)
}

fn run_populate(
    spec_path: PathBuf,
    state_path: Option<PathBuf>,
    data_path: PathBuf,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let input = load_form_input(&spec_path, state_path)?;
    let data_json = fs::read_to_string(data_path)?;
    let response = form_populate(
        &input.form_id,
        &input.config_json,
        &input.state_json,
        &data_json,
    );
    let value = parse_component_result(&response)?;
    write_state_output(&value["state"], out)
}

fn run_reset(
    spec_path: PathBuf,
    state_path: Option<PathBuf>,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let input = load_form_input(&spec_path, state_path)?;
    let response = form_reset(&input.form_id, &input.config_json, &input.state_json);
    let value = parse_component_result(&response)?;
    write_state_output(&value["state"], out)
}

fn write_state_output(state: &Value, out: Option<PathBuf>) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(state)?;
    match out {
        Some(path) => {
            fs::write(&path, rendered)?;
            println!("Wrote updated state to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
