#![forbid(unsafe_code)]

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dashchat::{
    ChatClient, ChatSession, DataFrame, EchoClient, ElementId, Interpreter, RenderedPlot,
    ScriptedClient, SessionConfig, SessionObserver, SessionState, VALUE_BOXES, VegaLiteRenderer,
    load_tips, write_csv_string,
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DASHCHAT_LOG";
const SCRIPT_SEPARATOR: &str = "---";

#[derive(Debug, Clone, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    dataset: Option<PathBuf>,
    script: Option<PathBuf>,
    transcript: Option<PathBuf>,
    emit_vega: bool,
}

/// Forwards dashboard changes to the log.
struct LogObserver;

impl SessionObserver for LogObserver {
    fn element_added(&mut self, id: ElementId) {
        tracing::debug!(element = id.as_str(), "element shown");
    }

    fn element_removed(&mut self, id: ElementId) {
        tracing::debug!(element = id.as_str(), "element hidden");
    }

    fn view_replaced(&mut self, view: &DataFrame) {
        tracing::debug!(rows = view.len(), "view replaced");
    }

    fn plot_replaced(&mut self, plot: Option<&RenderedPlot>) {
        match plot {
            Some(plot) => tracing::debug!(title = %plot.spec.title(), "plot replaced"),
            None => tracing::debug!("plot cleared"),
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("dashchat-cli error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let mut config = match args.config.as_deref() {
        Some(path) => SessionConfig::from_json_path(path).map_err(|error| error.to_string())?,
        None => SessionConfig::default(),
    };
    if let Some(dataset) = args.dataset.clone() {
        config = config.with_dataset_path(dataset);
    }

    let base = load_tips(&config.dataset_path).map_err(|error| {
        format!("failed to load {}: {error}", config.dataset_path.display())
    })?;
    tracing::info!(
        path = %config.dataset_path.display(),
        rows = base.len(),
        "dataset loaded"
    );
    let base = Arc::new(base);

    match args.script.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|error| format!("failed to read {}: {error}", path.display()))?;
            let client = ScriptedClient::new(script_replies(&text));
            drive(client, base, &config, &args)
        }
        None => drive(EchoClient, base, &config, &args),
    }
}

fn drive<C: ChatClient>(
    client: C,
    base: Arc<DataFrame>,
    config: &SessionConfig,
    args: &CliArgs,
) -> Result<(), String> {
    let mut session = ChatSession::new(
        client,
        Interpreter::new(VegaLiteRenderer::default()),
        base,
        config,
    );
    if let Some(welcome) = session.transcript().get(1) {
        println!("{}\n", welcome.content);
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let prompt = line.map_err(|error| error.to_string())?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            continue;
        }
        match session.submit(prompt, &mut LogObserver) {
            Ok(turn) => {
                println!("assistant: {}", turn.reply);
                for status in &turn.statuses {
                    println!("status: {status}");
                }
                print_dashboard(session.state(), config.max_table_rows, args.emit_vega)?;
            }
            Err(error) => println!("error: {error}"),
        }
    }

    if let Some(path) = args.transcript.as_deref() {
        let json = serde_json::to_string_pretty(session.transcript())
            .map_err(|error| error.to_string())?;
        std::fs::write(path, json)
            .map_err(|error| format!("failed to write {}: {error}", path.display()))?;
    }
    Ok(())
}

fn print_dashboard(state: &SessionState, max_rows: usize, emit_vega: bool) -> Result<(), String> {
    let visible = state
        .elements()
        .all_ids()
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>();
    println!("visible: [{}]", visible.join(", "));
    println!("filters: {}", state.active_filters());

    let boxes = state.value_boxes().map_err(|error| error.to_string())?;
    for id in VALUE_BOXES {
        if !state.elements().contains(id) {
            continue;
        }
        if let Some(value) = boxes.render(id) {
            println!("{}: {value}", id.title());
        }
    }

    if state.elements().contains(ElementId::DataTable) {
        let head = state.view().head(max_rows).map_err(|error| error.to_string())?;
        let csv = write_csv_string(&head).map_err(|error| error.to_string())?;
        println!("data table ({} rows):\n{}", state.view().len(), csv.trim_end());
    }

    if let Some(plot) = state.plot() {
        println!("plot: {}", plot.spec.title());
        if emit_vega {
            println!("{}", plot.figure.as_json());
        }
    }
    println!();
    Ok(())
}

/// Replies are separated by `---` lines when the file has any, one per line
/// otherwise.
fn script_replies(text: &str) -> Vec<String> {
    if text.lines().any(|line| line.trim() == SCRIPT_SEPARATOR) {
        let mut replies = vec![String::new()];
        for line in text.lines() {
            if line.trim() == SCRIPT_SEPARATOR {
                replies.push(String::new());
            } else if let Some(current) = replies.last_mut() {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(line);
            }
        }
        replies
            .into_iter()
            .filter(|reply| !reply.trim().is_empty())
            .collect()
    } else {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

fn parse_args() -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_owned())?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--dataset" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--dataset requires a path".to_owned())?;
                parsed.dataset = Some(PathBuf::from(value));
            }
            "--script" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--script requires a path".to_owned())?;
                parsed.script = Some(PathBuf::from(value));
            }
            "--transcript" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--transcript requires a path".to_owned())?;
                parsed.transcript = Some(PathBuf::from(value));
            }
            "--emit-vega" => {
                parsed.emit_vega = true;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(parsed)
}

fn print_help() {
    println!(
        "dashchat-cli\n\
         Reads prompts from stdin, one per line, and prints the dashboard after each turn.\n\
         Usage:\n\
         \tdashchat-cli [--config <json>] [--dataset <csv>] [--script <file>] [--transcript <json>] [--emit-vega]\n\
         Options:\n\
         \t--config <path>        session config JSON (dataset_path, reply_timeout_ms, max_table_rows)\n\
         \t--dataset <path>       tips CSV to load (overrides the config)\n\
         \t--script <path>        canned model replies, one per line or separated by '{SCRIPT_SEPARATOR}' lines;\n\
         \t                       without it every prompt is echoed back as the reply\n\
         \t--transcript <path>    write the conversation as JSON on exit\n\
         \t--emit-vega            print the Vega-Lite figure of the current plot\n\
         \t-h, --help             show this help\n\
         Logging is controlled by {LOG_ENV} (e.g. {LOG_ENV}=debug)."
    );
}

#[cfg(test)]
mod tests {
    use super::script_replies;

    #[test]
    fn script_lines_are_replies() {
        assert_eq!(
            script_replies("show data table\n\n  plot bar: day \n"),
            vec!["show data table".to_owned(), "plot bar: day".to_owned()]
        );
    }

    #[test]
    fn separator_groups_multiline_replies() {
        let text = "Sure.\nfilter: sex=male\n---\nhide everything\n---\n";
        assert_eq!(
            script_replies(text),
            vec!["Sure.\nfilter: sex=male".to_owned(), "hide everything".to_owned()]
        );
    }
}
