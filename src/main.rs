use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

use imgclass::config::{
    DEFAULT_DISPLAY, DEFAULT_INPUT_NODE, DEFAULT_LABELS_PATH, DEFAULT_MODEL_PATH,
    DEFAULT_OUTPUT_NODE, DEFAULT_TOP_K,
};
use imgclass::{Config, ModelFormat};

#[derive(Parser)]
#[command(author, version, about = "Classify an image with a frozen graph", long_about = None)]
struct Cli {
    /// Path to the image to classify
    image: PathBuf,
    /// Path to the frozen graph
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,
    /// Path to the label file, one label per line
    #[arg(short, long, default_value = DEFAULT_LABELS_PATH)]
    labels: PathBuf,
    /// Model format ('tf' or 'onnx') instead of guessing from the extension
    #[arg(short, long)]
    format: Option<String>,
    /// Name of the graph input node
    #[arg(long, default_value = DEFAULT_INPUT_NODE)]
    input_node: String,
    /// Name of the graph output node
    #[arg(long, default_value = DEFAULT_OUTPUT_NODE)]
    output_node: String,
    /// Number of labels to rank
    #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
    top: usize,
    /// Number of ranked labels to print
    #[arg(short, long, default_value_t = DEFAULT_DISPLAY)]
    show: usize,
    /// Sets the level of verbosity
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> imgclass::Result<Config> {
        let format = self.format.as_deref().map(str::parse::<ModelFormat>).transpose()?;
        Ok(Config {
            model_path: self.model.clone(),
            labels_path: self.labels.clone(),
            format,
            input_node: self.input_node.clone(),
            output_node: self.output_node.clone(),
            top_k: self.top,
            display: self.show,
        })
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "imgclass=warn,tract=warn",
        1 => "imgclass=info,tract=info",
        2 => "imgclass=debug,tract=debug",
        _ => "imgclass=trace,tract=trace",
    };
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();
}

fn run(cli: &Cli) -> imgclass::Result<()> {
    let config = cli.config()?;
    config.validate()?;
    let scores = imgclass::classify_file(&config, &cli.image)?;
    imgclass::report(&mut io::stdout().lock(), &scores, config.display)
        .map_err(imgclass::Error::Output)
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{e}");
        let mut source = e.source();
        while let Some(cause) = source {
            error!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1)
    }
}
