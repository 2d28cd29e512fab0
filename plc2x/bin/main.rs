use std::path::PathBuf;

use clap::Parser;

use st2plcopen::cli;
use st2plcopen::logger;

#[derive(Parser, Debug)]
#[command(
    name = "st2plcopen",
    about = "Converts Structured Text declarations to PLCopen XML"
)]
struct Args {
    /// Turn on verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Writes the log to the file rather than to standard error.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Converts the files into one PLCopen XML document.
    Convert {
        /// Structured Text files or directories of files.
        files: Vec<PathBuf>,

        /// Exemplar PLCopen document that gives the shape of the output.
        /// Uses the bundled e!COCKPIT exemplar when not specified.
        #[arg(long)]
        template: Option<PathBuf>,

        /// Writes the document to the file rather than to standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Prints the declarations that are understood in the files as JSON.
    Parse { files: Vec<PathBuf> },
}

pub fn main() -> Result<(), String> {
    let args = Args::parse();

    logger::configure(args.verbose, args.log_file)?;

    match args.action {
        Action::Convert {
            files,
            template,
            output,
        } => cli::convert(files, template, output, false),
        Action::Parse { files } => cli::parse(files, false),
    }
}
