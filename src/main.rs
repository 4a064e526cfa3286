use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use customs_pack::config::DEFAULT_MAX_FILE_SIZE;
use customs_pack::process_customs_declaration;
use customs_pack::Config;

#[derive(Parser)]
#[command(about = "Build a customs declaration workbook from packing lists, invoices and declaration files.")]
struct Args {
    /// Folder holding the input spreadsheets.
    #[arg(long, default_value = "uploads")]
    input: PathBuf,

    /// Folder receiving the generated workbook.
    #[arg(long, default_value = "outputs")]
    output: PathBuf,

    /// Template workbook with the PKL, INV, contract and declaration sheets.
    #[arg(long, default_value = "templates/001.xlsx")]
    template: PathBuf,

    /// Folder holding the header pictures (01.png, 02.png).
    #[arg(long, default_value = "images")]
    images: PathBuf,

    /// Largest accepted input file, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::new(args.input)
        .with_output_dir(args.output)
        .with_template_path(args.template)
        .with_images_dir(args.images)
        .with_max_file_size(args.max_file_size);
    let result = process_customs_declaration(&config);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
