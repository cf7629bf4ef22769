//! folio - manuscript to EPUB converter

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use folio::{Conversion, ConvertOptions, Metadata, SourceConverter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Convert manuscripts into EPUB", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio novel.scriv novel.epub --title 'Novel' --author 'Ann Lee' --pub-date 2021-04-30 --copyright-year 2021
    folio chapters/ book.epub --metadata book.json
    folio Novel.zip novel.epub --metadata book.json
    folio book.rtf book.epub --metadata book.json --converter unrtf --converter --latex")]
struct Cli {
    /// Markup file, chapter directory, or Scrivener project (folder or .zip)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// EPUB file to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Book metadata as JSON; flags override its fields
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Defaults to the author
    #[arg(long)]
    publisher: Option<String>,

    /// Book language, e.g. en-US
    #[arg(long)]
    lang: Option<String>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub_date: Option<String>,

    #[arg(long)]
    copyright_year: Option<String>,

    /// Include a copyright page
    #[arg(long)]
    copyright: bool,

    /// Add the work-of-fiction notice to the copyright page
    #[arg(long)]
    fiction: bool,

    /// JPEG cover image
    #[arg(long, value_name = "FILE")]
    cover: Option<PathBuf>,

    /// External converter command, one word per occurrence
    #[arg(long, value_name = "WORD", allow_hyphen_values = true)]
    converter: Vec<String>,

    /// Where to create the staging directory
    #[arg(long, value_name = "DIR")]
    tmp_dir: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_metadata(cli: &Cli) -> Result<Metadata, String> {
    let mut meta = match &cli.metadata {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str::<Metadata>(&json)
                .map_err(|e| format!("invalid metadata file {}: {e}", path.display()))?
        }
        None => Metadata::default(),
    };

    if let Some(title) = &cli.title {
        meta.title = title.clone();
    }
    if let Some(author) = &cli.author {
        meta.author = author.clone();
    }
    if let Some(publisher) = &cli.publisher {
        meta.publisher = Some(publisher.clone());
    }
    if let Some(lang) = &cli.lang {
        meta.language = lang.clone();
    }
    if meta.language.is_empty() {
        meta.language = "en-US".to_string();
    }
    if let Some(date) = &cli.pub_date {
        meta.pub_date = date.clone();
    }
    if let Some(year) = &cli.copyright_year {
        meta.copyright_year = year.clone();
    }
    if let Some(cover) = &cli.cover {
        meta.cover = Some(cover.clone());
    }
    meta.include_copyright |= cli.copyright;
    meta.fiction |= cli.fiction;
    Ok(meta)
}

fn run(cli: Cli) -> Result<(), String> {
    let meta = load_metadata(&cli)?;

    let mut options =
        ConvertOptions::new().with_converter(SourceConverter::from_command_line(&cli.converter));
    if let Some(dir) = cli.tmp_dir {
        options = options.with_tmp_dir(dir);
    }

    let report = Conversion::new(meta, options)
        .and_then(|conversion| conversion.run(&cli.input, &cli.output))
        .map_err(|e| e.to_string())?;

    if !cli.quiet {
        println!(
            "{} -> {} ({} chapters, {} parts)",
            cli.input.display(),
            cli.output.display(),
            report.chapters,
            report.parts
        );
    }
    Ok(())
}
