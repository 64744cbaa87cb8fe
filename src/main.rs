use clap::{Args, Parser, Subcommand};
use glob::glob;
use lopdf::Document;
use std::path::PathBuf;

use collection_binder::outline::Outline;
use collection_binder::settings::{UnitSystem, default_output_name, to_points};
use collection_binder::{Layout, Manifest, bind_manifest, links};

/// Bind rendered wiki pages into a single PDF with a table of contents
#[derive(Parser, Debug)]
#[command(name = "collection-binder", version, about = "Bind rendered PDF fragments into one book")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind the fragments listed in a JSON manifest
    Bind {
        /// Manifest: { "title": .., "fragments": [{ "source", "path", "title"?, "level"? }] }
        #[arg(long)]
        manifest: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Bind fragments named after the pages of a wiki book outline
    Outline {
        /// Outline page text (first line: [[Book_Page|Book Title]])
        #[arg(long)]
        outline: PathBuf,
        /// Directory holding one rendered PDF per page, named by sanitized URL
        #[arg(long)]
        fragments: PathBuf,
        /// Prefix turning outline links into URLs (e.g. https://example.wiki/wiki/)
        #[arg(long)]
        url_prefix: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the external links of PDFs matching a glob pattern
    Links {
        pattern: String,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output file (default: collection title with underscores + .pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Override the collection title used in headers and metadata
    #[arg(long)]
    title: Option<String>,
    /// JSON layout file (margins, font sizes, line height)
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Target page width (default: layout, 8.5in)
    #[arg(long, requires = "height")]
    width: Option<f64>,
    /// Target page height (default: layout, 11in)
    #[arg(long, requires = "width")]
    height: Option<f64>,
    /// Unit of --width/--height
    #[arg(long, value_enum, default_value_t = UnitSystem::Inch)]
    unit: UnitSystem,
}

impl OutputArgs {
    fn layout(&self) -> Result<Layout, Box<dyn std::error::Error>> {
        let mut layout = match &self.layout {
            Some(path) => Layout::load(path)?,
            None => Layout::default(),
        };
        if let (Some(w), Some(h)) = (self.width, self.height) {
            layout = layout.with_page_size(to_points(w, self.unit), to_points(h, self.unit));
        }
        layout.validate()?;
        Ok(layout)
    }

    fn bind(&self, mut manifest: Manifest) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(title) = &self.title {
            manifest.title = title.clone();
        }
        let layout = self.layout()?;
        let out = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_output_name(&manifest.title)));

        let assembly = bind_manifest(&manifest, &layout, &out)?;
        println!(
            "Done. {} ({} TOC pages, {} body pages, {} links rewritten)",
            out.display(),
            assembly.toc_pages,
            assembly.body_pages,
            assembly.links_rewritten
        );
        Ok(())
    }
}

fn list_links(pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = glob(pattern)?.filter_map(|e| e.ok()).collect();
    paths.sort();
    if paths.is_empty() {
        return Err(format!("no files match {pattern}").into());
    }
    for path in paths {
        let doc = Document::load(&path)?;
        println!("{}", path.display());
        for (page, urls) in links::extract_urls(&doc)? {
            let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
            println!("  page {page}: {}", urls.join(", "));
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Bind { manifest, output } => output.bind(Manifest::load(&manifest)?),
        Command::Outline {
            outline,
            fragments,
            url_prefix,
            output,
        } => {
            let manifest = Outline::load(&outline)?.into_manifest(&url_prefix, &fragments);
            output.bind(manifest)
        }
        Command::Links { pattern } => list_links(&pattern),
    }
}
