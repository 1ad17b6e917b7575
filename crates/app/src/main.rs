use chrono::Utc;
use clap::{Parser, Subcommand};
use docmark_core::{
    convert_file, discover_documents, output_path, retrieve_markdown, GcsClient, ImportOptions,
    LayoutClient, LayoutOptions, RagClient, RetrievalOptions,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PREVIEW_CHARS: usize = 1000;

#[derive(Parser)]
#[command(name = "docmark", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Google Cloud project id.
    #[arg(long, env = "DOCMARK_PROJECT")]
    project: String,

    /// Document AI multi-region, 'us' or 'eu'.
    #[arg(long, default_value = "us")]
    docai_location: String,

    /// Vertex AI region for the RAG Engine.
    #[arg(long, default_value = "us-central1")]
    rag_location: String,

    /// GCS bucket for uploaded Markdown output.
    #[arg(long, env = "DOCMARK_BUCKET")]
    bucket: Option<String>,
}

struct Context {
    project: String,
    docai_location: String,
    rag_location: String,
    bucket: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a Layout Parser processor (one-time setup).
    Setup {
        #[arg(long, default_value = "layout-parser-md")]
        display_name: String,
    },
    /// List Document AI processors in the project.
    ListProcessors,
    /// Convert a local document (or a folder of documents) to Markdown.
    Parse {
        /// Local file to process.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Folder to process recursively instead of a single file.
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Layout Parser processor id.
        #[arg(long, env = "DOCMARK_PROCESSOR_ID")]
        processor_id: Option<String>,
        /// Pages per sub-request when a large PDF is split.
        #[arg(long, default_value = "25")]
        max_pages: u32,
        /// Page count above which a PDF is split before submission.
        #[arg(long, default_value = "30")]
        split_threshold: u32,
        /// Also upload the Markdown to the configured bucket.
        #[arg(long, default_value_t = false)]
        upload: bool,
        /// Object prefix for uploaded output.
        #[arg(long, default_value = "parsed_output/")]
        output_prefix: String,
    },
    /// RAG Engine corpus operations.
    #[command(subcommand)]
    Corpus(CorpusCommand),
}

#[derive(Subcommand)]
enum CorpusCommand {
    /// Create a new corpus.
    Create {
        #[arg(long)]
        display_name: Option<String>,
    },
    /// List existing corpora.
    List,
    /// List files in a corpus.
    Files {
        #[arg(long)]
        corpus: String,
    },
    /// Import GCS documents through the LLM parser.
    Import {
        #[arg(long)]
        corpus: String,
        /// GCS uri(s) to import, e.g. gs://bucket/docs/report.pdf
        #[arg(long, required = true)]
        uri: Vec<String>,
        #[arg(long, default_value = "gemini-2.0-flash")]
        model: String,
    },
    /// Retrieve parsed chunks, deduplicate, and save as one Markdown file.
    Export {
        #[arg(long)]
        corpus: String,
        /// Retrieval query; the default broad match returns the whole corpus.
        #[arg(long, default_value = " ")]
        query: String,
        #[arg(long, default_value = "50")]
        top_k: usize,
        #[arg(long, default_value = "parsed_output.md")]
        output: PathBuf,
        /// Also upload the Markdown to the configured bucket.
        #[arg(long, default_value_t = false)]
        upload: bool,
        #[arg(long, default_value = "parsed_output/")]
        output_prefix: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let Cli {
        command,
        project,
        docai_location,
        rag_location,
        bucket,
    } = Cli::parse();

    let context = Context {
        project,
        docai_location,
        rag_location,
        bucket,
    };

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docmark boot"
    );

    match command {
        Command::Setup { display_name } => {
            let client = layout_client(&context, None)?;
            let processor = client
                .create_processor(&display_name)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("created processor: {}", processor.name);
            println!("processor id: {}", processor.processor_id);
            println!(
                "pass it to parse with --processor-id {}",
                processor.processor_id
            );
        }
        Command::ListProcessors => {
            let client = layout_client(&context, None)?;
            let processors = client
                .list_processors()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!(
                "processors in {}/{}:",
                context.project, context.docai_location
            );
            for processor in processors {
                println!("  - {}", processor.display_name);
                println!("    id: {}", processor.processor_id);
                println!("    type: {}", processor.processor_type);
                println!("    state: {}", processor.state);
            }
        }
        Command::Parse {
            file,
            folder,
            processor_id,
            max_pages,
            split_threshold,
            upload,
            output_prefix,
        } => {
            let processor_id = processor_id.ok_or_else(|| {
                anyhow::anyhow!(
                    "no processor id; run `docmark setup` first or pass --processor-id"
                )
            })?;

            let options = LayoutOptions {
                max_pages_per_request: max_pages,
                split_threshold,
                ..LayoutOptions::default()
            };
            let client = layout_client(&context, Some(processor_id))?;

            let files = match (file, folder) {
                (Some(path), None) => vec![path],
                (None, Some(dir)) => {
                    let found = discover_documents(&dir);
                    if found.is_empty() {
                        anyhow::bail!("no supported documents found in {}", dir.display());
                    }
                    found
                }
                _ => anyhow::bail!("pass exactly one of --file or --folder"),
            };

            for path in files {
                match run_parse(&context, &client, &path, &options, upload, &output_prefix).await
                {
                    Ok(()) => {}
                    Err(error) => warn!(path = %path.display(), %error, "conversion failed"),
                }
            }
        }
        Command::Corpus(command) => run_corpus(&context, command).await?,
    }

    Ok(())
}

fn layout_client(context: &Context, processor_id: Option<String>) -> anyhow::Result<LayoutClient> {
    let client = LayoutClient::new(
        &context.project,
        &context.docai_location,
        LayoutOptions::default().request_timeout_secs,
    )
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    Ok(match processor_id {
        Some(id) => client.with_processor(id),
        None => client,
    })
}

async fn run_parse(
    context: &Context,
    client: &LayoutClient,
    path: &Path,
    options: &LayoutOptions,
    upload: bool,
    output_prefix: &str,
) -> anyhow::Result<()> {
    info!(path = %path.display(), "converting document");

    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    {
        match docmark_core::page_count(path) {
            Ok(pages) => info!(pages, "pdf page count"),
            Err(error) => warn!(%error, "could not read pdf page count"),
        }
    }

    let conversion = convert_file(path, client, options)
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    if conversion.window_count > 1 {
        info!(
            windows = conversion.window_count,
            "large pdf was split into page windows"
        );
    }

    let destination = output_path(path);
    tokio::fs::write(&destination, &conversion.markdown).await?;
    println!("saved to {}", destination.display());

    if upload {
        let bucket = context
            .bucket
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--upload requires --bucket"))?;
        let object_name = format!(
            "{}{}",
            output_prefix,
            destination
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("output.md")
        );
        let uri = GcsClient::new()
            .upload(bucket, &object_name, &conversion.markdown, "text/markdown")
            .await
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
        println!("uploaded to {uri}");
    }

    println!("checksum: {}", conversion.fingerprint.checksum);
    println!("preview:");
    println!("{}", preview(&conversion.markdown));

    Ok(())
}

async fn run_corpus(context: &Context, command: CorpusCommand) -> anyhow::Result<()> {
    match command {
        CorpusCommand::Create { display_name } => {
            let display_name =
                display_name.unwrap_or_else(|| format!("llm-parser-{}", Utc::now().timestamp()));
            let client = RagClient::new(&context.project, &context.rag_location);
            let corpus = client
                .create_corpus(&display_name)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("created corpus: {}", corpus.name);
        }
        CorpusCommand::List => {
            let client = RagClient::new(&context.project, &context.rag_location);
            let corpora = client
                .list_corpora()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("existing corpora ({}):", corpora.len());
            for corpus in corpora {
                println!("  - {}: {}", corpus.display_name, corpus.name);
            }
        }
        CorpusCommand::Files { corpus } => {
            let client =
                RagClient::new(&context.project, &context.rag_location).with_corpus(corpus);
            let files = client
                .list_files()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("files in corpus ({}):", files.len());
            for file in files {
                println!("  - {}", file.display_name);
                println!("    resource: {}", file.name);
            }
        }
        CorpusCommand::Import { corpus, uri, model } => {
            let client =
                RagClient::new(&context.project, &context.rag_location).with_corpus(corpus);
            let options = ImportOptions {
                model_id: model,
                ..ImportOptions::default()
            };

            info!(uris = uri.len(), "importing files with llm parser");
            client
                .import_files(&uri, &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("import complete: {} file(s)", uri.len());
        }
        CorpusCommand::Export {
            corpus,
            query,
            top_k,
            output,
            upload,
            output_prefix,
        } => {
            let client =
                RagClient::new(&context.project, &context.rag_location).with_corpus(corpus);
            let options = RetrievalOptions {
                query,
                top_k,
                ..RetrievalOptions::default()
            };

            let markdown = retrieve_markdown(&client, &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if markdown.is_empty() {
                warn!("retrieval returned no chunks");
            }

            tokio::fs::write(&output, &markdown).await?;
            println!("saved to {}", output.display());

            if upload {
                let bucket = context
                    .bucket
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("--upload requires --bucket"))?;
                let object_name = format!(
                    "{}{}",
                    output_prefix,
                    output
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("parsed_output.md")
                );
                let uri = GcsClient::new()
                    .upload(bucket, &object_name, &markdown, "text/markdown")
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                println!("uploaded to {uri}");
            }

            println!("preview:");
            println!("{}", preview(&markdown));
        }
    }

    Ok(())
}

fn preview(markdown: &str) -> &str {
    let mut end = markdown.len().min(PREVIEW_CHARS);
    while end < markdown.len() && !markdown.is_char_boundary(end) {
        end += 1;
    }
    &markdown[..end]
}
