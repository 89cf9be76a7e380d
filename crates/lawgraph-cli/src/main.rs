mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lawgraph_ai::abbrev::{MAX_CHARS_PER_CHUNK, extract_by_chunk_llm};
use lawgraph_ai::{ChatClient, ChatConfig, HeuristicJudge, HttpChatClient, Judge, LlmJudge};
use lawgraph_core::abbrev::{ScopedMaps, aggregate_by_law, build_and_resolve, resolve_by_chunk};
use lawgraph_core::registry::parse_law_json;
use lawgraph_core::appendix::{APPENDIX_FILE, extract_terms_from_text};
use lawgraph_core::{
    AbbrevScope, AppendixDocument, AppendixIndex, LawCatalog, LawCategory, extract_references,
    parse_citations,
};
use lawgraph_retrieval::{ReferenceTracker, RetrievalConfig, RetrievalController};
use lawgraph_store::MemoryIndex;
use lawgraph_store::artifacts::{
    merge_saved_chunk_maps, merge_saved_law_maps, read_json, save_chunk_maps, save_law_maps,
    write_json_atomic,
};
use lawgraph_store::table::{read_chunks, write_chunks};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CHUNKS_FILE: &str = "chunks.parquet";

#[derive(Parser)]
#[command(name = "lawgraph", version, about = "Statute citation graph and evidence retrieval")]
struct Cli {
    /// Law catalog JSON (defaults to 건축법 and its decree).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse registry law documents into a chunk table and abbreviation maps.
    Ingest {
        #[arg(required = true)]
        laws: Vec<PathBuf>,
        #[arg(long, default_value = "out")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ScopeArg::Law)]
        abbr_scope: ScopeArg,
        /// Extract per-article abbreviations with the chat model.
        #[arg(long)]
        llm_abbrev: bool,
        /// Merge into the abbreviation maps already saved under --out.
        #[arg(long)]
        merge_existing: bool,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Write the building-use taxonomy, adding terms parsed from table text.
    Appendix {
        /// Extracted text of 건축법 시행령 [별표 1]; without it only the seed terms are written.
        text: Option<PathBuf>,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Print the references found in a piece of article text.
    Refs {
        /// Name of the citing law.
        #[arg(long, default_value = "건축법")]
        law: String,
        text: String,
    },
    /// Build the evidence set for a question.
    Ask {
        query: String,
        #[arg(long)]
        chunks: PathBuf,
        #[arg(short, long)]
        k: Option<usize>,
        /// Retrieval config JSON; missing fields take defaults.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Building-use taxonomy JSON (defaults to the built-in seed terms).
        #[arg(long)]
        appendix: Option<PathBuf>,
        /// Also walk references of the evidence hop by hop.
        #[arg(long)]
        track: bool,
        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Law,
    Chunk,
}

impl From<ScopeArg> for AbbrevScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Law => AbbrevScope::Law,
            ScopeArg::Chunk => AbbrevScope::Chunk,
        }
    }
}

#[derive(Args)]
struct LlmArgs {
    /// OpenAI-compatible base URL; without it no model is used.
    #[arg(long, env = "LAWGRAPH_LLM_URL")]
    llm_url: Option<String>,
    #[arg(long, env = "LAWGRAPH_LLM_MODEL", default_value = "HCX-005")]
    llm_model: String,
    #[arg(long, env = "LAWGRAPH_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,
}

impl LlmArgs {
    fn client(&self) -> Option<Arc<dyn ChatClient>> {
        let base_url = self.llm_url.clone()?;
        let config = ChatConfig {
            base_url,
            model: self.llm_model.clone(),
            api_key: self.llm_api_key.clone(),
            ..Default::default()
        };
        Some(Arc::new(HttpChatClient::new(config)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = match &cli.catalog {
        Some(path) => read_json::<LawCatalog>(path)
            .with_context(|| format!("reading catalog {}", path.display()))?,
        None => LawCatalog::default(),
    };

    match cli.command {
        Command::Ingest {
            laws,
            out,
            abbr_scope,
            llm_abbrev,
            merge_existing,
            llm,
        } => {
            let opts = IngestOptions {
                scope: abbr_scope.into(),
                llm_abbrev,
                merge_existing,
            };
            ingest(&catalog, &laws, &out, opts, &llm).await
        }
        Command::Appendix { text, out } => appendix(text.as_deref(), &out),
        Command::Refs { law, text } => refs(&catalog, &law, &text),
        Command::Ask {
            query,
            chunks,
            k,
            config,
            appendix,
            track,
            json,
            llm,
        } => {
            let config = match &config {
                Some(path) => read_json::<RetrievalConfig>(path)
                    .with_context(|| format!("reading retrieval config {}", path.display()))?,
                None => RetrievalConfig::default(),
            };
            let appendix = match &appendix {
                Some(path) => {
                    let json = std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    AppendixIndex::from_json(&json)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => AppendixIndex::seed(),
            };
            let setup = AskSetup {
                catalog,
                config,
                appendix,
            };
            ask(setup, &query, &chunks, k, track, json, &llm).await
        }
    }
}

struct IngestOptions {
    scope: AbbrevScope,
    llm_abbrev: bool,
    merge_existing: bool,
}

async fn ingest(
    catalog: &LawCatalog,
    laws: &[PathBuf],
    out: &Path,
    opts: IngestOptions,
    llm: &LlmArgs,
) -> anyhow::Result<()> {
    let mut chunks = Vec::new();
    for path in laws {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let parsed =
            parse_law_json(&json).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), articles = parsed.len(), "parsed law document");
        chunks.extend(parsed);
    }
    extract_references(&mut chunks, catalog);

    let mut maps = if opts.llm_abbrev {
        let Some(client) = llm.client() else {
            bail!("--llm-abbrev needs --llm-url or LAWGRAPH_LLM_URL");
        };
        let by_chunk = extract_by_chunk_llm(client.as_ref(), &chunks, MAX_CHARS_PER_CHUNK)
            .await
            .context("extracting abbreviations with the chat model")?;
        let by_law = aggregate_by_law(&chunks, &by_chunk);
        resolve_by_chunk(&mut chunks, &by_chunk, Some(&by_law));
        ScopedMaps {
            by_law,
            by_chunk: Some(by_chunk),
        }
    } else {
        build_and_resolve(&mut chunks, opts.scope)
    };
    if opts.merge_existing {
        maps.by_law = merge_saved_law_maps(out, &maps.by_law).context("merging saved law maps")?;
        if let Some(by_chunk) = maps.by_chunk.take() {
            maps.by_chunk =
                Some(merge_saved_chunk_maps(out, &by_chunk).context("merging saved chunk maps")?);
        }
    }

    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let table = out.join(CHUNKS_FILE);
    write_chunks(&table, &chunks).with_context(|| format!("writing {}", table.display()))?;
    let law_maps = save_law_maps(out, &maps.by_law).context("writing law abbreviation maps")?;
    println!("  {:<12} {} articles", table.display(), chunks.len());
    println!("  {:<12} {} laws", law_maps.display(), maps.by_law.len());
    if let Some(by_chunk) = &maps.by_chunk {
        let chunk_maps = save_chunk_maps(out, by_chunk).context("writing chunk abbreviation maps")?;
        println!("  {:<12} {} articles", chunk_maps.display(), by_chunk.len());
    }
    Ok(())
}

fn appendix(text: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let parsed = match text {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            extract_terms_from_text(&text)
        }
        None => Vec::new(),
    };
    let parsed_count = parsed.len();
    let doc = AppendixDocument::with_parsed(parsed);
    let path = out.join(APPENDIX_FILE);
    write_json_atomic(&path, &doc).with_context(|| format!("writing {}", path.display()))?;
    info!(parsed = parsed_count, terms = doc.terms.len(), "saved building-use taxonomy");
    println!("  {:<12} {} terms", path.display(), doc.terms.len());
    Ok(())
}

fn refs(catalog: &LawCatalog, law: &str, text: &str) -> anyhow::Result<()> {
    let set = parse_citations(
        text,
        law,
        LawCategory::from_law_name(law),
        &catalog.parent_act_of(law),
    );
    let out = serde_json::json!({
        "internal": set.internal,
        "external": set.external,
        "parent": set.parent,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

struct AskSetup {
    catalog: LawCatalog,
    config: RetrievalConfig,
    appendix: AppendixIndex,
}

async fn ask(
    setup: AskSetup,
    query: &str,
    chunks_path: &Path,
    k: Option<usize>,
    track: bool,
    json: bool,
    llm: &LlmArgs,
) -> anyhow::Result<()> {
    let chunks = read_chunks(chunks_path)
        .with_context(|| format!("reading {}", chunks_path.display()))?;
    let index = Arc::new(MemoryIndex::from_chunks(&chunks));
    let judge: Arc<dyn Judge> = match llm.client() {
        Some(client) => Arc::new(LlmJudge::new(client)),
        None => Arc::new(HeuristicJudge::default()),
    };

    let AskSetup {
        catalog,
        config,
        appendix,
    } = setup;
    let k = k.unwrap_or(config.k);
    let max_hops = config.max_hops;
    let controller = RetrievalController::new(index.clone(), judge)
        .with_catalog(catalog)
        .with_appendix(appendix)
        .with_config(config);
    let targets = controller.detect_targets(query);
    let result = controller.resolve(query, &targets, k).await?;

    let tracked = if track {
        let tracker = ReferenceTracker::new(index, max_hops);
        Some(tracker.track(result.evidence.clone()).await)
    } else {
        None
    };

    if json {
        let out = serde_json::json!({ "result": result, "tracked": tracked });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    display::print_resolve(query, &result);
    if let Some(tracked) = &tracked {
        display::print_tracked(tracked);
    }
    Ok(())
}
