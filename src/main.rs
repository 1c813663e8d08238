use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use streamlight::cli::{chunk_text, CliArgs, Command, InputArgs};
use streamlight::config::StreamlightConfig;
use streamlight::highlighter::{
    DefaultHighlighter, HighlightOptions, HighlightPlugin, HighlightPluginOptions,
    HighlightResult, Highlighter, LocalHighlighter, ThemeSelection,
};
use streamlight::session::StreamSession;
use streamlight::syntax::TokenBuffer;
use streamlight::theme::{list_available_themes, ThemeSource};
use streamlight::tracing::StreamSnapshot;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    streamlight::tracing::init();

    let config = match &args.config {
        Some(path) => StreamlightConfig::load_from(path),
        None => StreamlightConfig::load(),
    };

    match args.command {
        Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            streamlight::server::serve(&listen, Arc::new(LocalHighlighter::new()))
                .await
                .with_context(|| format!("Failed to serve on {}", listen))?;
        }
        Command::Highlight {
            input,
            endpoint,
            html,
        } => {
            let code = read_input(input.path.as_deref())?;
            let highlighter = highlighter(endpoint.as_deref(), &config)?;
            let result = highlighter
                .resolve(
                    &code,
                    &input.language(&config),
                    &input.theme(&config),
                    &HighlightOptions::default(),
                )
                .await;
            print_result(&result, html)?;
        }
        Command::Stream {
            input,
            no_recalls,
            chunk_size,
        } => stream(&input, &config, no_recalls, chunk_size)?,
        Command::Markdown {
            path,
            theme,
            endpoint,
            html,
        } => {
            let markdown = read_input(path.as_deref())?;
            let plugin = HighlightPlugin::new(
                HighlightPluginOptions {
                    theme: Some(ThemeSelection::named(
                        theme.unwrap_or_else(|| config.theme.clone()),
                    )),
                    highlighter: Some(highlighter(endpoint.as_deref(), &config)?),
                },
                &config,
            )?;
            for (block, result) in plugin.highlight_markdown(&markdown).await {
                println!("<!-- line {}: {} -->", block.line, block.lang);
                print_result(&result, html)?;
            }
        }
        Command::Themes => {
            for info in list_available_themes() {
                let source = match info.source {
                    ThemeSource::User => "user",
                    ThemeSource::Builtin => "builtin",
                };
                println!("{:<16} {:<24} {}", info.id, info.name, source);
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Remote-first when an endpoint is given, local otherwise
fn highlighter(
    endpoint: Option<&str>,
    config: &StreamlightConfig,
) -> Result<Arc<dyn Highlighter>> {
    Ok(match endpoint {
        Some(endpoint) => Arc::new(DefaultHighlighter::new(
            endpoint,
            Duration::from_secs(config.request_timeout_secs),
        )?),
        None => Arc::new(LocalHighlighter::new()),
    })
}

fn print_result(result: &HighlightResult, html: bool) -> Result<()> {
    if html {
        println!("{}", result.to_html());
    } else {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}

/// Print every batch as one JSON line, chunk by chunk
fn stream(
    input: &InputArgs,
    config: &StreamlightConfig,
    no_recalls: bool,
    chunk_size: usize,
) -> Result<()> {
    let text = read_input(input.path.as_deref())?;
    let mut session = StreamSession::new(input.stream_options(config, no_recalls));
    session.start_stream()?;

    let mut buffer = TokenBuffer::new();
    let mut snapshot = StreamSnapshot::from_buffer(&buffer);
    let chunks = chunk_text(&text, chunk_size);
    let last = chunks.len();

    for (idx, chunk) in chunks.into_iter().enumerate() {
        let mut batches = session.feed(chunk);
        if idx + 1 == last {
            batches.extend(session.finish());
        }
        for batch in batches {
            println!("{}", serde_json::to_string(&batch)?);
            buffer.apply(batch);
        }

        let next = StreamSnapshot::from_buffer(&buffer);
        if let Some(diff) = snapshot.diff(&next) {
            tracing::debug!("chunk {}: {}", idx, diff);
        }
        snapshot = next;
    }
    if last == 0 {
        for batch in session.finish() {
            println!("{}", serde_json::to_string(&batch)?);
        }
    }

    session.end_stream();
    tracing::info!(
        tokens = buffer.tokens().len(),
        recalls = buffer.recall_count(),
        "stream complete"
    );
    Ok(())
}
