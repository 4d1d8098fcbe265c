/*
 * main.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! `stencil` — render stencil templates from the command line.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use stencil_template::{Context, Template};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Minimal procedural template renderer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against a variable context
    Render {
        /// Template file
        template: PathBuf,

        /// JSON file with the initial variable context (an object)
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delimiter configuration, e.g. "<% %>"
        #[arg(short, long)]
        delimiters: Option<String>,
    },

    /// Compile a template and print its generated program
    Compile {
        /// Template file
        template: PathBuf,

        /// Delimiter configuration, e.g. "<% %>"
        #[arg(short, long)]
        delimiters: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stencil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            context,
            output,
            delimiters,
        } => render(&template, context.as_deref(), output.as_deref(), delimiters.as_deref()),
        Commands::Compile {
            template,
            delimiters,
        } => compile(&template, delimiters.as_deref()),
    }
}

fn render(
    template_path: &Path,
    context_path: Option<&Path>,
    output_path: Option<&Path>,
    delimiters: Option<&str>,
) -> Result<()> {
    let template = load_template(template_path, delimiters)?;
    let mut ctx = match context_path {
        Some(path) => load_context(path)?,
        None => Context::new(),
    };

    match output_path {
        Some(path) => {
            let mut out = Vec::new();
            template.render(&mut ctx, &mut out)?;
            fs::write(path, out)
                .with_context(|| format!("cannot write output file {}", path.display()))?;
            tracing::info!(output = %path.display(), "rendered template");
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            template.render(&mut ctx, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn compile(template_path: &Path, delimiters: Option<&str>) -> Result<()> {
    let template = load_template(template_path, delimiters)?;
    print!("{}", template.program());
    Ok(())
}

fn load_template(path: &Path, delimiters: Option<&str>) -> Result<Template> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("cannot read template file {}", path.display()))?;
    let template = match delimiters {
        Some(config) => Template::compile_with_delimiters(&source, config),
        None => Template::compile(&source),
    }
    .with_context(|| format!("cannot compile template {}", path.display()))?;
    Ok(template)
}

fn load_context(path: &Path) -> Result<Context> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read context file {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("context file {} is not valid JSON", path.display()))?;
    let ctx = Context::from_json(json)
        .with_context(|| format!("context file {} must hold a JSON object", path.display()))?;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_load_context_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "Ann", "count": 2}}"#).unwrap();

        let ctx = load_context(file.path()).unwrap();
        assert_eq!(
            ctx.get("name"),
            Some(&stencil_template::Value::from("Ann"))
        );
        assert_eq!(ctx.get("count"), Some(&stencil_template::Value::Int(2)));
    }

    #[test]
    fn test_load_context_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(load_context(file.path()).is_err());
    }

    #[test]
    fn test_render_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("greeting.tmpl");
        let context_path = dir.path().join("ctx.json");
        let output_path = dir.path().join("out.txt");

        fs::write(&template_path, "Hi {{=name}}!\n").unwrap();
        fs::write(&context_path, r#"{"name": "Ann"}"#).unwrap();

        render(
            &template_path,
            Some(&context_path),
            Some(&output_path),
            None,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output_path).unwrap(), "Hi Ann!\n");
    }
}
