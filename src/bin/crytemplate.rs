//! Command-line interface for crytemplate.
//! This binary tokenizes documents with TextMate-style grammars and lints
//! grammar files.
//!
//! Usage:
//!   crytemplate tokenize `<path>` --scope `<scope>` --grammar `<scope>=<path>`...  - Tokenize a document
//!   crytemplate check `<path>`                                                    - Check a grammar file loads

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;

use crytemplate::{parse_raw_grammar, FileGrammarSource, Grammar, LineTokens, Registry};

fn main() {
    let matches = Command::new("crytemplate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tokenize documents with TextMate-style grammars")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("tokenize")
                .about("Tokenize a document line by line")
                .arg(
                    Arg::new("path")
                        .help("Path to the document to tokenize")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("scope")
                        .long("scope")
                        .short('s')
                        .help("Scope name of the base grammar")
                        .required(true),
                )
                .arg(
                    Arg::new("grammar")
                        .long("grammar")
                        .short('g')
                        .help("Grammar mapping as '<scope>=<path>' (repeatable)")
                        .action(ArgAction::Append)
                        .required(true),
                )
                .arg(
                    Arg::new("injection")
                        .long("injection")
                        .short('i')
                        .help("Injection mapping as '<host-scope>=<injected-scope>' (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format ('json' or 'text')")
                        .default_value("text"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check that a grammar file parses and compiles")
                .arg(
                    Arg::new("path")
                        .help("Path to the grammar file")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("tokenize", sub)) => {
            let path = sub.get_one::<String>("path").expect("required arg");
            let scope = sub.get_one::<String>("scope").expect("required arg");
            let grammars: Vec<&String> = sub
                .get_many::<String>("grammar")
                .expect("required arg")
                .collect();
            let injections: Vec<&String> = sub
                .get_many::<String>("injection")
                .map(|vals| vals.collect())
                .unwrap_or_default();
            let format = sub.get_one::<String>("format").expect("has default");
            handle_tokenize_command(path, scope, &grammars, &injections, format);
        }
        Some(("check", sub)) => {
            let path = sub.get_one::<String>("path").expect("required arg");
            handle_check_command(path);
        }
        _ => unreachable!(),
    }
}

/// Handle the tokenize command
fn handle_tokenize_command(
    path: &str,
    scope: &str,
    grammars: &[&String],
    injections: &[&String],
    format: &str,
) {
    let mut source = FileGrammarSource::new();
    for mapping in grammars {
        let Some((grammar_scope, grammar_path)) = mapping.split_once('=') else {
            eprintln!("Error: --grammar expects '<scope>=<path>', got '{}'", mapping);
            std::process::exit(1);
        };
        source = source.with_grammar(grammar_scope, PathBuf::from(grammar_path));
    }

    let mut registry = Registry::new(source);
    for mapping in injections {
        let Some((host, injected)) = mapping.split_once('=') else {
            eprintln!(
                "Error: --injection expects '<host-scope>=<injected-scope>', got '{}'",
                mapping
            );
            std::process::exit(1);
        };
        registry = registry.with_injections(host, [injected]);
    }

    let grammar = match registry.load_grammar(scope) {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path, e);
            std::process::exit(1);
        }
    };

    let lines = match registry.tokenize_lines(&grammar, content.lines()) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match format {
        "json" => print_json(&content, &lines),
        "text" => print_text(&content, &lines, &grammar),
        other => {
            eprintln!("Error: unknown format '{}', expected 'json' or 'text'", other);
            std::process::exit(1);
        }
    }
}

fn print_json(content: &str, lines: &[LineTokens]) {
    let out: Vec<serde_json::Value> = content
        .lines()
        .zip(lines)
        .map(|(text, line)| {
            serde_json::json!({
                "line": text,
                "tokens": line.tokens,
            })
        })
        .collect();
    match serde_json::to_string_pretty(&out) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_text(content: &str, lines: &[LineTokens], grammar: &Arc<Grammar>) {
    println!("base grammar: {}", grammar.scope_name());
    for (number, (text, line)) in content.lines().zip(lines).enumerate() {
        println!("{:>4} | {}", number + 1, text);
        for token in &line.tokens {
            println!(
                "     | {:>3}..{:<3} {:?} {}",
                token.start,
                token.end,
                &text[token.start..token.end],
                token.scopes.join(" ")
            );
        }
    }
}

/// Handle the check command
fn handle_check_command(path: &str) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path, e);
            std::process::exit(1);
        }
    };

    let raw = match parse_raw_grammar(&text) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match Grammar::compile(&raw) {
        Ok(grammar) => {
            println!("ok: {}", grammar.scope_name());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
