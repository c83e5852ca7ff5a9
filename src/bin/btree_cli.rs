//! Simple CLI for exercising the B-tree index.
//!
//! The tree lives in memory for one run, so a session is a script of
//! commands taken from the arguments or, when none are given, read line by
//! line from stdin.
//!
//! Usage:
//!   btree_cli [--min-degree <t>] insert 10 20 5 remove 6 search 5 traverse
//!   btree_cli --min-degree 3 < script.txt
//!
//! Commands:
//!   insert <key>...   remove <key>...   search <key>...
//!   traverse          tree              stats
//!   validate          clear

use btree_index::{BTree, BTreeConfig, DEFAULT_MIN_DEGREE};
use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead};
use std::process::exit;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "btree_cli",
    about = "Run insert/search/remove scripts against an in-memory B-tree"
)]
struct Args {
    /// Minimum degree `t`: non-root nodes hold t-1 to 2t-1 keys
    #[arg(short = 't', long, env = "BTREE_MIN_DEGREE", default_value_t = DEFAULT_MIN_DEGREE)]
    min_degree: usize,

    /// Pretty-print JSON output of `tree` and `stats`
    #[arg(long)]
    pretty: bool,

    /// Commands to run; read from stdin when omitted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Insert(Vec<i64>),
    Remove(Vec<i64>),
    Search(Vec<i64>),
    Traverse,
    Tree,
    Stats,
    Validate,
    Clear,
}

fn parse_script(tokens: &[String]) -> Result<Vec<Command>, String> {
    let mut commands = Vec::new();
    let mut iter = tokens.iter().peekable();

    while let Some(word) = iter.next() {
        let command = match word.as_str() {
            "insert" | "remove" | "search" => {
                let mut keys = Vec::new();
                while let Some(key) = iter.peek().and_then(|t| t.parse::<i64>().ok()) {
                    keys.push(key);
                    iter.next();
                }
                if keys.is_empty() {
                    return Err(format!("{} needs at least one integer key", word));
                }
                match word.as_str() {
                    "insert" => Command::Insert(keys),
                    "remove" => Command::Remove(keys),
                    _ => Command::Search(keys),
                }
            }
            "traverse" => Command::Traverse,
            "tree" => Command::Tree,
            "stats" => Command::Stats,
            "validate" => Command::Validate,
            "clear" => Command::Clear,
            other => return Err(format!("Unknown command: {}", other)),
        };
        commands.push(command);
    }

    Ok(commands)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn run(tree: &mut BTree<i64>, command: &Command, pretty: bool) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Insert(keys) => {
            for &key in keys {
                println!("{}", if tree.insert(key) { "OK" } else { "EXISTS" });
            }
        }
        Command::Remove(keys) => {
            for key in keys {
                println!("{}", if tree.remove(key) { "REMOVED" } else { "NOT_FOUND" });
            }
        }
        Command::Search(keys) => {
            for key in keys {
                println!("{}", if tree.contains(key) { "FOUND" } else { "NOT_FOUND" });
            }
        }
        Command::Traverse => {
            let keys: Vec<String> = tree.iter().map(i64::to_string).collect();
            println!("COUNT: {}", keys.len());
            println!("{}", keys.join(" "));
        }
        Command::Tree => println!("{}", to_json(&tree.export(), pretty)?),
        Command::Stats => println!("{}", to_json(&tree.stats(), pretty)?),
        Command::Validate => {
            tree.validate()?;
            println!("VALID");
        }
        Command::Clear => {
            tree.clear();
            println!("OK");
        }
    }
    Ok(())
}

fn execute(tree: &mut BTree<i64>, tokens: &[String], pretty: bool) -> Result<(), Box<dyn Error>> {
    for command in parse_script(tokens)? {
        run(tree, &command, pretty)?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut tree = match BTree::with_config(BTreeConfig::new(args.min_degree)) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
    };

    if !args.script.is_empty() {
        if let Err(e) = execute(&mut tree, &args.script, args.pretty) {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
        return;
    }

    // Interactive / piped mode: one script per line, errors don't end the session
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                exit(1);
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<String> = trimmed.split_whitespace().map(String::from).collect();
        if let Err(e) = execute(&mut tree, &tokens, args.pretty) {
            eprintln!("ERROR: {}", e);
        }
    }
}
