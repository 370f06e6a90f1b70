//! CLI tool for reading DFP/ITR archives

use cvmdfp::{DfpItrFile, Document, ReadOptions};
use std::env;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <archive.zip> [--json] [--no-individual] [--no-consolidated]",
            args[0]
        );
        eprintln!("\nReads a CVM DFP/ITR archive and prints one line per document.");
        eprintln!("Use --json for the full statement trees as JSON.");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);

    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }

    let mut options = ReadOptions::new();
    let mut json = false;

    for arg in &args[2..] {
        match arg.as_str() {
            "--json" => json = true,
            "--no-individual" => options.individual = false,
            "--no-consolidated" => options.consolidated = false,
            _ => {
                eprintln!("Unknown option: {}", arg);
                std::process::exit(1);
            }
        }
    }

    let file = match DfpItrFile::open_with_options(&path, options) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error opening archive: {}", e);
            std::process::exit(1);
        }
    };

    let mut documents: Vec<Document> = Vec::new();

    for result in file {
        match result {
            Ok(document) => documents.push(document),
            Err(e) => {
                eprintln!("Error reading archive: {}", e);
                std::process::exit(1);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&documents) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing documents: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Documents: {}", documents.len());

        for doc in &documents {
            println!(
                "  [{}] {} (CNPJ {}) {:?} v{} period {} ({:?}): {} statement(s), {} fault(s)",
                doc.id,
                doc.company_name,
                doc.cnpj,
                doc.kind,
                doc.version,
                doc.period_end,
                doc.fiscal_year,
                doc.statements.len(),
                doc.faults.len()
            );
        }
    }
}
