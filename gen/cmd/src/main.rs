// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{crate_authors, crate_version, Arg, Command};
use log::info;
use miette::IntoDiagnostic;
use sapi_generator_config::{extract_includes, GeneratorConfig};

fn main() -> miette::Result<()> {
    env_logger::builder().init();

    let matches = Command::new("sapi_generator")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Generates a sandboxed-api C++ interface header from C/C++ headers")
        .arg(
            Arg::new("sapi_name")
                .long("sapi_name")
                .takes_value(true)
                .required(true)
                .help("Name of the sandboxed API, used as the generated class prefix"),
        )
        .arg(
            Arg::new("sapi_in")
                .long("sapi_in")
                .takes_value(true)
                .multiple_values(true)
                .required(true)
                .help("Input headers to scan for exported functions"),
        )
        .arg(
            Arg::new("sapi_out")
                .long("sapi_out")
                .takes_value(true)
                .help("Output path for the generated header; stdout if omitted"),
        )
        .arg(
            Arg::new("sapi_ns")
                .long("sapi_ns")
                .takes_value(true)
                .help("C++ namespace(s), separated by ::, to wrap the generated code in"),
        )
        .arg(
            Arg::new("sapi_isystem")
                .long("sapi_isystem")
                .takes_value(true)
                .help("Path to a file listing additional -isystem include directories, one per line"),
        )
        .arg(
            Arg::new("sapi_functions")
                .long("sapi_functions")
                .takes_value(true)
                .multiple_values(true)
                .help("Restrict generation to these function names; default is every exported function"),
        )
        .arg(
            Arg::new("sapi_embed_dir")
                .long("sapi_embed_dir")
                .takes_value(true)
                .help("Directory of the embedded sandboxee, for the optional Sandbox subclass"),
        )
        .arg(
            Arg::new("sapi_embed_name")
                .long("sapi_embed_name")
                .takes_value(true)
                .help("Name of the embedded sandboxee, for the optional Sandbox subclass"),
        )
        .arg(
            Arg::new("sapi_limit_scan_depth")
                .long("sapi_limit_scan_depth")
                .takes_value(false)
                .help("Only scan for exported functions declared directly in an input header"),
        )
        .arg(
            Arg::new("compile_flags")
                .long("compile_flags")
                .takes_value(true)
                .multiple_values(true)
                .last(true)
                .help("Extra flags passed through to the C/C++ front-end"),
        )
        .get_matches();

    let mut compile_flags: Vec<String> = matches
        .values_of("compile_flags")
        .map(|vals| vals.map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(isystem_path) = matches.value_of("sapi_isystem") {
        extract_includes(&PathBuf::from(isystem_path), &mut compile_flags);
    }

    let config = GeneratorConfig {
        sapi_name: matches.value_of("sapi_name").unwrap().to_string(),
        sapi_in: matches
            .values_of("sapi_in")
            .unwrap()
            .map(PathBuf::from)
            .collect(),
        sapi_out: matches.value_of("sapi_out").map(PathBuf::from),
        sapi_ns: matches.value_of("sapi_ns").map(str::to_string),
        sapi_functions: matches
            .values_of("sapi_functions")
            .map(|vals| vals.map(str::to_string).collect())
            .unwrap_or_default(),
        sapi_embed_dir: matches.value_of("sapi_embed_dir").map(str::to_string),
        sapi_embed_name: matches.value_of("sapi_embed_name").map(str::to_string),
        sapi_limit_scan_depth: matches.is_present("sapi_limit_scan_depth"),
        compile_flags,
    };

    let clang = sapi_generator_engine::initialize().into_diagnostic()?;
    let rendered = sapi_generator_engine::generate(&clang, &config).into_diagnostic()?;

    match &config.sapi_out {
        Some(path) => {
            let should_write = match std::fs::read_to_string(path) {
                Ok(existing) => existing != rendered,
                Err(_) => true,
            };
            if should_write {
                std::fs::write(path, rendered).into_diagnostic()?;
                info!("wrote {}", path.display());
            } else {
                info!("{} unchanged, skipping write", path.display());
            }
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
