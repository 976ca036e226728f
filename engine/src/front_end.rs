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

//! Owns the single libclang handle for a generation run and drives parsing
//! of each input header into a [`TranslationUnit`].

use std::path::{Path, PathBuf};

use clang::{Clang, Index, Unsaved};
use log::warn;

use crate::error::{GeneratorError, Result};
use crate::translation_unit::TranslationUnit;

/// Acquires the process-wide libclang handle. `clang::Clang::new()` may
/// only succeed once per process; callers are expected to call this exactly
/// once at the top of a run (the CLI's `main`, or a test's setup) and hold
/// the result for as long as any [`TranslationUnit`] derived from it is
/// alive.
pub fn initialize() -> Result<Clang> {
    Clang::new().map_err(GeneratorError::FrontEndInit)
}

fn language_flag(path: &Path) -> &'static str {
    if path.extension().and_then(|e| e.to_str()) == Some("c") {
        "-xc"
    } else {
        "-xc++"
    }
}

fn build_args(path: &Path, compile_flags: &[String]) -> Vec<String> {
    let mut args = vec![language_flag(path).to_string()];
    args.extend(compile_flags.iter().cloned());
    args.push("-I.".to_string());
    args
}

/// Parses a header from disk into a cached [`TranslationUnit`].
pub fn parse<'c>(
    index: &'c Index<'c>,
    path: &Path,
    compile_flags: &[String],
    limit_scan_depth: bool,
) -> Result<TranslationUnit<'c>> {
    if !path.exists() {
        return Err(GeneratorError::InputPathMissing(path.to_path_buf()));
    }
    let args = build_args(path, compile_flags);
    parse_with_args(index, path, &args, None, limit_scan_depth)
}

/// Parses an in-memory header, for tests that don't want disk fixtures.
pub fn parse_unsaved<'c>(
    index: &'c Index<'c>,
    path: &Path,
    contents: &str,
    compile_flags: &[String],
    limit_scan_depth: bool,
) -> Result<TranslationUnit<'c>> {
    let args = build_args(path, compile_flags);
    let unsaved = Unsaved::new(path, contents);
    parse_with_args(index, path, &args, Some(unsaved), limit_scan_depth)
}

fn parse_with_args<'c>(
    index: &'c Index<'c>,
    path: &Path,
    args: &[String],
    unsaved: Option<Unsaved>,
    limit_scan_depth: bool,
) -> Result<TranslationUnit<'c>> {
    let unsaved_slice = unsaved.as_ref().map(std::slice::from_ref).unwrap_or(&[]);
    let mut parser = index.parser(path);
    parser
        .arguments(args)
        .unsaved(unsaved_slice)
        .skip_function_bodies(true)
        .incomplete(true)
        .keep_going(true)
        .detailed_preprocessing_record(true);

    let tu = parser.parse().map_err(|err| GeneratorError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    for diagnostic in tu.get_diagnostics() {
        warn!("{}: {}", path.display(), diagnostic);
    }

    Ok(TranslationUnit::new(path.to_path_buf(), tu, limit_scan_depth))
}

/// Parses every input header in turn, short-circuiting on the first
/// failure. The caller supplies one [`Index`] shared across all units so
/// cross-unit cursor comparisons remain meaningful within libclang's model.
pub fn parse_all<'c>(
    index: &'c Index<'c>,
    paths: &[PathBuf],
    compile_flags: &[String],
    limit_scan_depth: bool,
) -> Result<Vec<TranslationUnit<'c>>> {
    paths
        .iter()
        .map(|path| parse(index, path, compile_flags, limit_scan_depth))
        .collect()
}
