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

/// Errors that can abort generation. Front-end diagnostics that are merely
/// advisory (`parse-warning`) are logged, not represented here.
#[derive(thiserror::Error, Debug)]
pub enum GeneratorError {
    #[error("input path {0} does not exist")]
    InputPathMissing(PathBuf),

    #[error("could not locate or initialize the Clang front-end library: {0}")]
    FrontEndInit(String),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot prepare header guard from path: {0}")]
    InvalidOutputPath(String),

    #[error(
        "unsupported argument type in function {function}, position {position}: `{spelling}` at {location}"
    )]
    UnsupportedType {
        function: String,
        position: usize,
        spelling: String,
        location: String,
    },
}

pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;
