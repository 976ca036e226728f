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

//! Data model for the `--sapi_*` flag surface, kept free of any argument
//! parsing dependency so the engine and its tests can construct a
//! [`GeneratorConfig`] directly.

use std::path::{Path, PathBuf};

use log::debug;

/// Everything the generator needs to know about one invocation, independent
/// of how it was populated (CLI flags, a test harness, ...).
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Class base name (`Foo` -> `FooApi`).
    pub sapi_name: String,
    /// Input header paths.
    pub sapi_in: Vec<PathBuf>,
    /// Output file; `None` means stdout.
    pub sapi_out: Option<PathBuf>,
    /// `::`-separated namespace.
    pub sapi_ns: Option<String>,
    /// Whitelist of function names; empty means all.
    pub sapi_functions: Vec<String>,
    /// Include directory for the embed header.
    pub sapi_embed_dir: Option<String>,
    /// Base name for embed support.
    pub sapi_embed_name: Option<String>,
    /// Retain only functions declared in the top-level file.
    pub sapi_limit_scan_depth: bool,
    /// Compile flags forwarded to the front-end, including any `-isystem`
    /// pairs produced by [`extract_includes`].
    pub compile_flags: Vec<String>,
}

/// Appends `-isystem <line>` for every line of the file at `path` to
/// `flags`. Silently does nothing if the file can't be opened or read,
/// mirroring the tolerant behavior of the original `-isystem` extraction
/// utility: a missing or unreadable `--sapi_isystem` file is not fatal.
pub fn extract_includes(path: &Path, flags: &mut Vec<String>) {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!("could not read isystem file {}: {}", path.display(), err);
            return;
        }
    };
    for line in contents.lines() {
        flags.push("-isystem".to_string());
        flags.push(line.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extract_includes_appends_isystem_pairs() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"/usr/include/foo\n/usr/include/bar\n")
            .unwrap();
        let mut flags = vec!["-xc++".to_string()];
        extract_includes(file.path(), &mut flags);
        assert_eq!(
            flags,
            vec![
                "-xc++".to_string(),
                "-isystem".to_string(),
                "/usr/include/foo".to_string(),
                "-isystem".to_string(),
                "/usr/include/bar".to_string(),
            ]
        );
    }

    #[test]
    fn extract_includes_tolerates_missing_file() {
        let mut flags = Vec::new();
        extract_includes(Path::new("/nonexistent/does/not/exist"), &mut flags);
        assert!(flags.is_empty());
    }
}
