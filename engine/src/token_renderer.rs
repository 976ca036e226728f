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

//! Renders a libclang token stream back into readable source text, grouping
//! tokens by source line and tracking brace depth so the result is
//! consistently indented regardless of how the original header was
//! formatted.

use clang::Token;
use itertools::Itertools;

struct OutputLine {
    tab: usize,
    define: bool,
    spellings: Vec<String>,
}

impl OutputLine {
    fn new(tab: usize) -> Self {
        OutputLine {
            tab,
            define: false,
            spellings: Vec::new(),
        }
    }

    fn push_token(&mut self, next_tab: &mut usize, spelling: String) {
        if spelling == "#" && self.spellings.is_empty() {
            self.define = true;
        }
        if spelling == "{" {
            *next_tab += 1;
        }
        if spelling == "}" {
            self.tab = self.tab.saturating_sub(1);
            *next_tab = next_tab.saturating_sub(1);
        }

        let no_space_before = spelling == "(";
        let after_leading_hash = self.define && self.spellings.len() == 1;
        if !self.spellings.is_empty() && !no_space_before && !after_leading_hash {
            self.spellings.push(" ".to_string());
        }
        self.spellings.push(spelling);
    }

    fn render(&self) -> String {
        let indent = if self.define {
            String::new()
        } else {
            "\t".repeat(self.tab)
        };
        format!("{}{}", indent, self.spellings.concat())
    }
}

/// Renders `tokens` (already filtered to exclude comments by the caller, if
/// desired) as source text, joining output lines with `separator`.
pub fn stringify_tokens(tokens: &[Token<'_>], separator: &str) -> String {
    let mut tab = 0usize;
    let mut next_tab = 0usize;
    let mut lines: Vec<OutputLine> = Vec::new();

    for (_line_no, group) in &tokens
        .iter()
        .group_by(|t| t.get_location().get_spelling_location().line)
    {
        let mut out = OutputLine::new(tab);
        for token in group {
            out.push_token(&mut next_tab, token.get_spelling());
        }
        tab = next_tab;
        lines.push(out);
    }

    lines.iter().map(OutputLine::render).join(separator)
}

#[cfg(test)]
mod tests {
    // Token-stream rendering is exercised indirectly in generator.rs's
    // integration tests, since constructing standalone `Token` values
    // requires a live translation unit.
}
