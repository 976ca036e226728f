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

//! Assembles the final sandboxed-api header out of the functions
//! discovered across all translation units, plus their transitive related
//! types, forward declarations and macro definitions.

use std::collections::HashSet;

use itertools::Itertools;
use sapi_generator_config::GeneratorConfig;

use crate::error::{GeneratorError, Result};
use crate::function::Function;
use crate::translation_unit::TranslationUnit;
use crate::types::Type;

const AUTO_GENERATED: &str = "// AUTO-GENERATED by the Sandboxed API generator.\n// Edits will be discarded when this file is regenerated.\n";
const GUARD_START: &str = "#ifndef {0}\n#define {0}";
const GUARD_END: &str = "#endif  // {}";
const EMBED_INCLUDE: &str = "#include \"{}\"";
const FIXED_INCLUDES: &[&str] = &[
    "absl/status/status.h",
    "absl/status/statusor.h",
    "sandboxed_api/sandbox.h",
    "sandboxed_api/util/status_macros.h",
    "sandboxed_api/vars.h",
];

/// Derives the `#ifndef`/`#define` guard name for `path`.
///
/// Mirrors the original rule closely, including its `genfiles/`-prefix
/// stripping convention for generated-file trees, but this is a textual
/// derivation rather than a real directory-tree lookup.
pub fn header_guard(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(GeneratorError::InvalidOutputPath(path.to_string()));
    }
    let stripped = match path.split_once("genfiles/") {
        Some((_, rest)) => rest,
        None => path,
    };
    let stripped = stripped.strip_suffix(".gen").unwrap_or(stripped);
    let mut guard = stripped
        .to_uppercase()
        .chars()
        .map(|c| match c {
            '.' | '-' | '/' => '_',
            other => other,
        })
        .collect::<String>();
    guard.push('_');
    Ok(guard)
}

pub struct Generator<'a, 'b, 'tu> {
    config: &'a GeneratorConfig,
    translation_units: &'b [TranslationUnit<'tu>],
}

impl<'a, 'b, 'tu> Generator<'a, 'b, 'tu> {
    pub fn new(config: &'a GeneratorConfig, translation_units: &'b [TranslationUnit<'tu>]) -> Self {
        Generator {
            config,
            translation_units,
        }
    }

    /// Functions named in `sapi_functions` (or every exported function, if
    /// the list is empty), deduplicated by mangled name and sorted by
    /// spelling — the order in which they'll appear in the class body.
    fn functions(&self) -> Result<Vec<Function<'b, 'tu>>> {
        let mut seen = HashSet::new();
        let mut functions = Vec::new();
        for tu in self.translation_units {
            for cursor in tu.functions() {
                let name = match cursor.get_name() {
                    Some(name) => name,
                    None => continue,
                };
                if !self.config.sapi_functions.is_empty() && !self.config.sapi_functions.contains(&name) {
                    continue;
                }
                let function = match Function::new(tu, cursor) {
                    Some(f) => f,
                    None => continue,
                };
                if function.is_mangled() {
                    continue;
                }
                let key = cursor.get_mangled_name().unwrap_or(name);
                if !seen.insert(key) {
                    continue;
                }
                functions.push(function);
            }
        }
        functions.sort_by_key(|f| f.name());
        Ok(functions)
    }

    /// The related-type closure across all selected functions, in
    /// first-seen order, with anything the Type Model flagged as
    /// "redundant with its enclosing typedef" filtered back out.
    fn related_types(&self, functions: &[Function<'b, 'tu>]) -> Vec<Type<'b, 'tu>> {
        let mut processed = HashSet::new();
        let mut ordered = Vec::new();
        let mut types_to_skip = HashSet::new();

        for function in functions {
            let mut fn_related = function.related_types().into_iter().collect::<Vec<_>>();
            fn_related.sort();
            for ty in fn_related {
                if processed.insert(ty) {
                    ordered.push(ty);
                }
            }
        }

        for tu in self.translation_units {
            for ty in &ordered {
                if let Some(usr) = ty.usr() {
                    if tu.is_type_to_skip(&usr) {
                        types_to_skip.insert(usr);
                    }
                }
            }
        }

        ordered
            .into_iter()
            .filter(|ty| ty.usr().map(|usr| !types_to_skip.contains(&usr)).unwrap_or(true))
            .collect()
    }

    fn forward_decls(&self, related_types: &[Type<'b, 'tu>]) -> Vec<String> {
        let mut done = HashSet::new();
        let mut decls = Vec::new();
        for ty in related_types {
            let usr = match ty.usr() {
                Some(usr) => usr,
                None => continue,
            };
            if done.contains(&usr) {
                continue;
            }
            for tu in self.translation_units {
                if let Some(cursor) = tu.forward_decl(&usr) {
                    if let Some(range) = cursor.get_range() {
                        let tokens: Vec<_> = range
                            .tokenize()
                            .into_iter()
                            .filter(|t| t.get_kind() != clang::TokenKind::Comment)
                            .collect();
                        decls.push(format!("{};", crate::token_renderer::stringify_tokens(&tokens, "\n")));
                    }
                    break;
                }
            }
            done.insert(usr);
        }
        decls
    }

    fn defines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for tu in self.translation_units {
            for cursor in tu.defines_to_emit() {
                if let Some(range) = cursor.get_range() {
                    let tokens: Vec<_> = range
                        .tokenize()
                        .into_iter()
                        .filter(|t| t.get_kind() != clang::TokenKind::Comment)
                        .collect();
                    lines.push(format!(
                        "#define {}",
                        crate::token_renderer::stringify_tokens(&tokens, " \\\n")
                    ));
                }
            }
        }
        lines
    }

    fn format_function(&self, function: &Function<'b, 'tu>) -> Result<String> {
        let name = function.name();
        let args = function
            .parameters()
            .iter()
            .map(|p| p.declaration())
            .join(", ");
        let result_spelling = function.result().return_type_spelling();
        let result_mapped = function.result().mapped_type(&name)?;

        let mut wrapped_lines = Vec::new();
        for param in function.parameters() {
            if !param.is_sugared_ptr() {
                wrapped_lines.push(format!("  {};", param.wrapped(&name)?));
            }
        }

        let call_args = function
            .parameters()
            .iter()
            .map(|p| p.call_argument())
            .join(", ");
        let call_line = if call_args.is_empty() {
            format!("SAPI_RETURN_IF_ERROR(sandbox_->Call(\"{}\", &ret));", name)
        } else {
            format!(
                "SAPI_RETURN_IF_ERROR(sandbox_->Call(\"{}\", &ret, {}));",
                name, call_args
            )
        };

        let is_enum_return = function.result().ty().is_sugared_enum();
        let return_line = if function.result().ty().is_void() {
            "  return absl::OkStatus();".to_string()
        } else if is_enum_return {
            format!(
                "  return static_cast<{}>(ret.GetValue());",
                function.result().ty().spelling()
            )
        } else {
            "  return ret.GetValue();".to_string()
        };

        let mut body = Vec::new();
        body.push(format!("// {}", function.original_definition()));
        body.push(format!("{} {}({}) {{", result_spelling, name, args));
        body.push(format!("  {} ret;", result_mapped));
        body.extend(wrapped_lines);
        body.push(String::new());
        body.push(format!("  {}", call_line));
        body.push(return_line);
        body.push("}".to_string());
        Ok(body.join("\n"))
    }

    /// Renders the full header.
    pub fn generate(&self) -> Result<String> {
        let functions = self.functions()?;
        let related_types = self.related_types(&functions);

        let mut related_type_lines = self.defines();
        related_type_lines.extend(self.forward_decls(&related_types));
        for ty in &related_types {
            related_type_lines.push(format!("{};", ty.stringify()));
        }

        let formatted_functions = functions
            .iter()
            .map(|f| self.format_function(f))
            .collect::<Result<Vec<_>>>()?;

        self.format_template(&related_type_lines, &formatted_functions)
    }

    fn format_template(&self, related_types: &[String], functions: &[String]) -> Result<String> {
        let mut out = String::new();
        out.push_str(AUTO_GENERATED);

        let guard = self
            .config
            .sapi_out
            .as_ref()
            .map(|p| header_guard(&p.display().to_string()))
            .transpose()?;
        if let Some(guard) = &guard {
            out.push_str(&GUARD_START.replacen("{0}", guard, 2));
            out.push_str("\n\n");
        }

        for include in FIXED_INCLUDES {
            out.push_str(&format!("#include \"{}\"\n", include));
        }

        if let Some(embed_name) = &self.config.sapi_embed_name {
            let embed_path = match self.config.sapi_embed_dir.as_deref() {
                Some(dir) if !dir.is_empty() => format!("{}/{}_embed.h", dir, embed_name),
                _ => format!("{}_embed.h", embed_name),
            };
            out.push_str(&EMBED_INCLUDE.replace("{}", &embed_path));
            out.push('\n');
        }

        let namespaces: Vec<&str> = self
            .config
            .sapi_ns
            .as_deref()
            .map(|ns| ns.split("::").filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        for ns in &namespaces {
            out.push_str(&format!("\nnamespace {} {{\n", ns));
        }

        out.push('\n');
        for line in related_types {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        if let Some(embed_name) = &self.config.sapi_embed_name {
            let embed_symbol = embed_name.replace('-', "_");
            out.push_str(&format!(
                "class {0}Sandbox : public ::sapi::Sandbox {{\n public:\n  {0}Sandbox() : ::sapi::Sandbox({1}_embed_create()) {{}}\n}};\n\n",
                self.config.sapi_name, embed_symbol
            ));
        }

        out.push_str(&format!("class {}Api {{\n public:\n", self.config.sapi_name));
        out.push_str(&format!(
            "  explicit {0}Api(::sapi::Sandbox* sandbox) : sandbox_(sandbox) {{}}\n\n",
            self.config.sapi_name
        ));
        out.push_str("  // Deprecated\n  ::sapi::Sandbox* GetSandbox() const { return sandbox(); }\n");
        out.push_str("  ::sapi::Sandbox* sandbox() const { return sandbox_; }\n");

        for function in functions {
            out.push('\n');
            for line in function.lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }

        out.push_str("\n private:\n  ::sapi::Sandbox* sandbox_;\n};\n\n");

        for ns in namespaces.iter().rev() {
            out.push_str(&format!("}}  // namespace {}\n", ns));
        }

        if let Some(guard) = &guard {
            out.push_str(&GUARD_END.replace("{}", guard));
            out.push('\n');
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_guard_strips_genfiles_prefix_and_gen_suffix() {
        assert_eq!(
            header_guard("xx/genfiles/tmp/te-st.h.gen").unwrap(),
            "TMP_TE_ST_H_"
        );
    }

    #[test]
    fn header_guard_leaves_a_dot_gen_directory_component_alone() {
        assert_eq!(
            header_guard("xx/genfiles/.gen/tmp/te-st.h").unwrap(),
            "_GEN_TMP_TE_ST_H_"
        );
    }

    #[test]
    fn header_guard_agrees_for_equivalent_genfiles_and_gen_suffixed_paths() {
        assert_eq!(
            header_guard("tmp/te-st.h").unwrap(),
            header_guard("genfiles/tmp/te-st.h.gen").unwrap()
        );
    }

    #[test]
    fn header_guard_rejects_empty_path() {
        assert!(matches!(
            header_guard(""),
            Err(GeneratorError::InvalidOutputPath(_))
        ));
    }
}
