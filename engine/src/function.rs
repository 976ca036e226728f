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

//! Function Model: an exported function's signature, expressed as a
//! [`Parameter`] per argument plus one for its return. The original
//! generator modelled arguments and return values as two subclasses of a
//! shared `Type`; here a `Parameter` is composition instead of inheritance —
//! a [`crate::types::Type`] plus a [`Role`] tag, since a return value really
//! is just an argument that happens not to have a call site of its own.

use std::hash::{Hash, Hasher};
use std::path::Path;

use clang::{Entity, TypeKind};

use crate::error::{GeneratorError, Result};
use crate::translation_unit::TranslationUnit;
use crate::types::{scalar_wrapper, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Argument(usize),
    Return,
}

pub struct Parameter<'b, 'tu> {
    ty: Type<'b, 'tu>,
    role: Role,
    name: Option<String>,
}

impl<'b, 'tu> Parameter<'b, 'tu> {
    pub fn new(ty: Type<'b, 'tu>, role: Role, name: Option<String>) -> Self {
        Parameter { ty, role, name }
    }

    pub fn ty(&self) -> Type<'b, 'tu> {
        self.ty
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The local variable name used in generated code: the declared
    /// parameter name, or `a{position}` if the header left it unnamed.
    pub fn effective_name(&self) -> String {
        match (&self.name, self.role) {
            (Some(name), _) => name.clone(),
            (None, Role::Argument(position)) => format!("a{}", position),
            (None, Role::Return) => "ret".to_string(),
        }
    }

    pub fn is_sugared_ptr(&self) -> bool {
        self.ty.is_sugared_ptr()
    }

    /// The argument passed to `sandbox_->Call(...)`: the raw pointer
    /// variable itself if this parameter is already a pointer, otherwise
    /// the address of its wrapped local.
    pub fn call_argument(&self) -> String {
        let name = self.effective_name();
        if self.is_sugared_ptr() {
            name
        } else {
            format!("&{}_", name)
        }
    }

    /// The parameter as it appears in the trampoline's own signature.
    pub fn declaration(&self) -> String {
        let name = self.effective_name();
        if self.is_sugared_ptr() {
            format!("::sapi::v::Ptr* {}", name)
        } else {
            format!("{} {}", self.ty.spelling(), name)
        }
    }

    /// The local wrapper-variable declaration line, e.g.
    /// `::sapi::v::Int a0_((a0));`. Only meaningful for non-pointer
    /// parameters; pointer parameters are passed through directly.
    pub fn wrapped(&self, function_name: &str) -> Result<String> {
        let name = self.effective_name();
        let mapped = self.mapped_type(function_name)?;
        Ok(format!("{} {}_(({}))", mapped, name, name))
    }

    fn position(&self) -> usize {
        match self.role {
            Role::Argument(position) => position,
            Role::Return => 0,
        }
    }

    /// The `::sapi::v::*` wrapper type this parameter maps to.
    pub fn mapped_type(&self, function_name: &str) -> Result<String> {
        mapped_type_of(self.ty, function_name, self.position())
    }

    /// The declared return-value expression: `absl::Status` for `void`,
    /// otherwise `absl::StatusOr<T>` with any top-level `const` stripped.
    pub fn return_type_spelling(&self) -> String {
        if self.ty.is_void() {
            "absl::Status".to_string()
        } else {
            format!("absl::StatusOr<{}>", strip_const(&self.ty.spelling()))
        }
    }
}

fn strip_const(spelling: &str) -> String {
    spelling
        .strip_prefix("const ")
        .unwrap_or(spelling)
        .trim_end_matches(" const")
        .to_string()
}

fn mapped_type_of<'b, 'tu>(ty: Type<'b, 'tu>, function_name: &str, position: usize) -> Result<String> {
    mapped_type_of_peeled(ty, ty, function_name, position)
}

/// Walks through typedef/elaborated sugar to classify the underlying kind,
/// while keeping `original` — the type as the caller actually spelled it —
/// around so `IntBase<...>`/`Reg<...>` are formatted from the surface
/// spelling rather than an anonymous canonical one (e.g. a typedef'd
/// anonymous enum's canonical spelling isn't the typedef name).
fn mapped_type_of_peeled<'b, 'tu>(
    original: Type<'b, 'tu>,
    ty: Type<'b, 'tu>,
    function_name: &str,
    position: usize,
) -> Result<String> {
    if ty.is_sugared_ptr() {
        return Ok(format!("::sapi::v::Reg<{}>", strip_const(&original.spelling())));
    }
    if ty.is_typedef() || ty.is_elaborated() {
        let canonical = ty.clang_type().get_canonical_type();
        return mapped_type_of_peeled(
            original,
            Type::new(ty.translation_unit(), canonical),
            function_name,
            position,
        );
    }
    if ty.is_sugared_enum() {
        return Ok(format!("::sapi::v::IntBase<{}>", original.spelling()));
    }
    if ty.is_const_array() || ty.clang_type().get_kind() == TypeKind::IncompleteArray {
        return Ok(format!("::sapi::v::Reg<{}>", original.spelling()));
    }
    match ty.clang_type().get_kind() {
        TypeKind::LValueReference => return Ok("LVALUEREFERENCE::NOT_SUPPORTED".to_string()),
        TypeKind::RValueReference => return Ok("RVALUEREFERENCE::NOT_SUPPORTED".to_string()),
        _ => {}
    }
    if ty.is_struct() || ty.is_union() {
        return Err(unsupported_error(&original, function_name, position));
    }
    scalar_wrapper(ty.clang_type().get_kind())
        .map(|s| s.to_string())
        .ok_or_else(|| unsupported_error(&original, function_name, position))
}

fn unsupported_error<'b, 'tu>(ty: &Type<'b, 'tu>, function_name: &str, position: usize) -> GeneratorError {
    GeneratorError::UnsupportedType {
        function: function_name.to_string(),
        position,
        spelling: ty.spelling(),
        location: location_string(ty),
    }
}

fn location_string<'b, 'tu>(ty: &Type<'b, 'tu>) -> String {
    ty.declaration()
        .and_then(|d| d.get_location())
        .map(|loc| {
            let spelling = loc.get_spelling_location();
            let file = spelling
                .file
                .map(|f| f.get_path().display().to_string())
                .unwrap_or_else(|| "<unknown file>".to_string());
            format!("{}:{}:{}", file, spelling.line, spelling.column)
        })
        .unwrap_or_else(|| "<unknown location>".to_string())
}

/// An exported function's full signature: its parameters, its return
/// value, and identity derived from the mangled name (matching the
/// front-end's own notion of a distinct symbol).
pub struct Function<'b, 'tu> {
    cursor: Entity<'tu>,
    parameters: Vec<Parameter<'b, 'tu>>,
    result: Parameter<'b, 'tu>,
}

impl<'b, 'tu> Function<'b, 'tu> {
    pub fn new(tu: &'b TranslationUnit<'tu>, cursor: Entity<'tu>) -> Option<Self> {
        let result_ty = cursor.get_result_type()?;
        let result = Parameter::new(Type::new(tu, result_ty), Role::Return, None);

        let arguments = cursor.get_arguments().unwrap_or_default();
        let parameters = arguments
            .into_iter()
            .enumerate()
            .filter_map(|(position, arg)| {
                let ty = arg.get_type()?;
                Some(Parameter::new(
                    Type::new(tu, ty),
                    Role::Argument(position),
                    arg.get_name(),
                ))
            })
            .collect();

        Some(Function {
            cursor,
            parameters,
            result,
        })
    }

    pub fn cursor(&self) -> Entity<'tu> {
        self.cursor
    }

    pub fn name(&self) -> String {
        self.cursor.get_name().unwrap_or_default()
    }

    pub fn parameters(&self) -> &[Parameter<'b, 'tu>] {
        &self.parameters
    }

    pub fn result(&self) -> &Parameter<'b, 'tu> {
        &self.result
    }

    pub fn original_definition(&self) -> String {
        format!(
            "{} {}",
            self.result.ty().spelling(),
            self.cursor
                .get_display_name()
                .unwrap_or_else(|| self.name())
        )
    }

    /// Whether the compiler has mangled this symbol's name, e.g. due to
    /// C++ overloading — `extern "C"` exports are left unmangled.
    pub fn is_mangled(&self) -> bool {
        self.cursor.get_mangled_name().as_deref() != Some(self.name().as_str())
    }

    /// All related types reachable from this function's parameters and
    /// return type.
    pub fn related_types(&self) -> std::collections::HashSet<Type<'b, 'tu>> {
        let mut result = std::collections::HashSet::new();
        for param in &self.parameters {
            param.ty().get_related_types(&mut result, false);
        }
        self.result.ty().get_related_types(&mut result, false);
        result
    }

    /// Resolves the `#include` line for this function's originating
    /// header, stripping everything up to and including the first
    /// occurrence of `prefix` in the path, or falling back to the bare
    /// file name if `prefix` never appears.
    pub fn get_include_path(&self, prefix: &str) -> Result<String> {
        let location = self
            .cursor
            .get_location()
            .ok_or_else(|| GeneratorError::InvalidOutputPath("<no location>".to_string()))?;
        let file = location
            .get_file_location()
            .file
            .ok_or_else(|| GeneratorError::InvalidOutputPath("<no file>".to_string()))?;
        let path = file.get_path();
        Ok(resolve_include_path(&path, prefix))
    }
}

fn resolve_include_path(path: &Path, prefix: &str) -> String {
    if prefix.is_empty() {
        return path.display().to_string();
    }
    let prefix = if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    };
    let path_str = path.display().to_string();
    if let Some(index) = path_str.find(&prefix) {
        format!("{}{}", prefix, &path_str[index + prefix.len()..])
    } else {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());
        format!("{}{}", prefix, basename)
    }
}

impl<'b, 'tu> PartialEq for Function<'b, 'tu> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor.get_mangled_name() == other.cursor.get_mangled_name()
    }
}

impl<'b, 'tu> Eq for Function<'b, 'tu> {}

impl<'b, 'tu> Hash for Function<'b, 'tu> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cursor.get_usr().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_path_strips_known_prefix() {
        let path = Path::new("/src/workspace/project/include/foo.h");
        assert_eq!(
            resolve_include_path(path, "project/include"),
            "project/include/foo.h"
        );
    }

    #[test]
    fn include_path_falls_back_to_basename() {
        let path = Path::new("/src/workspace/other/foo.h");
        assert_eq!(
            resolve_include_path(path, "project/include"),
            "project/include/foo.h"
        );
    }

    #[test]
    fn include_path_absolute_when_prefix_empty() {
        let path = Path::new("/src/workspace/project/include/foo.h");
        assert_eq!(resolve_include_path(path, ""), path.display().to_string());
    }

    #[test]
    fn strip_const_removes_leading_qualifier_only() {
        assert_eq!(strip_const("const int"), "int");
        assert_eq!(strip_const("int"), "int");
    }
}
