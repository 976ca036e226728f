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

use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use clang::{Entity, EntityKind, Type as ClangType, TypeKind, Usr};

use crate::token_renderer::stringify_tokens;
use crate::translation_unit::TranslationUnit;

/// Maps a scalar `TypeKind` to its `::sapi::v::` wrapper spelling. Also
/// doubles as the "is this a simple type" predicate: a kind present here is
/// simple.
pub(crate) fn scalar_wrapper(kind: TypeKind) -> Option<&'static str> {
    Some(match kind {
        TypeKind::Void => "::sapi::v::Void",
        TypeKind::CharS | TypeKind::CharU => "::sapi::v::Char",
        TypeKind::Int => "::sapi::v::Int",
        TypeKind::UInt => "::sapi::v::UInt",
        TypeKind::Long => "::sapi::v::Long",
        TypeKind::ULong => "::sapi::v::ULong",
        TypeKind::UChar => "::sapi::v::UChar",
        TypeKind::UShort => "::sapi::v::UShort",
        TypeKind::Short => "::sapi::v::Short",
        TypeKind::LongLong => "::sapi::v::LLong",
        TypeKind::ULongLong => "::sapi::v::ULLong",
        TypeKind::Float => "::sapi::v::Reg<float>",
        TypeKind::Double => "::sapi::v::Reg<double>",
        TypeKind::LongDouble => "::sapi::v::Reg<long double>",
        TypeKind::SChar => "::sapi::v::SChar",
        TypeKind::Bool => "::sapi::v::Bool",
        _ => return None,
    })
}

/// A C/C++ type as surfaced by the front-end, plus a back-reference to the
/// translation unit that contains it. Identity and hashing follow the USR
/// of the type's declaration; ordering is only meaningful between two
/// `Type`s from the same translation unit, by declaration visitation
/// index.
#[derive(Clone, Copy)]
pub struct Type<'b, 'tu> {
    tu: &'b TranslationUnit<'tu>,
    ty: ClangType<'tu>,
}

impl<'b, 'tu> Type<'b, 'tu> {
    pub fn new(tu: &'b TranslationUnit<'tu>, ty: ClangType<'tu>) -> Self {
        Type { tu, ty }
    }

    pub fn clang_type(&self) -> ClangType<'tu> {
        self.ty
    }

    pub fn translation_unit(&self) -> &'b TranslationUnit<'tu> {
        self.tu
    }

    pub fn spelling(&self) -> String {
        self.ty.get_display_name()
    }

    pub fn is_void(&self) -> bool {
        self.ty.get_kind() == TypeKind::Void
    }

    pub fn is_typedef(&self) -> bool {
        self.ty.get_kind() == TypeKind::Typedef
    }

    pub fn is_elaborated(&self) -> bool {
        self.ty.get_kind() == TypeKind::Elaborated
    }

    /// Struct, union and class declarations are otherwise indistinguishable
    /// except by declaration cursor kind.
    pub fn is_sugared_record(&self) -> bool {
        matches!(
            self.ty.get_declaration().map(|d| d.get_kind()),
            Some(EntityKind::StructDecl) | Some(EntityKind::UnionDecl) | Some(EntityKind::ClassDecl)
        )
    }

    pub fn is_struct(&self) -> bool {
        self.ty.get_declaration().map(|d| d.get_kind()) == Some(EntityKind::StructDecl)
    }

    pub fn is_class(&self) -> bool {
        self.ty.get_declaration().map(|d| d.get_kind()) == Some(EntityKind::ClassDecl)
    }

    pub fn is_union(&self) -> bool {
        self.ty.get_declaration().map(|d| d.get_kind()) == Some(EntityKind::UnionDecl)
    }

    pub fn is_function(&self) -> bool {
        self.ty.get_kind() == TypeKind::FunctionPrototype
    }

    pub fn is_sugared_ptr(&self) -> bool {
        self.ty.get_canonical_type().get_kind() == TypeKind::Pointer
    }

    pub fn is_sugared_enum(&self) -> bool {
        self.ty.get_canonical_type().get_kind() == TypeKind::Enum
    }

    pub fn is_const_array(&self) -> bool {
        self.ty.get_kind() == TypeKind::ConstantArray
    }

    pub fn is_simple_type(&self) -> bool {
        scalar_wrapper(self.ty.get_kind()).is_some()
    }

    pub fn pointee(&self) -> Option<Type<'b, 'tu>> {
        self.ty.get_pointee_type().map(|ty| Type::new(self.tu, ty))
    }

    /// Ordinary declaration lookup, with the one documented fallback: a
    /// sugared pointer with no declaration of its own (e.g. a function
    /// pointer) takes the declaration of its pointee.
    pub fn declaration(&self) -> Option<Entity<'tu>> {
        match self.ty.get_declaration() {
            Some(decl) => Some(decl),
            None if self.is_sugared_ptr() => self.pointee().and_then(|p| p.declaration()),
            None => None,
        }
    }

    pub fn usr(&self) -> Option<Usr> {
        self.declaration().and_then(|d| d.get_usr())
    }

    fn order_index(&self) -> Option<usize> {
        self.declaration().and_then(|d| self.tu.order_index(&d))
    }

    /// Returns the set of types that must be emitted so `self` is
    /// well-formed: typedef chains, record fields, function-pointer
    /// parameter/return types, enums, recursively.
    pub fn get_related_types(
        &self,
        result: &mut HashSet<Type<'b, 'tu>>,
        skip_self: bool,
    ) {
        if result.contains(self) || self.is_simple_type() || self.is_class() {
            return;
        }

        if self.is_typedef() {
            self.related_types_of_typedef(result);
            return;
        }

        if self.is_elaborated() {
            if let Some(named) = self.ty.get_elaborated_type() {
                Type::new(self.tu, named).get_related_types(result, skip_self);
            }
            return;
        }

        if self.is_const_array() {
            if let Some(elem) = self.ty.get_element_type() {
                Type::new(self.tu, elem).get_related_types(result, false);
            }
            return;
        }

        if matches!(
            self.ty.get_kind(),
            TypeKind::Pointer
                | TypeKind::MemberPointer
                | TypeKind::LValueReference
                | TypeKind::RValueReference
        ) {
            if let Some(pointee) = self.pointee() {
                pointee.get_related_types(result, skip_self);
            }
            return;
        }

        if self.is_struct() || self.is_union() {
            self.related_types_of_record(result, skip_self);
            return;
        }

        if self.is_function() {
            self.related_types_of_function(result);
            return;
        }

        if self.is_sugared_enum() {
            if !skip_self {
                if let Some(decl) = self.declaration() {
                    self.tu.search_for_macro_name(decl);
                }
                result.insert(*self);
            }
        }

        // Unexposed or otherwise unrecognized kinds are silently ignored,
        // as the front-end may not have resolved them fully.
    }

    fn related_types_of_typedef(&self, result: &mut HashSet<Type<'b, 'tu>>) {
        result.insert(*self);
        let decl = match self.ty.get_declaration() {
            Some(decl) => decl,
            None => return,
        };
        self.tu.search_for_macro_name(decl);

        let underlying = match decl.get_typedef_underlying_type() {
            Some(ty) => ty,
            None => return,
        };
        let mut t = Type::new(self.tu, underlying);
        if t.is_sugared_ptr() {
            if let Some(pointee) = t.pointee() {
                t = pointee;
            }
        }

        if !t.is_simple_type() {
            let skip_child = self.contains_declaration(&t);
            if t.is_sugared_record() && skip_child {
                if let Some(usr) = t.usr() {
                    self.tu.mark_type_to_skip(usr);
                }
            }
            t.get_related_types(result, skip_child);
        }
    }

    fn related_types_of_record(&self, result: &mut HashSet<Type<'b, 'tu>>, skip_self: bool) {
        let decl = self.declaration();
        let has_spelling = decl.and_then(|d| d.get_name()).is_some();
        if has_spelling && !skip_self {
            if let Some(decl) = decl {
                self.tu.search_for_macro_name(decl);
            }
            result.insert(*self);
        }

        if let Some(decl) = decl {
            for field in decl.get_children() {
                if field.get_kind() != EntityKind::FieldDecl {
                    continue;
                }
                self.tu.search_for_macro_name(field);
                if let Some(field_type) = field.get_type() {
                    Type::new(self.tu, field_type).get_related_types(result, false);
                }
            }
        }
    }

    fn related_types_of_function(&self, result: &mut HashSet<Type<'b, 'tu>>) {
        for arg in self.ty.get_argument_types().unwrap_or_default() {
            Type::new(self.tu, arg).get_related_types(result, false);
        }
        if let Some(ret) = self.ty.get_result_type() {
            Type::new(self.tu, ret).get_related_types(result, false);
        }
    }

    /// Whether the declaration extent of `other` lies entirely inside the
    /// declaration extent of `self` (used to detect a typedef whose body
    /// textually contains the struct it names, e.g. `typedef struct {...}
    /// x;`).
    pub fn contains_declaration(&self, other: &Type<'b, 'tu>) -> bool {
        let self_decl = match self.declaration() {
            Some(d) => d,
            None => return false,
        };
        let other_decl = match other.declaration() {
            Some(d) => d,
            None => return false,
        };
        let (self_range, other_range) = match (self_decl.get_range(), other_decl.get_range()) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        let self_start = self_range.get_start().get_spelling_location();
        let self_end = self_range.get_end().get_spelling_location();
        let other_start = other_range.get_start().get_spelling_location();
        let other_end = other_range.get_end().get_spelling_location();

        let in_file = |file: &Option<clang::source::File>| file.as_ref().map(|f| f.get_path());
        if in_file(&other_start.file).is_none() {
            return false;
        }
        in_file(&self_start.file) == in_file(&other_start.file)
            && self_start.offset <= other_start.offset
            && other_end.offset <= self_end.offset
    }

    /// Renders the declaration's token stream (comments excluded) through
    /// the Token Renderer.
    pub fn stringify(&self) -> String {
        let tokens: Vec<clang::Token<'tu>> = match self.declaration().and_then(|d| d.get_range()) {
            Some(range) => range
                .tokenize()
                .into_iter()
                .filter(|t| t.get_kind() != clang::TokenKind::Comment)
                .collect(),
            None => Vec::new(),
        };
        stringify_tokens(&tokens, "\n")
    }
}

impl<'b, 'tu> PartialEq for Type<'b, 'tu> {
    fn eq(&self, other: &Self) -> bool {
        self.usr() == other.usr()
    }
}

impl<'b, 'tu> Eq for Type<'b, 'tu> {}

impl<'b, 'tu> Hash for Type<'b, 'tu> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.usr().hash(state);
    }
}

impl<'b, 'tu> PartialOrd for Type<'b, 'tu> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'b, 'tu> Ord for Type<'b, 'tu> {
    /// Defined only within one translation unit, by the visitation index of
    /// each type's declaration. Comparing types from different units is a
    /// usage error in the caller; we fall back to `Equal` rather than
    /// panicking, since the Generator never actually needs to do so.
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_index()
            .cmp(&other.order_index())
    }
}
