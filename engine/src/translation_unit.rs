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

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use clang::{Entity, EntityKind, Linkage, TranslationUnit as ClangTu, Usr};
use log::debug;

/// Caches a single parsed translation unit: its one preorder declaration
/// walk, and everything the Type Model and Generator later need to look up
/// by cursor rather than re-walking the AST.
///
/// Processing is triggered lazily on the first call to [`Self::functions`]
/// or [`Self::order_index`]; `required_defines` and `types_to_skip` continue
/// to grow afterwards, as related-type closures are computed against this
/// unit.
pub struct TranslationUnit<'tu> {
    path: PathBuf,
    limit_scan_depth: bool,
    tu: ClangTu<'tu>,
    processed: Cell<bool>,
    order: RefCell<HashMap<Entity<'tu>, usize>>,
    function_cursors: RefCell<HashSet<Entity<'tu>>>,
    forward_decls: RefCell<HashMap<Usr, Entity<'tu>>>,
    defines: RefCell<HashMap<String, Entity<'tu>>>,
    required_defines: RefCell<HashSet<String>>,
    types_to_skip: RefCell<HashSet<Usr>>,
}

impl<'tu> TranslationUnit<'tu> {
    pub fn new(path: PathBuf, tu: ClangTu<'tu>, limit_scan_depth: bool) -> Self {
        TranslationUnit {
            path,
            limit_scan_depth,
            tu,
            processed: Cell::new(false),
            order: RefCell::new(HashMap::new()),
            function_cursors: RefCell::new(HashSet::new()),
            forward_decls: RefCell::new(HashMap::new()),
            defines: RefCell::new(HashMap::new()),
            required_defines: RefCell::new(HashSet::new()),
            types_to_skip: RefCell::new(HashSet::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Triggers the single preorder walk the first time it's needed.
    pub fn functions(&self) -> HashSet<Entity<'tu>> {
        self.process();
        self.function_cursors.borrow().clone()
    }

    fn process(&self) {
        if self.processed.get() {
            return;
        }
        self.processed.set(true);

        let root = self.tu.get_entity();
        let mut next_index = 0usize;
        walk_preorder(root, &mut next_index, &mut |cursor, index| {
            // Every visited cursor gets an order entry; only declarations
            // and macro-definitions are ever looked up again, so indexing
            // everything is harmless and sidesteps having to replicate
            // libclang's exact "is this kind a declaration" predicate.
            self.order.borrow_mut().insert(cursor, index);

            if cursor.get_kind() == EntityKind::MacroDefinition && cursor.get_location().is_some()
            {
                if let Some(name) = cursor.get_name() {
                    self.defines.borrow_mut().insert(name, cursor);
                }
            }

            if cursor.get_kind() == EntityKind::StructDecl && !cursor.is_definition() {
                if let Some(usr) = cursor.get_usr() {
                    self.forward_decls.borrow_mut().insert(usr, cursor);
                }
            }

            if cursor.get_kind() == EntityKind::FunctionDecl
                && cursor.get_linkage() != Some(Linkage::Internal)
            {
                let retained = if self.limit_scan_depth {
                    cursor
                        .get_location()
                        .and_then(|loc| loc.get_file_location().file)
                        .map(|file| file.get_path() == self.path)
                        .unwrap_or(false)
                } else {
                    true
                };
                if retained {
                    self.function_cursors.borrow_mut().insert(cursor);
                }
            }
        });

        debug!(
            "{}: {} functions, {} forward decls, {} macro definitions",
            self.path.display(),
            self.function_cursors.borrow().len(),
            self.forward_decls.borrow().len(),
            self.defines.borrow().len()
        );
    }

    pub fn order_index(&self, entity: &Entity<'tu>) -> Option<usize> {
        self.process();
        self.order.borrow().get(entity).copied()
    }

    /// Scans a cursor's token spellings for macro names, and recursively
    /// follows any macro whose definition is discovered, threading
    /// `required_defines` as a monotonically-growing accumulator so the
    /// recursion terminates.
    pub fn search_for_macro_name(&self, cursor: Entity<'tu>) {
        let tokens: Vec<String> = match cursor.get_range() {
            Some(range) => range
                .tokenize()
                .iter()
                .map(|t| t.get_spelling())
                .collect(),
            None => return,
        };
        for token in tokens {
            let already_required = self.required_defines.borrow().contains(&token);
            if already_required {
                continue;
            }
            let define_cursor = self.defines.borrow().get(&token).copied();
            if let Some(define_cursor) = define_cursor {
                self.required_defines.borrow_mut().insert(token);
                self.search_for_macro_name(define_cursor);
            }
        }
    }

    pub fn forward_decl(&self, usr: &Usr) -> Option<Entity<'tu>> {
        self.process();
        self.forward_decls.borrow().get(usr).copied()
    }

    pub fn mark_type_to_skip(&self, usr: Usr) {
        self.types_to_skip.borrow_mut().insert(usr);
    }

    pub fn is_type_to_skip(&self, usr: &Usr) -> bool {
        self.types_to_skip.borrow().contains(usr)
    }

    /// The `#define` cursors in `required_defines ∩ defines`, sorted by
    /// visitation index, ready for rendering by the Generator.
    pub fn defines_to_emit(&self) -> Vec<Entity<'tu>> {
        self.process();
        let defines = self.defines.borrow();
        let mut cursors: Vec<Entity<'tu>> = self
            .required_defines
            .borrow()
            .iter()
            .filter_map(|name| defines.get(name).copied())
            .collect();
        let order = self.order.borrow();
        cursors.sort_by_key(|c| order.get(c).copied().unwrap_or(usize::MAX));
        cursors
    }
}

fn walk_preorder<'tu>(
    entity: Entity<'tu>,
    next_index: &mut usize,
    visit: &mut dyn FnMut(Entity<'tu>, usize),
) {
    let index = *next_index;
    *next_index += 1;
    visit(entity, index);
    for child in entity.get_children() {
        walk_preorder(child, next_index, visit);
    }
}
