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

//! Drives libclang over a set of C/C++ headers and renders a sandboxed-api
//! interface header exposing the requested functions through RPC
//! trampolines.

mod error;
mod front_end;
mod function;
mod generator;
mod token_renderer;
mod translation_unit;
mod types;

pub use error::{GeneratorError, Result};
pub use front_end::initialize;
pub use generator::{header_guard, Generator};
pub use translation_unit::TranslationUnit;

use clang::{Clang, Index};
use log::info;
use sapi_generator_config::GeneratorConfig;

/// Runs the whole pipeline against an already-initialized `Clang` handle:
/// parses every input header, then renders the interface header. Returns
/// the rendered text; writing it to `sapi_out` (or stdout) is the caller's
/// job.
pub fn generate(clang: &Clang, config: &GeneratorConfig) -> Result<String> {
    let index = Index::new(clang, false, false);
    info!(
        "parsing {} input header(s) for sapi_name={}",
        config.sapi_in.len(),
        config.sapi_name
    );
    let translation_units = front_end::parse_all(
        &index,
        &config.sapi_in,
        &config.compile_flags,
        config.sapi_limit_scan_depth,
    )?;
    let generator = Generator::new(config, &translation_units);
    generator.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_for(path: &str, functions: &[&str]) -> GeneratorConfig {
        GeneratorConfig {
            sapi_name: "Test".to_string(),
            sapi_in: vec![PathBuf::from(path)],
            sapi_functions: functions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn generate_renders_a_simple_function() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("simple.h"),
            "extern \"C\" int DoubleIt(int x);\n",
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("simple.h", &["DoubleIt"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let rendered = generator.generate().expect("generate");
        assert!(rendered.contains("class TestApi"));
        assert!(rendered.contains("DoubleIt"));
        assert!(rendered.contains("SAPI_RETURN_IF_ERROR"));
    }

    #[test]
    fn generate_renders_a_pointer_argument_without_a_wrapped_local() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("ptr.h"),
            "extern \"C\" void g(char* p);\n",
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("ptr.h", &["g"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let rendered = generator.generate().expect("generate");
        assert!(rendered.contains("absl::Status g(::sapi::v::Ptr* p) {"));
        assert!(rendered.contains("sandbox_->Call(\"g\", &ret, p)"));
        assert!(!rendered.contains("p_(("));
    }

    #[test]
    fn generate_renders_an_enum_return_with_a_static_cast() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("enum_ret.h"),
            "enum E { kA, kB };\nextern \"C\" E h();\n",
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("enum_ret.h", &["h"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let rendered = generator.generate().expect("generate");
        assert!(rendered.contains("::sapi::v::IntBase<E> ret;"));
        assert!(rendered.contains("return static_cast<E>(ret.GetValue());"));
    }

    #[test]
    fn generate_orders_a_typedef_chain_before_its_user() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("chain.h"),
            "typedef unsigned int u;\ntypedef u* up;\nextern \"C\" u k(up x);\n",
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("chain.h", &["k"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let rendered = generator.generate().expect("generate");
        let u_pos = rendered.find("typedef unsigned int u").expect("u typedef present");
        let up_pos = rendered.find("typedef u * up").or_else(|| rendered.find("typedef u* up")).expect("up typedef present");
        let k_pos = rendered.find("StatusOr<u> k").expect("k method present");
        assert!(u_pos < up_pos);
        assert!(up_pos < k_pos);
    }

    #[test]
    fn generate_forward_declares_a_self_referential_struct() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("cyclic.h"),
            concat!(
                "struct S;\n",
                "typedef struct S* Sp;\n",
                "typedef void (*F)(Sp);\n",
                "struct S { F fn; };\n",
                "extern \"C\" void u(Sp x);\n",
            ),
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("cyclic.h", &["u"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let rendered = generator.generate().expect("generate");
        assert!(rendered.contains("struct S;"));
        assert!(rendered.contains("struct S {"));
        let forward_pos = rendered.find("struct S;").unwrap();
        let definition_pos = rendered.find("struct S {").unwrap();
        assert!(forward_pos < definition_pos);
    }

    #[test]
    fn generate_reports_unsupported_struct_by_value_argument() {
        let clang = initialize().expect("clang init");
        let index = Index::new(&clang, false, false);
        let tu = front_end::parse_unsaved(
            &index,
            std::path::Path::new("byval.h"),
            "struct Point { int x; int y; };\nextern \"C\" int Sum(struct Point p);\n",
            &[],
            false,
        )
        .expect("parse");
        let config = config_for("byval.h", &["Sum"]);
        let generator = Generator::new(&config, std::slice::from_ref(&tu));
        let result = generator.generate();
        assert!(matches!(result, Err(GeneratorError::UnsupportedType { .. })));
    }
}
