//! Main compiler
//!
//! Turns a query's feature list into a [`CompiledQuery`]: parse, analyze,
//! lower and type-check each feature in declaration order. The first
//! failure aborts the whole query.

use crate::codegen::ExpressionCompiler;
use crate::error::{CompileError, Result};
use crate::semantic::{SemanticAnalyzer, TypeChecker, TypeInfo};
use chronofeat_core::ir::{CompiledFeature, CompiledPredicate};
use chronofeat_parser::ExpressionParser;
use serde::{Deserialize, Serialize};

/// Compiler options
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Run the schema-independent type check after lowering
    pub enable_type_checking: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            enable_type_checking: true,
        }
    }
}

/// Compiled feature list, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub features: Vec<CompiledFeature>,
}

impl CompiledQuery {
    /// Output column names
    pub fn columns(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// The feature query compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Create a new compiler instance with default options
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Create a new compiler instance with custom options
    pub fn with_options(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Compile a feature list
    pub fn compile<S: AsRef<str>>(&self, features: &[S]) -> Result<CompiledQuery> {
        let mut analyzer = SemanticAnalyzer::new();
        let mut compiled = Vec::with_capacity(features.len());

        for feature in features {
            let raw = feature.as_ref();
            let definition =
                ExpressionParser::parse_feature(raw).map_err(|source| CompileError::Parse {
                    feature: raw.to_string(),
                    source,
                })?;

            analyzer.analyze_feature(&definition)?;
            let feature = ExpressionCompiler::compile_feature(&definition)?;

            if self.options.enable_type_checking {
                TypeChecker::new().check_feature(&feature)?;
            }
            compiled.push(feature);
        }

        log::debug!("compiled {} features", compiled.len());
        Ok(CompiledQuery { features: compiled })
    }

    /// Compile a stand-alone event predicate
    pub fn compile_predicate(&self, predicate: &str) -> Result<CompiledPredicate> {
        let expr = ExpressionParser::parse(predicate).map_err(|source| CompileError::Parse {
            feature: predicate.to_string(),
            source,
        })?;

        SemanticAnalyzer::new().analyze_predicate(&expr)?;
        let compiled = ExpressionCompiler::compile_predicate(predicate, &expr)?;

        if self.options.enable_type_checking {
            let result_type = TypeChecker::new().check_expression(&compiled.expr, &[])?;
            if !result_type.is_boolean() {
                return Err(CompileError::TypeMismatch {
                    context: format!("condition '{}'", compiled.raw),
                    expected: TypeInfo::Boolean.to_string(),
                    found: result_type.to_string(),
                });
            }
        }
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_declaration_order() {
        let query = Compiler::new()
            .compile(&["@entities.city as city", "obs_dt", "avg(MaxTemp) over last 7 days as t"])
            .unwrap();
        assert_eq!(query.columns(), vec!["city", "obs_dt", "t"]);
    }

    #[test]
    fn test_parse_error_names_feature() {
        let err = Compiler::new()
            .compile(&["obs_dt", "avg(MaxTemp) over last"])
            .unwrap_err();
        match err {
            CompileError::Parse { feature, source } => {
                assert_eq!(feature, "avg(MaxTemp) over last");
                assert_eq!(source.position(), Some(22));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_type_checking_can_be_disabled() {
        let lenient = Compiler::with_options(CompilerOptions {
            enable_type_checking: false,
        });
        assert!(lenient.compile(&["sum(x) over past + 'a'"]).is_ok());
        assert!(Compiler::new().compile(&["sum(x) over past + 'a'"]).is_err());
    }

    #[test]
    fn test_predicate_must_be_boolean() {
        let err = Compiler::new().compile_predicate("MaxTemp + 1").unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
        assert!(Compiler::new().compile_predicate("MaxTemp > 1").is_ok());
    }
}
