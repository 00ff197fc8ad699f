//! purpose: Static extraction of DI metadata from TypeScript source using
//!     tree-sitter. Finds `@Injectable()` classes and their constructor
//!     dependency tokens, `@Module({...})` declarations (including the
//!     `useValue`/`useFactory` object provider forms), and import specifiers.
//!     Syntax only - no type checking, no execution of user code.
//!
//! invariants:
//!     - An `@Inject('TOKEN')` parameter decorator always wins over the
//!       parameter's type annotation
//!     - A class with no constructor (or an empty one) yields a provider with
//!       an empty dependency list, not an error
//!     - Import records are extracted for every file, with or without DI
//!       metadata, because the watch coordinator's reverse-import search
//!       needs them
//!
//! gotchas:
//!     - .tsx files need the tsx language variant for JSX support
//!     - Decorators on exported classes can hang off either the
//!       export_statement or the class_declaration depending on placement;
//!       both are checked
//!     - A decorator regex pre-filter skips the provider/module pass for
//!       files with no DI annotations at all; imports are still collected

use crate::config::CompilerOptions;
use crate::graph::{ModuleDef, Provider, ProviderKind};
use crate::imports::{normalize_separators, resolve_specifier};
use crate::scanner::{FileScan, ScanError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Cheap textual pre-filter: files without these annotations cannot
/// contribute providers or modules, so the decorator pass is skipped.
static DECORATOR_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(Injectable|Module)\b").expect("valid regex"));

/// Static scanner for one TypeScript/TSX source file
pub struct TypeScriptScanner {
    // Tree-sitter parsers are stateful; one is created per extraction
}

impl TypeScriptScanner {
    pub fn new() -> Self {
        Self {}
    }

    fn create_parser(&self, is_tsx: bool) -> Result<Parser, ScanError> {
        let mut parser = Parser::new();
        let language = if is_tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        };
        parser
            .set_language(&language)
            .map_err(|e| ScanError::Parse(e.to_string()))?;
        Ok(parser)
    }

    fn is_tsx(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext == "tsx")
            .unwrap_or(false)
    }

    /// Extract one file's DI contribution.
    pub fn extract(
        &self,
        source: &str,
        path: &Path,
        root: &Path,
        options: &CompilerOptions,
    ) -> Result<FileScan, ScanError> {
        let mut parser = self.create_parser(Self::is_tsx(path))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ScanError::Parse("tree-sitter produced no syntax tree".to_string()))?;
        let program = tree.root_node();

        let rel_path = normalize_separators(
            &path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy(),
        );

        let mut scan = FileScan::default();
        let has_decorators = DECORATOR_HINT.is_match(source);

        for i in 0..program.named_child_count() {
            let Some(node) = program.named_child(i) else {
                continue;
            };

            match node.kind() {
                "import_statement" => {
                    if let Some(spec) = self.import_source(node, source) {
                        scan.imports
                            .push(resolve_specifier(&spec, path, root, options));
                    }
                }
                "export_statement" => {
                    // Re-exports (`export { x } from './y'`) count as imports
                    if let Some(spec) = self.import_source(node, source) {
                        scan.imports
                            .push(resolve_specifier(&spec, path, root, options));
                    }
                    if !has_decorators {
                        continue;
                    }
                    if let Some(decl) = node.child_by_field_name("declaration") {
                        if decl.kind() == "class_declaration" {
                            self.process_class(decl, Some(node), source, &rel_path, &mut scan);
                        }
                    }
                }
                "class_declaration" if has_decorators => {
                    self.process_class(node, None, source, &rel_path, &mut scan);
                }
                _ => {}
            }
        }

        Ok(scan)
    }

    /// Module specifier of an import/re-export statement, without quotes
    fn import_source(&self, node: Node, source: &str) -> Option<String> {
        let source_node = node.child_by_field_name("source")?;
        Some(self.string_value(source_node, source))
    }

    fn process_class(
        &self,
        class_node: Node,
        export_node: Option<Node>,
        source: &str,
        rel_path: &str,
        scan: &mut FileScan,
    ) {
        let Some(name_node) = class_node.child_by_field_name("name") else {
            return;
        };
        let class_name = self.node_text(name_node, source);

        let mut decorators = self.decorators_of(class_node);
        if let Some(export) = export_node {
            decorators.extend(self.decorators_of(export));
        }

        for decorator in decorators {
            let Some((dec_name, args)) = self.decorator_call(decorator, source) else {
                continue;
            };

            match dec_name.as_str() {
                "Injectable" => {
                    let dependencies = self.constructor_dependencies(class_node, source, rel_path);
                    scan.providers.push(Provider {
                        token: class_name.clone(),
                        dependencies,
                        source_file: rel_path.to_string(),
                        kind: ProviderKind::Class,
                        class_name: Some(class_name.clone()),
                        expression: None,
                    });
                }
                "Module" => {
                    self.parse_module_decorator(args, &class_name, source, rel_path, scan);
                }
                _ => {}
            }
        }
    }

    /// Direct decorator children of a node
    fn decorators_of<'a>(&self, node: Node<'a>) -> Vec<Node<'a>> {
        let mut decorators = Vec::new();
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                if child.kind() == "decorator" {
                    decorators.push(child);
                }
            }
        }
        decorators
    }

    /// Decompose a decorator into (name, call arguments). `@Injectable()`
    /// yields ("Injectable", Some(args)); a bare `@Injectable` yields
    /// ("Injectable", None).
    fn decorator_call<'a>(
        &self,
        decorator: Node<'a>,
        source: &str,
    ) -> Option<(String, Option<Node<'a>>)> {
        for i in 0..decorator.named_child_count() {
            let Some(child) = decorator.named_child(i) else {
                continue;
            };
            match child.kind() {
                "call_expression" => {
                    let function = child.child_by_field_name("function")?;
                    if function.kind() == "identifier" {
                        return Some((
                            self.node_text(function, source),
                            child.child_by_field_name("arguments"),
                        ));
                    }
                }
                "identifier" => {
                    return Some((self.node_text(child, source), None));
                }
                _ => {}
            }
        }
        None
    }

    /// Dependency tokens of the class constructor, in parameter order.
    /// `@Inject('TOKEN')` wins over the type annotation; a parameter with
    /// neither is skipped with a warning.
    fn constructor_dependencies(
        &self,
        class_node: Node,
        source: &str,
        rel_path: &str,
    ) -> Vec<String> {
        let Some(body) = class_node.child_by_field_name("body") else {
            return Vec::new();
        };

        for i in 0..body.named_child_count() {
            let Some(member) = body.named_child(i) else {
                continue;
            };
            if member.kind() != "method_definition" {
                continue;
            }
            let Some(name_node) = member.child_by_field_name("name") else {
                continue;
            };
            if self.node_text(name_node, source) != "constructor" {
                continue;
            }
            return self.parameter_tokens(member, source, rel_path);
        }

        Vec::new()
    }

    fn parameter_tokens(&self, method: Node, source: &str, rel_path: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let Some(params) = method.child_by_field_name("parameters") else {
            return tokens;
        };

        for i in 0..params.named_child_count() {
            let Some(param) = params.named_child(i) else {
                continue;
            };
            if param.kind() != "required_parameter" && param.kind() != "optional_parameter" {
                continue;
            }

            if let Some(token) = self.inject_token(param, source) {
                tokens.push(token);
                continue;
            }

            if let Some(type_node) = param.child_by_field_name("type") {
                if let Some(token) = self.type_name(type_node, source) {
                    tokens.push(token);
                    continue;
                }
            }

            let param_name = param
                .child_by_field_name("pattern")
                .map(|p| self.node_text(p, source))
                .unwrap_or_else(|| "<unknown>".to_string());
            eprintln!(
                "Warning: {}: constructor parameter '{}' has no @Inject token or usable type annotation; skipped",
                rel_path, param_name
            );
        }

        tokens
    }

    /// Token from an `@Inject('TOKEN')` or `@Inject(TOKEN)` parameter decorator
    fn inject_token(&self, param: Node, source: &str) -> Option<String> {
        for decorator in self.decorators_of(param) {
            let Some((name, args)) = self.decorator_call(decorator, source) else {
                continue;
            };
            if name != "Inject" {
                continue;
            }
            let Some(args) = args else {
                continue;
            };
            for i in 0..args.named_child_count() {
                let Some(arg) = args.named_child(i) else {
                    continue;
                };
                return Some(match arg.kind() {
                    "string" => self.string_value(arg, source),
                    _ => self.node_text(arg, source),
                });
            }
        }
        None
    }

    /// Usable token from a type annotation: a plain type identifier, or the
    /// base name of a generic type. Anything else (unions, literals,
    /// primitives are still identifiers and pass through) yields None.
    fn type_name(&self, type_annotation: Node, source: &str) -> Option<String> {
        let ty = type_annotation.named_child(0)?;
        match ty.kind() {
            "type_identifier" => Some(self.node_text(ty, source)),
            "generic_type" => {
                let name = ty.child_by_field_name("name")?;
                Some(self.node_text(name, source))
            }
            _ => None,
        }
    }

    /// Parse `@Module({ providers, imports, exports })` metadata into a
    /// ModuleDef plus any object-form providers it declares inline.
    fn parse_module_decorator(
        &self,
        args: Option<Node>,
        class_name: &str,
        source: &str,
        rel_path: &str,
        scan: &mut FileScan,
    ) {
        let mut module = ModuleDef {
            name: class_name.to_string(),
            providers: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            source_file: rel_path.to_string(),
        };

        let object = args.and_then(|a| {
            (0..a.named_child_count())
                .filter_map(|i| a.named_child(i))
                .find(|n| n.kind() == "object")
        });

        if let Some(object) = object {
            for i in 0..object.named_child_count() {
                let Some(pair) = object.named_child(i) else {
                    continue;
                };
                if pair.kind() != "pair" {
                    continue;
                }
                let Some(key_node) = pair.child_by_field_name("key") else {
                    continue;
                };
                let Some(value) = pair.child_by_field_name("value") else {
                    continue;
                };
                let key = match key_node.kind() {
                    "string" => self.string_value(key_node, source),
                    _ => self.node_text(key_node, source),
                };

                match key.as_str() {
                    "providers" => self.parse_providers_array(value, source, rel_path, &mut module, scan),
                    "imports" => module.imports = self.identifier_list(value, source),
                    "exports" => module.exports = self.identifier_list(value, source),
                    _ => {}
                }
            }
        }

        scan.modules.push(module);
    }

    /// Entries of a `providers: [...]` array: identifiers reference class
    /// providers by token; object literals declare value/factory providers
    /// inline.
    fn parse_providers_array(
        &self,
        array: Node,
        source: &str,
        rel_path: &str,
        module: &mut ModuleDef,
        scan: &mut FileScan,
    ) {
        if array.kind() != "array" {
            return;
        }
        for i in 0..array.named_child_count() {
            let Some(entry) = array.named_child(i) else {
                continue;
            };
            match entry.kind() {
                "identifier" => {
                    module.providers.push(self.node_text(entry, source));
                }
                "object" => {
                    if let Some(provider) = self.parse_provider_object(entry, source, rel_path) {
                        module.providers.push(provider.token.clone());
                        scan.providers.push(provider);
                    } else {
                        eprintln!(
                            "Warning: {}: provider object in module '{}' has no usable provide/useValue/useFactory shape; skipped",
                            rel_path, module.name
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// `{ provide, useValue }` or `{ provide, useFactory, inject }` entries
    fn parse_provider_object(
        &self,
        object: Node,
        source: &str,
        rel_path: &str,
    ) -> Option<Provider> {
        let mut token: Option<String> = None;
        let mut use_value: Option<String> = None;
        let mut use_factory: Option<String> = None;
        let mut inject: Vec<String> = Vec::new();

        for i in 0..object.named_child_count() {
            let Some(pair) = object.named_child(i) else {
                continue;
            };
            if pair.kind() != "pair" {
                continue;
            }
            let key_node = pair.child_by_field_name("key")?;
            let value = pair.child_by_field_name("value")?;
            let key = match key_node.kind() {
                "string" => self.string_value(key_node, source),
                _ => self.node_text(key_node, source),
            };

            match key.as_str() {
                "provide" => {
                    token = Some(match value.kind() {
                        "string" => self.string_value(value, source),
                        _ => self.node_text(value, source),
                    });
                }
                "useValue" => use_value = Some(self.node_text(value, source)),
                "useFactory" => use_factory = Some(self.node_text(value, source)),
                "inject" => {
                    if value.kind() == "array" {
                        for j in 0..value.named_child_count() {
                            let Some(dep) = value.named_child(j) else {
                                continue;
                            };
                            inject.push(match dep.kind() {
                                "string" => self.string_value(dep, source),
                                _ => self.node_text(dep, source),
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        let token = token?;
        if let Some(expression) = use_factory {
            return Some(Provider {
                token,
                dependencies: inject,
                source_file: rel_path.to_string(),
                kind: ProviderKind::Factory,
                class_name: None,
                expression: Some(expression),
            });
        }
        if let Some(expression) = use_value {
            return Some(Provider {
                token,
                dependencies: Vec::new(),
                source_file: rel_path.to_string(),
                kind: ProviderKind::Value,
                class_name: None,
                expression: Some(expression),
            });
        }
        None
    }

    /// Identifier (or string) names out of an array node
    fn identifier_list(&self, array: Node, source: &str) -> Vec<String> {
        let mut names = Vec::new();
        if array.kind() != "array" {
            return names;
        }
        for i in 0..array.named_child_count() {
            let Some(entry) = array.named_child(i) else {
                continue;
            };
            match entry.kind() {
                "identifier" => names.push(self.node_text(entry, source)),
                "string" => names.push(self.string_value(entry, source)),
                _ => {}
            }
        }
        names
    }

    /// Content of a string literal without quotes
    fn string_value(&self, node: Node, source: &str) -> String {
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "string_fragment" {
                    return self.node_text(child, source);
                }
            }
        }
        // Empty string literal has no fragment child
        self.node_text(node, source)
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_string()
    }

    fn node_text(&self, node: Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }
}

impl Default for TypeScriptScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;

    fn extract(source: &str) -> FileScan {
        let scanner = TypeScriptScanner::new();
        scanner
            .extract(
                source,
                Path::new("/proj/src/app.ts"),
                Path::new("/proj"),
                &CompilerOptions::default(),
            )
            .expect("extract")
    }

    #[test]
    fn test_injectable_class_with_typed_dependencies() {
        let scan = extract(
            r#"
import { Logger } from "./logger";
import { Db } from "./db";

@Injectable()
export class UserService {
  constructor(private readonly logger: Logger, private db: Db) {}
}
"#,
        );

        assert_eq!(scan.providers.len(), 1);
        let provider = &scan.providers[0];
        assert_eq!(provider.token, "UserService");
        assert_eq!(provider.dependencies, vec!["Logger", "Db"]);
        assert_eq!(provider.kind, ProviderKind::Class);
        assert_eq!(provider.class_name.as_deref(), Some("UserService"));
        assert_eq!(provider.source_file, "src/app.ts");
    }

    #[test]
    fn test_inject_decorator_wins_over_type_annotation() {
        let scan = extract(
            r#"
@Injectable()
export class ReportService {
  constructor(@Inject('CONFIG') config: AppConfig, logger: Logger) {}
}
"#,
        );

        assert_eq!(scan.providers.len(), 1);
        assert_eq!(scan.providers[0].dependencies, vec!["CONFIG", "Logger"]);
    }

    #[test]
    fn test_class_without_constructor_has_no_dependencies() {
        let scan = extract(
            r#"
@Injectable()
export class Clock {
  now(): number { return Date.now(); }
}
"#,
        );

        assert_eq!(scan.providers.len(), 1);
        assert!(scan.providers[0].dependencies.is_empty());
    }

    #[test]
    fn test_undecorated_class_is_not_a_provider() {
        let scan = extract(
            r#"
import { helper } from "./helper";

export class PlainClass {
  constructor(dep: Something) {}
}
"#,
        );

        assert!(scan.providers.is_empty());
        // Imports are still recorded for the reverse-import search
        assert_eq!(scan.imports, vec!["src/helper"]);
    }

    #[test]
    fn test_decorator_before_export_keyword() {
        let scan = extract(
            r#"
@Injectable()
export class Standalone {}
"#,
        );
        assert_eq!(scan.providers.len(), 1);
        assert_eq!(scan.providers[0].token, "Standalone");
    }

    #[test]
    fn test_generic_type_uses_base_name() {
        let scan = extract(
            r#"
@Injectable()
export class CacheReader {
  constructor(cache: Cache<string>) {}
}
"#,
        );
        assert_eq!(scan.providers[0].dependencies, vec!["Cache"]);
    }

    #[test]
    fn test_module_decorator_metadata() {
        let scan = extract(
            r#"
import { UserService } from "./user.service";
import { DbModule } from "../db/db.module";

@Module({
  imports: [DbModule],
  providers: [UserService, AuthService],
  exports: [UserService],
})
export class UserModule {}
"#,
        );

        assert_eq!(scan.modules.len(), 1);
        let module = &scan.modules[0];
        assert_eq!(module.name, "UserModule");
        assert_eq!(module.providers, vec!["UserService", "AuthService"]);
        assert_eq!(module.imports, vec!["DbModule"]);
        assert_eq!(module.exports, vec!["UserService"]);
        assert_eq!(module.source_file, "src/app.ts");
    }

    #[test]
    fn test_use_value_provider() {
        let scan = extract(
            r#"
@Module({
  providers: [{ provide: 'API_URL', useValue: "https://api.example.com" }],
})
export class ConfigModule {}
"#,
        );

        assert_eq!(scan.providers.len(), 1);
        let provider = &scan.providers[0];
        assert_eq!(provider.token, "API_URL");
        assert_eq!(provider.kind, ProviderKind::Value);
        assert!(provider.dependencies.is_empty());
        assert_eq!(
            provider.expression.as_deref(),
            Some("\"https://api.example.com\"")
        );
        assert_eq!(scan.modules[0].providers, vec!["API_URL"]);
    }

    #[test]
    fn test_use_factory_provider_with_inject() {
        let scan = extract(
            r#"
@Module({
  providers: [
    {
      provide: 'DB_POOL',
      useFactory: (config: AppConfig) => createPool(config),
      inject: ['CONFIG', Logger],
    },
  ],
})
export class DbModule {}
"#,
        );

        assert_eq!(scan.providers.len(), 1);
        let provider = &scan.providers[0];
        assert_eq!(provider.token, "DB_POOL");
        assert_eq!(provider.kind, ProviderKind::Factory);
        assert_eq!(provider.dependencies, vec!["CONFIG", "Logger"]);
        assert!(provider
            .expression
            .as_deref()
            .unwrap()
            .contains("createPool(config)"));
    }

    #[test]
    fn test_import_resolution_relative_and_bare() {
        let scan = extract(
            r#"
import { A } from "./a";
import { B } from "../lib/b";
import { Injectable } from "@pulzar/core";
export { C } from "./c";
"#,
        );

        assert_eq!(
            scan.imports,
            vec!["src/a", "lib/b", "@pulzar/core", "src/c"]
        );
    }

    #[test]
    fn test_tsx_file_parses() {
        let scanner = TypeScriptScanner::new();
        let scan = scanner
            .extract(
                r#"
import { Store } from "./store";

@Injectable()
export class ViewModel {
  constructor(store: Store) {}
}

export const View = () => <div>ok</div>;
"#,
                Path::new("/proj/src/view.tsx"),
                Path::new("/proj"),
                &CompilerOptions::default(),
            )
            .expect("extract tsx");

        assert_eq!(scan.providers.len(), 1);
        assert_eq!(scan.providers[0].dependencies, vec!["Store"]);
    }

    #[test]
    fn test_malformed_source_is_best_effort() {
        // tree-sitter recovers from local syntax errors; extraction keeps
        // whatever is parseable instead of failing the file
        let scan = extract(
            r#"
import { A } from "./a";
const oops = {{{;
@Injectable()
export class Survivor {}
"#,
        );
        assert_eq!(scan.imports, vec!["src/a"]);
    }
}
