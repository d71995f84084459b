//! Turns a symbols/exports file on disk into the structured form
//! `js-ld-core` consumes.
//!
//! Parsing of input JavaScript fragments into a full AST is out of scope
//! for this link-editor (spec.md §1): the generator is handed structured
//! import/export declarations and a [`SourceFragment`] body. This module
//! is the concrete, minimal stand-in for that out-of-scope "JS-AST
//! construction and scope-analysis facility": a small directive grammar
//! for the declarations, and a hand-rolled free-variable scan (spec.md's
//! own Design Notes section sanctions exactly this: "a minimal JS
//! parser/scope walker") for the body. It does not attempt to parse
//! JavaScript in general.
//!
//! # Directive grammar
//!
//! A line whose first non-whitespace characters are `//js-ld:` is a
//! directive; everything else is body source, concatenated in file
//! order. Recognised directives:
//!
//! ```text
//! //js-ld:import <symbol> [as <binding>]
//! //js-ld:define <symbol> function|value
//! //js-ld:require "<specifier>" as <local>
//! //js-ld:require "<specifier>" { <name>[ as <alias>], ... }
//! //js-ld:export <exported_name>[ = <local_expr>]
//! ```
//!
//! `import`/`define` are only meaningful in a symbols file; `export` only
//! in an exports file. `require` is shared by both (spec.md §4.5 notes
//! the exports-file emission is symmetric to the symbols-file one).

use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Context, Result};

use js_ld_core::{
    ExportSpecifier, ExportsFile, ImportSpecifier, RequirementImport, RequirementUse, SourceFragment, SymbolDef,
    SymbolImport, SymbolKind, SymbolsFile,
};

const DIRECTIVE_PREFIX: &str = "//js-ld:";

pub fn parse_symbols_file(text: &str) -> Result<SymbolsFile> {
    let mut file = SymbolsFile::default();
    let mut body_lines = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        match line.trim_start().strip_prefix(DIRECTIVE_PREFIX) {
            Some(rest) => parse_symbols_directive(rest.trim(), &mut file)
                .with_context(|| format!("line {}", lineno + 1))?,
            None => body_lines.push(line),
        }
    }
    file.body = fragment_from_body(&body_lines.join("\n"));
    Ok(file)
}

pub fn parse_exports_file(text: &str) -> Result<ExportsFile> {
    let mut file = ExportsFile::default();
    let mut body_lines = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        match line.trim_start().strip_prefix(DIRECTIVE_PREFIX) {
            Some(rest) => parse_exports_directive(rest.trim(), &mut file)
                .with_context(|| format!("line {}", lineno + 1))?,
            None => body_lines.push(line),
        }
    }
    file.body = fragment_from_body(&body_lines.join("\n"));
    Ok(file)
}

/// One identifier per non-blank, non-`#`-comment line.
pub fn parse_externs(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_symbols_directive(rest: &str, file: &mut SymbolsFile) -> Result<()> {
    let keyword = rest.split_whitespace().next().unwrap_or_default();
    match keyword {
        "import" => {
            let mut words = rest["import".len()..].split_whitespace();
            let name = words.next().ok_or_else(|| anyhow!("`import` needs a symbol name"))?;
            let binding = match words.next() {
                Some("as") => words.next().ok_or_else(|| anyhow!("`import ... as` needs a binding name"))?,
                _ => name,
            };
            file.symbol_imports.push(SymbolImport {
                symbol_name: name.to_string(),
                binding: binding.to_string(),
            });
        }
        "define" => {
            let mut words = rest["define".len()..].split_whitespace();
            let name = words.next().ok_or_else(|| anyhow!("`define` needs a symbol name"))?;
            let kind = match words.next() {
                Some("function") => SymbolKind::Function,
                Some("value") => SymbolKind::Value,
                other => bail!("`define` needs `function` or `value`, got {:?}", other),
            };
            file.symbol_defs.push(SymbolDef {
                symbol_name: name.to_string(),
                kind,
            });
        }
        "require" => file.requirement_uses.push(parse_require(rest)?),
        other => bail!("unrecognised js-ld directive `{}`", other),
    }
    Ok(())
}

fn parse_exports_directive(rest: &str, file: &mut ExportsFile) -> Result<()> {
    let keyword = rest.split_whitespace().next().unwrap_or_default();
    match keyword {
        "import" => {
            let mut words = rest["import".len()..].split_whitespace();
            let name = words.next().ok_or_else(|| anyhow!("`import` needs a symbol name"))?;
            let binding = match words.next() {
                Some("as") => words.next().ok_or_else(|| anyhow!("`import ... as` needs a binding name"))?,
                _ => name,
            };
            file.symbol_imports.push(SymbolImport {
                symbol_name: name.to_string(),
                binding: binding.to_string(),
            });
        }
        "require" => file.requirement_uses.push(parse_require(rest)?),
        "export" => {
            let after_kw = rest["export".len()..].trim();
            let (name_part, local_part) = match after_kw.split_once('=') {
                Some((n, l)) => (n.trim(), Some(l.trim().to_string())),
                None => (after_kw, None),
            };
            if name_part.is_empty() {
                bail!("`export` needs an exported name");
            }
            file.exports.push(ExportSpecifier {
                local_name: local_part,
                exported_name: name_part.to_string(),
            });
        }
        other => bail!("unrecognised js-ld directive `{}`", other),
    }
    Ok(())
}

/// Parses `require "<specifier>" as <local>` or `require "<specifier>" {
/// <name> [as <alias>], ... }`. `rest` is the directive text starting at
/// `require`.
fn parse_require(rest: &str) -> Result<RequirementUse> {
    let after_kw = rest["require".len()..].trim();
    let first_quote = after_kw
        .find('"')
        .ok_or_else(|| anyhow!("`require` needs a quoted module specifier"))?;
    let after_open_quote = &after_kw[first_quote + 1..];
    let close_quote = after_open_quote
        .find('"')
        .ok_or_else(|| anyhow!("unterminated module specifier"))?;
    let module_specifier = after_open_quote[..close_quote].to_string();
    let remainder = after_open_quote[close_quote + 1..].trim();

    let imports = if let Some(alias) = remainder.strip_prefix("as") {
        let alias = alias.trim();
        if alias.is_empty() {
            bail!("`require \"{}\" as` needs a local alias", module_specifier);
        }
        vec![RequirementImport::WholeModule {
            local_alias: alias.to_string(),
        }]
    } else if let Some(body) = remainder.strip_prefix('{') {
        let body = body
            .trim_end()
            .strip_suffix('}')
            .ok_or_else(|| anyhow!("unterminated `{{...}}` in `require \"{}\"`", module_specifier))?;
        body.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let mut parts = item.split_whitespace();
                let name = parts.next().unwrap_or_default().to_string();
                let alias = match parts.next() {
                    Some("as") => parts.next().map(str::to_string),
                    _ => None,
                };
                let local_binding_name = alias.clone().unwrap_or_else(|| name.clone());
                RequirementImport::Named(ImportSpecifier {
                    exported_name: alias.map(|_| name),
                    local_binding_name,
                })
            })
            .collect()
    } else {
        bail!("`require \"{}\"` needs `as <local>` or `{{ ... }}`", module_specifier);
    };

    Ok(RequirementUse {
        module_specifier,
        imports,
    })
}

fn fragment_from_body(text: &str) -> SourceFragment {
    let free_identifiers = scope_walk::free_identifiers(text);
    SourceFragment {
        text: text.to_string(),
        free_identifiers,
    }
}

/// The minimal free-variable scanner spec.md's Design Notes allow in
/// place of a real JS parser: strip comments/string-literal contents,
/// tokenize identifiers, then drop property-access targets (preceded by
/// `.`), language keywords, and names bound by a `const`/`let`/`var`/
/// `function` declaration or a function/arrow parameter list inside the
/// same fragment.
mod scope_walk {
    use std::collections::BTreeSet;

    const KEYWORDS: &[&str] = &[
        "var", "let", "const", "function", "return", "if", "else", "for", "while", "do", "switch", "case", "break",
        "continue", "new", "typeof", "instanceof", "in", "of", "this", "null", "true", "false", "undefined", "void",
        "delete", "try", "catch", "finally", "throw", "class", "extends", "super", "yield", "async", "await",
        "static", "get", "set", "export", "import", "default", "from", "as", "arguments", "NaN", "Infinity",
    ];

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_' || c == '$'
    }

    fn is_ident_part(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '$'
    }

    /// Replaces comments and the contents of string/template literals
    /// with blanks, preserving every other character's position so later
    /// passes can still reason about surrounding punctuation.
    fn strip_noise(src: &str) -> Vec<char> {
        let v: Vec<char> = src.chars().collect();
        let n = v.len();
        let mut out = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            let c = v[i];
            if c == '/' && i + 1 < n && v[i + 1] == '/' {
                while i < n && v[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            if c == '/' && i + 1 < n && v[i + 1] == '*' {
                out.push(' ');
                out.push(' ');
                i += 2;
                while i < n && !(v[i] == '*' && i + 1 < n && v[i + 1] == '/') {
                    out.push(if v[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
                if i < n {
                    out.push(' ');
                    out.push(' ');
                    i += 2;
                }
                continue;
            }
            if c == '\'' || c == '"' || c == '`' {
                let quote = c;
                out.push(' ');
                i += 1;
                while i < n && v[i] != quote {
                    if v[i] == '\\' && i + 1 < n {
                        out.push(' ');
                        i += 1;
                    }
                    out.push(if v[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
                if i < n {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            out.push(c);
            i += 1;
        }
        out
    }

    fn matching_close_paren(v: &[char], open_idx: usize) -> Option<usize> {
        let mut depth = 0i32;
        for (idx, &c) in v.iter().enumerate().skip(open_idx) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn matching_open_paren(v: &[char], close_idx: usize) -> Option<usize> {
        let mut depth = 0i32;
        let mut idx = close_idx as isize;
        while idx >= 0 {
            match v[idx as usize] {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx as usize);
                    }
                }
                _ => {}
            }
            idx -= 1;
        }
        None
    }

    fn add_param_names(v: &[char], start: usize, end: usize, declared: &mut BTreeSet<String>) {
        let text: String = v[start..end].iter().collect();
        for part in text.split(',') {
            let name = part.trim().trim_start_matches("...").split('=').next().unwrap_or("").trim();
            if name.chars().next().map(is_ident_start).unwrap_or(false) {
                declared.insert(name.to_string());
            }
        }
    }

    /// Collects names bound by `function (...)`/`function name (...)` and
    /// `(...) =>`/`name =>` parameter lists anywhere in `v`.
    fn collect_param_declarations(v: &[char]) -> BTreeSet<String> {
        let n = v.len();
        let mut declared = BTreeSet::new();

        // function declarations/expressions: walk every "function" keyword
        // occurrence and grab the next parenthesised group.
        let mut i = 0;
        while i < n {
            if is_ident_start(v[i]) {
                let start = i;
                while i < n && is_ident_part(v[i]) {
                    i += 1;
                }
                if v[start..i].iter().collect::<String>() == "function" {
                    let mut j = i;
                    while j < n && v[j] != '(' && v[j] != '{' {
                        j += 1;
                    }
                    if j < n && v[j] == '(' {
                        if let Some(close) = matching_close_paren(v, j) {
                            add_param_names(v, j + 1, close, &mut declared);
                        }
                    }
                }
                continue;
            }
            i += 1;
        }

        // arrow functions: walk every "=>" occurrence and look backward for
        // its parameter spec, either `(...)` or a single bare identifier.
        let mut i = 0;
        while i + 1 < n {
            if v[i] == '=' && v[i + 1] == '>' {
                let mut k = i;
                while k > 0 && v[k - 1].is_whitespace() {
                    k -= 1;
                }
                if k > 0 && v[k - 1] == ')' {
                    if let Some(open) = matching_open_paren(v, k - 1) {
                        add_param_names(v, open + 1, k - 1, &mut declared);
                    }
                } else if k > 0 {
                    let end = k;
                    let mut start = k;
                    while start > 0 && is_ident_part(v[start - 1]) {
                        start -= 1;
                    }
                    if start < end {
                        declared.insert(v[start..end].iter().collect());
                    }
                }
            }
            i += 1;
        }

        declared
    }

    /// Collects names bound by `const`/`let`/`var` declarations: the
    /// identifier immediately following the keyword (destructuring
    /// patterns aren't unpacked — good enough for the flat assignment
    /// bodies these files actually carry).
    fn collect_keyword_declarations(v: &[char]) -> BTreeSet<String> {
        let n = v.len();
        let mut declared = BTreeSet::new();
        let mut i = 0;
        let mut words: Vec<(usize, usize)> = Vec::new();
        while i < n {
            if is_ident_start(v[i]) {
                let start = i;
                while i < n && is_ident_part(v[i]) {
                    i += 1;
                }
                words.push((start, i));
            } else {
                i += 1;
            }
        }
        for pair in words.windows(2) {
            let (s0, e0) = pair[0];
            let (s1, e1) = pair[1];
            let kw: String = v[s0..e0].iter().collect();
            if matches!(kw.as_str(), "const" | "let" | "var") {
                declared.insert(v[s1..e1].iter().collect());
            }
        }
        declared
    }

    pub fn free_identifiers(text: &str) -> Vec<String> {
        let clean = strip_noise(text);
        let declared_params = collect_param_declarations(&clean);
        let declared_keywords = collect_keyword_declarations(&clean);

        let n = clean.len();
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut i = 0;
        let mut prev_significant: Option<char> = None;
        while i < n {
            let c = clean[i];
            if is_ident_start(c) {
                let start = i;
                while i < n && is_ident_part(clean[i]) {
                    i += 1;
                }
                let word: String = clean[start..i].iter().collect();
                let preceded_by_dot = prev_significant == Some('.');
                prev_significant = Some(*clean[start..i].last().unwrap());
                if preceded_by_dot
                    || KEYWORDS.contains(&word.as_str())
                    || declared_params.contains(&word)
                    || declared_keywords.contains(&word)
                {
                    continue;
                }
                if seen.insert(word.clone()) {
                    out.push(word);
                }
                continue;
            }
            if !c.is_whitespace() {
                prev_significant = Some(c);
            }
            i += 1;
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn property_access_is_not_free() {
            let free = free_identifiers("window.dispatchEvent();");
            assert_eq!(free, vec!["window".to_string()]);
        }

        #[test]
        fn declared_const_is_excluded() {
            let free = free_identifiers("const x = 1; use(x);");
            assert_eq!(free, vec!["use".to_string()]);
        }

        #[test]
        fn function_params_are_bound() {
            let free = free_identifiers("__symbols['bar'] = function (foo) { return foo(bar); };");
            assert_eq!(free, vec!["__symbols".to_string(), "bar".to_string()]);
        }

        #[test]
        fn arrow_params_are_bound() {
            let free = free_identifiers("const f = (a, b) => a + b + c;");
            assert_eq!(free, vec!["c".to_string()]);
        }

        #[test]
        fn string_and_comment_contents_are_ignored() {
            let free = free_identifiers("// references window\nconst s = 'window.foo'; use(s);");
            assert_eq!(free, vec!["use".to_string()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_file_parses_import_and_define() {
        let text = "//js-ld:import foo\n//js-ld:define bar function\n__symbols['bar'] = function () { return foo(); };\n";
        let file = parse_symbols_file(text).unwrap();
        assert_eq!(file.symbol_imports.len(), 1);
        assert_eq!(file.symbol_imports[0].symbol_name, "foo");
        assert_eq!(file.symbol_defs.len(), 1);
        assert_eq!(file.symbol_defs[0].symbol_name, "bar");
        assert!(file.body.text.contains("__symbols['bar']"));
    }

    #[test]
    fn require_whole_module_renamed() {
        let text = "//js-ld:require \"jQuery\" as $\n";
        let file = parse_symbols_file(text).unwrap();
        assert_eq!(file.requirement_uses.len(), 1);
        match &file.requirement_uses[0].imports[0] {
            RequirementImport::WholeModule { local_alias } => assert_eq!(local_alias, "$"),
            other => panic!("expected WholeModule, got {other:?}"),
        }
    }

    #[test]
    fn require_named_members() {
        let text = "//js-ld:require \"jQuery\" { ajax as doAjax, noConflict }\n";
        let file = parse_symbols_file(text).unwrap();
        let imports = &file.requirement_uses[0].imports;
        assert_eq!(imports.len(), 2);
        match &imports[0] {
            RequirementImport::Named(spec) => {
                assert_eq!(spec.effective_name(), "ajax");
                assert_eq!(spec.local_binding_name, "doAjax");
            }
            other => panic!("expected Named, got {other:?}"),
        }
        match &imports[1] {
            RequirementImport::Named(spec) => {
                assert_eq!(spec.effective_name(), "noConflict");
                assert_eq!(spec.local_binding_name, "noConflict");
            }
            other => panic!("expected Named, got {other:?}"),
        }
    }

    #[test]
    fn exports_file_parses_export_directive() {
        let text = "//js-ld:require \"jQuery\" as $\n//js-ld:export ajax = $.ajax\n";
        let file = parse_exports_file(text).unwrap();
        assert_eq!(file.exports.len(), 1);
        assert_eq!(file.exports[0].exported_name, "ajax");
        assert_eq!(file.exports[0].local_name.as_deref(), Some("$.ajax"));
    }

    #[test]
    fn export_without_local_name_defaults_to_exported_name() {
        let text = "//js-ld:export ajax\n";
        let file = parse_exports_file(text).unwrap();
        assert_eq!(file.exports[0].local_name, None);
        assert_eq!(file.exports[0].source_ref(), "ajax");
    }

    #[test]
    fn externs_file_strips_comments_and_blanks() {
        let text = "window\n# a comment\n\nGLOBAL_THING # trailing comment\n";
        let externs = parse_externs(text);
        assert!(externs.contains("window"));
        assert!(externs.contains("GLOBAL_THING"));
        assert_eq!(externs.len(), 2);
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let text = "//js-ld:frobnicate\n";
        assert!(parse_symbols_file(text).is_err());
    }
}
