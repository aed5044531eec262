//! Parser adapter: file content in, AST plus position metadata out.
//!
//! Isolates the concrete grammar dialect behind one interface: `.tsx`/`.ts`
//! parse as TypeScript (JSX on for `.tsx`), everything else as ECMAScript
//! with JSX enabled. Malformed sources produce `AstError::Parse`; callers
//! record the failure and move on, they never abort the run.

use crate::error::{AstError, AstResult};
use std::path::Path;
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, FilePathMapping, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};

/// A freshly parsed module together with its source map. The node table is
/// filled in by the extraction visitor.
pub struct ParsedSource {
    pub module: Module,
    pub cm: Lrc<SourceMap>,
    pub start_pos: BytePos,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SourceMap has no Debug impl.
        f.debug_struct("ParsedSource")
            .field("start_pos", &self.start_pos)
            .finish_non_exhaustive()
    }
}

/// Syntax dialect for a path, by extension.
pub fn syntax_for_path(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: true,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
    }
}

/// Parses one file's content into a module. Each file gets its own source
/// map so trees stay independent of one another.
pub fn parse_source(path: &Path, source: &str) -> AstResult<ParsedSource> {
    let cm = Lrc::new(SourceMap::new(FilePathMapping::empty()));
    let file_name = Lrc::new(FileName::Real(path.to_path_buf()));
    let source_file = cm.new_source_file(file_name, source.to_string());
    let start_pos = source_file.start_pos;

    let lexer = Lexer::new(
        syntax_for_path(path),
        Default::default(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| AstError::parse(e.kind().msg()))?;

    // The parser recovers from some errors; a recovered module is still a
    // malformed input for our purposes.
    let errors = parser.take_errors();
    if let Some(first) = errors.first() {
        return Err(AstError::parse(first.kind().msg()));
    }

    Ok(ParsedSource {
        module,
        cm,
        start_pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_tsx_with_jsx_elements() {
        let src = r#"
import { Button } from "@ui/old";
export const App = () => <Button variant="primary" />;
"#;
        let parsed = parse_source(&PathBuf::from("app.tsx"), src).unwrap();
        assert_eq!(parsed.module.body.len(), 2);
    }

    #[test]
    fn rejects_malformed_source() {
        let err = parse_source(&PathBuf::from("broken.tsx"), "const = <<<").unwrap_err();
        assert!(matches!(err, AstError::Parse { .. }));
    }

    #[test]
    fn plain_ts_does_not_take_jsx() {
        // `<Button />` in a .ts file is a type assertion, not JSX; the
        // dialect split keeps the two grammars apart.
        let src = "const x: number = 1;\n";
        parse_source(&PathBuf::from("util.ts"), src).unwrap();
    }
}
